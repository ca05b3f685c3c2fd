//! HTTP client for the B3 index portfolio endpoint.

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use url::Url;

use crate::{query::PortfolioQuery, types::PageEnvelope, user_agent::get_user_agent, Error};

/// Path of the portfolio endpoint, relative to the API host.
pub const PORTFOLIO_PATH: &str = "/indexProxy/indexCall/GetPortfolioDay";

const DEFAULT_BASE_URL: &str = "https://sistemaswebb3-listados.b3.com.br";

/// Shape of a successful HTTP response.
///
/// The endpoint answers with JSON normally but serves an HTML error page
/// on some failures, with a 200 status.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedResponse {
    Json(PageEnvelope),
    NonJson { content_type: String, body: String },
}

/// HTTP client for the B3 `GetPortfolioDay` endpoint.
///
/// Sends requests with browser-like headers and a randomized user agent,
/// since the upstream proxy rejects obvious non-browser clients.
pub struct Client {
    http: reqwest::Client,
    /// Host part of the API. Defaults to `https://sistemaswebb3-listados.b3.com.br`.
    base_api_url: String,
}

impl Client {
    /// Creates a client pointing at the production B3 host.
    pub fn new(timeout: Duration) -> Result<Self, Error> {
        Self::with_base_url(DEFAULT_BASE_URL, timeout)
    }

    /// Creates a client with a custom base URL. Used for testing with wiremock.
    pub fn with_base_url(base_url: &str, timeout: Duration) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .user_agent(get_user_agent())
            .timeout(timeout)
            .build()
            .map_err(|e| {
                tracing::error!("Failed to build HTTP client: {}", e);
                Error::Connect(e.to_string())
            })?;
        Ok(Self {
            http,
            base_api_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Builds the request URL: the encoded query is the final path segment.
    pub fn portfolio_url(&self, query: &PortfolioQuery) -> Result<Url, Error> {
        let encoded = query.encode()?;
        Url::parse(&format!("{}{}/{}", self.base_api_url, PORTFOLIO_PATH, encoded)).map_err(|e| {
            tracing::error!("Invalid URL constructed: {}", e);
            Error::InvalidUrl(e.to_string())
        })
    }

    /// Fetches one portfolio page.
    ///
    /// Transport failures and non-success statuses are errors; a success
    /// status with a non-JSON body is returned as [`ParsedResponse::NonJson`].
    pub async fn get_portfolio_page(&self, query: &PortfolioQuery) -> Result<ParsedResponse, Error> {
        let url = self.portfolio_url(query)?;
        tracing::debug!(page = query.page_number, %url, "requesting portfolio page");

        let resp = self
            .http
            .get(url)
            .header("accept", "application/json, text/plain, */*")
            .header("accept-language", "pt-BR,pt;q=0.9,en;q=0.8")
            .header("referer", "https://sistemaswebb3-listados.b3.com.br/")
            .header("sec-fetch-dest", "empty")
            .header("sec-fetch-mode", "cors")
            .header("sec-fetch-site", "same-origin")
            .header("cache-control", "no-cache")
            .header("pragma", "no-cache")
            .send()
            .await
            .map_err(transport_error)?;

        let status = resp.status();
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_lowercase();
        let body = resp.text().await.map_err(transport_error)?;

        if !status.is_success() {
            let snippet = truncate_body(&body);
            tracing::error!("Request failed with status {}: {}", status, snippet);
            return Err(Error::HttpStatus {
                status: status.as_u16(),
                body: snippet,
            });
        }

        parse_body(&content_type, &body)
    }
}

/// Classifies a successful body by content type before any JSON decoding.
pub(crate) fn parse_body(content_type: &str, body: &str) -> Result<ParsedResponse, Error> {
    if !looks_like_json(content_type, body) {
        return Ok(ParsedResponse::NonJson {
            content_type: content_type.to_string(),
            body: truncate_body(body),
        });
    }
    serde_json::from_str::<PageEnvelope>(body)
        .map(ParsedResponse::Json)
        .map_err(|e| {
            let snippet = truncate_body(body);
            tracing::error!("Failed to parse portfolio page: {} | body: {}", e, snippet);
            Error::Decode(e.to_string())
        })
}

fn looks_like_json(content_type: &str, body: &str) -> bool {
    if content_type.contains("json") {
        return true;
    }
    if content_type.contains("html") {
        return false;
    }
    body.trim_start().starts_with('{')
}

fn transport_error(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        tracing::error!("Request timed out: {}", e);
        Error::Timeout
    } else {
        tracing::error!("Failed to get resource: {}", e);
        Error::Connect(e.to_string())
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 2000;
    if body.len() <= MAX {
        body.to_string()
    } else {
        let mut end = MAX;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...[truncated]", &body[..end])
    }
}
