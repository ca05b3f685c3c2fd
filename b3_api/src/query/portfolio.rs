//! Query builder for the `GetPortfolioDay` endpoint.
//!
//! The endpoint takes its parameters as a single path segment: the query
//! object serialized as compact JSON and encoded with standard base64.

use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::Error;

/// Language the API uses for descriptive fields.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Language {
    /// Brazilian Portuguese. This is the default.
    #[default]
    #[serde(rename = "pt-br")]
    PtBr,
    /// US English.
    #[serde(rename = "en-us")]
    EnUs,
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Language::PtBr => "pt-br",
            Language::EnUs => "en-us",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for Language {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pt-br" => Ok(Language::PtBr),
            "en-us" => Ok(Language::EnUs),
            other => Err(Error::InvalidQuery(format!(
                "unknown language '{}'. Valid values: pt-br, en-us",
                other
            ))),
        }
    }
}

/// Parameters for one page of an index portfolio.
///
/// Field order matters: it fixes the key order of the encoded JSON
/// (`pageNumber`, `pageSize`, `language`, `index`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioQuery {
    /// Page number (1-indexed).
    pub page_number: i64,
    /// Records per page.
    pub page_size: i64,
    pub language: Language,
    /// Index symbol, e.g. `IBOV`.
    pub index: String,
}

impl Default for PortfolioQuery {
    fn default() -> Self {
        Self {
            page_number: 1,
            page_size: 1200,
            language: Language::PtBr,
            index: "IBOV".to_string(),
        }
    }
}

impl PortfolioQuery {
    /// Creates a query for page 1 of the given index.
    pub fn new(index: &str) -> Self {
        Self {
            index: index.to_string(),
            ..Self::default()
        }
    }

    /// Sets the page number (1-indexed).
    pub fn with_page(mut self, page_number: i64) -> Self {
        self.page_number = page_number;
        self
    }

    /// Sets the number of records per page.
    pub fn with_page_size(mut self, page_size: i64) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    /// Serializes the query as compact JSON and encodes it as standard base64.
    pub fn encode(&self) -> Result<String, Error> {
        let json = serde_json::to_string(self)
            .map_err(|e| Error::InvalidQuery(format!("failed to serialize query: {}", e)))?;
        Ok(STANDARD.encode(json.as_bytes()))
    }

    /// Decodes a path segment produced by [`PortfolioQuery::encode`].
    pub fn from_encoded(segment: &str) -> Result<Self, Error> {
        let bytes = STANDARD
            .decode(segment)
            .map_err(|e| Error::InvalidQuery(format!("invalid base64: {}", e)))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| Error::InvalidQuery(format!("invalid query JSON: {}", e)))
    }
}
