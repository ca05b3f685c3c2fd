//! Paginated extraction of an index portfolio.

use std::collections::HashSet;

use chrono::{Local, NaiveDateTime};

use b3_api::types::PageEnvelope;
use b3_api::{Client, ParsedResponse, PortfolioQuery};

use crate::config::ExtractConfig;
use crate::error::EtlError;
use crate::records::{HeaderMeta, RawRecord};
use crate::retry::{RetryPolicy, Sleeper, TokioSleeper};

/// Consolidated result of one extraction run.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    /// Records of all fetched pages, in page order.
    pub records: Vec<RawRecord>,
    /// Header metadata of the first page.
    pub header: HeaderMeta,
    pub pages_fetched: i64,
    /// Page count reported by the first page, if any.
    pub total_pages: Option<i64>,
    /// Records dropped because a numeric field could not be parsed.
    pub dropped_records: usize,
}

/// Fetches one or all pages of an index portfolio, retrying transient
/// failures, and normalizes the records.
///
/// Pages are fetched strictly in sequence: page `n + 1` is requested only
/// after page `n` has succeeded.
pub struct Extractor<S = TokioSleeper> {
    client: Client,
    config: ExtractConfig,
    retry: RetryPolicy,
    sleeper: S,
}

impl Extractor<TokioSleeper> {
    /// Creates an extractor against the production API.
    pub fn new(config: ExtractConfig, retry: RetryPolicy) -> Result<Self, EtlError> {
        config.validate()?;
        let client = Client::new(config.request_timeout)?;
        Ok(Self::with_client(config, retry, client, TokioSleeper))
    }
}

impl<S: Sleeper> Extractor<S> {
    /// Creates an extractor with an explicit client and sleeper. Used for
    /// testing with wiremock.
    pub fn with_client(config: ExtractConfig, retry: RetryPolicy, client: Client, sleeper: S) -> Self {
        Self {
            client,
            config,
            retry,
            sleeper,
        }
    }

    pub fn config(&self) -> &ExtractConfig {
        &self.config
    }

    fn query_for(&self, page: i64) -> PortfolioQuery {
        PortfolioQuery::new(&self.config.index)
            .with_page(page)
            .with_page_size(self.config.page_size)
            .with_language(self.config.language)
    }

    /// Fetches a single page, with retries.
    pub async fn fetch_page(&self, page: i64) -> Result<PageEnvelope, EtlError> {
        let query = self.query_for(page);
        let label = format!("{} page {}", self.config.index, page);
        self.retry
            .run(&label, &self.sleeper, || async {
                match self.client.get_portfolio_page(&query).await {
                    Ok(ParsedResponse::Json(envelope)) => Ok(envelope),
                    Ok(ParsedResponse::NonJson { content_type, body }) => {
                        tracing::warn!("{} returned non-JSON body ({})", label, content_type);
                        Err(b3_api::Error::NonJson { content_type, body })
                    }
                    Err(e) => Err(e),
                }
            })
            .await
    }

    /// Runs the extraction: page 1, then pages `2..=total_pages` when
    /// `extract_all_pages` is set.
    pub async fn extract(&self) -> Result<Extraction, EtlError> {
        self.extract_at(Local::now().naive_local()).await
    }

    /// Same as [`Extractor::extract`] with a fixed extraction timestamp.
    pub async fn extract_at(&self, extracted_at: NaiveDateTime) -> Result<Extraction, EtlError> {
        tracing::info!(
            "Extracting {} (page size {}, language {}, all pages: {})",
            self.config.index,
            self.config.page_size,
            self.config.language,
            self.config.extract_all_pages
        );

        let first = self.fetch_page(1).await?;
        let header = first
            .header
            .as_ref()
            .map(HeaderMeta::from)
            .unwrap_or_default();
        let total_pages = first.page.total_pages;

        let mut merger = PageMerger::new(header.clone(), extracted_at);
        merger.push(1, &first);
        let mut pages_fetched = 1;

        let remaining = match total_pages {
            Some(n) if self.config.extract_all_pages && n > 1 => n,
            _ => 1,
        };
        if remaining > 1 {
            tracing::info!("Found {} pages, fetching the remaining ones", remaining);
        }
        for page in 2..=remaining {
            if !self.config.page_delay.is_zero() {
                self.sleeper.sleep(self.config.page_delay).await;
            }
            let envelope = self.fetch_page(page).await?;
            merger.push(page, &envelope);
            pages_fetched += 1;
        }

        let (records, dropped_records) = merger.finish();
        if records.is_empty() {
            tracing::error!(
                "No usable records for {} across {} page(s)",
                self.config.index,
                pages_fetched
            );
            return Err(EtlError::NoDataFound {
                index: self.config.index.clone(),
            });
        }

        tracing::info!(
            "Extraction complete: {} records from {} page(s), {} dropped",
            records.len(),
            pages_fetched,
            dropped_records
        );
        Ok(Extraction {
            records,
            header,
            pages_fetched,
            total_pages,
            dropped_records,
        })
    }
}

/// Accumulates normalized records page by page.
struct PageMerger {
    header: HeaderMeta,
    extracted_at: NaiveDateTime,
    records: Vec<RawRecord>,
    seen: HashSet<(String, String)>,
    dropped: usize,
}

impl PageMerger {
    fn new(header: HeaderMeta, extracted_at: NaiveDateTime) -> Self {
        Self {
            header,
            extracted_at,
            records: Vec::new(),
            seen: HashSet::new(),
            dropped: 0,
        }
    }

    fn push(&mut self, page: i64, envelope: &PageEnvelope) {
        let before = self.records.len();
        for constituent in &envelope.results {
            match RawRecord::from_constituent(constituent, &self.header, self.extracted_at) {
                Ok(record) => {
                    if !self.seen.insert((record.cod.clone(), record.asset.clone())) {
                        tracing::warn!(
                            "Duplicate constituent {} / {} on page {}",
                            record.cod,
                            record.asset,
                            page
                        );
                    }
                    self.records.push(record);
                }
                Err(e) => {
                    self.dropped += 1;
                    tracing::warn!("Dropping {} on page {}: {}", constituent.cod, page, e);
                }
            }
        }
        tracing::info!("Page {}: +{} records", page, self.records.len() - before);
    }

    fn finish(self) -> (Vec<RawRecord>, usize) {
        (self.records, self.dropped)
    }
}
