//! Error types for the ETL library.

use thiserror::Error;

/// Errors produced by extraction, aggregation, configuration, and storage.
#[derive(Error, Debug)]
pub enum EtlError {
    /// The API rejected the request (4xx other than 429). Never retried.
    #[error("Client request error (HTTP {status}): {body}")]
    ClientRequestError { status: u16, body: String },
    /// The body was not JSON, or did not match the page schema, on the last attempt.
    #[error("Invalid response format: {0}")]
    InvalidResponseFormat(String),
    /// A locale-formatted numeric field could not be parsed.
    #[error("Malformed numeric field '{field}': {value:?}")]
    MalformedNumericField { field: &'static str, value: String },
    /// Every fetched page was valid but no usable record remained.
    #[error("No data found for index {index}")]
    NoDataFound { index: String },
    /// Retries were exhausted on a transient condition.
    #[error("Extraction failed after {attempts} attempts: {source}")]
    ExtractionFailed {
        attempts: u32,
        #[source]
        source: b3_api::Error,
    },
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("HTTP client error: {0}")]
    Http(#[from] b3_api::Error),
    #[error("Storage error: {0}")]
    Storage(#[from] polars::prelude::PolarsError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Refusing to write an empty dataset to {0}")]
    EmptyFrame(String),
}
