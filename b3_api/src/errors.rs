//! Error types for the API client.

/// Errors that can occur when requesting a portfolio page.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// The connection could not be established or was dropped mid-request.
    #[error("Connection failed: {0}")]
    Connect(String),
    /// The request did not complete within the configured timeout.
    #[error("Request timed out")]
    Timeout,
    /// The API returned a non-success status with a body snippet.
    #[error("Request failed with status {status}")]
    HttpStatus { status: u16, body: String },
    /// The body was not JSON (typically an HTML error page).
    #[error("Response was not JSON (content-type: {content_type})")]
    NonJson { content_type: String, body: String },
    /// The body was JSON but did not match the expected envelope.
    #[error("Failed to decode response: {0}")]
    Decode(String),
    /// The request URL could not be constructed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    /// An encoded query segment could not be decoded.
    #[error("Invalid encoded query: {0}")]
    InvalidQuery(String),
}
