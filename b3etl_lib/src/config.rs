//! Run configuration, built once at startup and passed into constructors.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use b3_api::Language;

use crate::error::EtlError;
use crate::retry::RetryPolicy;

pub const MIN_PAGE_SIZE: i64 = 1;
pub const MAX_PAGE_SIZE: i64 = 1200;
pub const MAX_INDEX_LENGTH: usize = 16;

/// What to extract and how to talk to the API.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractConfig {
    pub page_size: i64,
    /// Index symbol, e.g. `IBOV`, `SMLL`.
    pub index: String,
    pub language: Language,
    /// Fetch every page instead of only the first.
    pub extract_all_pages: bool,
    pub request_timeout: Duration,
    /// Pause between consecutive page requests.
    pub page_delay: Duration,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            page_size: MAX_PAGE_SIZE,
            index: "IBOV".to_string(),
            language: Language::PtBr,
            extract_all_pages: false,
            request_timeout: Duration::from_secs(30),
            page_delay: Duration::from_millis(1000),
        }
    }
}

impl ExtractConfig {
    pub fn validate(&self) -> Result<(), EtlError> {
        validate_page_size(self.page_size)?;
        validate_index(&self.index)?;
        if self.request_timeout.is_zero() {
            return Err(EtlError::InvalidConfig(
                "request timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Where output files land.
#[derive(Debug, Clone, PartialEq)]
pub struct StorageConfig {
    pub local_root: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            local_root: PathBuf::from("extracted_raw"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EtlConfig {
    pub extract: ExtractConfig,
    pub retry: RetryPolicy,
    pub storage: StorageConfig,
}

impl EtlConfig {
    /// Reads the configuration from process environment variables.
    pub fn from_env() -> Result<Self, EtlError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`; unset keys take defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, EtlError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = EtlConfig::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let extract = ExtractConfig {
            page_size: parse_var(&get, "B3_PAGE_SIZE")?.unwrap_or(defaults.extract.page_size),
            index: get("B3_INDEX")
                .map(|v| normalize_index(&v))
                .unwrap_or(defaults.extract.index),
            language: match get("B3_LANGUAGE") {
                Some(v) => Language::from_str(&v).map_err(|e| EtlError::InvalidConfig(e.to_string()))?,
                None => defaults.extract.language,
            },
            extract_all_pages: match get("B3_EXTRACT_ALL_PAGES") {
                Some(v) => parse_bool("B3_EXTRACT_ALL_PAGES", &v)?,
                None => defaults.extract.extract_all_pages,
            },
            request_timeout: parse_var::<u64, _>(&get, "B3_REQUEST_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.extract.request_timeout),
            page_delay: parse_var::<u64, _>(&get, "B3_PAGE_DELAY_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.extract.page_delay),
        };

        let retry = RetryPolicy {
            max_attempts: parse_var(&get, "B3_RETRY_MAX_ATTEMPTS")?
                .unwrap_or(defaults.retry.max_attempts),
            base_delay: parse_var::<u64, _>(&get, "B3_RETRY_BASE_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry.base_delay),
            backoff_multiplier: parse_var(&get, "B3_RETRY_MULTIPLIER")?
                .unwrap_or(defaults.retry.backoff_multiplier),
        };

        let storage = StorageConfig {
            local_root: get("LOCAL_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.storage.local_root),
        };

        let config = EtlConfig {
            extract,
            retry,
            storage,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), EtlError> {
        self.extract.validate()?;
        if self.retry.max_attempts < 1 {
            return Err(EtlError::InvalidConfig(
                "retry max attempts must be at least 1".to_string(),
            ));
        }
        if !self.retry.backoff_multiplier.is_finite() || self.retry.backoff_multiplier < 1.0 {
            return Err(EtlError::InvalidConfig(
                "retry backoff multiplier must be a finite number >= 1".to_string(),
            ));
        }
        Ok(())
    }
}

pub fn validate_page_size(page_size: i64) -> Result<i64, EtlError> {
    if !(MIN_PAGE_SIZE..=MAX_PAGE_SIZE).contains(&page_size) {
        return Err(EtlError::InvalidConfig(format!(
            "page_size must be between {} and {}",
            MIN_PAGE_SIZE, MAX_PAGE_SIZE
        )));
    }
    Ok(page_size)
}

/// Trims and upper-cases an index symbol: `" ibov "` becomes `IBOV`.
pub fn normalize_index(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// Index symbols are short ASCII alphanumeric codes.
pub fn validate_index(index: &str) -> Result<&str, EtlError> {
    if index.is_empty()
        || index.len() > MAX_INDEX_LENGTH
        || !index.chars().all(|c| c.is_ascii_alphanumeric())
    {
        return Err(EtlError::InvalidConfig(format!(
            "invalid index '{}': expected 1-{} ASCII letters or digits",
            index, MAX_INDEX_LENGTH
        )));
    }
    Ok(index)
}

fn parse_var<T, G>(get: &G, key: &str) -> Result<Option<T>, EtlError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    get(key)
        .map(|v| {
            v.trim()
                .parse::<T>()
                .map_err(|_| EtlError::InvalidConfig(format!("{} has invalid value '{}'", key, v)))
        })
        .transpose()
}

fn parse_bool(key: &str, value: &str) -> Result<bool, EtlError> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(EtlError::InvalidConfig(format!(
            "{} has invalid value '{}' (expected true/false)",
            key, value
        ))),
    }
}
