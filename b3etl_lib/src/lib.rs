//! Library layer for the B3 index ETL: paginated extraction with retry,
//! per-asset aggregation, configuration, and partitioned parquet storage.
//!
//! Wraps the `b3_api` crate with the retry policy, numeric normalization of
//! the upstream locale-formatted fields, and the empty-result policy.

pub mod aggregate;
pub mod config;
pub mod error;
pub mod extract;
pub mod numeric;
pub mod records;
pub mod retry;
pub mod storage;

pub use b3_api;
pub use b3_api::{Language, PortfolioQuery};

pub use aggregate::Aggregator;
pub use config::{EtlConfig, ExtractConfig, StorageConfig};
pub use error::EtlError;
pub use extract::{Extraction, Extractor};
pub use records::{HeaderMeta, RawRecord, SummaryRecord};
pub use retry::{RetryPolicy, Sleeper, TokioSleeper};
pub use storage::{Dataset, LocalStore};
