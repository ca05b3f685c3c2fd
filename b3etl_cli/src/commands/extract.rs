//! The `extract` subcommand: fetch the index portfolio and store the raw records.

use anyhow::{Context, Result};
use b3etl_lib::config::normalize_index;
use b3etl_lib::storage::{raw_frame, Dataset};
use b3etl_lib::{EtlConfig, Extraction, Extractor, Language, LocalStore};
use chrono::{Local, NaiveDate};
use clap::Args;

/// Arguments shared by `extract` and `pipeline`. Unset flags fall back to
/// the environment configuration.
#[derive(Args, Default)]
pub struct ExtractArgs {
    /// Records per page (1-1200)
    #[arg(long)]
    pub page_size: Option<i64>,

    /// Index symbol, e.g. IBOV or SMLL
    #[arg(long)]
    pub index: Option<String>,

    /// API language: pt-br or en-us
    #[arg(long)]
    pub language: Option<String>,

    /// Fetch every page instead of only the first
    #[arg(long)]
    pub all_pages: bool,

    /// Partition date for the output files (YYYY-MM-DD, default today)
    #[arg(long)]
    pub date: Option<String>,
}

impl ExtractArgs {
    pub fn apply(&self, config: &mut EtlConfig) -> Result<()> {
        if let Some(page_size) = self.page_size {
            config.extract.page_size = page_size;
        }
        if let Some(ref index) = self.index {
            config.extract.index = normalize_index(index);
        }
        if let Some(ref language) = self.language {
            config.extract.language = language.parse::<Language>()?;
        }
        if self.all_pages {
            config.extract.extract_all_pages = true;
        }
        config.validate()?;
        Ok(())
    }
}

/// Parses an optional `YYYY-MM-DD` date, defaulting to today.
pub fn parse_date(input: Option<&str>) -> Result<NaiveDate> {
    match input {
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .with_context(|| format!("invalid date '{}', expected YYYY-MM-DD", s)),
        None => Ok(Local::now().date_naive()),
    }
}

/// Runs the extractor and writes the raw dataset for `date`.
pub async fn extract_and_store(config: &EtlConfig, date: NaiveDate) -> Result<Extraction> {
    let extractor = Extractor::new(config.extract.clone(), config.retry.clone())?;
    let extraction = extractor.extract().await?;

    let store = LocalStore::new(&config.storage.local_root);
    let key = Dataset::Raw.partition_key(date);
    let mut df = raw_frame(&extraction.records)?;
    let path = store.write(&key, &mut df)?;

    eprintln!(
        "Stored {} records from {} page(s) in {} ({} dropped)",
        extraction.records.len(),
        extraction.pages_fetched,
        path.display(),
        extraction.dropped_records
    );
    Ok(extraction)
}

pub async fn run(args: &ExtractArgs, mut config: EtlConfig) -> Result<()> {
    args.apply(&mut config)?;
    let date = parse_date(args.date.as_deref())?;
    extract_and_store(&config, date).await?;
    Ok(())
}
