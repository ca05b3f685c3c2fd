//! The `transform` subcommand: aggregate a stored raw file per asset.

use anyhow::{Context, Result};
use b3etl_lib::storage::{raw_records_from_frame, summary_frame, Dataset};
use b3etl_lib::{Aggregator, EtlConfig, LocalStore, SummaryRecord};
use chrono::NaiveDate;
use clap::Args;

use crate::commands::extract::parse_date;
use crate::output::{print_summary, OutputFormat};

#[derive(Args)]
pub struct TransformArgs {
    /// Partition date of the raw file to read (YYYY-MM-DD, default today)
    #[arg(long)]
    pub source_date: Option<String>,

    /// Processing date stamped on the rows and used for the output partition
    /// (YYYY-MM-DD, default today)
    #[arg(long)]
    pub date: Option<String>,
}

/// Aggregates `records` and writes the transformed dataset for `date`.
pub fn aggregate_and_store(
    config: &EtlConfig,
    records: &[b3etl_lib::RawRecord],
    date: NaiveDate,
) -> Result<Vec<SummaryRecord>> {
    let summary = Aggregator::new().aggregate(records, date);
    let store = LocalStore::new(&config.storage.local_root);
    let key = Dataset::Transformed.partition_key(date);
    let mut df = summary_frame(&summary)?;
    let path = store.write(&key, &mut df)?;
    eprintln!("Stored {} asset rows in {}", summary.len(), path.display());
    Ok(summary)
}

pub fn run(args: &TransformArgs, config: EtlConfig, format: &OutputFormat) -> Result<()> {
    let source_date = parse_date(args.source_date.as_deref())?;
    let date = parse_date(args.date.as_deref())?;

    let store = LocalStore::new(&config.storage.local_root);
    let key = Dataset::Raw.partition_key(source_date);
    let df = store
        .read(&key)
        .with_context(|| format!("failed to read raw data at {}", store.path_for(&key).display()))?;
    let records = raw_records_from_frame(&df)?;
    eprintln!("Loaded {} raw records from {}", records.len(), key);

    let summary = aggregate_and_store(&config, &records, date)?;
    print_summary(&summary, format)?;
    Ok(())
}
