//! The `pipeline` subcommand: extract, then aggregate in memory.

use anyhow::Result;
use b3etl_lib::EtlConfig;

use crate::commands::extract::{extract_and_store, parse_date, ExtractArgs};
use crate::commands::transform::aggregate_and_store;
use crate::output::{print_summary, OutputFormat};

pub async fn run(args: &ExtractArgs, mut config: EtlConfig, format: &OutputFormat) -> Result<()> {
    args.apply(&mut config)?;
    let date = parse_date(args.date.as_deref())?;

    let extraction = extract_and_store(&config, date).await?;
    let summary = aggregate_and_store(&config, &extraction.records, date)?;

    print_summary(&summary, format)?;
    eprintln!("Pipeline complete");
    Ok(())
}
