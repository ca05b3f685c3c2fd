mod commands;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use b3etl_lib::EtlConfig;
use clap::{Parser, Subcommand};

use crate::output::OutputFormat;

#[derive(Parser)]
#[command(name = "b3etl")]
#[command(about = "Extract and aggregate the daily composition of a B3 index")]
struct Cli {
    /// Output format for summary rows: table, json, csv or markdown
    #[arg(long, default_value = "table", global = true)]
    output: String,

    /// Root directory for the partitioned parquet files (overrides LOCAL_ROOT)
    #[arg(long, global = true)]
    output_root: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the index portfolio and store the raw records (default)
    Extract(commands::extract::ExtractArgs),
    /// Aggregate a stored raw file per asset and store the summary
    Transform(commands::transform::TransformArgs),
    /// Extract, then aggregate and store both outputs
    Pipeline(commands::extract::ExtractArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("b3etl=info".parse()?)
                .add_directive("b3etl_lib=info".parse()?)
                .add_directive("b3_api=info".parse()?),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let format = match cli.output.as_str() {
        "json" => OutputFormat::Json,
        "csv" => OutputFormat::Csv,
        "markdown" | "md" => OutputFormat::Markdown,
        _ => OutputFormat::Table,
    };

    let mut config = EtlConfig::from_env()?;
    if let Some(root) = cli.output_root {
        config.storage.local_root = root;
    }

    match cli.command {
        None => {
            commands::extract::run(&commands::extract::ExtractArgs::default(), config).await?
        }
        Some(Commands::Extract(args)) => commands::extract::run(&args, config).await?,
        Some(Commands::Transform(args)) => commands::transform::run(&args, config, &format)?,
        Some(Commands::Pipeline(args)) => commands::pipeline::run(&args, config, &format).await?,
    }

    Ok(())
}
