use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use valuations_core::{
    aggregation::aggregates_from_frame,
    api_client::ApiClient,
    collaborators::{run_with, DataSet, RecordSource},
    config::AppConfig,
    pipeline::{run_pipeline, PipelineContext},
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Monthly-to-annual company valuation pipeline", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch valuations and rates from the API, aggregate them, and post the annual figures
    Run(RunArgs),
    /// Aggregate local JSON files and print the annual figures
    Process(ProcessArgs),
}

#[derive(Args, Debug, Default)]
struct RunArgs {
    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Evaluation date (YYYY-MM-DD); records on or after it are rejected
    #[arg(long)]
    today: Option<NaiveDate>,
    /// Print the aggregates instead of posting them
    #[arg(long)]
    dry_run: bool,
}

#[derive(Args, Debug)]
struct ProcessArgs {
    /// Monthly valuation payload (JSON)
    #[arg(long)]
    valuations: PathBuf,
    /// Exchange rate payload (JSON)
    #[arg(long)]
    rates: PathBuf,
    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Evaluation date (YYYY-MM-DD); records on or after it are rejected
    #[arg(long)]
    today: Option<NaiveDate>,
    /// Overrides the configured reference currency
    #[arg(long)]
    reference_currency: Option<String>,
    /// Write the aggregates here instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Command::Run(args) => handle_run(args).await,
        Command::Process(args) => handle_process(args),
    }
}

async fn handle_run(args: RunArgs) -> Result<()> {
    let config = AppConfig::load(args.config.as_deref()).context("failed to load configuration")?;
    config.base_url()?;
    let context = config.pipeline_context(args.today.unwrap_or_else(today));
    let client = ApiClient::new(&config.api).context("failed to build API client")?;

    if args.dry_run {
        let rates = client.fetch(DataSet::ExchangeRates).await?;
        let valuations = client.fetch(DataSet::MonthlyValuations).await?;
        let output = run_pipeline(&valuations, &rates, &context)?;
        let rows = aggregates_from_frame(&output.aggregates)?;
        println!("{}", serde_json::to_string_pretty(&rows)?);
        info!("Dry run: nothing was posted");
        return Ok(());
    }

    let report = run_with(&client, &client, &context).await?;
    if report.publish.failure_count > 0 {
        warn!(
            failures = report.publish.failure_count,
            "some annual aggregates were not posted"
        );
    }
    println!(
        "Posted {} of {} annual aggregates ({} failed).",
        report.publish.success_count,
        report.publish.attempted(),
        report.publish.failure_count
    );
    Ok(())
}

fn handle_process(args: ProcessArgs) -> Result<()> {
    let config = AppConfig::load(args.config.as_deref()).context("failed to load configuration")?;
    let mut context: PipelineContext = config.pipeline_context(args.today.unwrap_or_else(today));
    if let Some(code) = args.reference_currency {
        context = context.with_reference_currency(code);
    }

    let valuations = read_json(&args.valuations)?;
    let rates = read_json(&args.rates)?;

    let output = run_pipeline(&valuations, &rates, &context)?;
    let rows = aggregates_from_frame(&output.aggregates)?;
    let rendered = serde_json::to_string_pretty(&rows)?;

    match args.output {
        Some(path) => {
            fs::write(&path, rendered)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!(path = %path.display(), rows = rows.len(), "aggregates written");
        }
        None => println!("{rendered}"),
    }
    Ok(())
}

fn read_json(path: &Path) -> Result<Value> {
    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("{} is not valid JSON", path.display()))
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}
