//! dmart binary.
//!
//! Reads `dmart.toml` (or the path specified with `--config`), rebuilds the
//! disaster star schema in SQLite from the CSV extract, and reports a run
//! summary.
//!
//! ```
//! cargo run -p dmart-cli --bin dmart -- --source disasters.csv --json
//! ```

mod config;
mod csv_io;
mod holidays;

use std::{collections::BTreeMap, path::PathBuf};

use anyhow::Context as _;
use clap::Parser;
use dmart_core::pipeline::{Pipeline, RunSummary};
use dmart_store_sqlite::SqliteWarehouse;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::{
  config::MartConfig,
  csv_io::{CsvRejectionSink, CsvSource},
};

#[derive(Parser)]
#[command(author, version, about = "Disaster data mart loader")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "dmart.toml")]
  config: PathBuf,

  /// The disaster extract; overrides `source` from the config.
  #[arg(short, long)]
  source: Option<PathBuf>,

  /// SQLite database file; overrides `database` from the config.
  #[arg(short, long)]
  database: Option<PathBuf>,

  /// Print the run summary to stdout as JSON.
  #[arg(long)]
  json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();

  let mut cfg = MartConfig::load(&cli.config)?;
  if let Some(source) = cli.source {
    cfg.source = source;
  }
  if let Some(database) = cli.database {
    cfg.database = database;
  }

  let calendar = match &cfg.holidays {
    Some(path) => holidays::load(path)?,
    None => BTreeMap::new(),
  };

  let store = SqliteWarehouse::open(&cfg.database)
    .await
    .with_context(|| format!("failed to open warehouse at {:?}", cfg.database))?;

  let mut source = CsvSource::new(&cfg.source);
  let mut sink = CsvRejectionSink::create(&cfg.problem_rows, &cfg.problem_places)
    .context("failed to create rejection files")?;

  tracing::info!(
    source = %source.path().display(),
    database = %cfg.database.display(),
    holidays = calendar.len(),
    "starting load"
  );

  let mut pipeline = Pipeline::new(&store, &calendar, cfg.pipeline.clone());
  let summary = pipeline
    .run(&mut source, &mut sink)
    .await
    .context("load failed")?;

  report(&summary, cli.json)
}

fn report(summary: &RunSummary, json: bool) -> anyhow::Result<()> {
  for (kind, count) in &summary.facts_rejected {
    tracing::info!(%kind, count, "rejections");
  }
  if json {
    let out = serde_json::to_string_pretty(summary)
      .context("failed to serialise run summary")?;
    println!("{out}");
  }
  Ok(())
}
