//! Runtime configuration, deserialised from `dmart.toml` and `DMART_*`
//! environment variables.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use dmart_core::pipeline::PipelineConfig;
use serde::Deserialize;

/// Everything one load run needs to know about its surroundings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MartConfig {
  /// The disaster extract.
  pub source:         PathBuf,
  /// SQLite database file the star schema is rebuilt in.
  pub database:       PathBuf,
  /// Rejected rows, in the input layout.
  pub problem_rows:   PathBuf,
  /// Unresolvable place strings, one per line.
  pub problem_places: PathBuf,
  /// Optional `date,name` holiday file.
  pub holidays:       Option<PathBuf>,
  pub pipeline:       PipelineConfig,
}

impl Default for MartConfig {
  fn default() -> Self {
    Self {
      source:         PathBuf::from("canadian_disaster_database_source_data.csv"),
      database:       PathBuf::from("disaster_mart.db"),
      problem_rows:   PathBuf::from("problematic_rows.csv"),
      problem_places: PathBuf::from("problematic_places.csv"),
      holidays:       None,
      pipeline:       PipelineConfig::default(),
    }
  }
}

impl MartConfig {
  /// Layer the (optional) file at `path` under `DMART_`-prefixed environment
  /// variables. Nested keys use `__`, e.g. `DMART_PIPELINE__STORAGE__TIMEOUT_SECS`.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(
        config::Environment::with_prefix("DMART")
          .prefix_separator("_")
          .separator("__"),
      )
      .build()
      .context("failed to read config file")?;

    settings
      .try_deserialize()
      .context("failed to deserialise MartConfig")
  }
}
