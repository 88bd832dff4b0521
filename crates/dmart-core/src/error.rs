//! Error types for `dmart-core`.
//!
//! Row-level problems are not errors: they are [`crate::link::Rejection`]s
//! routed to a sink. Everything here aborts the run.

use std::time::Duration;

use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("date range is empty: {start} is after {end}")]
  EmptyDateRange { start: NaiveDate, end: NaiveDate },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A failure that aborts a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
  #[error("core error: {0}")]
  Core(#[from] Error),

  #[error("storage call `{op}` failed after {attempts} attempt(s): {source}")]
  Storage {
    op:       &'static str,
    attempts: u32,
    #[source]
    source:   BoxError,
  },

  #[error("storage call `{op}` timed out after {after:?} ({attempts} attempt(s))")]
  Timeout {
    op:       &'static str,
    attempts: u32,
    after:    Duration,
  },

  #[error("source read error: {0}")]
  Source(#[source] BoxError),

  #[error("rejection sink error: {0}")]
  Sink(#[source] BoxError),
}
