//! Fact linking: one source row → a fact row, or the reason it has none.
//!
//! Linking only *looks up* dimension keys. Every key a row needs must have
//! been created by the dimension pass over the same source, so a cache miss
//! here is a cross-pass inconsistency rather than bad input.

use std::{collections::BTreeMap, future::Future};

use chrono::NaiveDate;
use serde::Serialize;
use strum::Display;
use thiserror::Error;

use crate::{
  PipelineError,
  cache::DimensionCaches,
  calendar::parse_source_date,
  classify::{Keywords, cost_tuple, disaster_tuple, numeric_field, summary_tuple},
  dimension::{FactKey, FactRow, SurrogateKey, Table},
  normalize::decode,
  place::resolve_place,
  row::{Column, SourceRow},
};

// ─── Rejections ──────────────────────────────────────────────────────────────

/// Which of a row's two dates is meant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum DateRole {
  Start,
  End,
}

/// Why a row produced no fact.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
  #[error("place {0:?} could not be resolved")]
  UnresolvablePlace(String),

  #[error("category {0:?} is too long to be genuine")]
  InvalidDisaster(String),

  #[error("{role} date {raw:?} is not a valid date")]
  UnparseableDate { role: DateRole, raw: String },

  #[error("no date dimension row for {role} date {date}")]
  MissingDate { role: DateRole, date: NaiveDate },

  #[error("{count} date dimension rows for {role} date {date}")]
  AmbiguousDate {
    role:  DateRole,
    date:  NaiveDate,
    count: usize,
  },

  #[error("no {0} dimension key was created for this row")]
  MissingDimension(Table),

  #[error("another row already produced this fact key")]
  DuplicateFact,
}

/// The reason a row was rejected, without its details.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, Serialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RejectionKind {
  UnresolvablePlace,
  InvalidDisaster,
  UnparseableDate,
  MissingDate,
  AmbiguousDate,
  MissingDimension,
  DuplicateFact,
}

impl Rejection {
  pub fn kind(&self) -> RejectionKind {
    match self {
      Self::UnresolvablePlace(_) => RejectionKind::UnresolvablePlace,
      Self::InvalidDisaster(_) => RejectionKind::InvalidDisaster,
      Self::UnparseableDate { .. } => RejectionKind::UnparseableDate,
      Self::MissingDate { .. } => RejectionKind::MissingDate,
      Self::AmbiguousDate { .. } => RejectionKind::AmbiguousDate,
      Self::MissingDimension(_) => RejectionKind::MissingDimension,
      Self::DuplicateFact => RejectionKind::DuplicateFact,
    }
  }

  /// `true` for rejections that point at a bug rather than at bad input.
  pub fn is_inconsistency(&self) -> bool {
    matches!(self, Self::MissingDimension(_))
  }
}

/// The outcome of linking one row.
pub type Linked = Result<FactRow, Rejection>;

// ─── Date lookup ─────────────────────────────────────────────────────────────

/// Exact-match lookup of calendar dates in the date dimension.
pub trait DateLookup {
  /// Keys of every date row for `date`. Storage failures are fatal.
  fn date_keys(
    &self,
    date: NaiveDate,
  ) -> impl Future<Output = Result<Vec<SurrogateKey>, PipelineError>> + Send + '_;
}

impl DateLookup for BTreeMap<NaiveDate, Vec<SurrogateKey>> {
  async fn date_keys(
    &self,
    date: NaiveDate,
  ) -> Result<Vec<SurrogateKey>, PipelineError> {
    Ok(self.get(&date).cloned().unwrap_or_default())
  }
}

// ─── Linker ──────────────────────────────────────────────────────────────────

/// Turns source rows into fact rows against populated dimension caches.
#[derive(Debug, Clone, Copy)]
pub struct FactLinker<'a> {
  keywords: &'a Keywords,
}

impl<'a> FactLinker<'a> {
  pub fn new(keywords: &'a Keywords) -> Self { Self { keywords } }

  /// Link `row`. The outer `Result` carries fatal storage failures from the
  /// date lookup; the inner one is the row's own outcome.
  pub async fn link<D: DateLookup>(
    &self,
    row: &SourceRow,
    caches: &DimensionCaches,
    dates: &D,
  ) -> Result<Linked, PipelineError> {
    let keys = match self.dimension_keys(row, caches) {
      Ok(keys) => keys,
      Err(rejection) => return Ok(Err(rejection)),
    };

    let start_date = match resolve_date(row, DateRole::Start, dates).await? {
      Ok(key) => key,
      Err(rejection) => return Ok(Err(rejection)),
    };
    let end_date = match resolve_date(row, DateRole::End, dates).await? {
      Ok(key) => key,
      Err(rejection) => return Ok(Err(rejection)),
    };

    Ok(Ok(FactRow {
      key:        FactKey {
        start_date,
        end_date,
        location: keys.location,
        disaster: keys.disaster,
        summary: keys.summary,
      },
      cost:       keys.cost,
      fatalities: numeric_field(row, Column::Fatalities),
      injured:    numeric_field(row, Column::Injured),
      evacuated:  numeric_field(row, Column::Evacuated),
    }))
  }

  /// Look up the four cache-backed dimension keys.
  fn dimension_keys(
    &self,
    row: &SourceRow,
    caches: &DimensionCaches,
  ) -> Result<DimensionKeys, Rejection> {
    let cost = caches
      .cost
      .lookup(&cost_tuple(row))
      .ok_or(Rejection::MissingDimension(Table::Cost))?;

    let place = resolve_place(row.field(Column::Place)).ok_or_else(|| {
      Rejection::UnresolvablePlace(decode(row.field(Column::Place)))
    })?;
    let location = caches
      .location
      .lookup(&place)
      .ok_or(Rejection::MissingDimension(Table::Location))?;

    let disaster = disaster_tuple(row).ok_or_else(|| {
      Rejection::InvalidDisaster(decode(row.field(Column::Category)))
    })?;
    let disaster = caches
      .disaster
      .lookup(&disaster)
      .ok_or(Rejection::MissingDimension(Table::Disaster))?;

    let summary = caches
      .summary
      .lookup(&summary_tuple(row, self.keywords))
      .ok_or(Rejection::MissingDimension(Table::Summary))?;

    Ok(DimensionKeys {
      location,
      disaster,
      cost,
      summary,
    })
  }
}

struct DimensionKeys {
  location: SurrogateKey,
  disaster: SurrogateKey,
  cost:     SurrogateKey,
  summary:  SurrogateKey,
}

/// Parse one of the row's dates and find its single date dimension key.
async fn resolve_date<D: DateLookup>(
  row: &SourceRow,
  role: DateRole,
  dates: &D,
) -> Result<Result<SurrogateKey, Rejection>, PipelineError> {
  let column = match role {
    DateRole::Start => Column::StartDate,
    DateRole::End => Column::EndDate,
  };
  let raw = row.field(column);
  let Some(date) = parse_source_date(raw) else {
    return Ok(Err(Rejection::UnparseableDate {
      role,
      raw: decode(raw),
    }));
  };

  let keys = dates.date_keys(date).await?;
  Ok(match keys.as_slice() {
    [key] => Ok(*key),
    [] => Err(Rejection::MissingDate { role, date }),
    many => Err(Rejection::AmbiguousDate {
      role,
      date,
      count: many.len(),
    }),
  })
}
