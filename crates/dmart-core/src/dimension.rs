//! Dimension natural keys, surrogate keys and the fact row.
//!
//! Natural keys compare structurally: a `None` component only equals another
//! `None`, never an empty or populated value.

use std::fmt;

use chrono::{Datelike, NaiveDate, Weekday};
use serde::Serialize;
use strum::{Display, EnumIter};

pub use crate::place::Place;

// ─── Keys and tables ─────────────────────────────────────────────────────────

/// A storage-generated identifier for a dimension row.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize,
)]
#[serde(transparent)]
pub struct SurrogateKey(pub i64);

impl fmt::Display for SurrogateKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// The tables of the star schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Table {
  Date,
  Location,
  Disaster,
  Cost,
  Summary,
  Fact,
}

impl Table {
  /// The SQL table name.
  pub fn table_name(self) -> &'static str {
    match self {
      Self::Date => "date_dimension",
      Self::Location => "location_dimension",
      Self::Disaster => "disaster_dimension",
      Self::Cost => "cost_dimension",
      Self::Summary => "summary_dimension",
      Self::Fact => "fact",
    }
  }
}

// ─── Date ────────────────────────────────────────────────────────────────────

/// One calendar day of the date dimension, before holiday backfill.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateRow {
  pub date:        NaiveDate,
  pub year:        i32,
  pub month:       u32,
  pub day:         u32,
  /// ISO weekday, Monday = 1.
  pub day_of_week: u32,
  pub is_weekend:  bool,
}

impl From<NaiveDate> for DateRow {
  fn from(date: NaiveDate) -> Self {
    let weekday = date.weekday();
    Self {
      date,
      year: date.year(),
      month: date.month(),
      day: date.day(),
      day_of_week: weekday.number_from_monday(),
      is_weekend: matches!(weekday, Weekday::Sat | Weekday::Sun),
    }
  }
}

// ─── Disaster ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct DisasterTuple {
  pub disaster_type:   Option<String>,
  pub subgroup:        Option<String>,
  pub group:           Option<String>,
  pub category:        Option<String>,
  /// Only kept for the `geological` subgroup.
  pub magnitude:       Option<String>,
  pub people_affected: Option<String>,
}

// ─── Cost ────────────────────────────────────────────────────────────────────

/// Column names of the cost figures, in [`CostTuple`] order.
pub const COST_COLUMNS: [&str; 9] = [
  "estimated_total_cost",
  "normalized_total_cost",
  "federal_dfaa_payments",
  "provincial_dfaa_payments",
  "provincial_department_payments",
  "municipal_cost",
  "ogd_cost",
  "insurance_payments",
  "ngo_cost",
];

/// The monetary figures of one event, each the numeric literal from the
/// extract or `None` when the field was empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct CostTuple(pub [Option<String>; 9]);

// ─── Summary ─────────────────────────────────────────────────────────────────

/// Number of keyword slots on a summary row.
pub const KEYWORD_SLOTS: usize = 3;

/// A normalized comment and the keywords found in it. The keywords are
/// derived from the comment, so two tuples with the same comment are equal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct SummaryTuple {
  pub comment:  Option<String>,
  pub keywords: [Option<String>; KEYWORD_SLOTS],
}

// ─── Fact ────────────────────────────────────────────────────────────────────

/// The composite primary key of the fact table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FactKey {
  pub start_date: SurrogateKey,
  pub end_date:   SurrogateKey,
  pub location:   SurrogateKey,
  pub disaster:   SurrogateKey,
  pub summary:    SurrogateKey,
}

/// A fully linked fact row, ready to insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactRow {
  pub key:        FactKey,
  pub cost:       SurrogateKey,
  pub fatalities: Option<String>,
  pub injured:    Option<String>,
  pub evacuated:  Option<String>,
}

#[cfg(test)]
mod tests {
  use strum::IntoEnumIterator;

  use super::*;

  #[test]
  fn date_row_attributes() {
    let row = DateRow::from(NaiveDate::from_ymd_opt(2011, 7, 2).unwrap());
    assert_eq!((row.year, row.month, row.day), (2011, 7, 2));
    assert_eq!(row.day_of_week, 6);
    assert!(row.is_weekend);
  }

  #[test]
  fn every_table_has_a_distinct_name() {
    let mut names: Vec<_> = Table::iter().map(Table::table_name).collect();
    names.sort_unstable();
    names.dedup();
    assert_eq!(names.len(), 6);
    assert_eq!(Table::Location.to_string(), "location");
  }

  #[test]
  fn null_and_empty_are_distinct_components() {
    let mut a = CostTuple::default();
    let mut b = CostTuple::default();
    assert_eq!(a, b);
    a.0[0] = Some(String::new());
    assert_ne!(a, b);
    b.0[0] = Some(String::new());
    assert_eq!(a, b);
  }
}
