//! The `WarehouseStore` trait: what the pipeline needs from a relational
//! backend.
//!
//! The trait is implemented by storage backends (e.g. `dmart-store-sqlite`).
//! Each call is one statement (or one batch) that commits on its own; the
//! pipeline never relies on cross-call transactions.

use std::future::Future;

use chrono::NaiveDate;

use crate::dimension::{
  CostTuple, DateRow, DisasterTuple, FactRow, Place, SummaryTuple, SurrogateKey,
  Table,
};

/// Abstraction over the star-schema warehouse.
///
/// Insert methods take their natural key by value and return the surrogate
/// key generated by the backend.
pub trait WarehouseStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Schema ────────────────────────────────────────────────────────────

  /// Drop every star-schema table (fact table first) and create them empty.
  fn reset_schema(&self) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Number of rows currently in `table`.
  fn row_count(
    &self,
    table: Table,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  // ── Date dimension ────────────────────────────────────────────────────

  /// Insert calendar rows; returns the number inserted.
  fn insert_dates(
    &self,
    rows: Vec<DateRow>,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Every `(date_key, date)` pair of the date dimension, ordered by date.
  fn list_dates(
    &self,
  ) -> impl Future<Output = Result<Vec<(SurrogateKey, NaiveDate)>, Self::Error>>
  + Send
  + '_;

  /// Flag a date row as a holiday with the given label.
  fn mark_holiday(
    &self,
    key: SurrogateKey,
    label: String,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Keys of every date row whose calendar date equals `date`.
  fn find_date_keys(
    &self,
    date: NaiveDate,
  ) -> impl Future<Output = Result<Vec<SurrogateKey>, Self::Error>> + Send + '_;

  // ── Lazily populated dimensions ───────────────────────────────────────

  fn insert_location(
    &self,
    place: Place,
  ) -> impl Future<Output = Result<SurrogateKey, Self::Error>> + Send + '_;

  fn insert_disaster(
    &self,
    disaster: DisasterTuple,
  ) -> impl Future<Output = Result<SurrogateKey, Self::Error>> + Send + '_;

  fn insert_cost(
    &self,
    cost: CostTuple,
  ) -> impl Future<Output = Result<SurrogateKey, Self::Error>> + Send + '_;

  fn insert_summary(
    &self,
    summary: SummaryTuple,
  ) -> impl Future<Output = Result<SurrogateKey, Self::Error>> + Send + '_;

  // ── Facts ─────────────────────────────────────────────────────────────

  fn insert_fact(
    &self,
    fact: FactRow,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
