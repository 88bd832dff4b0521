//! Destinations for rows the pipeline could not load.

use std::convert::Infallible;

use crate::{link::Rejection, row::SourceRow};

/// Receives rejected rows as they are encountered, so they can be inspected
/// after the run.
pub trait RejectionSink {
  type Error: std::error::Error + Send + Sync + 'static;

  /// A row that produced no fact, with the reason.
  fn reject_row(
    &mut self,
    row: &SourceRow,
    rejection: &Rejection,
  ) -> Result<(), Self::Error>;

  /// A row whose place string could not be resolved to a location.
  fn reject_place(&mut self, row: &SourceRow) -> Result<(), Self::Error>;
}

/// Keeps every rejection in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
  pub rows:   Vec<(SourceRow, Rejection)>,
  /// Raw place fields, in the order they were rejected.
  pub places: Vec<Vec<u8>>,
}

impl RejectionSink for MemorySink {
  type Error = Infallible;

  fn reject_row(
    &mut self,
    row: &SourceRow,
    rejection: &Rejection,
  ) -> Result<(), Infallible> {
    self.rows.push((row.clone(), rejection.clone()));
    Ok(())
  }

  fn reject_place(&mut self, row: &SourceRow) -> Result<(), Infallible> {
    self
      .places
      .push(row.field(crate::row::Column::Place).to_vec());
    Ok(())
  }
}
