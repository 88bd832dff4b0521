//! CSV adapters: the extract as a [`RowSource`] and the two side files as a
//! [`RejectionSink`].
//!
//! Records are read and written as raw bytes so that invalid UTF-8 survives
//! to the normalizer and into the rejected-rows file unchanged.

use std::{
  fs::File,
  io,
  path::{Path, PathBuf},
};

use csv::{ByteRecord, ReaderBuilder, WriterBuilder};
use dmart_core::{
  link::Rejection,
  row::{Column, RowSource, SourceRow},
  sink::RejectionSink,
};

// ─── Source ──────────────────────────────────────────────────────────────────

/// The disaster extract on disk. Each pass reopens the file, so both pipeline
/// passes see the same rows in the same order.
#[derive(Debug, Clone)]
pub struct CsvSource {
  path: PathBuf,
}

impl CsvSource {
  pub fn new(path: impl Into<PathBuf>) -> Self { Self { path: path.into() } }

  pub fn path(&self) -> &Path { &self.path }
}

impl RowSource for CsvSource {
  type Error = csv::Error;

  fn pass(
    &mut self,
  ) -> Result<
    Box<dyn Iterator<Item = Result<SourceRow, csv::Error>> + '_>,
    csv::Error,
  > {
    let reader = ReaderBuilder::new()
      .has_headers(true)
      .flexible(true)
      .from_path(&self.path)?;

    let rows = reader.into_byte_records().map(|record| {
      let record = record?;
      Ok(source_row(&record))
    });
    Ok(Box::new(rows))
  }
}

fn source_row(record: &ByteRecord) -> SourceRow {
  let line = record.position().map_or(0, |p| p.line());
  SourceRow::new(line, record.iter().map(<[u8]>::to_vec).collect())
}

// ─── Sink ────────────────────────────────────────────────────────────────────

/// Writes rejected rows and unresolvable places to two CSV files, flushing
/// after every record so the files are current even if the run aborts.
pub struct CsvRejectionSink<W: io::Write> {
  rows:   csv::Writer<W>,
  places: csv::Writer<W>,
}

impl CsvRejectionSink<File> {
  /// Create (truncating) both side files.
  pub fn create(rows: &Path, places: &Path) -> csv::Result<Self> {
    Ok(Self::new(File::create(rows)?, File::create(places)?))
  }
}

impl<W: io::Write> CsvRejectionSink<W> {
  pub fn new(rows: W, places: W) -> Self {
    let writer = |w| WriterBuilder::new().flexible(true).from_writer(w);
    Self {
      rows:   writer(rows),
      places: writer(places),
    }
  }

  /// Flush and return the underlying writers.
  pub fn into_inner(self) -> csv::Result<(W, W)> {
    let rows = self.rows.into_inner().map_err(|e| e.into_error())?;
    let places = self.places.into_inner().map_err(|e| e.into_error())?;
    Ok((rows, places))
  }
}

impl<W: io::Write> RejectionSink for CsvRejectionSink<W> {
  type Error = csv::Error;

  fn reject_row(
    &mut self,
    row: &SourceRow,
    _rejection: &Rejection,
  ) -> Result<(), csv::Error> {
    self.rows.write_record(&row.fields)?;
    self.rows.flush()?;
    Ok(())
  }

  fn reject_place(&mut self, row: &SourceRow) -> Result<(), csv::Error> {
    self.places.write_record([row.field(Column::Place)])?;
    self.places.flush()?;
    Ok(())
  }
}
