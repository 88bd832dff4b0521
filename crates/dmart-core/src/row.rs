//! The raw source row and the fixed 22-column layout of the extract.

use std::convert::Infallible;

use strum::EnumCount;

// ─── Layout ──────────────────────────────────────────────────────────────────

/// Columns of the disaster extract, in file order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumCount)]
pub enum Column {
  Category,
  Group,
  Subgroup,
  Type,
  Place,
  StartDate,
  Comment,
  Fatalities,
  Injured,
  Evacuated,
  EstimatedTotalCost,
  NormalizedTotalCost,
  EndDate,
  FederalDfaaPayments,
  ProvincialDfaaPayments,
  ProvincialDepartmentPayments,
  MunicipalCosts,
  OgdCosts,
  InsurancePayments,
  NgoPayments,
  UtilityPeopleAffected,
  Magnitude,
}

impl Column {
  pub fn index(self) -> usize { self as usize }
}

// ─── Row ─────────────────────────────────────────────────────────────────────

/// One data row exactly as read from the extract. Fields stay as raw bytes so
/// that encoding cleanup happens in one place, the normalizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRow {
  /// 1-based line number in the source file, header included.
  pub line:   u64,
  pub fields: Vec<Vec<u8>>,
}

impl SourceRow {
  pub fn new(line: u64, fields: Vec<Vec<u8>>) -> Self { Self { line, fields } }

  /// Build a row from string fields; handy for fixtures.
  pub fn from_strs<I, S>(line: u64, fields: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
  {
    let fields = fields
      .into_iter()
      .map(|f| f.as_ref().as_bytes().to_vec())
      .collect();
    Self { line, fields }
  }

  /// The raw bytes of `column`. Short rows read missing columns as empty.
  pub fn field(&self, column: Column) -> &[u8] {
    self
      .fields
      .get(column.index())
      .map(Vec::as_slice)
      .unwrap_or_default()
  }
}

// ─── Source ──────────────────────────────────────────────────────────────────

/// Something the pipeline can read from start to finish more than once.
///
/// The dimension pass and the fact pass each call [`RowSource::pass`] and
/// must observe the same rows in the same order.
pub trait RowSource {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Begin a new forward pass over every data row, header excluded.
  fn pass(
    &mut self,
  ) -> Result<
    Box<dyn Iterator<Item = Result<SourceRow, Self::Error>> + '_>,
    Self::Error,
  >;
}

impl RowSource for Vec<SourceRow> {
  type Error = Infallible;

  fn pass(
    &mut self,
  ) -> Result<Box<dyn Iterator<Item = Result<SourceRow, Infallible>> + '_>, Infallible>
  {
    Ok(Box::new(self.iter().cloned().map(Ok)))
  }
}
