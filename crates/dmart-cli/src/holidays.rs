//! Holiday calendar loaded from a `date,name` CSV file.

use std::{collections::BTreeMap, io, path::Path};

use anyhow::Context as _;
use chrono::NaiveDate;
use serde::Deserialize;

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Deserialize)]
struct Entry {
  date: String,
  name: String,
}

/// Read holidays from `path`. Several holidays on one date are joined with
/// `", "`.
pub fn load(path: &Path) -> anyhow::Result<BTreeMap<NaiveDate, String>> {
  let file = std::fs::File::open(path)
    .with_context(|| format!("failed to open holiday file {path:?}"))?;
  read(file).with_context(|| format!("failed to read holiday file {path:?}"))
}

fn read(input: impl io::Read) -> anyhow::Result<BTreeMap<NaiveDate, String>> {
  let mut reader = csv::ReaderBuilder::new()
    .trim(csv::Trim::All)
    .from_reader(input);

  let mut calendar = BTreeMap::<NaiveDate, String>::new();
  for (i, entry) in reader.deserialize::<Entry>().enumerate() {
    let entry = entry?;
    let date = NaiveDate::parse_from_str(&entry.date, DATE_FORMAT)
      .with_context(|| format!("record {}: bad date {:?}", i + 1, entry.date))?;
    calendar
      .entry(date)
      .and_modify(|names| {
        names.push_str(", ");
        names.push_str(&entry.name);
      })
      .or_insert(entry.name);
  }
  Ok(calendar)
}
