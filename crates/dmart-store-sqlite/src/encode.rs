//! Encoding and decoding helpers between domain types and SQLite columns.
//!
//! Calendar dates are stored as `YYYY-MM-DD` text so that equality and
//! ordering work on the column directly. Numeric figures are bound as the
//! literal text from the extract and read back through [`numeric_text`],
//! since `NUMERIC` affinity may have stored them as integers or reals.

use chrono::NaiveDate;
use rusqlite::types::Value;

use crate::{Error, Result};

const DATE_FORMAT: &str = "%Y-%m-%d";

// ─── NaiveDate ───────────────────────────────────────────────────────────────

pub fn encode_date(date: NaiveDate) -> String {
  date.format(DATE_FORMAT).to_string()
}

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, DATE_FORMAT)
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

// ─── Numeric figures ─────────────────────────────────────────────────────────

/// Render a `NUMERIC` column value back as literal text.
pub fn numeric_text(value: Value) -> Option<String> {
  match value {
    Value::Null => None,
    Value::Integer(i) => Some(i.to_string()),
    Value::Real(f) => Some(f.to_string()),
    Value::Text(t) => Some(t),
    Value::Blob(b) => Some(String::from_utf8_lossy(&b).into_owned()),
  }
}
