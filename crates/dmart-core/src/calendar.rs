//! The date dimension's calendar: covered range, holiday lookup, and parsing
//! of the extract's date fields.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{Error, Result, normalize::{decode, truncate}};

/// Longest holiday label kept; longer labels are truncated with a marker.
pub const MAX_HOLIDAY_CHARS: usize = 50;

/// Date format of the extract's start and end date fields. Anything after
/// the first whitespace (the time of day) is ignored.
pub const SOURCE_DATE_FORMAT: &str = "%m/%d/%Y";

// ─── Holidays ────────────────────────────────────────────────────────────────

/// Calendar date → holiday display name.
pub trait HolidayCalendar {
  fn holiday_name(&self, date: NaiveDate) -> Option<&str>;
}

impl HolidayCalendar for BTreeMap<NaiveDate, String> {
  fn holiday_name(&self, date: NaiveDate) -> Option<&str> {
    self.get(&date).map(String::as_str)
  }
}


/// The label stored on the date dimension for a holiday name.
pub fn holiday_label(name: &str) -> String {
  truncate(name.trim(), MAX_HOLIDAY_CHARS).into_owned()
}

// ─── Range ───────────────────────────────────────────────────────────────────

/// The inclusive span of calendar dates the date dimension covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
  pub start: NaiveDate,
  pub end:   NaiveDate,
}

impl DateRange {
  pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
    Self { start, end }.validated()
  }

  /// Reject ranges whose start is after their end.
  pub fn validated(self) -> Result<Self> {
    if self.start > self.end {
      return Err(Error::EmptyDateRange {
        start: self.start,
        end:   self.end,
      });
    }
    Ok(self)
  }

  /// Every day in the range, in order.
  pub fn days(&self) -> impl Iterator<Item = NaiveDate> + use<> {
    let end = self.end;
    self.start.iter_days().take_while(move |d| *d <= end)
  }
}

impl Default for DateRange {
  /// The extract's events run from 1900 to the present.
  fn default() -> Self {
    Self {
      start: NaiveDate::from_ymd_opt(1900, 1, 1).unwrap_or(NaiveDate::MIN),
      end:   NaiveDate::from_ymd_opt(2030, 12, 31).unwrap_or(NaiveDate::MAX),
    }
  }
}

// ─── Parsing ─────────────────────────────────────────────────────────────────

/// Parse the date component of a source date field such as `6/23/2011 0:00`.
pub fn parse_source_date(raw: &[u8]) -> Option<NaiveDate> {
  let text = decode(raw);
  let date_part = text.split_whitespace().next()?;
  NaiveDate::parse_from_str(date_part, SOURCE_DATE_FORMAT).ok()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
  }

  #[test]
  fn parses_date_and_discards_time() {
    assert_eq!(parse_source_date(b"6/23/2011 0:00"), Some(ymd(2011, 6, 23)));
    assert_eq!(parse_source_date(b"12/01/1998"), Some(ymd(1998, 12, 1)));
    assert_eq!(parse_source_date(b"  07/04/1950 13:45  "), Some(ymd(1950, 7, 4)));
  }

  #[test]
  fn rejects_unparseable_dates() {
    assert_eq!(parse_source_date(b""), None);
    assert_eq!(parse_source_date(b"unknown"), None);
    assert_eq!(parse_source_date(b"2011-06-23"), None);
    assert_eq!(parse_source_date(b"2/30/2011"), None);
  }

  #[test]
  fn range_yields_every_day_inclusive() {
    let range = DateRange::new(ymd(2020, 2, 27), ymd(2020, 3, 1)).unwrap();
    let days: Vec<_> = range.days().collect();
    assert_eq!(days, vec![
      ymd(2020, 2, 27),
      ymd(2020, 2, 28),
      ymd(2020, 2, 29),
      ymd(2020, 3, 1),
    ]);
  }

  #[test]
  fn inverted_range_is_rejected() {
    let err = DateRange::new(ymd(2020, 1, 2), ymd(2020, 1, 1)).unwrap_err();
    assert!(matches!(err, Error::EmptyDateRange { .. }));
  }

  #[test]
  fn long_holiday_names_are_truncated() {
    let label = holiday_label(&"Saint-Jean-Baptiste ".repeat(4));
    assert_eq!(label.chars().count(), MAX_HOLIDAY_CHARS);
    assert!(label.ends_with(".."));
    assert_eq!(holiday_label("Canada Day"), "Canada Day");
  }

  #[test]
  fn maps_act_as_calendars() {
    let mut map = BTreeMap::new();
    map.insert(ymd(2017, 7, 1), "Canada Day".to_owned());
    assert_eq!(map.holiday_name(ymd(2017, 7, 1)), Some("Canada Day"));
    assert_eq!(map.holiday_name(ymd(2017, 7, 2)), None);
  }
}
