//! Place resolution: free-text place → (city, province, country).
//!
//! The extract spells places as "City, Province", "Province", abbreviations
//! ("Montreal, QC"), regional names ("Maritime Provinces") or a foreign
//! country. Province names can appear inside city names, so the match that
//! ends furthest to the right wins.

use serde::Serialize;

use crate::normalize::{normalize, truncate};

/// Country label for domestic places.
pub const DOMESTIC_COUNTRY: &str = "canada";

/// Longest city name kept; longer names are truncated with a marker.
pub const MAX_CITY_CHARS: usize = 60;

/// Province and territory spellings, as they appear after normalization,
/// mapped to their two-letter code.
const PROVINCE_NAMES: &[(&str, &str)] = &[
  ("newfoundland and labrador", "NL"),
  ("newfoundland", "NL"),
  ("labrador", "NL"),
  ("prince edward island", "PE"),
  ("maritime provinces", "NS"),
  ("martime provinces", "NS"),
  ("nova scotia", "NS"),
  ("new brunswick", "NB"),
  ("quebec", "QC"),
  ("québec", "QC"),
  ("ontario", "ON"),
  ("manitoba", "MB"),
  ("saskatchewan", "SK"),
  ("prairie provinces", "AB"),
  ("alberta", "AB"),
  ("british columbia", "BC"),
  ("yukon", "YT"),
  ("northwest territories", "NT"),
  ("nunavut", "NU"),
];

/// Postal abbreviations. These are common English words or word prefixes
/// ("on", "ab…"), so they only count as the last word of a place.
const PROVINCE_CODES: &[(&str, &str)] = &[
  ("nl", "NL"),
  ("pe", "PE"),
  ("ns", "NS"),
  ("nb", "NB"),
  ("qc", "QC"),
  ("on", "ON"),
  ("mb", "MB"),
  ("sk", "SK"),
  ("ab", "AB"),
  ("bc", "BC"),
  ("yt", "YT"),
  ("nt", "NT"),
  ("nu", "NU"),
];

/// City used when a place names only a province. Quebec maps to Quebec City
/// because a bare "Quebec" is ambiguous between the city and the province.
const MAIN_CITY: &[(&str, &str)] = &[
  ("QC", "quebec"),
  ("ON", "toronto"),
  ("NL", "st. johns"),
  ("PE", "charlottetown"),
  ("NS", "halifax"),
  ("NB", "moncton"),
  ("MB", "winnipeg"),
  ("SK", "saskatoon"),
  ("AB", "calgary"),
  ("BC", "vancouver"),
  ("YT", "whitehorse"),
  ("NT", "yellowknife"),
  ("NU", "iqaluit"),
];

/// Foreign countries that appear in the extract, with their canonical label.
const RECOGNIZED_COUNTRIES: &[(&str, &str)] = &[
  ("usa", "usa"),
  ("united states", "usa"),
  ("nepal", "nepal"),
  ("japan", "japan"),
  ("libya", "libya"),
  ("saudi arabia", "saudi arabia"),
  ("iceland", "iceland"),
  ("haiti", "haiti"),
  ("ireland", "ireland"),
];

// ─── Place ───────────────────────────────────────────────────────────────────

/// A resolved place; also the natural key of the location dimension.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Place {
  pub city:     String,
  /// Two-letter province code for domestic places, the country label
  /// otherwise.
  pub province: String,
  pub country:  String,
}

impl Place {
  pub fn is_domestic(&self) -> bool { self.country == DOMESTIC_COUNTRY }
}

// ─── Resolution ──────────────────────────────────────────────────────────────

/// Resolve a raw place string, or `None` when neither a province nor a
/// recognized country can be found in it.
pub fn resolve_place(raw: impl AsRef<[u8]>) -> Option<Place> {
  let place = clean_place(raw.as_ref());

  let province = rightmost(&place, PROVINCE_NAMES)
    .into_iter()
    .chain(trailing_code(&place))
    .max_by_key(Hit::rank);

  if let Some(Hit { start, value: code, .. }) = province {
    let city = place[..start].trim();
    let city = if city.is_empty() {
      main_city(code).to_owned()
    } else {
      truncate(city, MAX_CITY_CHARS).into_owned()
    };
    return Some(Place {
      city,
      province: code.to_owned(),
      country: DOMESTIC_COUNTRY.to_owned(),
    });
  }

  rightmost(&place, RECOGNIZED_COUNTRIES).map(|Hit { value: label, .. }| Place {
    city:     label.to_owned(),
    province: label.to_owned(),
    country:  label.to_owned(),
  })
}

/// Normalize and drop the word "city" ("Quebec City, QC" → "quebec qc").
fn clean_place(raw: &[u8]) -> String {
  normalize(raw).replace(" city", "").replace("city", "")
}

/// One table entry found in a place string.
#[derive(Debug, Clone, Copy)]
struct Hit {
  /// Byte offset where the match starts.
  start: usize,
  len:   usize,
  value: &'static str,
}

impl Hit {
  /// The match ending furthest right wins; ties go to the longer match.
  fn rank(&self) -> (usize, usize) { (self.start + self.len, self.len) }
}

/// Find the table entry whose last occurrence in `haystack` ranks highest.
fn rightmost(
  haystack: &str,
  table: &'static [(&'static str, &'static str)],
) -> Option<Hit> {
  table
    .iter()
    .filter_map(|&(needle, value)| {
      haystack.rfind(needle).map(|start| Hit {
        start,
        len: needle.len(),
        value,
      })
    })
    .max_by_key(Hit::rank)
}

/// A province code standing as the final word of `place`, ignoring trailing
/// punctuation ("montreal qc", "halifax ns.").
fn trailing_code(place: &str) -> Option<Hit> {
  let trimmed = place.trim_end_matches(|c: char| !c.is_alphanumeric());
  let start = trimmed.rfind(' ').map_or(0, |space| space + 1);
  let word = &trimmed[start..];
  PROVINCE_CODES
    .iter()
    .find(|&&(code, _)| code == word)
    .map(|&(_, value)| Hit {
      start,
      len: word.len(),
      value,
    })
}

fn main_city(code: &str) -> &'static str {
  MAIN_CITY
    .iter()
    .find(|(c, _)| *c == code)
    .map(|(_, city)| *city)
    .unwrap_or_default()
}
