//! Row classification: one source row → the natural keys of the disaster,
//! cost and summary dimensions.

use serde::{Deserialize, Serialize};

use crate::{
  dimension::{CostTuple, DisasterTuple, KEYWORD_SLOTS, SummaryTuple},
  normalize::{decode, normalize_non_empty},
  row::{Column, SourceRow},
};

/// Categories in the extract are at most 8 characters long; anything longer
/// than this is a shifted or corrupt row.
pub const MAX_CATEGORY_CHARS: usize = 10;

/// Only this subgroup carries a meaningful magnitude (earthquakes, tsunamis).
pub const GEOLOGICAL_SUBGROUP: &str = "geological";

/// Monetary columns in [`CostTuple`] order.
pub const COST_SOURCE_COLUMNS: [Column; 9] = [
  Column::EstimatedTotalCost,
  Column::NormalizedTotalCost,
  Column::FederalDfaaPayments,
  Column::ProvincialDfaaPayments,
  Column::ProvincialDepartmentPayments,
  Column::MunicipalCosts,
  Column::OgdCosts,
  Column::InsurancePayments,
  Column::NgoPayments,
];

const DEFAULT_KEYWORDS: &[&str] = &[
  "explosion",
  "entombed",
  "killed",
  "severe",
  "large",
  "dead",
  "homeless",
  "injured",
  "collision",
  "avalanche",
  "blew",
  "blizzard",
  "acid",
  "drought",
  "thunderstorm",
  "heavy",
  "failure",
  "evacuation",
  "derailed",
  "arson",
];

// ─── Keywords ────────────────────────────────────────────────────────────────

/// The ordered keyword list scanned against summary comments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Keywords(Vec<String>);

impl Keywords {
  pub fn new<I, S>(keywords: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self(keywords.into_iter().map(Into::into).collect())
  }

  /// Up to [`KEYWORD_SLOTS`] keywords contained in `text`, in list order.
  pub fn matches(&self, text: &str) -> [Option<String>; KEYWORD_SLOTS] {
    let mut slots: [Option<String>; KEYWORD_SLOTS] = Default::default();
    let found = self
      .0
      .iter()
      .filter(|k| !k.is_empty() && text.contains(k.as_str()));
    for (slot, keyword) in slots.iter_mut().zip(found) {
      *slot = Some(keyword.clone());
    }
    slots
  }
}

impl Default for Keywords {
  fn default() -> Self { Self::new(DEFAULT_KEYWORDS.iter().copied()) }
}

// ─── Classifiers ─────────────────────────────────────────────────────────────

/// The disaster natural key, or `None` when the category is too long to be
/// genuine.
pub fn disaster_tuple(row: &SourceRow) -> Option<DisasterTuple> {
  let raw_category = decode(row.field(Column::Category));
  if raw_category.trim().chars().count() > MAX_CATEGORY_CHARS {
    return None;
  }

  let subgroup = normalize_non_empty(row.field(Column::Subgroup));
  let magnitude = if subgroup.as_deref() == Some(GEOLOGICAL_SUBGROUP) {
    normalize_non_empty(row.field(Column::Magnitude))
  } else {
    None
  };

  Some(DisasterTuple {
    disaster_type: normalize_non_empty(row.field(Column::Type)),
    subgroup,
    group: normalize_non_empty(row.field(Column::Group)),
    category: normalize_non_empty(raw_category),
    magnitude,
    people_affected: normalize_non_empty(row.field(Column::UtilityPeopleAffected)),
  })
}

/// The cost natural key. Total over every row shape.
pub fn cost_tuple(row: &SourceRow) -> CostTuple {
  CostTuple(COST_SOURCE_COLUMNS.map(|column| numeric_field(row, column)))
}

/// The summary natural key: normalized comment plus matched keywords.
pub fn summary_tuple(row: &SourceRow, keywords: &Keywords) -> SummaryTuple {
  let comment = normalize_non_empty(row.field(Column::Comment));
  let keywords = comment
    .as_deref()
    .map(|c| keywords.matches(c))
    .unwrap_or_default();
  SummaryTuple { comment, keywords }
}

/// A numeric field passed through as its literal text; `None` when empty.
pub fn numeric_field(row: &SourceRow, column: Column) -> Option<String> {
  let text = decode(row.field(column));
  let text = text.trim();
  (!text.is_empty()).then(|| text.to_owned())
}

#[cfg(test)]
mod tests {
  use super::*;

  /// A 22-column row with the given overrides.
  fn row(overrides: &[(Column, &str)]) -> SourceRow {
    let mut fields = vec![Vec::new(); 22];
    for (column, value) in overrides {
      fields[column.index()] = value.as_bytes().to_vec();
    }
    SourceRow::new(2, fields)
  }

  #[test]
  fn disaster_fields_are_normalized() {
    let r = row(&[
      (Column::Category, "Disaster"),
      (Column::Group, "Natural"),
      (Column::Subgroup, "Meteorological - Hydrological"),
      (Column::Type, "Flood"),
      (Column::Magnitude, "7.1"),
      (Column::UtilityPeopleAffected, "1200"),
    ]);
    let t = disaster_tuple(&r).unwrap();
    assert_eq!(t.category.as_deref(), Some("disaster"));
    assert_eq!(t.group.as_deref(), Some("natural"));
    assert_eq!(t.subgroup.as_deref(), Some("meteorological - hydrological"));
    assert_eq!(t.disaster_type.as_deref(), Some("flood"));
    assert_eq!(t.magnitude, None, "magnitude only kept for geological events");
    assert_eq!(t.people_affected.as_deref(), Some("1200"));
  }

  #[test]
  fn geological_events_keep_magnitude() {
    let r = row(&[
      (Column::Category, "Disaster"),
      (Column::Subgroup, "Geological"),
      (Column::Type, "Earthquake"),
      (Column::Magnitude, "6.2"),
    ]);
    let t = disaster_tuple(&r).unwrap();
    assert_eq!(t.magnitude.as_deref(), Some("6.2"));
    assert_eq!(t.group, None);
  }

  #[test]
  fn over_long_category_is_rejected() {
    let r = row(&[(Column::Category, "Definitely not a category")]);
    assert_eq!(disaster_tuple(&r), None);

    let r = row(&[(Column::Category, "Incident")]);
    assert!(disaster_tuple(&r).is_some());
  }

  #[test]
  fn empty_cost_fields_are_null() {
    let t = cost_tuple(&row(&[]));
    assert_eq!(t, CostTuple::default());
  }

  #[test]
  fn cost_figures_keep_their_position() {
    let t = cost_tuple(&row(&[
      (Column::EstimatedTotalCost, " 1500000 "),
      (Column::NgoPayments, "2500"),
    ]));
    assert_eq!(t.0[0].as_deref(), Some("1500000"));
    assert_eq!(t.0[8].as_deref(), Some("2500"));
    assert!(t.0[1..8].iter().all(Option::is_none));
  }

  #[test]
  fn cost_tuple_is_total() {
    assert_eq!(cost_tuple(&SourceRow::new(1, Vec::new())), CostTuple::default());
    let short = SourceRow::from_strs(1, ["a"; 12]);
    let t = cost_tuple(&short);
    assert_eq!(t.0[0].as_deref(), Some("a"));
    assert_eq!(t.0[2], None);
  }

  #[test]
  fn summary_collects_first_three_keywords_in_list_order() {
    let r = row(&[(
      Column::Comment,
      "Heavy rain; a dead tree, an explosion and a severe thunderstorm.",
    )]);
    let t = summary_tuple(&r, &Keywords::default());
    assert_eq!(
      t.comment.as_deref(),
      Some("heavy rain; a dead tree an explosion and a severe thunderstorm.")
    );
    assert_eq!(
      t.keywords,
      [
        Some("explosion".to_owned()),
        Some("severe".to_owned()),
        Some("dead".to_owned()),
      ]
    );
  }

  #[test]
  fn keyword_matching_is_case_sensitive() {
    let keywords = Keywords::new(["Flood", "flood"]);
    let r = row(&[(Column::Comment, "FLOOD waters")]);
    let t = summary_tuple(&r, &keywords);
    assert_eq!(t.keywords, [Some("flood".to_owned()), None, None]);
  }

  #[test]
  fn empty_comment_has_no_keywords() {
    let t = summary_tuple(&row(&[]), &Keywords::default());
    assert_eq!(t, SummaryTuple::default());
  }
}
