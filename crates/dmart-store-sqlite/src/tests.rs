//! Integration tests for `SqliteWarehouse` against an in-memory database.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use dmart_core::{
  calendar::DateRange,
  dimension::{
    CostTuple, DateRow, DisasterTuple, FactKey, FactRow, Place, SummaryTuple,
    SurrogateKey, Table,
  },
  link::{DateRole, Rejection, RejectionKind},
  pipeline::{Pipeline, PipelineConfig, RunSummary},
  row::SourceRow,
  sink::MemorySink,
  store::WarehouseStore,
};

use crate::SqliteWarehouse;

async fn store() -> SqliteWarehouse {
  let s = SqliteWarehouse::open_in_memory()
    .await
    .expect("in-memory store");
  s.reset_schema().await.expect("schema");
  s
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
  NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

// ─── Schema ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn fresh_schema_is_empty() {
  let s = store().await;
  for table in [
    Table::Date,
    Table::Location,
    Table::Disaster,
    Table::Cost,
    Table::Summary,
    Table::Fact,
  ] {
    assert_eq!(s.row_count(table).await.unwrap(), 0, "{table}");
  }
}

#[tokio::test]
async fn reset_drops_existing_rows() {
  let s = store().await;
  s.insert_dates(vec![DateRow::from(date(2000, 1, 1))])
    .await
    .unwrap();
  assert_eq!(s.row_count(Table::Date).await.unwrap(), 1);

  s.reset_schema().await.unwrap();
  assert_eq!(s.row_count(Table::Date).await.unwrap(), 0);
}

// ─── Date dimension ──────────────────────────────────────────────────────────

#[tokio::test]
async fn dates_are_listed_in_calendar_order() {
  let s = store().await;
  let days = [date(2000, 1, 3), date(2000, 1, 1), date(2000, 1, 2)];
  let inserted = s
    .insert_dates(days.iter().copied().map(DateRow::from).collect())
    .await
    .unwrap();
  assert_eq!(inserted, 3);

  let listed: Vec<NaiveDate> =
    s.list_dates().await.unwrap().into_iter().map(|(_, d)| d).collect();
  assert_eq!(listed, vec![date(2000, 1, 1), date(2000, 1, 2), date(2000, 1, 3)]);
}

#[tokio::test]
async fn holidays_are_marked_on_the_date_row() {
  let s = store().await;
  s.insert_dates(vec![
    DateRow::from(date(2000, 7, 1)),
    DateRow::from(date(2000, 7, 2)),
  ])
  .await
  .unwrap();

  let keys = s.find_date_keys(date(2000, 7, 1)).await.unwrap();
  assert_eq!(keys.len(), 1);
  s.mark_holiday(keys[0], "canada day".into()).await.unwrap();

  let holidays = s.holidays().await.unwrap();
  assert_eq!(holidays, vec![(date(2000, 7, 1), "canada day".to_owned())]);
}

#[tokio::test]
async fn unknown_date_has_no_keys() {
  let s = store().await;
  s.insert_dates(vec![DateRow::from(date(2000, 1, 1))])
    .await
    .unwrap();
  assert!(s.find_date_keys(date(1999, 12, 31)).await.unwrap().is_empty());
}

// ─── Dimensions ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn locations_record_the_domestic_flag() {
  let s = store().await;
  let home = Place {
    city:     "montreal".into(),
    province: "QC".into(),
    country:  "canada".into(),
  };
  let abroad = Place {
    city:     "japan".into(),
    province: "japan".into(),
    country:  "japan".into(),
  };
  let k1 = s.insert_location(home.clone()).await.unwrap();
  let k2 = s.insert_location(abroad.clone()).await.unwrap();
  assert_ne!(k1, k2);

  let rows = s.locations().await.unwrap();
  assert_eq!(rows.len(), 2);
  assert_eq!(rows[0].place, home);
  assert!(rows[0].canada);
  assert_eq!(rows[1].place, abroad);
  assert!(!rows[1].canada);
}

#[tokio::test]
async fn all_null_cost_tuple_is_a_valid_row() {
  let s = store().await;
  let key = s.insert_cost(CostTuple::default()).await.unwrap();
  assert_eq!(s.row_count(Table::Cost).await.unwrap(), 1);
  assert!(key.0 > 0);
}

#[tokio::test]
async fn fact_with_unknown_keys_violates_foreign_keys() {
  let s = store().await;
  let bogus = SurrogateKey(999);
  let fact = FactRow {
    key:        FactKey {
      start_date: bogus,
      end_date:   bogus,
      location:   bogus,
      disaster:   bogus,
      summary:    bogus,
    },
    cost:       bogus,
    fatalities: None,
    injured:    None,
    evacuated:  None,
  };
  assert!(s.insert_fact(fact).await.is_err());
  assert_eq!(s.row_count(Table::Fact).await.unwrap(), 0);
}

#[tokio::test]
async fn fact_measures_read_back_as_text() {
  let s = store().await;
  s.insert_dates(vec![DateRow::from(date(2000, 1, 1))])
    .await
    .unwrap();
  let day = s.find_date_keys(date(2000, 1, 1)).await.unwrap()[0];
  let location = s
    .insert_location(Place {
      city:     "calgary".into(),
      province: "AB".into(),
      country:  "canada".into(),
    })
    .await
    .unwrap();
  let disaster = s
    .insert_disaster(DisasterTuple {
      disaster_type: Some("flood".into()),
      ..DisasterTuple::default()
    })
    .await
    .unwrap();
  let summary = s.insert_summary(SummaryTuple::default()).await.unwrap();
  let cost = s.insert_cost(CostTuple::default()).await.unwrap();

  let fact = FactRow {
    key:        FactKey {
      start_date: day,
      end_date: day,
      location,
      disaster,
      summary,
    },
    cost,
    fatalities: Some("4".into()),
    injured:    None,
    evacuated:  Some("1500".into()),
  };
  s.insert_fact(fact.clone()).await.unwrap();

  assert_eq!(s.facts().await.unwrap(), vec![fact]);
}

// ─── Full runs ───────────────────────────────────────────────────────────────

/// A 22-column extract row with the given place and dates; every other field
/// is fixed.
fn extract_row(line: u64, place: &str, start: &str, end: &str) -> SourceRow {
  let fields = vec![
    "Disaster",
    "Natural",
    "Meteorological - Hydrological",
    "Flood",
    place,
    start,
    "Heavy rain caused severe flooding",
    "2",
    "",
    "1500",
    "",
    "",
    end,
    "100000",
    "",
    "",
    "",
    "",
    "",
    "",
    "",
    "",
  ];
  SourceRow::from_strs(line, fields)
}

fn config() -> PipelineConfig {
  PipelineConfig {
    date_range: DateRange::new(date(2000, 1, 1), date(2000, 12, 31)).unwrap(),
    ..PipelineConfig::default()
  }
}

async fn run(
  s: &SqliteWarehouse,
  rows: &mut Vec<SourceRow>,
  holidays: &BTreeMap<NaiveDate, String>,
) -> (RunSummary, MemorySink) {
  let mut sink = MemorySink::default();
  let mut pipeline = Pipeline::new(s, holidays, config());
  let summary = pipeline.run(rows, &mut sink).await.unwrap();
  (summary, sink)
}

#[tokio::test]
async fn rows_sharing_dimensions_share_keys() {
  let s = store().await;
  let mut rows = vec![
    extract_row(1, "Montreal QC", "04/05/2000", "04/09/2000"),
    extract_row(2, "Montreal QC", "04/06/2000", "04/09/2000"),
  ];
  let (summary, sink) = run(&s, &mut rows, &BTreeMap::new()).await;

  assert_eq!(summary.rows_read, 2);
  assert_eq!(summary.dates, 366);
  assert_eq!(summary.facts_accepted, 2);
  assert_eq!(summary.rejected_total(), 0);
  assert!(sink.rows.is_empty());
  assert!(sink.places.is_empty());

  for table in [Table::Location, Table::Disaster, Table::Cost, Table::Summary] {
    assert_eq!(s.row_count(table).await.unwrap(), 1, "{table}");
  }

  let facts = s.facts().await.unwrap();
  assert_eq!(facts.len(), 2);
  let (a, b) = (&facts[0], &facts[1]);
  assert_ne!(a.key.start_date, b.key.start_date);
  assert_eq!(a.key.end_date, b.key.end_date);
  assert_eq!(a.key.location, b.key.location);
  assert_eq!(a.key.disaster, b.key.disaster);
  assert_eq!(a.key.summary, b.key.summary);
  assert_eq!(a.cost, b.cost);
  assert_eq!(a.fatalities.as_deref(), Some("2"));
  assert_eq!(a.injured, None);

  let locations = s.locations().await.unwrap();
  assert_eq!(locations[0].place.city, "montreal");
  assert_eq!(locations[0].place.province, "QC");
  assert!(locations[0].canada);
}

#[tokio::test]
async fn unresolvable_places_are_reported_and_rejected() {
  let s = store().await;
  let mut rows = vec![extract_row(1, "Atlantis", "04/05/2000", "04/09/2000")];
  let (summary, sink) = run(&s, &mut rows, &BTreeMap::new()).await;

  assert_eq!(summary.unresolved_places, 1);
  assert_eq!(sink.places, vec![b"Atlantis".to_vec()]);
  assert_eq!(summary.facts_accepted, 0);
  assert_eq!(
    summary.facts_rejected.get(&RejectionKind::UnresolvablePlace),
    Some(&1)
  );
  assert_eq!(s.row_count(Table::Location).await.unwrap(), 0);
  // The other dimensions are still populated from the row.
  assert_eq!(s.row_count(Table::Cost).await.unwrap(), 1);
}

#[tokio::test]
async fn dates_outside_the_range_are_rejected() {
  let s = store().await;
  let mut rows = vec![extract_row(7, "Halifax NS", "12/30/1999", "01/02/2000")];
  let (summary, sink) = run(&s, &mut rows, &BTreeMap::new()).await;

  assert_eq!(summary.facts_accepted, 0);
  assert_eq!(sink.rows.len(), 1);
  let (row, rejection) = &sink.rows[0];
  assert_eq!(row.line, 7);
  assert_eq!(rejection, &Rejection::MissingDate {
    role: DateRole::Start,
    date: date(1999, 12, 30),
  });
}

#[tokio::test]
async fn repeated_rows_load_once() {
  let s = store().await;
  let mut rows = vec![
    extract_row(1, "Regina SK", "06/01/2000", "06/02/2000"),
    extract_row(2, "Regina SK", "06/01/2000", "06/02/2000"),
  ];
  let (summary, sink) = run(&s, &mut rows, &BTreeMap::new()).await;

  assert_eq!(summary.facts_accepted, 1);
  assert_eq!(s.row_count(Table::Fact).await.unwrap(), 1);
  assert_eq!(sink.rows.len(), 1);
  assert_eq!(sink.rows[0].0.line, 2);
  assert_eq!(sink.rows[0].1, Rejection::DuplicateFact);
}

#[tokio::test]
async fn holidays_are_backfilled_during_a_run() {
  let s = store().await;
  let holidays = BTreeMap::from([
    (date(2000, 7, 1), "Canada Day".to_owned()),
    (date(1999, 7, 1), "Canada Day".to_owned()),
  ]);
  let (summary, _) = run(&s, &mut Vec::new(), &holidays).await;

  assert_eq!(summary.holidays, 1);
  assert_eq!(s.holidays().await.unwrap(), vec![(
    date(2000, 7, 1),
    "Canada Day".to_owned()
  )]);
}

#[tokio::test]
async fn a_second_run_rebuilds_from_scratch() {
  let s = store().await;
  let make = || {
    vec![
      extract_row(1, "Montreal QC", "04/05/2000", "04/09/2000"),
      extract_row(2, "Tokyo, Japan", "04/06/2000", "04/09/2000"),
    ]
  };

  let (first, _) = run(&s, &mut make(), &BTreeMap::new()).await;
  let (second, _) = run(&s, &mut make(), &BTreeMap::new()).await;

  assert_ne!(first.run_id, second.run_id);
  assert_eq!(first.facts_accepted, 2);
  assert_eq!(second.facts_accepted, 2);
  assert_eq!(s.row_count(Table::Date).await.unwrap(), 366);
  assert_eq!(s.row_count(Table::Location).await.unwrap(), 2);
  assert_eq!(s.row_count(Table::Fact).await.unwrap(), 2);
}

#[tokio::test]
async fn one_pipeline_can_run_repeatedly() {
  let s = store().await;
  let calendar = BTreeMap::new();
  let mut pipeline = Pipeline::new(&s, &calendar, config());

  let mut first_sink = MemorySink::default();
  let mut rows = vec![extract_row(1, "Montreal QC", "04/05/2000", "04/09/2000")];
  let first = pipeline.run(&mut rows, &mut first_sink).await.unwrap();

  let mut second_sink = MemorySink::default();
  let second = pipeline.run(&mut rows, &mut second_sink).await.unwrap();

  assert_ne!(first.run_id, second.run_id);
  assert_eq!(second.locations, 1);
  assert_eq!(second.facts_accepted, 1);
  assert!(second_sink.rows.is_empty());
  assert_eq!(s.row_count(Table::Location).await.unwrap(), 1);
  assert_eq!(s.row_count(Table::Fact).await.unwrap(), 1);

  let location = s.locations().await.unwrap()[0].key;
  assert_eq!(s.facts().await.unwrap()[0].key.location, location);
}
