//! The load pipeline: date dimension, dimension pass, fact pass.
//!
//! ```text
//! reset schema
//!   └─ date dimension (range + holiday backfill)
//!        └─ dimension pass   source rows → caches (get-or-create)
//!             └─ fact pass   source rows → FactLinker → fact | rejection
//! ```
//!
//! Rows are processed strictly in source order and the dimension pass ends
//! before the fact pass starts. Row-level failures are routed to the
//! [`RejectionSink`]; storage, source and sink failures abort the run.

use std::{collections::{BTreeMap, HashSet}, future::Future, time::Duration};

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use tracing::{Instrument, debug, error, info, warn};
use uuid::Uuid;

use crate::{
  PipelineError,
  cache::DimensionCaches,
  calendar::{DateRange, HolidayCalendar, holiday_label},
  classify::{Keywords, cost_tuple, disaster_tuple, summary_tuple},
  dimension::{DateRow, SurrogateKey, Table},
  link::{DateLookup, FactLinker, Rejection, RejectionKind},
  normalize::decode,
  place::resolve_place,
  row::{Column, RowSource, SourceRow},
  sink::RejectionSink,
  store::WarehouseStore,
};

// ─── Configuration ───────────────────────────────────────────────────────────

/// Limits applied to every storage call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoragePolicy {
  /// Per-attempt timeout, in seconds.
  pub timeout_secs:  u64,
  /// Attempts for reads. Inserts are never retried, since a timed-out insert
  /// may still have committed.
  pub read_attempts: u32,
}

impl StoragePolicy {
  pub fn timeout(&self) -> Duration { Duration::from_secs(self.timeout_secs) }
}

impl Default for StoragePolicy {
  fn default() -> Self {
    Self {
      timeout_secs:  30,
      read_attempts: 3,
    }
  }
}

/// Everything a run needs besides its collaborators.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
  pub date_range: DateRange,
  pub keywords:   Keywords,
  pub storage:    StoragePolicy,
}

// ─── Summary ─────────────────────────────────────────────────────────────────

/// Counts reported when a run completes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
  pub run_id:            Uuid,
  pub rows_read:         u64,
  pub dates:             u64,
  pub holidays:          u64,
  pub locations:         u64,
  pub disasters:         u64,
  pub costs:             u64,
  pub summaries:         u64,
  pub unresolved_places: u64,
  pub facts_accepted:    u64,
  pub facts_rejected:    BTreeMap<RejectionKind, u64>,
}

impl RunSummary {
  pub fn rejected_total(&self) -> u64 { self.facts_rejected.values().sum() }

  fn record_rejection(&mut self, kind: RejectionKind) {
    *self.facts_rejected.entry(kind).or_default() += 1;
  }
}

// ─── Pipeline ────────────────────────────────────────────────────────────────

/// The load pipeline: borrows its collaborators and owns the dimension
/// caches of the run in progress.
pub struct Pipeline<'a, S, C: ?Sized> {
  store:    &'a S,
  calendar: &'a C,
  config:   PipelineConfig,
  caches:   DimensionCaches,
}

impl<'a, S, C> Pipeline<'a, S, C>
where
  S: WarehouseStore,
  C: HolidayCalendar + ?Sized,
{
  pub fn new(store: &'a S, calendar: &'a C, config: PipelineConfig) -> Self {
    Self {
      store,
      calendar,
      config,
      caches: DimensionCaches::default(),
    }
  }

  /// Rebuild the data mart from `source`, sending rejected rows to `sink`.
  /// Every call is a fresh run: tables are recreated and the caches start
  /// empty.
  pub async fn run<R, K>(
    &mut self,
    source: &mut R,
    sink: &mut K,
  ) -> Result<RunSummary, PipelineError>
  where
    R: RowSource,
    K: RejectionSink,
  {
    let run_id = Uuid::new_v4();
    self.caches = DimensionCaches::default();

    let span = tracing::info_span!("run", %run_id);
    async move {
      let mut summary = RunSummary {
        run_id,
        ..RunSummary::default()
      };

      let store = self.store;
      let policy = self.config.storage;
      write(policy, "reset_schema", || store.reset_schema()).await?;
      info!("schema reset");

      self.load_date_dimension(&mut summary).await?;
      self.populate_dimensions(source, sink, &mut summary).await?;
      self.populate_facts(source, sink, &mut summary).await?;
      self.check_row_counts(&summary).await?;

      info!(
        facts_accepted = summary.facts_accepted,
        facts_rejected = summary.rejected_total(),
        unresolved_places = summary.unresolved_places,
        "run complete"
      );
      Ok(summary)
    }
    .instrument(span)
    .await
  }

  /// Insert one row per day of the configured range, then flag holidays.
  async fn load_date_dimension(
    &self,
    summary: &mut RunSummary,
  ) -> Result<(), PipelineError> {
    let store = self.store;
    let policy = self.config.storage;
    let range = self.config.date_range.validated()?;

    let rows: Vec<DateRow> = range.days().map(DateRow::from).collect();
    summary.dates =
      write(policy, "insert_dates", move || store.insert_dates(rows.clone()))
        .await?;

    let dates = read(policy, "list_dates", || store.list_dates()).await?;
    for (key, date) in dates {
      let Some(name) = self.calendar.holiday_name(date) else {
        continue;
      };
      let label = holiday_label(name);
      write(policy, "mark_holiday", move || {
        store.mark_holiday(key, label.clone())
      })
      .await?;
      summary.holidays += 1;
    }

    info!(
      dates = summary.dates,
      holidays = summary.holidays,
      start = %range.start,
      end = %range.end,
      "date dimension loaded"
    );
    Ok(())
  }

  /// First pass: create every dimension row the source needs.
  async fn populate_dimensions<R, K>(
    &mut self,
    source: &mut R,
    sink: &mut K,
    summary: &mut RunSummary,
  ) -> Result<(), PipelineError>
  where
    R: RowSource,
    K: RejectionSink,
  {
    let store = self.store;
    let policy = self.config.storage;
    let caches = &mut self.caches;
    let keywords = &self.config.keywords;

    for item in source.pass().map_err(source_error)? {
      let row = item.map_err(source_error)?;
      summary.rows_read += 1;

      match resolve_place(row.field(Column::Place)) {
        Some(place) => {
          caches
            .location
            .get_or_create(&place, |p| {
              write(policy, "insert_location", move || {
                store.insert_location(p.clone())
              })
            })
            .await?;
        }
        None => {
          warn!(
            line = row.line,
            place = %decode(row.field(Column::Place)),
            "unresolvable place"
          );
          summary.unresolved_places += 1;
          sink.reject_place(&row).map_err(sink_error)?;
        }
      }

      match disaster_tuple(&row) {
        Some(disaster) => {
          caches
            .disaster
            .get_or_create(&disaster, |d| {
              write(policy, "insert_disaster", move || {
                store.insert_disaster(d.clone())
              })
            })
            .await?;
        }
        None => debug!(line = row.line, "category too long; no disaster row"),
      }

      caches
        .cost
        .get_or_create(&cost_tuple(&row), |c| {
          write(policy, "insert_cost", move || store.insert_cost(c.clone()))
        })
        .await?;

      caches
        .summary
        .get_or_create(&summary_tuple(&row, keywords), |s| {
          write(policy, "insert_summary", move || {
            store.insert_summary(s.clone())
          })
        })
        .await?;
    }

    summary.locations = caches.location.len() as u64;
    summary.disasters = caches.disaster.len() as u64;
    summary.costs = caches.cost.len() as u64;
    summary.summaries = caches.summary.len() as u64;
    info!(
      rows = summary.rows_read,
      locations = summary.locations,
      disasters = summary.disasters,
      costs = summary.costs,
      summaries = summary.summaries,
      "dimensions populated"
    );
    Ok(())
  }

  /// Second pass: link every row into the fact table or reject it.
  async fn populate_facts<R, K>(
    &self,
    source: &mut R,
    sink: &mut K,
    summary: &mut RunSummary,
  ) -> Result<(), PipelineError>
  where
    R: RowSource,
    K: RejectionSink,
  {
    let store = self.store;
    let policy = self.config.storage;
    let linker = FactLinker::new(&self.config.keywords);
    let dates = StoreDates { store, policy };
    let mut seen = HashSet::new();

    for item in source.pass().map_err(source_error)? {
      let row = item.map_err(source_error)?;
      let linked = linker
        .link(&row, &self.caches, &dates)
        .await?
        .and_then(|fact| {
          if seen.insert(fact.key) {
            Ok(fact)
          } else {
            Err(Rejection::DuplicateFact)
          }
        });

      match linked {
        Ok(fact) => {
          write(policy, "insert_fact", move || store.insert_fact(fact.clone()))
            .await?;
          summary.facts_accepted += 1;
        }
        Err(rejection) => {
          log_rejection(&row, &rejection);
          summary.record_rejection(rejection.kind());
          sink.reject_row(&row, &rejection).map_err(sink_error)?;
        }
      }
    }

    info!(
      accepted = summary.facts_accepted,
      rejected = summary.rejected_total(),
      "facts populated"
    );
    Ok(())
  }

  /// Compare the tables against what this run believes it created.
  async fn check_row_counts(
    &self,
    summary: &RunSummary,
  ) -> Result<(), PipelineError> {
    let store = self.store;
    let policy = self.config.storage;
    for table in Table::iter() {
      let expected = match table {
        Table::Date => summary.dates,
        Table::Location => summary.locations,
        Table::Disaster => summary.disasters,
        Table::Cost => summary.costs,
        Table::Summary => summary.summaries,
        Table::Fact => summary.facts_accepted,
      };
      let actual =
        read(policy, "row_count", move || store.row_count(table)).await?;
      if actual == expected {
        debug!(%table, rows = actual, "row count matches");
      } else {
        warn!(%table, expected, actual, "row count mismatch");
      }
    }
    Ok(())
  }
}

fn log_rejection(row: &SourceRow, rejection: &Rejection) {
  if rejection.is_inconsistency() {
    error!(line = row.line, %rejection, "dimension pass missed a key");
  } else {
    warn!(line = row.line, %rejection, "row rejected");
  }
}

// ─── Date lookup against the store ───────────────────────────────────────────

struct StoreDates<'a, S> {
  store:  &'a S,
  policy: StoragePolicy,
}

impl<S: WarehouseStore> DateLookup for StoreDates<'_, S> {
  async fn date_keys(
    &self,
    date: chrono::NaiveDate,
  ) -> Result<Vec<SurrogateKey>, PipelineError> {
    let store = self.store;
    read(self.policy, "find_date_keys", move || store.find_date_keys(date)).await
  }
}

// ─── Storage calls ───────────────────────────────────────────────────────────

/// An idempotent call, retried up to `read_attempts` times.
async fn read<T, E, F, Fut>(
  policy: StoragePolicy,
  op: &'static str,
  call: F,
) -> Result<T, PipelineError>
where
  F: FnMut() -> Fut,
  Fut: Future<Output = Result<T, E>>,
  E: std::error::Error + Send + Sync + 'static,
{
  bounded(policy, op, policy.read_attempts, call).await
}

/// A call that must not be repeated, attempted once.
async fn write<T, E, F, Fut>(
  policy: StoragePolicy,
  op: &'static str,
  call: F,
) -> Result<T, PipelineError>
where
  F: FnMut() -> Fut,
  Fut: Future<Output = Result<T, E>>,
  E: std::error::Error + Send + Sync + 'static,
{
  bounded(policy, op, 1, call).await
}

async fn bounded<T, E, F, Fut>(
  policy: StoragePolicy,
  op: &'static str,
  attempts: u32,
  mut call: F,
) -> Result<T, PipelineError>
where
  F: FnMut() -> Fut,
  Fut: Future<Output = Result<T, E>>,
  E: std::error::Error + Send + Sync + 'static,
{
  let attempts = attempts.max(1);
  let mut attempt = 0;
  loop {
    attempt += 1;
    let failure = match tokio::time::timeout(policy.timeout(), call()).await {
      Ok(Ok(value)) => return Ok(value),
      Ok(Err(e)) => PipelineError::Storage {
        op,
        attempts: attempt,
        source: Box::new(e),
      },
      Err(_) => PipelineError::Timeout {
        op,
        attempts: attempt,
        after: policy.timeout(),
      },
    };
    if attempt >= attempts {
      return Err(failure);
    }
    warn!(op, attempt, error = %failure, "storage call failed; retrying");
    tokio::time::sleep(Duration::from_millis(100 * u64::from(attempt))).await;
  }
}

fn source_error<E>(e: E) -> PipelineError
where
  E: std::error::Error + Send + Sync + 'static,
{
  PipelineError::Source(Box::new(e))
}

fn sink_error<E>(e: E) -> PipelineError
where
  E: std::error::Error + Send + Sync + 'static,
{
  PipelineError::Sink(Box::new(e))
}
