//! [`SqliteWarehouse`]: the SQLite implementation of [`WarehouseStore`].

use std::path::Path;

use chrono::NaiveDate;
use rusqlite::types::Value;

use dmart_core::{
  dimension::{
    COST_COLUMNS, CostTuple, DateRow, DisasterTuple, FactKey, FactRow, Place,
    SummaryTuple, SurrogateKey, Table,
  },
  store::WarehouseStore,
};

use crate::{
  Result,
  encode::{decode_date, encode_date, numeric_text},
  schema::{PRAGMAS, RESET},
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A star-schema warehouse backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteWarehouse {
  conn: tokio_rusqlite::Connection,
}

/// A location dimension row as stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationRow {
  pub key:    SurrogateKey,
  pub place:  Place,
  pub canada: bool,
}

impl SqliteWarehouse {
  /// Open (or create) a warehouse at `path`. Tables are created by
  /// [`WarehouseStore::reset_schema`].
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.apply_pragmas().await?;
    Ok(store)
  }

  /// Open an in-memory warehouse, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.apply_pragmas().await?;
    Ok(store)
  }

  async fn apply_pragmas(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(PRAGMAS)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Every fact row, in insertion order.
  pub async fn facts(&self) -> Result<Vec<FactRow>> {
    let facts = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT start_date_key, end_date_key, location_key, disaster_key,
                  summary_key, cost_key,
                  fatality_number, injured_number, evacuated_number
           FROM fact ORDER BY rowid",
        )?;
        let rows = stmt
          .query_map([], |row| {
            Ok(FactRow {
              key:        FactKey {
                start_date: SurrogateKey(row.get(0)?),
                end_date:   SurrogateKey(row.get(1)?),
                location:   SurrogateKey(row.get(2)?),
                disaster:   SurrogateKey(row.get(3)?),
                summary:    SurrogateKey(row.get(4)?),
              },
              cost:       SurrogateKey(row.get(5)?),
              fatalities: numeric_text(row.get::<_, Value>(6)?),
              injured:    numeric_text(row.get::<_, Value>(7)?),
              evacuated:  numeric_text(row.get::<_, Value>(8)?),
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(facts)
  }

  /// Every location row, ordered by key.
  pub async fn locations(&self) -> Result<Vec<LocationRow>> {
    let rows = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT location_key, city, province, country, canada
           FROM location_dimension ORDER BY location_key",
        )?;
        let rows = stmt
          .query_map([], |row| {
            Ok(LocationRow {
              key:    SurrogateKey(row.get(0)?),
              place:  Place {
                city:     row.get(1)?,
                province: row.get(2)?,
                country:  row.get(3)?,
              },
              canada: row.get(4)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(rows)
  }

  /// Every holiday on the date dimension, ordered by date.
  pub async fn holidays(&self) -> Result<Vec<(NaiveDate, String)>> {
    let raws: Vec<(String, String)> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT date_actual, holiday_text FROM date_dimension
           WHERE is_holiday = 1 ORDER BY date_actual",
        )?;
        let rows = stmt
          .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(|(date, label)| Ok((decode_date(&date)?, label)))
      .collect()
  }

  /// Run an `INSERT … RETURNING` statement and wrap the generated key.
  async fn insert_returning(&self, sql: String, params: Vec<Value>) -> Result<SurrogateKey> {
    let key: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(&sql, rusqlite::params_from_iter(params), |row| row.get(0))?)
      })
      .await?;
    Ok(SurrogateKey(key))
  }
}

// ─── WarehouseStore impl ─────────────────────────────────────────────────────

impl WarehouseStore for SqliteWarehouse {
  type Error = crate::Error;

  // ── Schema ────────────────────────────────────────────────────────────────

  async fn reset_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(RESET)?;
        Ok(())
      })
      .await?;
    tracing::debug!("star schema recreated");
    Ok(())
  }

  async fn row_count(&self, table: Table) -> Result<u64> {
    let sql = format!("SELECT COUNT(*) FROM {}", table.table_name());
    let count = self
      .conn
      .call(move |conn| Ok(conn.query_row(&sql, [], |row| row.get::<_, i64>(0))?))
      .await?;
    Ok(count.max(0) as u64)
  }

  // ── Date dimension ────────────────────────────────────────────────────────

  async fn insert_dates(&self, rows: Vec<DateRow>) -> Result<u64> {
    let encoded: Vec<_> = rows
      .into_iter()
      .map(|r| {
        (
          encode_date(r.date),
          r.year,
          r.month,
          r.day,
          r.day_of_week,
          r.is_weekend,
        )
      })
      .collect();

    let inserted = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut inserted = 0_u64;
        {
          let mut stmt = tx.prepare(
            "INSERT INTO date_dimension
               (date_actual, year, month, day, day_of_week, is_weekend)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          )?;
          for (date, year, month, day, day_of_week, is_weekend) in &encoded {
            inserted += stmt.execute(rusqlite::params![
              date,
              year,
              month,
              day,
              day_of_week,
              is_weekend,
            ])? as u64;
          }
        }
        tx.commit()?;
        Ok(inserted)
      })
      .await?;
    Ok(inserted)
  }

  async fn list_dates(&self) -> Result<Vec<(SurrogateKey, NaiveDate)>> {
    let raws: Vec<(i64, String)> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT date_key, date_actual FROM date_dimension ORDER BY date_actual",
        )?;
        let rows = stmt
          .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(|(key, date)| Ok((SurrogateKey(key), decode_date(&date)?)))
      .collect()
  }

  async fn mark_holiday(&self, key: SurrogateKey, label: String) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE date_dimension SET is_holiday = 1, holiday_text = ?1
           WHERE date_key = ?2",
          rusqlite::params![label, key.0],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn find_date_keys(&self, date: NaiveDate) -> Result<Vec<SurrogateKey>> {
    let date_str = encode_date(date);
    let keys: Vec<i64> = self
      .conn
      .call(move |conn| {
        let mut stmt =
          conn.prepare("SELECT date_key FROM date_dimension WHERE date_actual = ?1")?;
        let keys = stmt
          .query_map(rusqlite::params![date_str], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(keys)
      })
      .await?;
    Ok(keys.into_iter().map(SurrogateKey).collect())
  }

  // ── Lazily populated dimensions ───────────────────────────────────────────

  async fn insert_location(&self, place: Place) -> Result<SurrogateKey> {
    let canada = place.is_domestic();
    self
      .insert_returning(
        "INSERT INTO location_dimension (city, province, country, canada)
         VALUES (?1, ?2, ?3, ?4)
         RETURNING location_key"
          .to_owned(),
        vec![
          place.city.into(),
          place.province.into(),
          place.country.into(),
          canada.into(),
        ],
      )
      .await
  }

  async fn insert_disaster(&self, d: DisasterTuple) -> Result<SurrogateKey> {
    self
      .insert_returning(
        "INSERT INTO disaster_dimension
           (disaster_type, disaster_subgroup, disaster_group, disaster_category,
            magnitude, utility_people_affected)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         RETURNING disaster_key"
          .to_owned(),
        vec![
          d.disaster_type.into(),
          d.subgroup.into(),
          d.group.into(),
          d.category.into(),
          d.magnitude.into(),
          d.people_affected.into(),
        ],
      )
      .await
  }

  async fn insert_cost(&self, cost: CostTuple) -> Result<SurrogateKey> {
    let placeholders = (1..=COST_COLUMNS.len())
      .map(|i| format!("?{i}"))
      .collect::<Vec<_>>()
      .join(", ");
    let sql = format!(
      "INSERT INTO cost_dimension ({}) VALUES ({placeholders}) RETURNING cost_key",
      COST_COLUMNS.join(", "),
    );
    self
      .insert_returning(sql, cost.0.into_iter().map(Value::from).collect())
      .await
  }

  async fn insert_summary(&self, s: SummaryTuple) -> Result<SurrogateKey> {
    let [k1, k2, k3] = s.keywords;
    self
      .insert_returning(
        "INSERT INTO summary_dimension (summary, keyword_1, keyword_2, keyword_3)
         VALUES (?1, ?2, ?3, ?4)
         RETURNING summary_key"
          .to_owned(),
        vec![s.comment.into(), k1.into(), k2.into(), k3.into()],
      )
      .await
  }

  // ── Facts ─────────────────────────────────────────────────────────────────

  async fn insert_fact(&self, fact: FactRow) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO fact (
             start_date_key, end_date_key, location_key, disaster_key,
             summary_key, cost_key,
             fatality_number, injured_number, evacuated_number
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
          rusqlite::params![
            fact.key.start_date.0,
            fact.key.end_date.0,
            fact.key.location.0,
            fact.key.disaster.0,
            fact.key.summary.0,
            fact.cost.0,
            fact.fatalities,
            fact.injured,
            fact.evacuated,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}
