//! SQL schema for the SQLite warehouse.
//!
//! Every run starts from empty tables: [`RESET`] drops the star schema (fact
//! table first, since it references the dimensions) and recreates it.

/// Connection-level settings, applied once when the store is opened.
pub const PRAGMAS: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;
";

/// Drop and recreate the star schema.
pub const RESET: &str = "
DROP TABLE IF EXISTS fact;
DROP TABLE IF EXISTS date_dimension;
DROP TABLE IF EXISTS location_dimension;
DROP TABLE IF EXISTS disaster_dimension;
DROP TABLE IF EXISTS cost_dimension;
DROP TABLE IF EXISTS summary_dimension;

-- One row per calendar day; only is_holiday/holiday_text are ever updated.
CREATE TABLE date_dimension (
    date_key     INTEGER PRIMARY KEY,
    date_actual  TEXT    NOT NULL UNIQUE,   -- YYYY-MM-DD
    year         INTEGER NOT NULL,
    month        INTEGER NOT NULL,
    day          INTEGER NOT NULL,
    day_of_week  INTEGER NOT NULL,          -- ISO, Monday = 1
    is_weekend   INTEGER NOT NULL,
    is_holiday   INTEGER NOT NULL DEFAULT 0,
    holiday_text TEXT
);

CREATE TABLE location_dimension (
    location_key INTEGER PRIMARY KEY,
    city         TEXT    NOT NULL,
    province     TEXT    NOT NULL,          -- province code or country label
    country      TEXT    NOT NULL,
    canada       INTEGER NOT NULL,
    UNIQUE (city, province, country)
);

CREATE TABLE disaster_dimension (
    disaster_key            INTEGER PRIMARY KEY,
    disaster_type           TEXT,
    disaster_subgroup       TEXT,
    disaster_group          TEXT,
    disaster_category       TEXT,
    magnitude               NUMERIC,        -- geological subgroup only
    utility_people_affected NUMERIC
);

CREATE TABLE cost_dimension (
    cost_key                       INTEGER PRIMARY KEY,
    estimated_total_cost           NUMERIC,
    normalized_total_cost          NUMERIC,
    federal_dfaa_payments          NUMERIC,
    provincial_dfaa_payments       NUMERIC,
    provincial_department_payments NUMERIC,
    municipal_cost                 NUMERIC,
    ogd_cost                       NUMERIC,
    insurance_payments             NUMERIC,
    ngo_cost                       NUMERIC
);

CREATE TABLE summary_dimension (
    summary_key INTEGER PRIMARY KEY,
    summary     TEXT,
    keyword_1   TEXT,
    keyword_2   TEXT,
    keyword_3   TEXT
);

CREATE TABLE fact (
    start_date_key   INTEGER NOT NULL REFERENCES date_dimension(date_key),
    end_date_key     INTEGER NOT NULL REFERENCES date_dimension(date_key),
    location_key     INTEGER NOT NULL REFERENCES location_dimension(location_key),
    disaster_key     INTEGER NOT NULL REFERENCES disaster_dimension(disaster_key),
    summary_key      INTEGER NOT NULL REFERENCES summary_dimension(summary_key),
    cost_key         INTEGER NOT NULL REFERENCES cost_dimension(cost_key),
    fatality_number  NUMERIC,
    injured_number   NUMERIC,
    evacuated_number NUMERIC,
    PRIMARY KEY (start_date_key, end_date_key, location_key, disaster_key, summary_key)
);

CREATE INDEX fact_cost_idx ON fact(cost_key);
";
