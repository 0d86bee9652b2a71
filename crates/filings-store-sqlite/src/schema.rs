//! SQL schema for the filings warehouse.
//!
//! Executed at connection startup. `PRAGMA user_version` records the schema
//! revision; future migrations will be gated on it.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- SCD Type 2: one row per company version.
CREATE TABLE IF NOT EXISTS company_dim (
    company_id               INTEGER PRIMARY KEY,
    cik                      TEXT    NOT NULL,
    name                     TEXT    NOT NULL,
    sic                      TEXT,
    country_of_incorporation TEXT,
    country_of_business      TEXT,
    valid_from               TEXT    NOT NULL,   -- RFC 3339 UTC
    valid_to                 TEXT    NOT NULL,   -- 9999-12-31 while current
    is_current               INTEGER NOT NULL CHECK (is_current IN (0, 1))
);

CREATE INDEX IF NOT EXISTS company_cik_idx ON company_dim(cik);
-- At most one current version per CIK.
CREATE UNIQUE INDEX IF NOT EXISTS company_current_idx
    ON company_dim(cik) WHERE is_current = 1;

CREATE TABLE IF NOT EXISTS filing_dim (
    filing_id        INTEGER PRIMARY KEY,
    accession        TEXT NOT NULL UNIQUE,
    cik              TEXT NOT NULL,
    form_type        TEXT NOT NULL,
    period_of_report TEXT,                     -- YYYY-MM-DD
    date_filed       TEXT                      -- YYYY-MM-DD
);

CREATE TABLE IF NOT EXISTS metric_dim (
    metric_id INTEGER PRIMARY KEY,
    tag       TEXT NOT NULL,
    version   TEXT NOT NULL,
    label     TEXT,
    datatype  TEXT,
    iord      TEXT,                            -- 'I' | 'D'
    UNIQUE (tag, version)
);

-- label is '' when the statement grain is the code alone, so that the
-- UNIQUE constraint applies (NULLs never collide).
CREATE TABLE IF NOT EXISTS statement_dim (
    statement_id INTEGER PRIMARY KEY,
    code         TEXT NOT NULL,
    label        TEXT NOT NULL DEFAULT '',
    name         TEXT NOT NULL,
    UNIQUE (code, label)
);

CREATE TABLE IF NOT EXISTS date_dim (
    date_id     INTEGER PRIMARY KEY,
    date        TEXT    NOT NULL UNIQUE,       -- YYYY-MM-DD
    year        INTEGER NOT NULL,
    month       INTEGER NOT NULL,
    day         INTEGER NOT NULL,
    quarter     INTEGER NOT NULL,
    fiscal_year INTEGER
);

-- Rebuilt in full on every run. Foreign keys are checked by the loader
-- and by the integrity report rather than declared here.
CREATE TABLE IF NOT EXISTS fact_financials (
    fact_id      INTEGER PRIMARY KEY,
    company_id   INTEGER NOT NULL,
    filing_id    INTEGER NOT NULL,
    metric_id    INTEGER NOT NULL,
    statement_id INTEGER NOT NULL,
    date_id      INTEGER NOT NULL,
    value        REAL    NOT NULL,
    unit         TEXT,
    footnote     TEXT
);

CREATE INDEX IF NOT EXISTS fact_company_idx ON fact_financials(company_id);
CREATE INDEX IF NOT EXISTS fact_filing_idx  ON fact_financials(filing_id);

PRAGMA user_version = 1;
";
