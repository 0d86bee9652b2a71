//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings with microsecond precision,
//! calendar dates as `YYYY-MM-DD`. Natural keys are stored in their canonical
//! form and re-canonicalized on the way out.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use filings_core::{
  dimension::{Company, CompanyAttrs},
  keys::{Accession, Cik, MetricKey, StatementKey},
  resolve::DimensionState,
  scd::CompanyVersion,
  snapshot::KeySnapshot,
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339_opts(SecondsFormat::Micros, true) }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── NaiveDate ───────────────────────────────────────────────────────────────

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

// ─── Natural keys ────────────────────────────────────────────────────────────

fn invalid(table: &'static str, value: &str) -> Error {
  Error::InvalidKey { table, value: value.to_owned() }
}

pub fn decode_cik(s: &str) -> Result<Cik> { Cik::parse(s).ok_or_else(|| invalid("company_dim", s)) }

pub fn decode_accession(s: &str) -> Result<Accession> {
  Accession::parse(s).ok_or_else(|| invalid("filing_dim", s))
}

pub fn decode_metric(tag: &str, version: &str) -> Result<MetricKey> {
  MetricKey::parse(tag, version).ok_or_else(|| invalid("metric_dim", &format!("{tag}/{version}")))
}

/// Statement labels are stored as `''` when absent.
pub fn encode_label(label: Option<&str>) -> &str { label.unwrap_or("") }

pub fn decode_statement(code: &str, label: &str) -> Result<StatementKey> {
  let code = code.trim();
  if code.is_empty() {
    return Err(invalid("statement_dim", code));
  }
  Ok(StatementKey {
    code:  code.to_owned(),
    label: (!label.is_empty()).then(|| label.to_owned()),
  })
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Natural and surrogate keys of every dimension as stored. Companies are
/// limited to their current version.
#[derive(Default)]
pub struct RawKeys {
  /// `(company_id, cik, name, sic)`
  pub companies:  Vec<(i64, String, String, Option<String>)>,
  pub filings:    Vec<(i64, String)>,
  /// `(metric_id, tag, version)`
  pub metrics:    Vec<(i64, String, String)>,
  /// `(statement_id, code, label)`
  pub statements: Vec<(i64, String, String)>,
  pub dates:      Vec<(i64, String)>,
}

impl RawKeys {
  pub fn into_snapshot(self) -> Result<KeySnapshot> {
    Ok(KeySnapshot {
      companies:  self
        .companies
        .into_iter()
        .map(|(id, cik, ..)| Ok((decode_cik(&cik)?, id)))
        .collect::<Result<_>>()?,
      filings:    self
        .filings
        .into_iter()
        .map(|(id, acc)| Ok((decode_accession(&acc)?, id)))
        .collect::<Result<_>>()?,
      metrics:    self
        .metrics
        .into_iter()
        .map(|(id, tag, version)| Ok((decode_metric(&tag, &version)?, id)))
        .collect::<Result<_>>()?,
      statements: self
        .statements
        .into_iter()
        .map(|(id, code, label)| Ok((decode_statement(&code, &label)?, id)))
        .collect::<Result<_>>()?,
      dates:      self
        .dates
        .into_iter()
        .map(|(id, date)| Ok((decode_date(&date)?, id)))
        .collect::<Result<_>>()?,
    })
  }

  pub fn into_state(self) -> Result<DimensionState> {
    Ok(DimensionState {
      companies:  self
        .companies
        .into_iter()
        .map(|(_, cik, name, sic)| Ok((decode_cik(&cik)?, CompanyAttrs { name, sic })))
        .collect::<Result<_>>()?,
      filings:    self
        .filings
        .iter()
        .map(|(_, acc)| decode_accession(acc))
        .collect::<Result<_>>()?,
      metrics:    self
        .metrics
        .iter()
        .map(|(_, tag, version)| decode_metric(tag, version))
        .collect::<Result<_>>()?,
      statements: self
        .statements
        .iter()
        .map(|(_, code, label)| decode_statement(code, label))
        .collect::<Result<_>>()?,
      dates:      self
        .dates
        .iter()
        .map(|(_, date)| decode_date(date))
        .collect::<Result<_>>()?,
    })
  }
}

/// Raw values read directly from a `company_dim` row.
pub struct RawCompanyVersion {
  pub company_id:               i64,
  pub cik:                      String,
  pub name:                     String,
  pub sic:                      Option<String>,
  pub country_of_incorporation: Option<String>,
  pub country_of_business:      Option<String>,
  pub valid_from:               String,
  pub valid_to:                 String,
  pub is_current:               bool,
}

impl RawCompanyVersion {
  pub const COLUMNS: &'static str = "company_id, cik, name, sic, country_of_incorporation, \
                                     country_of_business, valid_from, valid_to, is_current";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      company_id:               row.get(0)?,
      cik:                      row.get(1)?,
      name:                     row.get(2)?,
      sic:                      row.get(3)?,
      country_of_incorporation: row.get(4)?,
      country_of_business:      row.get(5)?,
      valid_from:               row.get(6)?,
      valid_to:                 row.get(7)?,
      is_current:               row.get(8)?,
    })
  }

  pub fn into_version(self) -> Result<CompanyVersion> {
    Ok(CompanyVersion {
      company_id: self.company_id,
      company:    Company {
        cik:                      decode_cik(&self.cik)?,
        attrs:                    CompanyAttrs { name: self.name, sic: self.sic },
        country_of_incorporation: self.country_of_incorporation,
        country_of_business:      self.country_of_business,
      },
      valid_from: decode_dt(&self.valid_from)?,
      valid_to:   decode_dt(&self.valid_to)?,
      is_current: self.is_current,
    })
  }
}
