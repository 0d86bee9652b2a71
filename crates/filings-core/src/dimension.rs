//! Dimension row types for the gold-layer star schema.
//!
//! Each type here is the *attribute payload* of a dimension row as produced
//! from Silver data; surrogate keys are assigned by the warehouse at insert
//! time and never appear on these values.

use std::hash::Hash;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use strum::{AsRefStr, Display};

use crate::{
  Error, Result,
  keys::{Accession, Cik, MetricKey, StatementKey},
};

/// A dimension row identified by a natural key.
pub trait Dimension {
  type Key: Clone + Eq + Hash;

  /// Table-level name used in logs and errors.
  const NAME: &'static str;

  fn natural_key(&self) -> Self::Key;
}

// ─── Company ─────────────────────────────────────────────────────────────────

/// The attributes of a company that participate in change detection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompanyAttrs {
  pub name: String,
  pub sic:  Option<String>,
}

/// One company as described by a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Company {
  pub cik:                      Cik,
  pub attrs:                    CompanyAttrs,
  /// Carried onto each version; does not trigger a new version by itself.
  pub country_of_incorporation: Option<String>,
  pub country_of_business:      Option<String>,
}

impl Dimension for Company {
  type Key = Cik;

  const NAME: &'static str = "company_dim";

  fn natural_key(&self) -> Cik { self.cik.clone() }
}

// ─── Filing ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Filing {
  pub accession:        Accession,
  /// Registrant natural key. Company is versioned, so filings refer to it by
  /// CIK rather than by a surrogate key that changes on supersession.
  pub cik:              Cik,
  pub form_type:        String,
  pub period_of_report: Option<NaiveDate>,
  pub date_filed:       Option<NaiveDate>,
}

impl Dimension for Filing {
  type Key = Accession;

  const NAME: &'static str = "filing_dim";

  fn natural_key(&self) -> Accession { self.accession.clone() }
}

// ─── Metric ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Metric {
  pub key:      MetricKey,
  pub label:    Option<String>,
  pub datatype: Option<String>,
  /// `I` for instant, `D` for duration.
  pub iord:     Option<String>,
}

impl Dimension for Metric {
  type Key = MetricKey;

  const NAME: &'static str = "metric_dim";

  fn natural_key(&self) -> MetricKey { self.key.clone() }
}

// ─── Statement ───────────────────────────────────────────────────────────────

/// The fixed statement vocabulary. Unrecognised codes land in `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr, Serialize)]
pub enum StatementKind {
  #[strum(serialize = "Income Statement")]
  IncomeStatement,
  #[strum(serialize = "Balance Sheet")]
  BalanceSheet,
  #[strum(serialize = "Cash Flow")]
  CashFlow,
  #[strum(serialize = "Other")]
  Other,
}

impl StatementKind {
  pub fn from_code(code: &str) -> Self {
    match code.trim().to_ascii_uppercase().as_str() {
      "IS" => Self::IncomeStatement,
      "BS" => Self::BalanceSheet,
      "CF" => Self::CashFlow,
      _ => Self::Other,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Statement {
  pub key:  StatementKey,
  pub kind: StatementKind,
}

impl Statement {
  pub fn new(key: StatementKey) -> Self {
    let kind = StatementKind::from_code(&key.code);
    Self { key, kind }
  }
}

impl Dimension for Statement {
  type Key = StatementKey;

  const NAME: &'static str = "statement_dim";

  fn natural_key(&self) -> StatementKey { self.key.clone() }
}

// ─── Date ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRow {
  pub date:        NaiveDate,
  pub year:        i32,
  pub month:       u32,
  pub day:         u32,
  pub quarter:     u32,
  pub fiscal_year: Option<i32>,
}

impl DateRow {
  /// Derive calendar attributes. `fiscal_year_end_month` is the last month
  /// of the fiscal year; dates after it belong to the next fiscal year.
  pub fn new(date: NaiveDate, fiscal_year_end_month: Option<u32>) -> Self {
    let month = date.month();
    let fiscal_year = fiscal_year_end_month.map(|end| {
      if month <= end { date.year() } else { date.year() + 1 }
    });
    Self {
      date,
      year: date.year(),
      month,
      day: date.day(),
      quarter: (month - 1) / 3 + 1,
      fiscal_year,
    }
  }
}

impl Dimension for DateRow {
  type Key = NaiveDate;

  const NAME: &'static str = "date_dim";

  fn natural_key(&self) -> NaiveDate { self.date }
}

/// Every day in `[start, end]`.
pub fn date_range(
  start: NaiveDate,
  end: NaiveDate,
  fiscal_year_end_month: Option<u32>,
) -> Result<Vec<DateRow>> {
  if start > end {
    return Err(Error::EmptyDateRange { start, end });
  }
  check_fiscal_month(fiscal_year_end_month)?;

  Ok(
    start
      .iter_days()
      .take_while(|d| *d <= end)
      .map(|d| DateRow::new(d, fiscal_year_end_month))
      .collect(),
  )
}

/// Date rows for a set of observed dates, in ascending order.
pub fn observed_dates(
  dates: impl IntoIterator<Item = NaiveDate>,
  fiscal_year_end_month: Option<u32>,
) -> Result<Vec<DateRow>> {
  check_fiscal_month(fiscal_year_end_month)?;
  let mut dates: Vec<NaiveDate> = dates.into_iter().collect();
  dates.sort_unstable();
  dates.dedup();
  Ok(dates.into_iter().map(|d| DateRow::new(d, fiscal_year_end_month)).collect())
}

fn check_fiscal_month(month: Option<u32>) -> Result<()> {
  match month {
    Some(m) if !(1..=12).contains(&m) => Err(Error::InvalidFiscalMonth(m)),
    _ => Ok(()),
  }
}
