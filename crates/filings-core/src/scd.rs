//! SCD Type 2 versioning for the company dimension.
//!
//! A company version is either *current* (`is_current`, `valid_to` at the
//! open-ended sentinel) or *closed*. The only transition is current → closed,
//! taken when the load observes changed attributes; it is always paired with
//! the insert of a new current version starting at the same load timestamp.
//! Closed versions are immutable.

use chrono::{DateTime, NaiveDate, TimeZone as _, Utc};
use serde::Serialize;

use crate::dimension::Company;

/// The far-future `valid_to` carried by current versions.
pub fn open_end() -> DateTime<Utc> {
  NaiveDate::from_ymd_opt(9999, 12, 31)
    .and_then(|d| d.and_hms_opt(0, 0, 0))
    .map(|dt| Utc.from_utc_datetime(&dt))
    .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionState {
  Current,
  Closed,
}

/// A persisted company version.
#[derive(Debug, Clone, Serialize)]
pub struct CompanyVersion {
  pub company_id: i64,
  pub company:    Company,
  pub valid_from: DateTime<Utc>,
  pub valid_to:   DateTime<Utc>,
  pub is_current: bool,
}

impl CompanyVersion {
  pub fn state(&self) -> VersionState {
    if self.is_current { VersionState::Current } else { VersionState::Closed }
  }

  /// Whether this version was the active one at `at`.
  pub fn covers(&self, at: DateTime<Utc>) -> bool {
    self.valid_from <= at && at < self.valid_to
  }
}

/// A company version about to be inserted in the [`VersionState::Current`]
/// state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenVersion {
  pub company:    Company,
  pub valid_from: DateTime<Utc>,
  pub valid_to:   DateTime<Utc>,
}

impl OpenVersion {
  pub fn new(company: Company, load_ts: DateTime<Utc>) -> Self {
    Self {
      company,
      valid_from: load_ts,
      valid_to: open_end(),
    }
  }
}

/// The paired operations of one current → closed transition. The writer
/// must apply `close_at` to the existing current row and insert `successor`
/// inside one transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
  pub close_at:  DateTime<Utc>,
  pub successor: OpenVersion,
}

impl Transition {
  pub fn new(changed: Company, load_ts: DateTime<Utc>) -> Self {
    Self {
      close_at:  load_ts,
      successor: OpenVersion::new(changed, load_ts),
    }
  }
}
