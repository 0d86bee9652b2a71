//! Natural-key → surrogate-key lookup maps.
//!
//! A [`KeySnapshot`] is read from the warehouse once the dimension commit has
//! finished and is never modified afterwards; the fact stage shares it behind
//! an `Arc`. A snapshot taken before the commit would miss every key the
//! commit inserted, so the run builds a fresh one after each commit.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::keys::{Accession, Cik, MetricKey, StatementKey};

#[derive(Debug, Clone, Default)]
pub struct KeySnapshot {
  /// Current company versions only.
  pub companies:  HashMap<Cik, i64>,
  pub filings:    HashMap<Accession, i64>,
  pub metrics:    HashMap<MetricKey, i64>,
  pub statements: HashMap<StatementKey, i64>,
  pub dates:      HashMap<NaiveDate, i64>,
}

/// Sizes of each lookup map, for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SnapshotSizes {
  pub companies:  usize,
  pub filings:    usize,
  pub metrics:    usize,
  pub statements: usize,
  pub dates:      usize,
}

impl KeySnapshot {
  pub fn company(&self, cik: &Cik) -> Option<i64> { self.companies.get(cik).copied() }

  pub fn filing(&self, accession: &Accession) -> Option<i64> { self.filings.get(accession).copied() }

  pub fn metric(&self, key: &MetricKey) -> Option<i64> { self.metrics.get(key).copied() }

  pub fn statement(&self, key: &StatementKey) -> Option<i64> { self.statements.get(key).copied() }

  pub fn date(&self, date: &NaiveDate) -> Option<i64> { self.dates.get(date).copied() }

  pub fn sizes(&self) -> SnapshotSizes {
    SnapshotSizes {
      companies:  self.companies.len(),
      filings:    self.filings.len(),
      metrics:    self.metrics.len(),
      statements: self.statements.len(),
      dates:      self.dates.len(),
    }
  }
}
