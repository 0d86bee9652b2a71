//! The `Warehouse` trait and its supporting result types.
//!
//! The trait is implemented by storage backends (e.g. `filings-store-sqlite`).
//! The ETL job depends on this abstraction, not on any concrete backend.

use std::future::Future;

use serde::Serialize;

use crate::{
  fact::FactRecord,
  keys::Cik,
  resolve::{DimensionPlan, DimensionState},
  scd::CompanyVersion,
  snapshot::KeySnapshot,
};

// ─── Result types ────────────────────────────────────────────────────────────

/// Rows written by [`Warehouse::apply_dimensions`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DimensionWrite {
  pub companies_inserted:   usize,
  pub companies_superseded: usize,
  pub filings_inserted:     usize,
  pub metrics_inserted:     usize,
  pub statements_inserted:  usize,
  pub dates_inserted:       usize,
}

/// Fact rows whose foreign key points at no dimension row, per key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OrphanCounts {
  pub company:   u64,
  pub filing:    u64,
  pub metric:    u64,
  pub statement: u64,
  pub date:      u64,
}

impl OrphanCounts {
  pub fn total(&self) -> u64 { self.company + self.filing + self.metric + self.statement + self.date }
}

/// A company natural key whose number of current versions is not one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurrentViolation {
  pub cik:     Cik,
  pub current: u64,
}

/// Result of [`Warehouse::integrity`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IntegrityReport {
  pub facts:              u64,
  pub orphans:            OrphanCounts,
  pub current_violations: Vec<CurrentViolation>,
}

impl IntegrityReport {
  pub fn is_clean(&self) -> bool {
    self.orphans.total() == 0 && self.current_violations.is_empty()
  }
}

/// One line of the "top companies by total reported value" query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompanyTotal {
  pub cik:         Cik,
  pub name:        String,
  pub facts:       u64,
  pub total_value: f64,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over the gold-layer warehouse.
///
/// Dimension and fact writes are separate consistency domains:
/// [`apply_dimensions`](Self::apply_dimensions) is a single transaction for
/// every dimension, while facts are cleared once and then inserted one
/// transaction per chunk.
///
/// All methods return `Send` futures so the trait can be driven from a
/// multi-threaded tokio runtime.
pub trait Warehouse: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Dimensions ────────────────────────────────────────────────────────

  /// Natural keys currently persisted, with the attributes of each
  /// company's current version.
  fn dimension_state(
    &self,
  ) -> impl Future<Output = Result<DimensionState, Self::Error>> + Send + '_;

  /// Apply a dimension plan atomically: every insert and every SCD2
  /// close-and-open pair commits together or not at all.
  fn apply_dimensions(
    &self,
    plan: DimensionPlan,
  ) -> impl Future<Output = Result<DimensionWrite, Self::Error>> + Send + '_;

  /// Build the natural → surrogate key maps from committed rows. Companies
  /// map to their current version.
  fn key_snapshot(&self) -> impl Future<Output = Result<KeySnapshot, Self::Error>> + Send + '_;

  // ── Facts ─────────────────────────────────────────────────────────────

  /// Delete every fact row. Returns the number of rows removed.
  fn clear_facts(&self) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Insert one chunk of facts in its own transaction.
  fn insert_facts(
    &self,
    chunk_index: usize,
    facts: Vec<FactRecord>,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  // ── Reads ─────────────────────────────────────────────────────────────

  /// Every version of one company, oldest first.
  fn company_history(
    &self,
    cik: Cik,
  ) -> impl Future<Output = Result<Vec<CompanyVersion>, Self::Error>> + Send + '_;

  fn fact_count(&self) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Check referential integrity of the fact table and the one-current-
  /// version rule of the company dimension.
  fn integrity(&self) -> impl Future<Output = Result<IntegrityReport, Self::Error>> + Send + '_;

  /// Current companies ranked by the sum of their fact values.
  fn top_companies(
    &self,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<CompanyTotal>, Self::Error>> + Send + '_;
}
