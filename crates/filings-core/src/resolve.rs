//! Dimension resolution: Silver rows + persisted state → write plan.
//!
//! Resolution is a pure transformation. Source rows are first deduplicated
//! by natural key under [`first_occurrence_wins`], then diffed against the
//! natural keys already persisted. Append-only dimensions only ever produce
//! inserts; the company dimension can additionally produce SCD2 transitions.

use std::collections::{HashMap, HashSet, hash_map::Entry};

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::{
  dimension::{Company, CompanyAttrs, DateRow, Dimension, Filing, Metric, Statement},
  keys::{Accession, Cik, MetricKey, StatementGrain, StatementKey},
  scd::{OpenVersion, Transition},
  source::SourceTables,
};

// ─── Deduplication policy ────────────────────────────────────────────────────

/// Result of deduplicating one source batch.
#[derive(Debug, Clone)]
pub struct Deduped<T> {
  /// One row per natural key, in order of first appearance.
  pub rows:       Vec<T>,
  /// Later rows dropped because their natural key was already seen.
  pub duplicates: usize,
  /// The subset of `duplicates` whose attributes differ from the kept row.
  pub conflicts:  usize,
}

/// The deduplication policy for every dimension: when a batch holds the same
/// natural key more than once, the first row in source order is kept and
/// all later rows are discarded, whatever their attributes.
pub fn first_occurrence_wins<T>(rows: impl IntoIterator<Item = T>) -> Deduped<T>
where
  T: Dimension + PartialEq,
{
  let mut kept: Vec<T> = Vec::new();
  let mut position: HashMap<T::Key, usize> = HashMap::new();
  let mut duplicates = 0;
  let mut conflicts = 0;

  for row in rows {
    match position.entry(row.natural_key()) {
      Entry::Vacant(slot) => {
        slot.insert(kept.len());
        kept.push(row);
      }
      Entry::Occupied(slot) => {
        duplicates += 1;
        if kept[*slot.get()] != row {
          conflicts += 1;
        }
      }
    }
  }

  Deduped { rows: kept, duplicates, conflicts }
}

// ─── Per-dimension resolution ────────────────────────────────────────────────

/// Rows of an append-only dimension whose natural key is not yet persisted.
pub fn new_rows<T: Dimension>(rows: Vec<T>, existing: &HashSet<T::Key>) -> Vec<T> {
  rows
    .into_iter()
    .filter(|row| !existing.contains(&row.natural_key()))
    .collect()
}

/// The company rows split into brand-new keys and changed current keys.
#[derive(Debug, Clone, Default)]
pub struct CompanyResolution {
  pub to_insert:    Vec<Company>,
  pub to_supersede: Vec<Company>,
  pub unchanged:    usize,
}

/// Diff deduplicated company rows against the current versions.
///
/// A key whose name and SIC code match its current version is left alone,
/// even if carried-along attributes such as the countries differ.
pub fn resolve_companies(
  rows: Vec<Company>,
  current: &HashMap<Cik, CompanyAttrs>,
) -> CompanyResolution {
  let mut resolution = CompanyResolution::default();
  for company in rows {
    match current.get(&company.cik) {
      None => resolution.to_insert.push(company),
      Some(attrs) if *attrs == company.attrs => resolution.unchanged += 1,
      Some(_) => resolution.to_supersede.push(company),
    }
  }
  resolution
}

// ─── Whole-run planning ──────────────────────────────────────────────────────

/// The natural keys currently persisted, as read back from the warehouse.
/// Companies are represented by their *current* version only.
#[derive(Debug, Clone, Default)]
pub struct DimensionState {
  pub companies:  HashMap<Cik, CompanyAttrs>,
  pub filings:    HashSet<Accession>,
  pub metrics:    HashSet<MetricKey>,
  pub statements: HashSet<StatementKey>,
  pub dates:      HashSet<NaiveDate>,
}

/// Dimension candidates extracted from one run's sources.
#[derive(Debug, Clone, Default)]
pub struct Candidates {
  pub companies:  Vec<Company>,
  pub filings:    Vec<Filing>,
  pub metrics:    Vec<Metric>,
  pub statements: Vec<Statement>,
  pub dates:      Vec<DateRow>,
  /// Source rows that lacked a required field, per dimension.
  pub skipped:    SkippedRows,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SkippedRows {
  pub companies:  usize,
  pub filings:    usize,
  pub metrics:    usize,
  pub statements: usize,
}

impl Candidates {
  /// Extract candidates in source order. The date dimension is supplied by
  /// the caller because it is generated or observed rather than read.
  pub fn from_sources(sources: &SourceTables, grain: StatementGrain, dates: Vec<DateRow>) -> Self {
    let mut skipped = SkippedRows::default();

    let companies = collect(sources.submissions.iter().map(|r| r.company()), &mut skipped.companies);
    let filings = collect(sources.submissions.iter().map(|r| r.filing()), &mut skipped.filings);
    let metrics = collect(sources.tags.iter().map(|r| r.metric()), &mut skipped.metrics);
    let statements = collect(
      sources.presentations.iter().map(|r| r.statement(grain)),
      &mut skipped.statements,
    );

    Self { companies, filings, metrics, statements, dates, skipped }
  }
}

fn collect<T>(rows: impl Iterator<Item = Option<T>>, skipped: &mut usize) -> Vec<T> {
  rows
    .filter_map(|row| {
      if row.is_none() {
        *skipped += 1;
      }
      row
    })
    .collect()
}

/// Per-dimension resolution counts, reported in the run summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResolveCounts {
  pub candidates: usize,
  pub duplicates: usize,
  pub conflicts:  usize,
  pub to_insert:  usize,
  pub superseded: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResolveReport {
  pub companies:  ResolveCounts,
  pub filings:    ResolveCounts,
  pub metrics:    ResolveCounts,
  pub statements: ResolveCounts,
  pub dates:      ResolveCounts,
  pub skipped:    SkippedRows,
}

/// Everything the warehouse must write for the dimension phase of one run.
#[derive(Debug, Clone)]
pub struct DimensionPlan {
  pub load_ts:     DateTime<Utc>,
  pub companies:   Vec<OpenVersion>,
  pub transitions: Vec<Transition>,
  pub filings:     Vec<Filing>,
  pub metrics:     Vec<Metric>,
  pub statements:  Vec<Statement>,
  pub dates:       Vec<DateRow>,
  pub report:      ResolveReport,
}

impl DimensionPlan {
  pub fn is_empty(&self) -> bool {
    self.companies.is_empty()
      && self.transitions.is_empty()
      && self.filings.is_empty()
      && self.metrics.is_empty()
      && self.statements.is_empty()
      && self.dates.is_empty()
  }
}

fn append_only<T>(rows: Vec<T>, existing: &HashSet<T::Key>) -> (Vec<T>, ResolveCounts)
where
  T: Dimension + PartialEq,
{
  let candidates = rows.len();
  let deduped = first_occurrence_wins(rows);
  let inserts = new_rows(deduped.rows, existing);
  let counts = ResolveCounts {
    candidates,
    duplicates: deduped.duplicates,
    conflicts: deduped.conflicts,
    to_insert: inserts.len(),
    superseded: 0,
  };
  (inserts, counts)
}

/// Resolve every dimension against the persisted state.
pub fn plan(candidates: Candidates, state: &DimensionState, load_ts: DateTime<Utc>) -> DimensionPlan {
  let company_candidates = candidates.companies.len();
  let deduped = first_occurrence_wins(candidates.companies);
  let resolution = resolve_companies(deduped.rows, &state.companies);
  let company_counts = ResolveCounts {
    candidates: company_candidates,
    duplicates: deduped.duplicates,
    conflicts:  deduped.conflicts,
    to_insert:  resolution.to_insert.len(),
    superseded: resolution.to_supersede.len(),
  };

  let (filings, filing_counts) = append_only(candidates.filings, &state.filings);
  let (metrics, metric_counts) = append_only(candidates.metrics, &state.metrics);
  let (statements, statement_counts) = append_only(candidates.statements, &state.statements);
  let (dates, date_counts) = append_only(candidates.dates, &state.dates);

  DimensionPlan {
    load_ts,
    companies: resolution
      .to_insert
      .into_iter()
      .map(|c| OpenVersion::new(c, load_ts))
      .collect(),
    transitions: resolution
      .to_supersede
      .into_iter()
      .map(|c| Transition::new(c, load_ts))
      .collect(),
    filings,
    metrics,
    statements,
    dates,
    report: ResolveReport {
      companies:  company_counts,
      filings:    filing_counts,
      metrics:    metric_counts,
      statements: statement_counts,
      dates:      date_counts,
      skipped:    candidates.skipped,
    },
  }
}
