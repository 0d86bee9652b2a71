//! Fact construction: numeric-fact rows → fully keyed fact records.
//!
//! Each chunk of numeric rows is joined against the presentation links and
//! submissions (both held in memory as a [`JoinIndex`]) and every foreign key
//! is resolved through a [`KeySnapshot`]. A row with any unresolved key is
//! dropped and counted; it is never partially inserted.

use std::collections::HashMap;

use serde::Serialize;
use strum::Display;

use crate::{
  keys::{Accession, Cik, MetricKey, StatementGrain, StatementKey},
  snapshot::KeySnapshot,
  source::{NumRecord, NumRow, SourceTables},
};

/// One row of the fact table, keyed by five surrogate keys.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FactRecord {
  pub company_id:   i64,
  pub filing_id:    i64,
  pub metric_id:    i64,
  pub statement_id: i64,
  pub date_id:      i64,
  pub value:        f64,
  pub unit:         Option<String>,
  pub footnote:     Option<String>,
}

// ─── Join index ──────────────────────────────────────────────────────────────

/// The small Silver tables, keyed for the per-row joins.
#[derive(Debug, Clone, Default)]
pub struct JoinIndex {
  statements:  HashMap<Accession, HashMap<MetricKey, StatementKey>>,
  registrants: HashMap<Accession, Cik>,
}

impl JoinIndex {
  /// Index the presentation links and submissions. When a key appears more
  /// than once, the first occurrence in source order wins, so each numeric
  /// row joins to at most one statement and one registrant.
  pub fn build(sources: &SourceTables, grain: StatementGrain) -> Self {
    let mut statements: HashMap<Accession, HashMap<MetricKey, StatementKey>> = HashMap::new();
    for row in &sources.presentations {
      if let (Some((accession, metric)), Some(statement)) = (row.link(), row.statement_key(grain)) {
        statements.entry(accession).or_default().entry(metric).or_insert(statement);
      }
    }

    let mut registrants = HashMap::new();
    for row in &sources.submissions {
      if let (Some(accession), Some(cik)) = (row.accession(), row.registrant()) {
        registrants.entry(accession).or_insert(cik);
      }
    }

    Self { statements, registrants }
  }

  pub fn statement(&self, accession: &Accession, metric: &MetricKey) -> Option<&StatementKey> {
    self.statements.get(accession)?.get(metric)
  }

  pub fn registrant(&self, accession: &Accession) -> Option<&Cik> { self.registrants.get(accession) }

  /// `(presentation links, submissions)` held in the index.
  pub fn sizes(&self) -> (usize, usize) {
    (self.statements.values().map(HashMap::len).sum(), self.registrants.len())
  }
}

// ─── Drop accounting ─────────────────────────────────────────────────────────

/// Why a complete numeric row produced no fact. Only the first failing step
/// is recorded for a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum DropReason {
  NoPresentation,
  NoSubmission,
  Company,
  Filing,
  Metric,
  Statement,
  Date,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DropCounts {
  pub no_presentation: usize,
  pub no_submission:   usize,
  pub company:         usize,
  pub filing:          usize,
  pub metric:          usize,
  pub statement:       usize,
  pub date:            usize,
}

impl DropCounts {
  pub fn record(&mut self, reason: DropReason) {
    let slot = match reason {
      DropReason::NoPresentation => &mut self.no_presentation,
      DropReason::NoSubmission => &mut self.no_submission,
      DropReason::Company => &mut self.company,
      DropReason::Filing => &mut self.filing,
      DropReason::Metric => &mut self.metric,
      DropReason::Statement => &mut self.statement,
      DropReason::Date => &mut self.date,
    };
    *slot += 1;
  }

  pub fn total(&self) -> usize {
    self.no_presentation
      + self.no_submission
      + self.company
      + self.filing
      + self.metric
      + self.statement
      + self.date
  }

  pub fn merge(&mut self, other: &DropCounts) {
    self.no_presentation += other.no_presentation;
    self.no_submission += other.no_submission;
    self.company += other.company;
    self.filing += other.filing;
    self.metric += other.metric;
    self.statement += other.statement;
    self.date += other.date;
  }
}

/// Counters for a run's fact stage.
///
/// `loaded + dropped.total() == read - incomplete` holds for every chunk and
/// for the sum over chunks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FactTally {
  pub read:       usize,
  pub incomplete: usize,
  pub loaded:     usize,
  pub dropped:    DropCounts,
}

impl FactTally {
  pub fn merge(&mut self, other: &FactTally) {
    self.read += other.read;
    self.incomplete += other.incomplete;
    self.loaded += other.loaded;
    self.dropped.merge(&other.dropped);
  }

  /// Rows with every required source field present.
  pub fn complete(&self) -> usize { self.read - self.incomplete }

  pub fn balanced(&self) -> bool { self.loaded + self.dropped.total() == self.complete() }
}

// ─── Builder ─────────────────────────────────────────────────────────────────

/// The facts built from one chunk plus its accounting.
#[derive(Debug, Clone, Default)]
pub struct ChunkOutcome {
  pub facts: Vec<FactRecord>,
  pub tally: FactTally,
}

/// Resolve one complete numeric record to a fact.
pub fn resolve(
  record: NumRecord,
  index: &JoinIndex,
  keys: &KeySnapshot,
) -> Result<FactRecord, DropReason> {
  let statement = index
    .statement(&record.accession, &record.metric)
    .ok_or(DropReason::NoPresentation)?;
  let cik = index
    .registrant(&record.accession)
    .ok_or(DropReason::NoSubmission)?;

  Ok(FactRecord {
    company_id:   keys.company(cik).ok_or(DropReason::Company)?,
    filing_id:    keys.filing(&record.accession).ok_or(DropReason::Filing)?,
    metric_id:    keys.metric(&record.metric).ok_or(DropReason::Metric)?,
    statement_id: keys.statement(statement).ok_or(DropReason::Statement)?,
    date_id:      keys.date(&record.date).ok_or(DropReason::Date)?,
    value:        record.value,
    unit:         record.unit,
    footnote:     record.footnote,
  })
}

/// Build the fact records for one chunk of numeric rows.
pub fn build_chunk(rows: Vec<NumRow>, index: &JoinIndex, keys: &KeySnapshot) -> ChunkOutcome {
  let mut outcome = ChunkOutcome {
    facts: Vec::with_capacity(rows.len()),
    tally: FactTally { read: rows.len(), ..Default::default() },
  };

  for row in rows {
    let Some(record) = row.complete() else {
      outcome.tally.incomplete += 1;
      continue;
    };
    match resolve(record, index, keys) {
      Ok(fact) => outcome.facts.push(fact),
      Err(reason) => outcome.tally.dropped.record(reason),
    }
  }

  outcome.tally.loaded = outcome.facts.len();
  outcome
}
