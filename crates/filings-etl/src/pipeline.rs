//! Run orchestration: Silver sources → dimensions → key snapshot → facts.
//!
//! The dimension phase is incremental and commits as one unit. The fact
//! phase rebuilds the fact table: it is cleared once, then refilled one
//! committed chunk at a time. Chunk N+1 is read and built on a blocking
//! thread while chunk N commits.

use std::sync::Arc;

use chrono::{DateTime, SubsecRound as _, Utc};
use filings_core::{
  dimension::{self, DateRow},
  fact::{ChunkOutcome, FactTally, JoinIndex, build_chunk},
  resolve::{self, Candidates, ResolveReport},
  snapshot::{KeySnapshot, SnapshotSizes},
  source::SourceTables,
  store::{DimensionWrite, Warehouse},
};
use filings_silver::SilverLayout;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::Instrument as _;
use uuid::Uuid;

use crate::{
  Result,
  error::{Stage, StageExt as _},
  settings::{DateMode, EtlConfig},
};

// ─── Summaries ───────────────────────────────────────────────────────────────

/// What the dimension phase resolved and wrote.
#[derive(Debug, Clone, Serialize)]
pub struct DimensionSummary {
  pub load_ts: DateTime<Utc>,
  pub report:  ResolveReport,
  pub written: DimensionWrite,
}

/// What the fact phase read, built, and committed.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FactSummary {
  /// Rows removed by the initial clear.
  pub cleared:   u64,
  pub chunks:    usize,
  /// Rows actually committed; equals `tally.loaded` on success.
  pub committed: usize,
  pub tally:     FactTally,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
  pub run_id:     Uuid,
  pub dimensions: DimensionSummary,
  pub snapshot:   SnapshotSizes,
  pub facts:      FactSummary,
}

// ─── Entry points ────────────────────────────────────────────────────────────

/// Full gold load: dimensions, then a rebuild of the fact table.
pub async fn run<W: Warehouse>(warehouse: &W, config: &EtlConfig) -> Result<RunSummary> {
  let run_id = Uuid::new_v4();
  full_load(warehouse, config, run_id)
    .instrument(tracing::info_span!("run", %run_id))
    .await
}

/// The dimension phase alone.
pub async fn run_dimensions<W: Warehouse>(
  warehouse: &W,
  config: &EtlConfig,
) -> Result<DimensionSummary> {
  let run_id = Uuid::new_v4();
  dimensions_only(warehouse, config)
    .instrument(tracing::info_span!("dims", %run_id))
    .await
}

async fn full_load<W: Warehouse>(warehouse: &W, config: &EtlConfig, run_id: Uuid) -> Result<RunSummary> {
  let layout = config.silver.layout()?;
  let tables = read_sources(&layout).await?;
  let dimensions = load_dimensions(warehouse, config, &layout, &tables).await?;

  let snapshot = Arc::new(warehouse.key_snapshot().await.stage(Stage::KeySnapshot)?);
  let sizes = snapshot.sizes();
  tracing::info!(?sizes, "key snapshot ready");

  let index = Arc::new(JoinIndex::build(&tables, config.statements.grain));
  drop(tables);
  let (links, registrants) = index.sizes();
  tracing::debug!(links, registrants, "join index built");

  let facts = load_facts(warehouse, &layout, config.chunk_size, index, snapshot).await?;

  tracing::info!(
    loaded = facts.tally.loaded,
    dropped = facts.tally.dropped.total(),
    incomplete = facts.tally.incomplete,
    chunks = facts.chunks,
    "run complete"
  );
  Ok(RunSummary { run_id, dimensions, snapshot: sizes, facts })
}

async fn dimensions_only<W: Warehouse>(warehouse: &W, config: &EtlConfig) -> Result<DimensionSummary> {
  let layout = config.silver.layout()?;
  let tables = read_sources(&layout).await?;
  load_dimensions(warehouse, config, &layout, &tables).await
}

// ─── Phases ──────────────────────────────────────────────────────────────────

/// Check that every dataset exists, then load the small tables. Nothing is
/// written if this fails.
async fn read_sources(layout: &SilverLayout) -> Result<SourceTables> {
  let layout = layout.clone();
  let tables = tokio::task::spawn_blocking(move || {
    layout.check()?;
    layout.read_tables()
  })
  .await
  .stage(Stage::ReadSources)?
  .stage(Stage::ReadSources)?;

  tracing::info!(
    submissions = tables.submissions.len(),
    tags = tables.tags.len(),
    presentations = tables.presentations.len(),
    "read silver tables"
  );
  Ok(tables)
}

async fn date_rows(config: &EtlConfig, layout: &SilverLayout) -> Result<Vec<DateRow>> {
  let dates = &config.dates;
  match dates.mode {
    DateMode::Range => dimension::date_range(dates.start, dates.end, dates.fiscal_year_end_month)
      .stage(Stage::ResolveDimensions),
    DateMode::Observed => {
      let layout = layout.clone();
      let chunk_size = config.chunk_size;
      let observed = tokio::task::spawn_blocking(move || layout.observed_dates(chunk_size))
        .await
        .stage(Stage::ReadSources)?
        .stage(Stage::ReadSources)?;
      dimension::observed_dates(observed, dates.fiscal_year_end_month).stage(Stage::ResolveDimensions)
    }
  }
}

async fn load_dimensions<W: Warehouse>(
  warehouse: &W,
  config: &EtlConfig,
  layout: &SilverLayout,
  tables: &SourceTables,
) -> Result<DimensionSummary> {
  let dates = date_rows(config, layout).await?;
  let candidates = Candidates::from_sources(tables, config.statements.grain, dates);
  let state = warehouse.dimension_state().await.stage(Stage::ResolveDimensions)?;

  // One timestamp per run; every close and open in it shares the value.
  let load_ts = Utc::now().trunc_subsecs(6);
  let plan = resolve::plan(candidates, &state, load_ts);
  let report = plan.report;
  warn_on_conflicts(&report);

  let written = warehouse.apply_dimensions(plan).await.stage(Stage::CommitDimensions)?;
  Ok(DimensionSummary { load_ts, report, written })
}

fn warn_on_conflicts(report: &ResolveReport) {
  let dimensions = [
    ("company", &report.companies),
    ("filing", &report.filings),
    ("metric", &report.metrics),
    ("statement", &report.statements),
    ("date", &report.dates),
  ];
  for (dimension, counts) in dimensions {
    if counts.conflicts > 0 {
      tracing::warn!(
        dimension,
        duplicates = counts.duplicates,
        conflicts = counts.conflicts,
        "conflicting rows for one natural key; kept the first"
      );
    } else if counts.duplicates > 0 {
      tracing::debug!(dimension, duplicates = counts.duplicates, "dropped duplicate rows");
    }
  }
  let skipped = report.skipped;
  if skipped != Default::default() {
    tracing::info!(?skipped, "skipped source rows missing a natural key");
  }
}

async fn load_facts<W: Warehouse>(
  warehouse: &W,
  layout: &SilverLayout,
  chunk_size: usize,
  index: Arc<JoinIndex>,
  snapshot: Arc<KeySnapshot>,
) -> Result<FactSummary> {
  let mut summary = FactSummary {
    cleared: warehouse.clear_facts().await.stage(Stage::ClearFacts)?,
    ..Default::default()
  };
  tracing::info!(cleared = summary.cleared, "cleared fact table");

  let chunks = layout.num_chunks(chunk_size).stage(Stage::ReadFactChunk(0))?;
  let (tx, mut rx) = mpsc::channel::<Result<(usize, ChunkOutcome)>>(1);

  let producer = tokio::task::spawn_blocking(move || {
    for (i, chunk) in chunks.enumerate() {
      let item = chunk
        .stage(Stage::ReadFactChunk(i))
        .map(|rows| (i, build_chunk(rows, &index, &snapshot)));
      let failed = item.is_err();
      // A closed channel means the consumer gave up.
      if tx.blocking_send(item).is_err() || failed {
        break;
      }
    }
  });

  while let Some(item) = rx.recv().await {
    let (i, outcome) = item?;
    let rows = outcome.facts.len();
    let committed = warehouse
      .insert_facts(i, outcome.facts)
      .await
      .stage(Stage::CommitFactChunk { index: i, rows })?;

    let tally = outcome.tally;
    tracing::info!(
      chunk = i,
      read = tally.read,
      loaded = committed,
      dropped = tally.dropped.total(),
      incomplete = tally.incomplete,
      "fact chunk committed"
    );
    if tally.dropped.total() > 0 {
      tracing::debug!(chunk = i, dropped = ?tally.dropped, "drop reasons");
    }

    summary.chunks += 1;
    summary.committed += committed;
    summary.tally.merge(&tally);
  }

  producer.await.stage(Stage::ReadFactChunk(summary.chunks))?;
  Ok(summary)
}
