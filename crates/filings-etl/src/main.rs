//! `filings-etl`: loads the gold-layer warehouse from Silver extracts.
//!
//! # Usage
//!
//! ```text
//! filings-etl init
//! filings-etl run --chunk-size 50000
//! filings-etl --config prod.toml verify
//! filings-etl history 320193
//! ```

use std::path::PathBuf;

use anyhow::{Context as _, bail};
use clap::{Parser, Subcommand};
use filings_core::{keys::Cik, store::Warehouse};
use filings_etl::{EtlConfig, RunSummary};
use filings_store_sqlite::SqliteWarehouse;
use serde::Serialize;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Gold-layer loader for SEC financial statement data")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "filings.toml")]
  config: PathBuf,

  /// Warehouse database file; overrides `warehouse_path`.
  #[arg(long, global = true)]
  warehouse: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Create the warehouse schema if it does not exist.
  Init,
  /// Load dimensions incrementally, then rebuild the fact table.
  Run {
    /// Fact rows per chunk; overrides `chunk_size`.
    #[arg(long)]
    chunk_size: Option<usize>,
    /// Print the run summary as JSON.
    #[arg(long)]
    json:       bool,
  },
  /// Load dimensions only.
  Dims {
    #[arg(long)]
    json: bool,
  },
  /// Check fact foreign keys and company version invariants.
  Verify {
    #[arg(long)]
    json: bool,
  },
  /// Current companies ranked by total reported value.
  Top {
    #[arg(short, long, default_value_t = 10)]
    limit: usize,
  },
  /// Every recorded version of one company.
  History { cik: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Logs go to stderr so `--json` output stays clean.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();

  let mut cfg = EtlConfig::load(&cli.config)
    .with_context(|| format!("failed to load configuration from {}", cli.config.display()))?;
  if let Some(path) = cli.warehouse {
    cfg.warehouse_path = filings_etl::settings::expand_tilde(&path);
  }
  if let Command::Run { chunk_size: Some(n), .. } = cli.command {
    cfg.chunk_size = n;
    cfg.validate()?;
  }

  let warehouse = SqliteWarehouse::open(&cfg.warehouse_path)
    .await
    .with_context(|| format!("failed to open warehouse at {:?}", cfg.warehouse_path))?;

  match cli.command {
    Command::Init => {
      println!("warehouse ready at {}", cfg.warehouse_path.display());
    }

    Command::Run { json, .. } => {
      let summary = filings_etl::run(&warehouse, &cfg).await.context("gold load failed")?;
      if json {
        print_json(&summary)?;
      } else {
        print_run(&summary);
      }
    }

    Command::Dims { json } => {
      let summary = filings_etl::run_dimensions(&warehouse, &cfg)
        .await
        .context("dimension load failed")?;
      if json {
        print_json(&summary)?;
      } else {
        let w = summary.written;
        println!(
          "companies: {} new, {} superseded; filings: {}; metrics: {}; statements: {}; dates: {}",
          w.companies_inserted,
          w.companies_superseded,
          w.filings_inserted,
          w.metrics_inserted,
          w.statements_inserted,
          w.dates_inserted,
        );
      }
    }

    Command::Verify { json } => {
      let report = warehouse.integrity().await.context("integrity check failed")?;
      if json {
        print_json(&report)?;
      } else {
        let o = report.orphans;
        println!("facts:      {}", report.facts);
        println!(
          "orphans:    company {} / filing {} / metric {} / statement {} / date {}",
          o.company, o.filing, o.metric, o.statement, o.date
        );
        for v in &report.current_violations {
          println!("cik {}: {} current versions", v.cik, v.current);
        }
      }
      if !report.is_clean() {
        bail!("warehouse failed integrity checks");
      }
    }

    Command::Top { limit } => {
      for (rank, row) in warehouse.top_companies(limit).await?.iter().enumerate() {
        println!(
          "{:>3}. {:<12} {:<40} {:>10} facts  {:>20.2}",
          rank + 1,
          row.cik.as_str(),
          row.name,
          row.facts,
          row.total_value
        );
      }
    }

    Command::History { cik } => {
      let Some(cik) = Cik::parse(&cik) else {
        bail!("not a valid CIK: {cik:?}");
      };
      let history = warehouse.company_history(cik.clone()).await?;
      if history.is_empty() {
        bail!("no company with CIK {cik}");
      }
      for v in history {
        let until = if v.is_current { "current".to_owned() } else { v.valid_to.to_rfc3339() };
        println!(
          "#{:<6} {} → {}  {} (SIC {})",
          v.company_id,
          v.valid_from.to_rfc3339(),
          until,
          v.company.attrs.name,
          v.company.attrs.sic.as_deref().unwrap_or("-"),
        );
      }
    }
  }

  Ok(())
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}

fn print_run(summary: &RunSummary) {
  let dims = &summary.dimensions;
  let facts = &summary.facts;
  let dropped = facts.tally.dropped;

  println!("run {}", summary.run_id);
  println!("  load timestamp   {}", dims.load_ts.to_rfc3339());
  println!(
    "  companies        {} new, {} superseded, {} duplicate rows ({} conflicting)",
    dims.written.companies_inserted,
    dims.written.companies_superseded,
    dims.report.companies.duplicates,
    dims.report.companies.conflicts,
  );
  println!("  filings          {} new", dims.written.filings_inserted);
  println!("  metrics          {} new", dims.written.metrics_inserted);
  println!("  statements       {} new", dims.written.statements_inserted);
  println!("  dates            {} new", dims.written.dates_inserted);
  println!(
    "  facts            {} loaded from {} rows in {} chunks ({} incomplete)",
    facts.committed, facts.tally.read, facts.chunks, facts.tally.incomplete,
  );
  println!(
    "  dropped          {} (no presentation {}, no submission {}, company {}, filing {}, \
     metric {}, statement {}, date {})",
    dropped.total(),
    dropped.no_presentation,
    dropped.no_submission,
    dropped.company,
    dropped.filing,
    dropped.metric,
    dropped.statement,
    dropped.date,
  );
}
