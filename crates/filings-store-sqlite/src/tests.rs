//! Integration tests for `SqliteWarehouse` against an in-memory database.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use filings_core::{
  dimension::{Company, CompanyAttrs, DateRow, Filing, Metric, Statement},
  fact::FactRecord,
  keys::{Accession, Cik, MetricKey, StatementGrain, StatementKey},
  resolve::{Candidates, DimensionPlan, DimensionState, plan},
  scd::{Transition, open_end},
  store::Warehouse,
};

use crate::{Error, SqliteWarehouse};

async fn warehouse() -> SqliteWarehouse {
  SqliteWarehouse::open_in_memory()
    .await
    .expect("in-memory warehouse")
}

fn cik(raw: &str) -> Cik { Cik::parse(raw).unwrap() }

fn company(raw_cik: &str, name: &str) -> Company {
  Company {
    cik:                      cik(raw_cik),
    attrs:                    CompanyAttrs { name: name.into(), sic: None },
    country_of_incorporation: Some("US".into()),
    country_of_business:      None,
  }
}

/// A load timestamp `day` days into 2024, at whole-second precision so it
/// survives the microsecond encoding unchanged.
fn at(day: i64) -> DateTime<Utc> {
  DateTime::parse_from_rfc3339("2024-01-01T06:00:00Z").unwrap().with_timezone(&Utc) + Duration::days(day)
}

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate { NaiveDate::from_ymd_opt(y, m, d).unwrap() }

fn candidates(companies: Vec<Company>) -> Candidates {
  Candidates {
    filings: vec![Filing {
      accession:        Accession::parse("0000100-24-000001").unwrap(),
      cik:              cik("100"),
      form_type:        "10-K".into(),
      period_of_report: Some(ymd(2023, 12, 31)),
      date_filed:       Some(ymd(2024, 2, 15)),
    }],
    metrics: vec![Metric {
      key:      MetricKey::parse("Revenues", "us-gaap/2023").unwrap(),
      label:    Some("Revenues".into()),
      datatype: Some("monetary".into()),
      iord:     Some("D".into()),
    }],
    statements: vec![
      Statement::new(StatementKey::parse(StatementGrain::CodeAndLabel, "IS", Some("Revenue")).unwrap()),
      Statement::new(StatementKey::parse(StatementGrain::Code, "BS", None).unwrap()),
    ],
    dates: vec![DateRow::new(ymd(2023, 12, 31), None)],
    companies,
    ..Default::default()
  }
}

async fn load(w: &SqliteWarehouse, companies: Vec<Company>, load_ts: DateTime<Utc>) -> DimensionPlan {
  let state = w.dimension_state().await.unwrap();
  let plan = plan(candidates(companies), &state, load_ts);
  w.apply_dimensions(plan.clone()).await.unwrap();
  plan
}

fn fact(snapshot: &filings_core::snapshot::KeySnapshot, value: f64) -> FactRecord {
  FactRecord {
    company_id:   snapshot.company(&cik("100")).unwrap(),
    filing_id:    *snapshot.filings.values().next().unwrap(),
    metric_id:    *snapshot.metrics.values().next().unwrap(),
    statement_id: *snapshot.statements.values().next().unwrap(),
    date_id:      *snapshot.dates.values().next().unwrap(),
    value,
    unit:         Some("USD".into()),
    footnote:     None,
  }
}

// ─── Dimensions ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn first_load_inserts_every_dimension() {
  let w = warehouse().await;
  load(&w, vec![company("100", "Acme")], Utc::now()).await;

  let state = w.dimension_state().await.unwrap();
  assert_eq!(state.companies.len(), 1);
  assert_eq!(state.companies[&cik("100")].name, "Acme");
  assert_eq!(state.filings.len(), 1);
  assert_eq!(state.metrics.len(), 1);
  assert_eq!(state.statements.len(), 2);
  assert!(state.statements.contains(&StatementKey { code: "BS".into(), label: None }));
  assert_eq!(state.dates.len(), 1);
}

#[tokio::test]
async fn changed_company_is_versioned() {
  let w = warehouse().await;
  let t0 = at(0);
  let t1 = at(1);

  load(&w, vec![company("100", "Acme")], t0).await;
  let plan = load(&w, vec![company("100", "Acme Corp")], t1).await;
  assert_eq!(plan.transitions.len(), 1);

  let history = w.company_history(cik("0100")).await.unwrap();
  assert_eq!(history.len(), 2);

  let (old, new) = (&history[0], &history[1]);
  assert_eq!(old.company.attrs.name, "Acme");
  assert!(!old.is_current);
  assert_eq!(old.valid_to, t1);
  assert_eq!(new.company.attrs.name, "Acme Corp");
  assert!(new.is_current);
  assert_eq!(new.valid_from, t1);
  assert_eq!(new.valid_to, open_end());
  assert_eq!(new.company.country_of_incorporation.as_deref(), Some("US"));
}

#[tokio::test]
async fn one_current_version_per_company() {
  let w = warehouse().await;
  for (day, name) in [(0, "Acme"), (1, "Acme Corp"), (2, "Acme Inc"), (3, "Acme Inc")] {
    load(&w, vec![company("100", name), company("200", "Globex")], at(day)).await;
  }

  let report = w.integrity().await.unwrap();
  assert!(report.current_violations.is_empty());
  assert_eq!(w.company_history(cik("100")).await.unwrap().len(), 3);
  assert_eq!(w.company_history(cik("200")).await.unwrap().len(), 1);
}

#[tokio::test]
async fn rerun_with_same_sources_is_a_no_op() {
  let w = warehouse().await;
  load(&w, vec![company("100", "Acme")], Utc::now()).await;
  let before = w.key_snapshot().await.unwrap();

  let state = w.dimension_state().await.unwrap();
  let second = plan(candidates(vec![company("100", "Acme")]), &state, Utc::now());
  assert!(second.is_empty());
  let write = w.apply_dimensions(second).await.unwrap();
  assert_eq!(write, Default::default());

  let after = w.key_snapshot().await.unwrap();
  assert_eq!(before.companies, after.companies);
  assert_eq!(before.statements, after.statements);
}

#[tokio::test]
async fn snapshot_maps_companies_to_current_version() {
  let w = warehouse().await;
  load(&w, vec![company("100", "Acme")], at(0)).await;
  let old_id = w.key_snapshot().await.unwrap().company(&cik("100")).unwrap();

  load(&w, vec![company("100", "Acme Corp")], at(1)).await;
  let snapshot = w.key_snapshot().await.unwrap();
  let new_id = snapshot.company(&cik("100")).unwrap();

  assert_ne!(old_id, new_id);
  assert_eq!(snapshot.companies.len(), 1);
}

#[tokio::test]
async fn failed_transition_rolls_back_every_dimension() {
  let w = warehouse().await;
  let load_ts = Utc::now();

  // A transition for a company that was never loaded has nothing to close;
  // the insert of company 100 ahead of it must not survive.
  let mut bad = plan(candidates(vec![company("100", "Acme")]), &DimensionState::default(), load_ts);
  bad.transitions.push(Transition::new(company("999", "Ghost"), load_ts));

  let err = w.apply_dimensions(bad).await.unwrap_err();
  assert!(matches!(err, Error::Transaction { ref unit, .. } if unit == "dimensions"));

  let state = w.dimension_state().await.unwrap();
  assert!(state.companies.is_empty());
  assert!(state.filings.is_empty());
  assert!(state.metrics.is_empty());
  assert!(state.statements.is_empty());
  assert!(state.dates.is_empty());
}

// ─── Facts ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn facts_are_cleared_then_inserted_per_chunk() {
  let w = warehouse().await;
  load(&w, vec![company("100", "Acme")], Utc::now()).await;
  let snapshot = w.key_snapshot().await.unwrap();

  assert_eq!(w.insert_facts(0, vec![fact(&snapshot, 1.0), fact(&snapshot, 2.0)]).await.unwrap(), 2);
  assert_eq!(w.insert_facts(1, vec![fact(&snapshot, 3.0)]).await.unwrap(), 1);
  assert_eq!(w.fact_count().await.unwrap(), 3);

  assert_eq!(w.clear_facts().await.unwrap(), 3);
  assert_eq!(w.fact_count().await.unwrap(), 0);
  assert_eq!(w.insert_facts(0, vec![]).await.unwrap(), 0);
}

#[tokio::test]
async fn integrity_reports_orphans() {
  let w = warehouse().await;
  load(&w, vec![company("100", "Acme")], Utc::now()).await;
  let snapshot = w.key_snapshot().await.unwrap();

  w.insert_facts(0, vec![fact(&snapshot, 1.0)]).await.unwrap();
  let clean = w.integrity().await.unwrap();
  assert!(clean.is_clean());
  assert_eq!(clean.facts, 1);

  let mut orphan = fact(&snapshot, 2.0);
  orphan.metric_id = 9_999;
  orphan.date_id = 9_999;
  w.insert_facts(1, vec![orphan]).await.unwrap();

  let report = w.integrity().await.unwrap();
  assert!(!report.is_clean());
  assert_eq!(report.facts, 2);
  assert_eq!(report.orphans.metric, 1);
  assert_eq!(report.orphans.date, 1);
  assert_eq!(report.orphans.company, 0);
  assert_eq!(report.orphans.total(), 2);
}

#[tokio::test]
async fn integrity_on_empty_warehouse_is_clean() {
  let report = warehouse().await.integrity().await.unwrap();
  assert!(report.is_clean());
  assert_eq!(report.facts, 0);
}

#[tokio::test]
async fn top_companies_ranks_by_total_value() {
  let w = warehouse().await;
  load(&w, vec![company("100", "Acme"), company("200", "Globex")], Utc::now()).await;
  let snapshot = w.key_snapshot().await.unwrap();

  let mut globex = fact(&snapshot, 50.0);
  globex.company_id = snapshot.company(&cik("200")).unwrap();
  w.insert_facts(0, vec![fact(&snapshot, 10.0), fact(&snapshot, 15.0), globex]).await.unwrap();

  let top = w.top_companies(10).await.unwrap();
  assert_eq!(top.len(), 2);
  assert_eq!(top[0].cik, cik("200"));
  assert_eq!(top[0].name, "Globex");
  assert_eq!(top[1].facts, 2);
  assert_eq!(top[1].total_value, 25.0);

  assert_eq!(w.top_companies(1).await.unwrap().len(), 1);
}
