//! [`SqliteWarehouse`], the SQLite implementation of [`Warehouse`].

use std::path::Path;

use filings_core::{
  dimension::{DateRow, Filing, Metric, Statement},
  fact::FactRecord,
  keys::Cik,
  resolve::{DimensionPlan, DimensionState},
  scd::{CompanyVersion, OpenVersion},
  snapshot::KeySnapshot,
  store::{CompanyTotal, CurrentViolation, DimensionWrite, IntegrityReport, OrphanCounts, Warehouse},
};
use rusqlite::Transaction;

use crate::{
  Error, Result,
  encode::{
    RawCompanyVersion, RawKeys, decode_cik, encode_date, encode_dt, encode_label,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// The filings warehouse backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteWarehouse {
  conn: tokio_rusqlite::Connection,
}

impl SqliteWarehouse {
  /// Open (or create) a warehouse at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let warehouse = Self { conn };
    warehouse.init_schema().await?;
    Ok(warehouse)
  }

  /// Open an in-memory warehouse, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let warehouse = Self { conn };
    warehouse.init_schema().await?;
    Ok(warehouse)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Read every natural key with its surrogate key.
  async fn raw_keys(&self) -> Result<RawKeys> {
    let raw = self
      .conn
      .call(|conn| {
        let mut keys = RawKeys::default();

        let mut stmt = conn.prepare(
          "SELECT company_id, cik, name, sic FROM company_dim WHERE is_current = 1",
        )?;
        keys.companies = stmt
          .query_map([], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)))?
          .collect::<rusqlite::Result<_>>()?;

        let mut stmt = conn.prepare("SELECT filing_id, accession FROM filing_dim")?;
        keys.filings = stmt
          .query_map([], |r| Ok((r.get(0)?, r.get(1)?)))?
          .collect::<rusqlite::Result<_>>()?;

        let mut stmt = conn.prepare("SELECT metric_id, tag, version FROM metric_dim")?;
        keys.metrics = stmt
          .query_map([], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)))?
          .collect::<rusqlite::Result<_>>()?;

        let mut stmt = conn.prepare("SELECT statement_id, code, label FROM statement_dim")?;
        keys.statements = stmt
          .query_map([], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)))?
          .collect::<rusqlite::Result<_>>()?;

        let mut stmt = conn.prepare("SELECT date_id, date FROM date_dim")?;
        keys.dates = stmt
          .query_map([], |r| Ok((r.get(0)?, r.get(1)?)))?
          .collect::<rusqlite::Result<_>>()?;

        Ok(keys)
      })
      .await?;
    Ok(raw)
  }
}

// ─── Row writers ─────────────────────────────────────────────────────────────

fn insert_company(tx: &Transaction<'_>, version: &OpenVersion) -> rusqlite::Result<usize> {
  let company = &version.company;
  tx.prepare_cached(
    "INSERT INTO company_dim
       (cik, name, sic, country_of_incorporation, country_of_business,
        valid_from, valid_to, is_current)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 1)",
  )?
  .execute(rusqlite::params![
    company.cik.as_str(),
    company.attrs.name,
    company.attrs.sic,
    company.country_of_incorporation,
    company.country_of_business,
    encode_dt(version.valid_from),
    encode_dt(version.valid_to),
  ])
}

fn insert_filing(tx: &Transaction<'_>, filing: &Filing) -> rusqlite::Result<usize> {
  tx.prepare_cached(
    "INSERT INTO filing_dim (accession, cik, form_type, period_of_report, date_filed)
     VALUES (?1, ?2, ?3, ?4, ?5)",
  )?
  .execute(rusqlite::params![
    filing.accession.as_str(),
    filing.cik.as_str(),
    filing.form_type,
    filing.period_of_report.map(encode_date),
    filing.date_filed.map(encode_date),
  ])
}

fn insert_metric(tx: &Transaction<'_>, metric: &Metric) -> rusqlite::Result<usize> {
  tx.prepare_cached(
    "INSERT INTO metric_dim (tag, version, label, datatype, iord) VALUES (?1, ?2, ?3, ?4, ?5)",
  )?
  .execute(rusqlite::params![
    metric.key.tag,
    metric.key.version,
    metric.label,
    metric.datatype,
    metric.iord,
  ])
}

fn insert_statement(tx: &Transaction<'_>, statement: &Statement) -> rusqlite::Result<usize> {
  tx.prepare_cached("INSERT INTO statement_dim (code, label, name) VALUES (?1, ?2, ?3)")?
    .execute(rusqlite::params![
      statement.key.code,
      encode_label(statement.key.label.as_deref()),
      statement.kind.as_ref(),
    ])
}

fn insert_date(tx: &Transaction<'_>, row: &DateRow) -> rusqlite::Result<usize> {
  tx.prepare_cached(
    "INSERT INTO date_dim (date, year, month, day, quarter, fiscal_year)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
  )?
  .execute(rusqlite::params![
    encode_date(row.date),
    row.year,
    row.month,
    row.day,
    row.quarter,
    row.fiscal_year,
  ])
}

/// Write the whole plan inside `tx`. Every SCD2 close must hit exactly the
/// one current row of its company.
fn write_plan(tx: &Transaction<'_>, plan: &DimensionPlan) -> tokio_rusqlite::Result<DimensionWrite> {
  let mut write = DimensionWrite::default();

  for version in &plan.companies {
    write.companies_inserted += insert_company(tx, version)?;
  }

  for transition in &plan.transitions {
    let cik = transition.successor.company.cik.as_str();
    let closed = tx
      .prepare_cached(
        "UPDATE company_dim SET valid_to = ?1, is_current = 0 WHERE cik = ?2 AND is_current = 1",
      )?
      .execute(rusqlite::params![encode_dt(transition.close_at), cik])?;
    if closed != 1 {
      return Err(tokio_rusqlite::Error::Other(Box::new(Error::NoCurrentVersion(
        cik.to_owned(),
      ))));
    }
    write.companies_superseded += closed;
    insert_company(tx, &transition.successor)?;
  }

  for filing in &plan.filings {
    write.filings_inserted += insert_filing(tx, filing)?;
  }
  for metric in &plan.metrics {
    write.metrics_inserted += insert_metric(tx, metric)?;
  }
  for statement in &plan.statements {
    write.statements_inserted += insert_statement(tx, statement)?;
  }
  for row in &plan.dates {
    write.dates_inserted += insert_date(tx, row)?;
  }

  Ok(write)
}

fn count(n: i64) -> u64 { u64::try_from(n).unwrap_or(0) }

// ─── Warehouse impl ──────────────────────────────────────────────────────────

impl Warehouse for SqliteWarehouse {
  type Error = Error;

  // ── Dimensions ────────────────────────────────────────────────────────────

  async fn dimension_state(&self) -> Result<DimensionState> {
    self.raw_keys().await?.into_state()
  }

  async fn apply_dimensions(&self, plan: DimensionPlan) -> Result<DimensionWrite> {
    if plan.is_empty() {
      tracing::debug!("dimension plan is empty; nothing to commit");
      return Ok(DimensionWrite::default());
    }

    let write = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let write = write_plan(&tx, &plan)?;
        tx.commit()?;
        Ok(write)
      })
      .await
      .map_err(|source| Error::Transaction { unit: "dimensions".into(), source })?;

    tracing::info!(
      companies = write.companies_inserted,
      superseded = write.companies_superseded,
      filings = write.filings_inserted,
      metrics = write.metrics_inserted,
      statements = write.statements_inserted,
      dates = write.dates_inserted,
      "committed dimensions"
    );
    Ok(write)
  }

  async fn key_snapshot(&self) -> Result<KeySnapshot> {
    self.raw_keys().await?.into_snapshot()
  }

  // ── Facts ─────────────────────────────────────────────────────────────────

  async fn clear_facts(&self) -> Result<u64> {
    let removed = self
      .conn
      .call(|conn| Ok(conn.execute("DELETE FROM fact_financials", [])?))
      .await
      .map_err(|source| Error::Transaction { unit: "fact clear".into(), source })?;
    Ok(removed as u64)
  }

  async fn insert_facts(&self, chunk_index: usize, facts: Vec<FactRecord>) -> Result<usize> {
    let inserted = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut inserted = 0;
        {
          let mut stmt = tx.prepare_cached(
            "INSERT INTO fact_financials
               (company_id, filing_id, metric_id, statement_id, date_id, value, unit, footnote)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
          )?;
          for fact in &facts {
            inserted += stmt.execute(rusqlite::params![
              fact.company_id,
              fact.filing_id,
              fact.metric_id,
              fact.statement_id,
              fact.date_id,
              fact.value,
              fact.unit,
              fact.footnote,
            ])?;
          }
        }
        tx.commit()?;
        Ok(inserted)
      })
      .await
      .map_err(|source| Error::Transaction { unit: format!("fact chunk {chunk_index}"), source })?;

    tracing::debug!(chunk = chunk_index, inserted, "committed fact chunk");
    Ok(inserted)
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn company_history(&self, cik: Cik) -> Result<Vec<CompanyVersion>> {
    let raws: Vec<RawCompanyVersion> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {} FROM company_dim WHERE cik = ?1 ORDER BY company_id",
          RawCompanyVersion::COLUMNS
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![cik.as_str()], RawCompanyVersion::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawCompanyVersion::into_version).collect()
  }

  async fn fact_count(&self) -> Result<u64> {
    let n: i64 = self
      .conn
      .call(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM fact_financials", [], |r| r.get(0))?))
      .await?;
    Ok(count(n))
  }

  async fn integrity(&self) -> Result<IntegrityReport> {
    let (totals, violations): ([i64; 6], Vec<(String, i64)>) = self
      .conn
      .call(|conn| {
        let totals = conn.query_row(
          "SELECT COUNT(*),
                  COALESCE(SUM(c.company_id   IS NULL), 0),
                  COALESCE(SUM(fi.filing_id   IS NULL), 0),
                  COALESCE(SUM(m.metric_id    IS NULL), 0),
                  COALESCE(SUM(s.statement_id IS NULL), 0),
                  COALESCE(SUM(d.date_id      IS NULL), 0)
             FROM fact_financials f
             LEFT JOIN company_dim   c  ON c.company_id    = f.company_id
             LEFT JOIN filing_dim    fi ON fi.filing_id    = f.filing_id
             LEFT JOIN metric_dim    m  ON m.metric_id     = f.metric_id
             LEFT JOIN statement_dim s  ON s.statement_id  = f.statement_id
             LEFT JOIN date_dim      d  ON d.date_id       = f.date_id",
          [],
          |r| Ok([r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?, r.get(4)?, r.get(5)?]),
        )?;

        let mut stmt = conn.prepare(
          "SELECT cik, SUM(is_current) FROM company_dim
            GROUP BY cik HAVING SUM(is_current) != 1
            ORDER BY cik",
        )?;
        let violations = stmt
          .query_map([], |r| Ok((r.get(0)?, r.get(1)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok((totals, violations))
      })
      .await?;

    let [facts, company, filing, metric, statement, date] = totals.map(count);
    let current_violations = violations
      .into_iter()
      .map(|(cik, current)| Ok(CurrentViolation { cik: decode_cik(&cik)?, current: count(current) }))
      .collect::<Result<Vec<_>>>()?;

    Ok(IntegrityReport {
      facts,
      orphans: OrphanCounts { company, filing, metric, statement, date },
      current_violations,
    })
  }

  async fn top_companies(&self, limit: usize) -> Result<Vec<CompanyTotal>> {
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);

    let rows: Vec<(String, String, i64, f64)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT c.cik,
                  MAX(CASE WHEN c.is_current = 1 THEN c.name END),
                  COUNT(*),
                  SUM(f.value) AS total
             FROM fact_financials f
             JOIN company_dim c ON c.company_id = f.company_id
            GROUP BY c.cik
           HAVING MAX(c.is_current) = 1
            ORDER BY total DESC, c.cik
            LIMIT ?1",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![limit], |r| {
            Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    rows
      .into_iter()
      .map(|(cik, name, facts, total_value)| {
        Ok(CompanyTotal { cik: decode_cik(&cik)?, name, facts: count(facts), total_value })
      })
      .collect()
  }
}
