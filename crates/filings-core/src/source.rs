//! Silver-layer source rows.
//!
//! Field names follow the SEC financial statement data sets (`sub`, `tag`,
//! `pre`, `num`). Every field is optional at this level: a row is only turned
//! into a dimension or fact candidate once its required natural-key fields
//! canonicalize successfully.

use chrono::NaiveDate;
use serde::Deserialize;

use crate::{
  dimension::{Company, CompanyAttrs, Filing, Metric, Statement},
  keys::{
    Accession, Cik, MetricKey, StatementGrain, StatementKey, canonical_identifier, canonical_text,
    parse_date, parse_value,
  },
};

fn text(field: &Option<String>) -> Option<String> { field.as_deref().and_then(canonical_text) }

// ─── Submissions ─────────────────────────────────────────────────────────────

/// One row of the submissions extract (`sub`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SubmissionRow {
  pub adsh:       Option<String>,
  pub cik:        Option<String>,
  pub name:       Option<String>,
  pub sic:        Option<String>,
  pub countryinc: Option<String>,
  pub countryba:  Option<String>,
  pub form:       Option<String>,
  pub period:     Option<String>,
  pub filed:      Option<String>,
}

impl SubmissionRow {
  pub fn accession(&self) -> Option<Accession> { self.adsh.as_deref().and_then(Accession::parse) }

  pub fn registrant(&self) -> Option<Cik> { self.cik.as_deref().and_then(Cik::parse) }

  /// The company this submission describes; `None` without a CIK or name.
  pub fn company(&self) -> Option<Company> {
    Some(Company {
      cik:                      self.registrant()?,
      attrs:                    CompanyAttrs {
        name: text(&self.name)?,
        sic:  self.sic.as_deref().and_then(canonical_identifier),
      },
      country_of_incorporation: text(&self.countryinc),
      country_of_business:      text(&self.countryba),
    })
  }

  /// The filing this submission describes; `None` without an accession,
  /// CIK, or form type.
  pub fn filing(&self) -> Option<Filing> {
    Some(Filing {
      accession:        self.accession()?,
      cik:              self.registrant()?,
      form_type:        text(&self.form)?,
      period_of_report: self.period.as_deref().and_then(parse_date),
      date_filed:       self.filed.as_deref().and_then(parse_date),
    })
  }
}

// ─── Tags ────────────────────────────────────────────────────────────────────

/// One row of the tags extract (`tag`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TagRow {
  pub tag:      Option<String>,
  pub version:  Option<String>,
  pub tlabel:   Option<String>,
  pub datatype: Option<String>,
  pub iord:     Option<String>,
}

impl TagRow {
  pub fn metric(&self) -> Option<Metric> {
    Some(Metric {
      key:      MetricKey::parse(self.tag.as_deref()?, self.version.as_deref()?)?,
      label:    text(&self.tlabel),
      datatype: text(&self.datatype),
      iord:     text(&self.iord).map(|s| s.to_ascii_uppercase()),
    })
  }
}

// ─── Presentation links ──────────────────────────────────────────────────────

/// One row of the presentation-link extract (`pre`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PresentationRow {
  pub adsh:    Option<String>,
  pub tag:     Option<String>,
  pub version: Option<String>,
  pub stmt:    Option<String>,
  pub plabel:  Option<String>,
}

impl PresentationRow {
  /// The `(filing, metric)` pair this row classifies.
  pub fn link(&self) -> Option<(Accession, MetricKey)> {
    Some((
      self.adsh.as_deref().and_then(Accession::parse)?,
      MetricKey::parse(self.tag.as_deref()?, self.version.as_deref()?)?,
    ))
  }

  pub fn statement_key(&self, grain: StatementGrain) -> Option<StatementKey> {
    StatementKey::parse(grain, self.stmt.as_deref()?, self.plabel.as_deref())
  }

  pub fn statement(&self, grain: StatementGrain) -> Option<Statement> {
    self.statement_key(grain).map(Statement::new)
  }
}

// ─── Numeric facts ───────────────────────────────────────────────────────────

/// One row of the numeric-facts extract (`num`), as read.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NumRow {
  pub adsh:     Option<String>,
  pub tag:      Option<String>,
  pub version:  Option<String>,
  pub ddate:    Option<String>,
  pub value:    Option<String>,
  pub uom:      Option<String>,
  #[serde(alias = "foot")]
  pub footnote: Option<String>,
}

/// A numeric fact row with every required natural-key field present and
/// canonical.
#[derive(Debug, Clone, PartialEq)]
pub struct NumRecord {
  pub accession: Accession,
  pub metric:    MetricKey,
  pub date:      NaiveDate,
  pub value:     f64,
  pub unit:      Option<String>,
  pub footnote:  Option<String>,
}

impl NumRow {
  /// The canonical record, or `None` when a required field is missing or
  /// unparseable. Such rows are *incomplete*, which is distinct from a row
  /// that is complete but fails to join.
  pub fn complete(&self) -> Option<NumRecord> {
    Some(NumRecord {
      accession: self.adsh.as_deref().and_then(Accession::parse)?,
      metric:    MetricKey::parse(self.tag.as_deref()?, self.version.as_deref()?)?,
      date:      self.ddate.as_deref().and_then(parse_date)?,
      value:     self.value.as_deref().and_then(parse_value)?,
      unit:      text(&self.uom),
      footnote:  text(&self.footnote),
    })
  }
}

// ─── Small tables ────────────────────────────────────────────────────────────

/// The Silver tables small enough to hold fully in memory for a run.
#[derive(Debug, Clone, Default)]
pub struct SourceTables {
  pub submissions:   Vec<SubmissionRow>,
  pub tags:          Vec<TagRow>,
  pub presentations: Vec<PresentationRow>,
}
