//! Natural keys and the canonicalization applied before every dedup, join,
//! and lookup.
//!
//! Silver extracts mix numeric and textual renderings of the same identifier
//! (`320193`, `"0000320193"`, `320193.0`). Every key type in this module can
//! only be built through its `parse` constructor, so two renderings of one
//! identifier always compare equal and a lookup map keyed by these types can
//! never miss a row because of a type mismatch alone.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ─── Canonical forms ─────────────────────────────────────────────────────────

/// Canonical form of a numeric-looking identifier (CIK, SIC code).
///
/// Integers, including float renderings with a zero fraction, are printed as
/// plain decimal without leading zeros. Anything else is kept as trimmed
/// text. Returns `None` for blank input.
pub fn canonical_identifier(raw: &str) -> Option<String> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    return None;
  }

  let integral = match trimmed.split_once('.') {
    Some((int, frac)) if !frac.is_empty() && frac.bytes().all(|b| b == b'0') => int,
    Some(_) => return Some(trimmed.to_owned()),
    None => trimmed,
  };

  if !integral.is_empty() && integral.bytes().all(|b| b.is_ascii_digit()) {
    let stripped = integral.trim_start_matches('0');
    let canonical = if stripped.is_empty() { "0" } else { stripped };
    return Some(canonical.to_owned());
  }

  Some(trimmed.to_owned())
}

/// Canonical form of a free-text key component: trimmed, `None` when blank.
pub fn canonical_text(raw: &str) -> Option<String> {
  let trimmed = raw.trim();
  (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

/// Parse a source calendar date.
///
/// Accepts `YYYYMMDD` (optionally rendered as a float, `20231231.0`),
/// `YYYY-MM-DD`, and `YYYY-MM-DD` followed by a time component.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
  let trimmed = raw.trim();
  let compact = match trimmed.split_once('.') {
    Some((int, frac)) if frac.bytes().all(|b| b == b'0') => int,
    _ => trimmed,
  };

  if compact.len() == 8 && compact.bytes().all(|b| b.is_ascii_digit()) {
    return NaiveDate::parse_from_str(compact, "%Y%m%d").ok();
  }

  let date_part = match trimmed.char_indices().nth(10) {
    Some((idx, ' ' | 'T')) => &trimmed[..idx],
    _ => trimmed,
  };
  NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

/// Parse a reported numeric value. Non-finite values are rejected.
pub fn parse_value(raw: &str) -> Option<f64> {
  raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

// ─── Key types ───────────────────────────────────────────────────────────────

/// Registrant identifier; natural key of the company dimension.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Cik(String);

impl Cik {
  pub fn parse(raw: &str) -> Option<Self> { canonical_identifier(raw).map(Self) }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for Cik {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

/// Accession number; natural key of the filing dimension.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Accession(String);

impl Accession {
  pub fn parse(raw: &str) -> Option<Self> {
    canonical_text(raw).map(|s| Self(s.to_ascii_uppercase()))
  }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for Accession {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

/// `(tag, taxonomy version)`; natural key of the metric dimension.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct MetricKey {
  pub tag:     String,
  pub version: String,
}

impl MetricKey {
  pub fn parse(tag: &str, version: &str) -> Option<Self> {
    Some(Self {
      tag:     canonical_text(tag)?,
      version: canonical_text(version)?,
    })
  }
}

impl fmt::Display for MetricKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}/{}", self.tag, self.version)
  }
}

/// Granularity of the statement dimension's natural key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementGrain {
  /// One row per `(statement code, presented label)`.
  #[default]
  CodeAndLabel,
  /// One row per statement code; presented labels are ignored.
  Code,
}

/// Natural key of the statement dimension. `label` is always `None` under
/// [`StatementGrain::Code`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct StatementKey {
  pub code:  String,
  pub label: Option<String>,
}

impl StatementKey {
  pub fn parse(grain: StatementGrain, code: &str, label: Option<&str>) -> Option<Self> {
    let code = canonical_text(code)?.to_ascii_uppercase();
    let label = match grain {
      StatementGrain::CodeAndLabel => label.and_then(canonical_text),
      StatementGrain::Code => None,
    };
    Some(Self { code, label })
  }
}

impl fmt::Display for StatementKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.label {
      Some(label) => write!(f, "{}:{label}", self.code),
      None => f.write_str(&self.code),
    }
  }
}

#[cfg(test)]
mod tests {
  use proptest::prelude::*;

  use super::*;

  #[test]
  fn identifier_renderings_collapse() {
    for raw in ["100", " 100 ", "0000000100", "100.0", "100.000"] {
      assert_eq!(canonical_identifier(raw).as_deref(), Some("100"), "{raw:?}");
    }
    assert_eq!(canonical_identifier("0").as_deref(), Some("0"));
    assert_eq!(canonical_identifier("000").as_deref(), Some("0"));
  }

  #[test]
  fn non_numeric_identifiers_are_trimmed_only() {
    assert_eq!(canonical_identifier(" ab12 ").as_deref(), Some("ab12"));
    assert_eq!(canonical_identifier("100.5").as_deref(), Some("100.5"));
    assert_eq!(canonical_identifier("   "), None);
  }

  #[test]
  fn accession_is_trimmed_and_uppercased() {
    let a = Accession::parse(" 0000320193-23-000106x ").unwrap();
    assert_eq!(a.as_str(), "0000320193-23-000106X");
    assert!(Accession::parse("").is_none());
  }

  #[test]
  fn statement_key_respects_grain() {
    let full = StatementKey::parse(StatementGrain::CodeAndLabel, "is", Some(" Revenue ")).unwrap();
    assert_eq!(full.code, "IS");
    assert_eq!(full.label.as_deref(), Some("Revenue"));

    let coarse = StatementKey::parse(StatementGrain::Code, "is", Some("Revenue")).unwrap();
    assert_eq!(coarse.label, None);
    assert!(StatementKey::parse(StatementGrain::Code, " ", None).is_none());
  }

  #[test]
  fn dates_in_all_source_shapes() {
    let expected = NaiveDate::from_ymd_opt(2023, 9, 30);
    assert_eq!(parse_date("20230930"), expected);
    assert_eq!(parse_date("20230930.0"), expected);
    assert_eq!(parse_date("2023-09-30"), expected);
    assert_eq!(parse_date("2023-09-30 00:00:00"), expected);
    assert_eq!(parse_date("2023-09-30T00:00:00"), expected);
    assert_eq!(parse_date("20231340"), None);
    assert_eq!(parse_date("soon"), None);
  }

  #[test]
  fn values_must_be_finite() {
    assert_eq!(parse_value(" 12.5 "), Some(12.5));
    assert_eq!(parse_value("NaN"), None);
    assert_eq!(parse_value("inf"), None);
    assert_eq!(parse_value(""), None);
  }

  proptest! {
    /// A key rendered as an integer, a zero-padded string, or a float must
    /// resolve to the same lookup entry.
    #[test]
    fn cik_renderings_resolve_identically(n in 0u64..10_000_000_000, pad in 0usize..6) {
      let plain = Cik::parse(&n.to_string());
      let padded = Cik::parse(&format!("{}{n}", "0".repeat(pad)));
      let float = Cik::parse(&format!("{n}.0"));
      let spaced = Cik::parse(&format!("  {n}\t"));
      prop_assert!(plain.is_some());
      prop_assert_eq!(&plain, &padded);
      prop_assert_eq!(&plain, &float);
      prop_assert_eq!(&plain, &spaced);
    }

    #[test]
    fn canonical_identifier_is_idempotent(raw in "[ 0-9a-z.]{0,12}") {
      let once = canonical_identifier(&raw);
      let twice = once.as_deref().and_then(canonical_identifier);
      prop_assert_eq!(once, twice);
    }
  }
}
