//! Job settings, layered from an optional TOML file and `FILINGS__*`
//! environment variables.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use filings_core::keys::StatementGrain;
use filings_silver::SilverLayout;
use serde::Deserialize;

use crate::{Error, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EtlConfig {
  pub warehouse_path: PathBuf,
  /// Numeric-fact rows per chunk. Affects memory and commit granularity
  /// only, never the loaded result.
  pub chunk_size:     usize,
  pub silver:         SilverConfig,
  pub dates:          DatesConfig,
  pub statements:     StatementsConfig,
}

impl Default for EtlConfig {
  fn default() -> Self {
    Self {
      warehouse_path: PathBuf::from("data/warehouse.db"),
      chunk_size:     100_000,
      silver:         SilverConfig::default(),
      dates:          DatesConfig::default(),
      statements:     StatementsConfig::default(),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SilverConfig {
  pub dir:       PathBuf,
  pub extension: String,
  /// Must be exactly one byte.
  pub delimiter: String,
}

impl Default for SilverConfig {
  fn default() -> Self {
    Self {
      dir:       PathBuf::from("data/silver/financials"),
      extension: "tsv".into(),
      delimiter: "\t".into(),
    }
  }
}

impl SilverConfig {
  pub fn layout(&self) -> Result<SilverLayout> {
    let [delimiter] = self.delimiter.as_bytes() else {
      return Err(Error::Config(format!(
        "silver.delimiter must be a single byte, got {:?}",
        self.delimiter
      )));
    };
    Ok(SilverLayout::new(&self.dir, self.extension.as_str(), *delimiter))
  }
}

/// How the date dimension is populated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateMode {
  /// Every day between `start` and `end`.
  #[default]
  Range,
  /// The distinct dates present in the numeric facts.
  Observed,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatesConfig {
  pub mode:                  DateMode,
  pub start:                 NaiveDate,
  pub end:                   NaiveDate,
  pub fiscal_year_end_month: Option<u32>,
}

impl Default for DatesConfig {
  fn default() -> Self {
    Self {
      mode:                  DateMode::Range,
      start:                 NaiveDate::from_ymd_opt(2005, 1, 1).unwrap_or_default(),
      end:                   NaiveDate::from_ymd_opt(2025, 12, 31).unwrap_or_default(),
      fiscal_year_end_month: None,
    }
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StatementsConfig {
  pub grain: StatementGrain,
}

impl EtlConfig {
  /// Read `path` (if it exists) and the environment.
  pub fn load(path: &Path) -> Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("FILINGS").separator("__"))
      .build()
      .map_err(|e| Error::Config(e.to_string()))?;

    let mut cfg: Self = settings
      .try_deserialize()
      .map_err(|e| Error::Config(e.to_string()))?;
    cfg.warehouse_path = expand_tilde(&cfg.warehouse_path);
    cfg.silver.dir = expand_tilde(&cfg.silver.dir);
    cfg.validate()?;
    Ok(cfg)
  }

  pub fn validate(&self) -> Result<()> {
    if self.chunk_size == 0 {
      return Err(Error::Config("chunk_size must be at least 1".into()));
    }
    self.silver.layout()?;
    Ok(())
  }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
