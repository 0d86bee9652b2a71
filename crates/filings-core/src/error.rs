//! Error types for `filings-core`.

use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("date range is empty: {start} is after {end}")]
  EmptyDateRange { start: NaiveDate, end: NaiveDate },

  #[error("fiscal year end month must be 1-12, got {0}")]
  InvalidFiscalMonth(u32),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
