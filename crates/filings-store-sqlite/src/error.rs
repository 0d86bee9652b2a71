//! Error type for `filings-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  /// A commit (or a statement inside it) was rejected. Nothing from `unit`
  /// was persisted; earlier units are unaffected.
  #[error("{unit} transaction failed: {source}")]
  Transaction {
    unit:   String,
    #[source]
    source: tokio_rusqlite::Error,
  },

  /// An SCD2 close found no current version of the company to close.
  #[error("company {0} has no current version to close")]
  NoCurrentVersion(String),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("invalid stored key in {table}: {value:?}")]
  InvalidKey { table: &'static str, value: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
