//! Error type for `filings-silver`.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// An expected upstream dataset is absent. Fatal before any write.
  #[error("source dataset missing: {}", .0.display())]
  SourceMissing(PathBuf),

  #[error("reading {}: {source}", path.display())]
  Csv {
    path:   PathBuf,
    #[source]
    source: csv::Error,
  },

  #[error("chunk size must be at least 1")]
  ZeroChunkSize,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
