//! Error type for `filings-etl`.

use std::fmt;

use thiserror::Error;

/// The step of a run that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
  ReadSources,
  ResolveDimensions,
  CommitDimensions,
  KeySnapshot,
  ClearFacts,
  ReadFactChunk(usize),
  CommitFactChunk { index: usize, rows: usize },
}

impl fmt::Display for Stage {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::ReadSources => f.write_str("read sources"),
      Self::ResolveDimensions => f.write_str("resolve dimensions"),
      Self::CommitDimensions => f.write_str("commit dimensions"),
      Self::KeySnapshot => f.write_str("build key snapshot"),
      Self::ClearFacts => f.write_str("clear facts"),
      Self::ReadFactChunk(index) => write!(f, "read fact chunk {index}"),
      Self::CommitFactChunk { index, rows } => write!(f, "commit fact chunk {index} ({rows} rows)"),
    }
  }
}

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid configuration: {0}")]
  Config(String),

  #[error("{stage} failed: {source}")]
  Stage {
    stage:  Stage,
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
  },
}

impl Error {
  pub fn stage(&self) -> Option<Stage> {
    match self {
      Self::Stage { stage, .. } => Some(*stage),
      Self::Config(_) => None,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Attach the failing [`Stage`] to any error.
pub trait StageExt<T> {
  fn stage(self, stage: Stage) -> Result<T>;
}

impl<T, E> StageExt<T> for std::result::Result<T, E>
where
  E: std::error::Error + Send + Sync + 'static,
{
  fn stage(self, stage: Stage) -> Result<T> {
    self.map_err(|e| Error::Stage { stage, source: Box::new(e) })
  }
}
