//! [`SilverLayout`]: where the extracts live and how to read them.

use std::{
  collections::BTreeSet,
  fs::File,
  path::{Path, PathBuf},
};

use chrono::NaiveDate;
use filings_core::{
  keys::parse_date,
  source::{NumRow, PresentationRow, SourceTables, SubmissionRow, TagRow},
};
use serde::de::DeserializeOwned;
use strum::{AsRefStr, EnumIter, IntoEnumIterator as _};

use crate::{Error, Result};

/// The four Silver datasets, named by their file stem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, EnumIter)]
pub enum Dataset {
  #[strum(serialize = "sub")]
  Submissions,
  #[strum(serialize = "tag")]
  Tags,
  #[strum(serialize = "pre")]
  Presentations,
  #[strum(serialize = "num")]
  Numbers,
}

/// Location and format of one Silver snapshot.
#[derive(Debug, Clone)]
pub struct SilverLayout {
  pub dir:       PathBuf,
  pub extension: String,
  pub delimiter: u8,
}

impl SilverLayout {
  pub fn new(dir: impl Into<PathBuf>, extension: impl Into<String>, delimiter: u8) -> Self {
    Self {
      dir: dir.into(),
      extension: extension.into(),
      delimiter,
    }
  }

  pub fn path(&self, dataset: Dataset) -> PathBuf {
    self.dir.join(format!("{}.{}", dataset.as_ref(), self.extension))
  }

  /// Fail with [`Error::SourceMissing`] if any dataset file is absent.
  pub fn check(&self) -> Result<()> {
    for dataset in Dataset::iter() {
      let path = self.path(dataset);
      if !path.is_file() {
        return Err(Error::SourceMissing(path));
      }
    }
    Ok(())
  }

  /// Tab-separated extracts are read unquoted: SEC text fields may open
  /// with a bare `"` that must not swallow the following delimiters.
  fn reader(&self, path: &Path) -> Result<csv::Reader<File>> {
    csv::ReaderBuilder::new()
      .delimiter(self.delimiter)
      .quoting(self.delimiter != b'\t')
      .flexible(true)
      .from_path(path)
      .map_err(|source| Error::Csv { path: path.to_path_buf(), source })
  }

  fn read_all<T: DeserializeOwned>(&self, dataset: Dataset) -> Result<Vec<T>> {
    let path = self.path(dataset);
    let rows = self
      .reader(&path)?
      .into_deserialize()
      .collect::<csv::Result<Vec<T>>>()
      .map_err(|source| Error::Csv { path: path.clone(), source })?;
    tracing::debug!(dataset = dataset.as_ref(), rows = rows.len(), "loaded silver table");
    Ok(rows)
  }

  /// Load submissions, tags, and presentation links fully into memory.
  pub fn read_tables(&self) -> Result<SourceTables> {
    Ok(SourceTables {
      submissions:   self.read_all::<SubmissionRow>(Dataset::Submissions)?,
      tags:          self.read_all::<TagRow>(Dataset::Tags)?,
      presentations: self.read_all::<PresentationRow>(Dataset::Presentations)?,
    })
  }

  /// Stream the numeric facts in chunks of at most `chunk_size` rows.
  pub fn num_chunks(&self, chunk_size: usize) -> Result<NumChunks> {
    if chunk_size == 0 {
      return Err(Error::ZeroChunkSize);
    }
    let path = self.path(Dataset::Numbers);
    let rows = self.reader(&path)?.into_deserialize();
    Ok(NumChunks { path, rows, chunk_size, done: false })
  }

  /// Distinct parseable dates in the numeric facts, streamed in one pass.
  pub fn observed_dates(&self, chunk_size: usize) -> Result<BTreeSet<NaiveDate>> {
    let mut dates = BTreeSet::new();
    for chunk in self.num_chunks(chunk_size)? {
      dates.extend(chunk?.iter().filter_map(|row| row.ddate.as_deref().and_then(parse_date)));
    }
    Ok(dates)
  }
}

/// Upper bound on rows reserved ahead of reading a chunk.
const PREALLOC_ROWS: usize = 64 * 1024;

/// Cursor over the numeric-facts extract yielding bounded chunks.
///
/// Yields an error at most once; iteration ends after it.
pub struct NumChunks {
  path:       PathBuf,
  rows:       csv::DeserializeRecordsIntoIter<File, NumRow>,
  chunk_size: usize,
  done:       bool,
}

impl Iterator for NumChunks {
  type Item = Result<Vec<NumRow>>;

  fn next(&mut self) -> Option<Self::Item> {
    if self.done {
      return None;
    }

    let mut chunk = Vec::with_capacity(self.chunk_size.min(PREALLOC_ROWS));
    while chunk.len() < self.chunk_size {
      match self.rows.next() {
        Some(Ok(row)) => chunk.push(row),
        Some(Err(source)) => {
          self.done = true;
          return Some(Err(Error::Csv { path: self.path.clone(), source }));
        }
        None => {
          self.done = true;
          break;
        }
      }
    }

    (!chunk.is_empty()).then_some(Ok(chunk))
  }
}
