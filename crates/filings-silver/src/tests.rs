//! Tests for `SilverLayout` against extracts written to a temporary
//! directory.

use std::fs;

use chrono::NaiveDate;
use tempfile::TempDir;

use crate::{Dataset, Error, SilverLayout};

const SUB: &str = "adsh\tcik\tname\tsic\tform\tperiod\tfiled\n\
                   A-1\t0000000100\tAcme\t3571\t10-K\t20231231\t20240215\n";
const TAG: &str = "tag\tversion\ttlabel\tdatatype\tiord\n\
                   Assets\tus-gaap/2023\tAssets\tmonetary\tI\n";
const PRE: &str = "adsh\treport\tline\tstmt\tinpth\ttag\tversion\tplabel\n\
                   A-1\t2\t5\tBS\t0\tAssets\tus-gaap/2023\tTotal assets\n";

fn num_file(rows: usize) -> String {
  let mut out = String::from("adsh\ttag\tversion\tcoreg\tddate\tqtrs\tuom\tvalue\tfootnote\n");
  for i in 0..rows {
    out.push_str(&format!("A-1\tAssets\tus-gaap/2023\t\t2023123{}\t0\tUSD\t{i}\t\n", i % 2));
  }
  out
}

fn layout(num_rows: usize) -> (TempDir, SilverLayout) {
  let dir = tempfile::tempdir().expect("tempdir");
  let layout = SilverLayout::new(dir.path(), "tsv", b'\t');
  fs::write(layout.path(Dataset::Submissions), SUB).unwrap();
  fs::write(layout.path(Dataset::Tags), TAG).unwrap();
  fs::write(layout.path(Dataset::Presentations), PRE).unwrap();
  fs::write(layout.path(Dataset::Numbers), num_file(num_rows)).unwrap();
  (dir, layout)
}

#[test]
fn dataset_paths_use_sec_file_stems() {
  let layout = SilverLayout::new("/silver", "tsv", b'\t');
  assert_eq!(layout.path(Dataset::Submissions).to_str(), Some("/silver/sub.tsv"));
  assert_eq!(layout.path(Dataset::Numbers).to_str(), Some("/silver/num.tsv"));
}

#[test]
fn check_reports_missing_dataset() {
  let (_dir, layout) = layout(1);
  fs::remove_file(layout.path(Dataset::Presentations)).unwrap();

  let err = layout.check().unwrap_err();
  assert!(matches!(err, Error::SourceMissing(ref p) if p.ends_with("pre.tsv")));
}

#[test]
fn small_tables_load_with_extra_columns_ignored() {
  let (_dir, layout) = layout(1);
  layout.check().unwrap();

  let tables = layout.read_tables().unwrap();
  assert_eq!(tables.submissions.len(), 1);
  assert_eq!(tables.submissions[0].company().unwrap().cik.as_str(), "100");
  assert_eq!(tables.tags.len(), 1);
  assert_eq!(tables.presentations.len(), 1);
  assert_eq!(tables.presentations[0].plabel.as_deref(), Some("Total assets"));
}

#[test]
fn numeric_facts_stream_in_bounded_chunks() {
  let (_dir, layout) = layout(5);

  let sizes: Vec<usize> = layout
    .num_chunks(2)
    .unwrap()
    .map(|chunk| chunk.unwrap().len())
    .collect();
  assert_eq!(sizes, vec![2, 2, 1]);
}

#[test]
fn empty_fact_file_yields_no_chunks() {
  let (_dir, layout) = layout(0);
  assert_eq!(layout.num_chunks(10).unwrap().count(), 0);
}

#[test]
fn empty_fields_read_as_absent() {
  let (_dir, layout) = layout(1);
  let row = layout.num_chunks(10).unwrap().next().unwrap().unwrap().remove(0);
  assert_eq!(row.footnote, None);
  assert_eq!(row.value.as_deref(), Some("0"));
}

#[test]
fn oversized_chunk_size_reads_the_whole_file() {
  let (_dir, layout) = layout(3);
  let chunks: Vec<usize> = layout
    .num_chunks(usize::MAX)
    .unwrap()
    .map(|chunk| chunk.unwrap().len())
    .collect();
  assert_eq!(chunks, vec![3]);
}

#[test]
fn tab_separated_fields_keep_literal_quotes() {
  let (_dir, layout) = layout(0);
  fs::write(
    layout.path(Dataset::Presentations),
    "adsh\ttag\tversion\tstmt\tplabel\n\
     A-1\tAssets\tus-gaap/2023\tBS\t\"Total assets\n\
     A-1\tLiabilities\tus-gaap/2023\tBS\tTotal liabilities\n",
  )
  .unwrap();

  let tables = layout.read_tables().unwrap();
  assert_eq!(tables.presentations.len(), 2);
  assert_eq!(tables.presentations[0].plabel.as_deref(), Some("\"Total assets"));
  assert_eq!(tables.presentations[1].tag.as_deref(), Some("Liabilities"));
}

#[test]
fn zero_chunk_size_is_rejected() {
  let (_dir, layout) = layout(1);
  assert!(matches!(layout.num_chunks(0), Err(Error::ZeroChunkSize)));
}

#[test]
fn observed_dates_are_distinct() {
  let (_dir, layout) = layout(4);
  let dates: Vec<NaiveDate> = layout.observed_dates(3).unwrap().into_iter().collect();
  assert_eq!(
    dates,
    vec![
      NaiveDate::from_ymd_opt(2023, 12, 30).unwrap(),
      NaiveDate::from_ymd_opt(2023, 12, 31).unwrap(),
    ]
  );
}
