use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const NO_COVER_MANIFEST: &str = "no_cover_available_isbns.csv";
pub const PLACEHOLDER_MANIFEST: &str = "placeholder_image_isbns.csv";
pub const NOT_FOUND_MANIFEST: &str = "not_found_isbns.csv";
pub const FAILED_MANIFEST: &str = "failed_isbns.csv";

/// Terminal classification of one ISBN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Saved(String),
    NoCoverAvailable,
    PlaceholderOnly,
    NotFoundInCatalog,
}

impl Outcome {
    pub fn bucket(&self) -> &'static str {
        match self {
            Outcome::Saved(_) => "saved",
            Outcome::NoCoverAvailable => "no_cover",
            Outcome::PlaceholderOnly => "placeholder_only",
            Outcome::NotFoundInCatalog => "not_found",
        }
    }
}

#[derive(Debug, Error)]
pub enum RecorderError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

/// Run-scoped accumulator. ISBNs are kept in arrival order and never
/// deduplicated.
#[derive(Debug)]
pub struct OutcomeRecorder {
    total_input: usize,
    started_at: DateTime<Utc>,
    saved: Vec<(String, String)>,
    no_cover: Vec<String>,
    placeholder_only: Vec<String>,
    not_found: Vec<String>,
    failed: Vec<(String, String)>,
}

impl OutcomeRecorder {
    pub fn new(total_input: usize) -> Self {
        Self {
            total_input,
            started_at: Utc::now(),
            saved: Vec::new(),
            no_cover: Vec::new(),
            placeholder_only: Vec::new(),
            not_found: Vec::new(),
            failed: Vec::new(),
        }
    }

    pub fn record(&mut self, isbn: &str, outcome: Outcome) {
        crate::metrics::outcome_recorded(outcome.bucket());
        let isbn = isbn.to_string();
        match outcome {
            Outcome::Saved(filename) => self.saved.push((isbn, filename)),
            Outcome::NoCoverAvailable => self.no_cover.push(isbn),
            Outcome::PlaceholderOnly => self.placeholder_only.push(isbn),
            Outcome::NotFoundInCatalog => self.not_found.push(isbn),
        }
    }

    /// ISBNs whose processing errored out (retries spent or fatal error).
    pub fn record_failure(&mut self, isbn: &str, reason: impl Into<String>) {
        crate::metrics::outcome_recorded("failed");
        self.failed.push((isbn.to_string(), reason.into()));
    }

    pub fn saved(&self) -> &[(String, String)] {
        &self.saved
    }

    pub fn no_cover(&self) -> &[String] {
        &self.no_cover
    }

    pub fn placeholder_only(&self) -> &[String] {
        &self.placeholder_only
    }

    pub fn not_found(&self) -> &[String] {
        &self.not_found
    }

    pub fn failed(&self) -> &[(String, String)] {
        &self.failed
    }

    pub fn has_failures(&self) -> bool {
        !(self.no_cover.is_empty()
            && self.placeholder_only.is_empty()
            && self.not_found.is_empty()
            && self.failed.is_empty())
    }

    /// Builds the run summary, taking the saved count from the files actually
    /// present in `output_dir`.
    pub fn summarize(&self, output_dir: &Path) -> Result<RunSummary, RecorderError> {
        let saved = count_cover_files(output_dir)?;
        let classified =
            saved + self.placeholder_only.len() + self.no_cover.len() + self.not_found.len();
        Ok(RunSummary {
            started_at: self.started_at,
            finished_at: Utc::now(),
            total_input: self.total_input,
            saved,
            saved_this_run: self.saved.len(),
            placeholder_only: self.placeholder_only.len(),
            no_cover: self.no_cover.len(),
            not_found: self.not_found.len(),
            failed: self.failed.len(),
            unaccounted: self.total_input as i64 - classified as i64,
        })
    }

    /// Writes one manifest per non-empty failure bucket and returns the paths
    /// written.
    pub fn write_manifests(&self, dir: &Path) -> Result<Vec<PathBuf>, RecorderError> {
        let failed: Vec<String> = self.failed.iter().map(|(isbn, _)| isbn.clone()).collect();
        let buckets: [(&str, &[String]); 4] = [
            (NO_COVER_MANIFEST, self.no_cover.as_slice()),
            (PLACEHOLDER_MANIFEST, self.placeholder_only.as_slice()),
            (NOT_FOUND_MANIFEST, self.not_found.as_slice()),
            (FAILED_MANIFEST, failed.as_slice()),
        ];
        let mut written = Vec::new();
        for (name, isbns) in buckets {
            if isbns.is_empty() {
                continue;
            }
            let path = dir.join(name);
            write_isbn_manifest(&path, isbns)?;
            written.push(path);
        }
        Ok(written)
    }
}

fn write_isbn_manifest(path: &Path, isbns: &[String]) -> Result<(), RecorderError> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["isbn"])?;
    for isbn in isbns {
        writer.write_record([isbn])?;
    }
    writer.flush()?;
    Ok(())
}

fn count_cover_files(dir: &Path) -> Result<usize, RecorderError> {
    if !dir.exists() {
        return Ok(0);
    }
    let mut count = 0;
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let is_cover = entry
            .path()
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("jpg"));
        if is_cover && entry.file_type()?.is_file() {
            count += 1;
        }
    }
    Ok(count)
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub total_input: usize,
    /// Cover files present in the output directory.
    pub saved: usize,
    pub saved_this_run: usize,
    pub placeholder_only: usize,
    pub no_cover: usize,
    pub not_found: usize,
    pub failed: usize,
    /// `total_input - (saved + placeholder_only + no_cover + not_found)`.
    pub unaccounted: i64,
}

impl RunSummary {
    /// True when every ISBN landed in a bucket, or the only gap is ISBNs
    /// that errored out.
    pub fn is_consistent(&self) -> bool {
        self.unaccounted == self.failed as i64
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let elapsed = self.finished_at - self.started_at;
        writeln!(f, "Run summary ({}s)", elapsed.num_seconds())?;
        writeln!(f, "  total ISBNs:          {}", self.total_input)?;
        writeln!(f, "  covers saved:         {}", self.saved)?;
        writeln!(f, "  placeholder only:     {}", self.placeholder_only)?;
        writeln!(f, "  no cover available:   {}", self.no_cover)?;
        writeln!(f, "  not found in catalog: {}", self.not_found)?;
        writeln!(f, "  failed:               {}", self.failed)?;
        write!(f, "  unaccounted:          {}", self.unaccounted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(dir: &Path, name: &str) {
        std::fs::write(dir.join(name), b"jpeg").expect("write");
    }

    #[test]
    fn buckets_partition_input() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut recorder = OutcomeRecorder::new(5);
        touch(dir.path(), "dune_1.jpg");
        recorder.record("1", Outcome::Saved("dune_1.jpg".into()));
        recorder.record("2", Outcome::NoCoverAvailable);
        recorder.record("3", Outcome::PlaceholderOnly);
        recorder.record("4", Outcome::NotFoundInCatalog);
        recorder.record("4", Outcome::NotFoundInCatalog);

        let summary = recorder.summarize(dir.path()).expect("summary");
        assert_eq!(summary.saved, 1);
        assert_eq!(summary.not_found, 2);
        assert_eq!(summary.unaccounted, 0);
        assert!(summary.is_consistent());
        assert_eq!(recorder.not_found(), ["4".to_string(), "4".to_string()]);
    }

    #[test]
    fn saved_count_comes_from_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut recorder = OutcomeRecorder::new(1);
        recorder.record("1", Outcome::Saved("lost_1.jpg".into()));

        let summary = recorder.summarize(dir.path()).expect("summary");
        assert_eq!(summary.saved, 0);
        assert_eq!(summary.saved_this_run, 1);
        assert_eq!(summary.unaccounted, 1);
        assert!(!summary.is_consistent());
    }

    #[test]
    fn failures_surface_as_unaccounted() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut recorder = OutcomeRecorder::new(2);
        recorder.record("1", Outcome::NoCoverAvailable);
        recorder.record_failure("2", "catalog unreachable");

        let summary = recorder.summarize(dir.path()).expect("summary");
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.unaccounted, 1);
        assert!(summary.is_consistent());
    }

    #[test]
    fn manifests_only_for_non_empty_buckets() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut recorder = OutcomeRecorder::new(3);
        recorder.record("111", Outcome::NotFoundInCatalog);
        recorder.record("222", Outcome::NotFoundInCatalog);
        recorder.record("333", Outcome::Saved("x_333.jpg".into()));

        let written = recorder.write_manifests(dir.path()).expect("manifests");
        assert_eq!(written, vec![dir.path().join(NOT_FOUND_MANIFEST)]);
        let body = std::fs::read_to_string(dir.path().join(NOT_FOUND_MANIFEST)).expect("read");
        assert_eq!(body, "isbn\n111\n222\n");
        assert!(!dir.path().join(NO_COVER_MANIFEST).exists());
        assert!(!dir.path().join(PLACEHOLDER_MANIFEST).exists());
    }

    #[test]
    fn nothing_written_without_failures() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut recorder = OutcomeRecorder::new(1);
        recorder.record("1", Outcome::Saved("a_1.jpg".into()));
        assert!(!recorder.has_failures());
        assert!(recorder.write_manifests(dir.path()).expect("manifests").is_empty());
    }

    #[test]
    fn summary_renders_counts() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut recorder = OutcomeRecorder::new(1);
        recorder.record("1", Outcome::PlaceholderOnly);
        let text = recorder.summarize(dir.path()).expect("summary").to_string();
        assert!(text.contains("placeholder only:     1"));
        assert!(text.contains("unaccounted:          0"));
    }
}
