use crate::catalog::DEFAULT_API_ROOT;
use crate::pipeline::PipelineConfig;
use crate::placeholder::{PlaceholderDetector, PlaceholderError};
use crate::retry::RetryPolicy;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Fetches book covers for a list of ISBNs. Misses are listed in
/// no_cover_available_isbns.csv, placeholder_image_isbns.csv and
/// not_found_isbns.csv, plus failed_isbns.csv for ISBNs that errored out;
/// any of them can be fed back in as input.
#[derive(Debug, Parser)]
#[command(name = "isbn-covers", version, about)]
pub struct Cli {
    /// CSV file with an `isbn` column.
    #[arg(long, env = "COVERS_INPUT", default_value = "isbns.csv")]
    pub input: PathBuf,

    /// Directory cover images are written to.
    #[arg(long, env = "COVERS_OUTPUT_DIR", default_value = "covers")]
    pub output_dir: PathBuf,

    /// Directory the failure manifests are written to.
    #[arg(long, env = "COVERS_MANIFEST_DIR", default_value = ".")]
    pub manifest_dir: PathBuf,

    #[arg(long, env = "CATALOG_API_ROOT", default_value = DEFAULT_API_ROOT)]
    pub api_root: String,

    /// Attempts per ISBN before it is marked failed.
    #[arg(long, env = "RETRY_MAX_ATTEMPTS", default_value_t = 5)]
    pub max_attempts: u32,

    /// First backoff delay; doubles after each failed attempt.
    #[arg(long, env = "RETRY_BASE_DELAY_MS", default_value_t = 1000)]
    pub base_delay_ms: u64,

    /// Pause after every ISBN to stay under the catalog's rate limits.
    #[arg(long, env = "ISBN_PAUSE_MS", default_value_t = 500)]
    pub pause_ms: u64,

    /// SHA-256 of a known placeholder image. Repeatable.
    #[arg(
        long = "placeholder-hash",
        env = "PLACEHOLDER_HASHES",
        value_delimiter = ','
    )]
    pub placeholder_hashes: Vec<String>,

    /// File with one placeholder SHA-256 per line, e.g. placeholders.txt.
    #[arg(long, env = "PLACEHOLDER_FILE")]
    pub placeholder_file: Option<PathBuf>,

    /// Also write the run summary as JSON.
    #[arg(long)]
    pub summary_json: Option<PathBuf>,

    /// Print the SHA-256 of a local image and exit.
    #[arg(long, value_name = "IMAGE")]
    pub hash_file: Option<PathBuf>,
}

impl Cli {
    pub fn detector(&self) -> Result<PlaceholderDetector, PlaceholderError> {
        let mut detector = PlaceholderDetector::new(&self.placeholder_hashes)?;
        if let Some(path) = &self.placeholder_file {
            detector.extend_from_file(path)?;
        }
        Ok(detector)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, Duration::from_millis(self.base_delay_ms))
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            output_dir: self.output_dir.clone(),
            retry: self.retry_policy(),
            pause: Duration::from_millis(self.pause_ms),
        }
    }
}
