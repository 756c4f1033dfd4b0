use crate::catalog::{Catalog, CatalogError};
use crate::outcome::{Outcome, OutcomeRecorder};
use crate::placeholder::PlaceholderDetector;
use crate::retry::{RetryPolicy, Retryable};
use crate::selector::select_image;
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;
use tokio::time::{Duration, sleep};
use tracing::{debug, error, info};

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub output_dir: PathBuf,
    pub retry: RetryPolicy,
    /// Unconditional pause after each ISBN, success or failure.
    pub pause: Duration,
}

impl PipelineConfig {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            retry: RetryPolicy::default(),
            pause: Duration::from_millis(500),
        }
    }
}

/// Resolves ISBNs to cover files, one at a time.
pub struct Pipeline<C> {
    catalog: C,
    detector: PlaceholderDetector,
    config: PipelineConfig,
}

impl<C: Catalog> Pipeline<C> {
    pub fn new(catalog: C, detector: PlaceholderDetector, config: PipelineConfig) -> Self {
        Self {
            catalog,
            detector,
            config,
        }
    }

    /// Processes every ISBN in input order, recording exactly one entry per
    /// ISBN. A failing ISBN never stops the run.
    pub async fn run(&self, isbns: &[String], recorder: &mut OutcomeRecorder) {
        let total = isbns.len();
        for (index, isbn) in isbns.iter().enumerate() {
            info!(
                target = "covers.run",
                isbn = %isbn,
                "[{}/{}] processing",
                index + 1,
                total
            );
            let started = Instant::now();
            match self.process(isbn).await {
                Ok(outcome) => {
                    info!(
                        target = "covers.run",
                        isbn = %isbn,
                        outcome = outcome.bucket(),
                        "isbn_resolved"
                    );
                    recorder.record(isbn, outcome);
                }
                Err(err) => {
                    error!(
                        target = "covers.run",
                        isbn = %isbn,
                        stage = err.stage(),
                        kind = ?err.kind(),
                        error = err.detail(),
                        "isbn_failed"
                    );
                    recorder.record_failure(isbn, err.to_string());
                }
            }
            crate::metrics::isbn_elapsed(isbn, started.elapsed().as_millis());
            sleep(self.config.pause).await;
        }
    }

    /// One ISBN, retried on network errors under the configured policy.
    pub async fn process(&self, isbn: &str) -> Result<Outcome, PipelineError> {
        self.config
            .retry
            .run(isbn, |_attempt| self.resolve(isbn))
            .await
    }

    /// A single attempt: query, walk the items in catalog order, and classify.
    /// A placeholder never ends the walk; a later item may still carry a real
    /// cover.
    pub async fn resolve(&self, isbn: &str) -> Result<Outcome, PipelineError> {
        let response = self
            .catalog
            .lookup(isbn)
            .await
            .map_err(|err| PipelineError::network("lookup", err))?;
        if response.is_empty() {
            return Ok(Outcome::NotFoundInCatalog);
        }

        let mut placeholder_seen = false;
        for (index, item) in response.items.iter().enumerate() {
            let Some(url) = select_image(item) else {
                debug!(target = "covers.pipeline", isbn, item = index, "no_image_links");
                continue;
            };
            let bytes = self
                .catalog
                .fetch_bytes(&url)
                .await
                .map_err(|err| PipelineError::network("download", err))?;
            if self.detector.is_placeholder(&bytes) {
                info!(target = "covers.pipeline", isbn, item = index, url = %url, "placeholder_image");
                placeholder_seen = true;
                continue;
            }

            let filename = cover_filename(item.title.as_deref(), isbn);
            self.persist(&filename, &bytes).await?;
            info!(
                target = "covers.pipeline",
                isbn,
                item = index,
                bytes = bytes.len(),
                file = %filename,
                "cover_saved"
            );
            return Ok(Outcome::Saved(filename));
        }

        if placeholder_seen {
            Ok(Outcome::PlaceholderOnly)
        } else {
            Ok(Outcome::NoCoverAvailable)
        }
    }

    async fn persist(&self, filename: &str, bytes: &[u8]) -> Result<(), PipelineError> {
        let target = self.config.output_dir.join(filename);
        let partial = self.config.output_dir.join(format!("{filename}.part"));
        if let Err(err) = tokio::fs::write(&partial, bytes).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(PipelineError::fatal("persist", write_failure(&partial, err)));
        }
        if let Err(err) = tokio::fs::rename(&partial, &target).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(PipelineError::fatal("persist", write_failure(&target, err)));
        }
        Ok(())
    }
}

fn write_failure(path: &Path, err: std::io::Error) -> String {
    format!("{}: {err}", path.display())
}

/// `<sanitized title>_<isbn>.jpg`. Every character outside `[0-9A-Za-z-]`
/// becomes `_` and the title is lower-cased; a missing title is treated as
/// empty.
pub fn cover_filename(title: Option<&str>, isbn: &str) -> String {
    let stem = sanitize(title.unwrap_or("")).to_lowercase();
    format!("{stem}_{}.jpg", sanitize(isbn))
}

fn sanitize(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[derive(Debug, Error)]
#[error("stage `{stage}` failed: {message}")]
pub struct PipelineError {
    stage: &'static str,
    message: String,
    kind: PipelineErrorKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineErrorKind {
    Network,
    Fatal,
}

impl PipelineError {
    pub fn network(stage: &'static str, err: CatalogError) -> Self {
        Self {
            stage,
            message: err.to_string(),
            kind: PipelineErrorKind::Network,
        }
    }

    pub fn fatal(stage: &'static str, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
            kind: PipelineErrorKind::Fatal,
        }
    }

    pub fn stage(&self) -> &'static str {
        self.stage
    }

    pub fn kind(&self) -> PipelineErrorKind {
        self.kind
    }

    pub fn detail(&self) -> &str {
        &self.message
    }
}

impl Retryable for PipelineError {
    fn is_retryable(&self) -> bool {
        self.kind == PipelineErrorKind::Network
    }
}
