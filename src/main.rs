mod catalog;
mod config;
mod http;
mod input;
mod metrics;
mod outcome;
mod pipeline;
mod placeholder;
mod retry;
mod selector;

use catalog::BooksCatalog;
use clap::Parser;
use config::Cli;
use eyre::WrapErr;
use http::{HttpSettings, build_client};
use outcome::OutcomeRecorder;
use pipeline::Pipeline;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    init_tracing();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(target = "covers.run", "run failed: {err:?}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> eyre::Result<()> {
    if let Some(path) = &cli.hash_file {
        let bytes = std::fs::read(path)
            .wrap_err_with(|| format!("unable to read {}", path.display()))?;
        println!("{}  {}", placeholder::content_hash(&bytes), path.display());
        return Ok(());
    }

    let detector = cli.detector()?;
    if detector.is_empty() {
        warn!(
            target = "covers.run",
            "no placeholder signatures configured; stock images will be saved as covers \
             (add SHA-256 digests to placeholders.txt and pass --placeholder-file placeholders.txt)"
        );
    } else {
        info!(target = "covers.run", signatures = detector.len(), "placeholder_signatures_loaded");
    }

    let isbns = input::read_isbns(&cli.input)?;
    std::fs::create_dir_all(&cli.output_dir)
        .wrap_err_with(|| format!("unable to create {}", cli.output_dir.display()))?;

    let http = build_client(&HttpSettings::from_env());
    let catalog = BooksCatalog::new(&cli.api_root, http);
    let config = cli.pipeline_config();
    info!(
        target = "covers.run",
        total = isbns.len(),
        input = %cli.input.display(),
        output_dir = %config.output_dir.display(),
        backoff = ?config.retry.schedule(),
        "run_started"
    );
    let pipeline = Pipeline::new(catalog, detector, config);
    let mut recorder = OutcomeRecorder::new(isbns.len());
    pipeline.run(&isbns, &mut recorder).await;

    let summary = recorder.summarize(&cli.output_dir)?;
    println!("{summary}");
    if !summary.is_consistent() {
        warn!(
            target = "covers.run",
            unaccounted = summary.unaccounted,
            failed = summary.failed,
            "outcome_accounting_mismatch"
        );
    }

    if recorder.has_failures() {
        std::fs::create_dir_all(&cli.manifest_dir)
            .wrap_err_with(|| format!("unable to create {}", cli.manifest_dir.display()))?;
        for path in recorder.write_manifests(&cli.manifest_dir)? {
            info!(target = "covers.run", manifest = %path.display(), "manifest_written");
        }
    }

    if let Some(path) = &cli.summary_json {
        let body = serde_json::to_vec_pretty(&summary)?;
        std::fs::write(path, body)
            .wrap_err_with(|| format!("unable to write {}", path.display()))?;
    }
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}
