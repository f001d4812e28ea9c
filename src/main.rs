//! Command-line entry point: `organ-midi <INPUT>`.
//!
//! # Sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] (explicit `--config` file, or the platform default).
//! 3. Gate the input on extension and size.
//! 4. Create the [`tokio`] runtime (multi-thread, 2 workers).
//! 5. Clear job directories orphaned by earlier runs.
//! 6. Submit the upload and follow the job with a progress bar.
//! 7. Print the outputs (or the JSON snapshot) and exit non-zero on failure.

mod progress;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use anyhow::{Context, Result};
use clap::Parser;
use organ_midi::{
    audio::check_upload,
    config::AppConfig,
    job::{Job, JobId, JobOrchestrator, JobRegistry, JobStatus, PipelineSettings, RetentionSweeper},
    separate::DemucsSeparator,
    transcribe::BasicPitchTranscriber,
};

use crate::progress::JobProgress;

const POLL_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Parser)]
#[command(
    name = "organ-midi",
    about = "Turn a mixed recording into a four-channel organ MIDI file"
)]
struct Cli {
    /// Audio file to convert (mp3, wav, m4a or flac)
    input: PathBuf,

    /// Settings file (default: settings.toml in the platform config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory that receives one sub-directory per job
    #[arg(long)]
    results_dir: Option<PathBuf>,

    /// Print the final job record as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(Cli::parse()) {
        Ok(JobStatus::Complete) => ExitCode::SUCCESS,
        Ok(_) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<JobStatus> {
    // 1. Configuration
    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from(path)
            .with_context(|| format!("could not load {}", path.display()))?,
        None => AppConfig::load().unwrap_or_else(|e| {
            log::warn!("Failed to load config ({e}); using defaults");
            AppConfig::default()
        }),
    };
    if let Some(dir) = cli.results_dir {
        config.storage.results_dir = dir;
    }

    // 2. Upload gate
    let size = std::fs::metadata(&cli.input)
        .with_context(|| format!("could not read {}", cli.input.display()))?
        .len();
    check_upload(&cli.input, size, &config.upload)?;
    let bytes = std::fs::read(&cli.input)
        .with_context(|| format!("could not read {}", cli.input.display()))?;
    let file_name = cli
        .input
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string();

    // 3. Runtime (2 workers: the separator and transcriber block one each)
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;

    // 4. Orphan cleanup
    let registry = JobRegistry::new();
    let sweeper = RetentionSweeper::from_config(registry.clone(), &config.storage);
    match sweeper.sweep_orphans(SystemTime::now()) {
        Ok(removed) if !removed.is_empty() => {
            log::info!("Removed {} expired job directories", removed.len());
        }
        Ok(_) => {}
        Err(e) => log::warn!("Could not sweep {}: {e}", config.storage.results_dir.display()),
    }

    // 5. Orchestrator with the production collaborators
    let orchestrator = JobOrchestrator::new(
        registry,
        Arc::new(DemucsSeparator::from_config(&config.separator)),
        Arc::new(BasicPitchTranscriber::from_config(&config.transcriber)),
        PipelineSettings::from_config(&config),
    );

    let job = rt.block_on(async {
        let id = orchestrator.submit(&bytes, &file_name).await?;
        follow(&orchestrator, id).await
    })?;

    report(&job, cli.json)?;
    Ok(job.status)
}

/// Poll the job until it is terminal, mirroring it on a progress bar.
async fn follow(orchestrator: &JobOrchestrator, id: JobId) -> Result<Job> {
    let bar = JobProgress::new()?;
    loop {
        let job = orchestrator.get_status(&id)?;
        if job.is_terminal() {
            bar.finish(&job);
            return Ok(job);
        }
        bar.update(&job);
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

fn report(job: &Job, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(job)?);
        return Ok(());
    }

    match job.status {
        JobStatus::Complete => {
            if let Some(combined) = job.combined_midi() {
                println!("combined: {}", combined.display());
            }
            for (stem, path) in &job.stem_paths {
                let midi = job
                    .midi_paths
                    .get(stem.name())
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "-".into());
                println!("{stem:>8}: {}  {midi}", path.display());
            }
        }
        _ => {
            eprintln!(
                "job {} failed: {}",
                job.id,
                job.error.as_deref().unwrap_or("unknown error")
            );
        }
    }
    Ok(())
}
