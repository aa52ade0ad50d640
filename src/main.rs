//! Subgen - Subtitle Generation Pipeline
//!
//! Command-line entry point: stages video files as uploads, runs them through
//! the ffmpeg/whisper.cpp pipeline concurrently and reports where each
//! subtitle file can be fetched.

use anyhow::{bail, Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{info, warn, Level};
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use walkdir::WalkDir;

use subgen::artifact::Artifact;
use subgen::cli::{Args, Commands};
use subgen::config::Config;
use subgen::error::SubgenError;
use subgen::job::{is_supported_media, MediaJob};
use subgen::subtitle::normalize_transcript;
use subgen::workflow::Workflow;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    setup_logging(args.verbose)?;
    info!("Starting Subgen");

    let mut config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            if Path::new("config.toml").exists() {
                info!("Found config.toml in current directory, loading...");
                Config::from_file("config.toml")?
            } else {
                Config::default()
            }
        }
    };

    match args.command {
        Commands::Generate {
            inputs,
            input_dir,
            output_dir,
            retention_secs,
            hold,
            json,
        } => {
            if let Some(dir) = output_dir {
                config.storage.output_dir = dir;
            }
            if let Some(secs) = retention_secs {
                config.storage.retention_secs = secs;
            }

            let inputs = collect_inputs(inputs, input_dir.as_deref());
            if inputs.is_empty() {
                bail!("No video files to process");
            }

            let workflow = Arc::new(Workflow::from_config(&config));
            let results = generate_all(&workflow, &config, inputs).await;
            let failures = report(&results, json)?;
            info!("Subtitle files written to {}", workflow.artifacts().output_dir().display());

            if hold {
                hold_until_expired(&workflow).await;
            } else {
                info!(
                    "Exiting before the {}s retention window; subtitle files will not be deleted automatically",
                    config.storage.retention_secs
                );
            }

            if failures > 0 {
                bail!("{} of {} files failed", failures, results.len());
            }
        }
        Commands::Normalize { input, output } => {
            let raw = tokio::fs::read_to_string(&input)
                .await
                .with_context(|| format!("Failed to read {}", input.display()))?;
            let track = normalize_transcript(&raw);
            info!("Normalized {} cues", track.len());

            match output {
                Some(path) => tokio::fs::write(&path, track.to_srt()).await?,
                None => print!("{}", track.to_srt()),
            }
        }
        Commands::Extract { input, output } => {
            if !input.exists() {
                return Err(SubgenError::FileNotFound(input.display().to_string()).into());
            }
            let workflow = Workflow::from_config(&config);
            workflow.extract_audio(&input, &output).await?;
            println!("Audio written to {}", output.display());
        }
        Commands::InitConfig { output } => {
            Config::default().save_to_file(&output)?;
            println!("Default configuration written to {}", output.display());
        }
    }

    Ok(())
}

/// Explicit inputs first, then every supported video found under `input_dir`.
fn collect_inputs(mut inputs: Vec<PathBuf>, input_dir: Option<&Path>) -> Vec<PathBuf> {
    if let Some(dir) = input_dir {
        for entry in WalkDir::new(dir).into_iter().filter_map(|e| e.ok()) {
            if entry.file_type().is_file() && is_supported_media(entry.path()) {
                inputs.push(entry.path().to_path_buf());
            }
        }
    }
    inputs
}

async fn generate_all(
    workflow: &Arc<Workflow>,
    config: &Config,
    inputs: Vec<PathBuf>,
) -> Vec<(PathBuf, Result<Artifact, SubgenError>)> {
    info!("Generating subtitles for {} files", inputs.len());

    let pb = ProgressBar::new(inputs.len() as u64);
    pb.set_style(ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-"));

    let mut jobs = JoinSet::new();
    for input in inputs {
        let workflow = Arc::clone(workflow);
        let uploads_dir = config.storage.uploads_dir.clone();
        jobs.spawn(async move {
            let result = match MediaJob::stage_upload(&input, &uploads_dir).await {
                Ok(job) => workflow.generate(job).await,
                Err(e) => Err(e),
            };
            (input, result)
        });
    }

    let mut results = Vec::new();
    while let Some(joined) = jobs.join_next().await {
        match joined {
            Ok((input, result)) => {
                pb.set_message(input.file_name().unwrap_or_default().to_string_lossy().to_string());
                pb.inc(1);
                results.push((input, result));
            }
            Err(e) => warn!("Subtitle job panicked or was cancelled: {}", e),
        }
    }
    pb.finish_with_message("done");

    results
}

/// Print one line (or JSON object) per input; returns the number of failures.
fn report(results: &[(PathBuf, Result<Artifact, SubgenError>)], json: bool) -> Result<usize> {
    let mut failures = 0;
    let mut entries = Vec::new();

    for (input, result) in results {
        match result {
            Ok(artifact) => {
                if json {
                    let mut entry = artifact.to_json()?;
                    entry["input"] = serde_json::json!(input);
                    entries.push(entry);
                } else {
                    println!("{} -> {} ({} cues)", input.display(), artifact.reference, artifact.cue_count);
                }
            }
            Err(e) => {
                failures += 1;
                if json {
                    entries.push(serde_json::json!({
                        "input": input,
                        "error": e.user_message(),
                    }));
                } else {
                    eprintln!("{}: {}", input.display(), e.user_message());
                }
            }
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    }

    Ok(failures)
}

async fn hold_until_expired(workflow: &Workflow) {
    let artifacts = workflow.artifacts();
    info!(
        "Holding until {} subtitle files expire (Ctrl-C to delete them now)",
        artifacts.pending().len()
    );

    tokio::select! {
        _ = artifacts.wait_for_expiry() => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, removing subtitle files");
            artifacts.shutdown().await;
        }
    }
}

fn setup_logging(verbose: bool) -> Result<()> {
    let log_dir = std::env::current_dir()?.join(".subgen").join("log");
    std::fs::create_dir_all(&log_dir)?;

    // Daily rotation; the guard must outlive the program
    let file_appender = rolling::daily(&log_dir, "subgen.log");
    let (non_blocking_file, _guard) = non_blocking(file_appender);
    std::mem::forget(_guard);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!(
        "Logging initialized - console: {}, file: {}",
        log_level,
        log_dir.join("subgen.log").display()
    );

    Ok(())
}
