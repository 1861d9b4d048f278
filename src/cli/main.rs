//! Cutout CLI tool
//!
//! Runs one acquisition pipeline: the IMAGE argument stands in for the photo
//! picker, the cutout is cached locally, and the editor transition is printed
//! to stdout as a JSON line.

use super::config::{CliConfigBuilder, ENV_CACHE_DIR};
use super::progress::SpinnerObserver;
use crate::{
    build_http_orchestrator,
    cache::{format_size, ArtifactCache},
    config::{
        DEFAULT_API_KEY_HEADER, DEFAULT_CUTOUT_FILE_NAME, DEFAULT_PICKER_QUALITY,
        DEFAULT_TARGET_SCREEN,
    },
    navigation::JsonLinesNavigator,
    observer::{LoggingObserver, PipelineObserver},
    orchestrator::PipelineOutcome,
    tracing_config::{events, init_cli_tracing, new_session_id, spans},
};
use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::Instrument;

/// Pick a photo, remove its background remotely and hand both images to the editor
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "bgcutout")]
#[allow(clippy::struct_excessive_bools)]
pub struct Cli {
    /// Image to pick; omit it to behave like a dismissed picker
    #[arg(value_name = "IMAGE")]
    pub image: Option<PathBuf>,

    /// Removal service URL [env: BGCUTOUT_ENDPOINT]
    #[arg(short, long, value_name = "URL")]
    pub endpoint: Option<String>,

    /// API key for the removal service [env: BGCUTOUT_API_KEY]
    #[arg(long)]
    pub api_key: Option<String>,

    /// Header the API key is sent in
    #[arg(long, default_value = DEFAULT_API_KEY_HEADER)]
    pub api_key_header: String,

    /// Directory cutouts are cached in [env: BGCUTOUT_CACHE_DIR]
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// File name the cutout is saved under (overwritten on every run)
    #[arg(long, default_value = DEFAULT_CUTOUT_FILE_NAME)]
    pub file_name: String,

    /// Picker compression factor (0.0 smallest - 1.0 best)
    #[arg(short, long, default_value_t = DEFAULT_PICKER_QUALITY)]
    pub quality: f32,

    /// Give up on the removal service after this many seconds [default: wait]
    #[arg(long, value_name = "SECS")]
    pub timeout_secs: Option<u64>,

    /// Screen that receives the transition
    #[arg(long, default_value = DEFAULT_TARGET_SCREEN)]
    pub screen: String,

    /// Enable verbose logging (-v: DEBUG, -vv: TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// List cached cutouts and exit
    #[arg(long)]
    pub list_artifacts: bool,

    /// Delete cached cutouts and exit
    #[arg(long)]
    pub clear_cache: bool,

    /// Show the cache directory and exit
    #[arg(long)]
    pub show_cache_dir: bool,
}

pub async fn main() -> Result<()> {
    let cli = Cli::parse();

    let session_id = new_session_id();
    let _tracing =
        init_cli_tracing(cli.verbose, &session_id).context("Failed to initialize tracing")?;

    let env = |key: &str| std::env::var(key).ok();
    let artifact_dir = CliConfigBuilder::artifact_dir(&cli, env)?;

    if cli.show_cache_dir {
        show_cache_dir(&artifact_dir, cli.output_dir.is_some());
        return Ok(());
    }

    if cli.list_artifacts {
        return list_artifacts(&artifact_dir);
    }

    if cli.clear_cache {
        return clear_cache(&artifact_dir);
    }

    let pipeline = CliConfigBuilder::pipeline_config(&cli)?;
    let removal = CliConfigBuilder::removal_config(&cli, env)?;
    let session = spans::session(&session_id, &removal.endpoint);

    let navigator = Arc::new(JsonLinesNavigator::new(std::io::stdout()));
    let orchestrator = build_http_orchestrator(
        cli.image.clone(),
        removal,
        artifact_dir,
        pipeline,
        navigator,
    )
    .context("Failed to set up the cutout pipeline")?;

    // Logs and the spinner would fight over stderr
    let (mut orchestrator, spinner_task) = if cli.verbose > 0 {
        let observer: Arc<dyn PipelineObserver> = Arc::new(LoggingObserver::new(true));
        (orchestrator.with_observer(observer), None)
    } else {
        let spinner = Arc::new(SpinnerObserver::new());
        let task = spinner.follow(orchestrator.subscribe());
        let observer: Arc<dyn PipelineObserver> = spinner;
        (orchestrator.with_observer(observer), Some(task))
    };

    let outcome = orchestrator.pick_and_process().instrument(session).await;

    drop(orchestrator);
    if let Some(task) = spinner_task {
        join_spinner(task).await;
    }

    match outcome {
        PipelineOutcome::Completed(run) => {
            info!(
                "✅ Cutout saved to {} ({})",
                run.persisted.path.display(),
                format_size(run.persisted.size_bytes)
            );
            Ok(())
        },
        PipelineOutcome::Cancelled => {
            info!("No image selected; nothing to do");
            Ok(())
        },
        PipelineOutcome::Failed(failure) => {
            events::error_with_context(&failure, "cutout pipeline");
            anyhow::bail!("{}", failure.user_message())
        },
    }
}

/// Wait for the spinner to wind down; returns `false` if its task panicked or was aborted
async fn join_spinner(task: tokio::task::JoinHandle<()>) -> bool {
    match task.await {
        Ok(()) => true,
        Err(e) => {
            debug!("Spinner task ended abnormally: {}", e);
            false
        },
    }
}

/// List persisted cutouts
fn list_artifacts(artifact_dir: &Path) -> Result<()> {
    let cache = ArtifactCache::new(artifact_dir);
    let artifacts = cache
        .scan_artifacts()
        .context("Failed to list cached cutouts")?;

    println!("📦 Cached Cutouts");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    if artifacts.is_empty() {
        println!("No cached cutouts found in {}", artifact_dir.display());
        println!("\n💡 To create one, use:");
        println!("  bgcutout --endpoint https://api.example.com/remove photo.jpg");
        return Ok(());
    }

    let mut total = 0;
    for artifact in &artifacts {
        total += artifact.size_bytes;
        println!("📁 {}", artifact.file_name);
        println!("  └─ Location: {}", artifact.path.display());
        println!("  └─ Size: {}", format_size(artifact.size_bytes));
        if let Some(modified) = artifact.modified {
            println!("  └─ Modified: {}", modified.format("%Y-%m-%d %H:%M:%S"));
        }
        println!();
    }

    println!("Total: {} in {} file(s)", format_size(total), artifacts.len());
    Ok(())
}

/// Remove every persisted cutout
fn clear_cache(artifact_dir: &Path) -> Result<()> {
    let cache = ArtifactCache::new(artifact_dir);

    println!("🗑️  Clearing cached cutouts...");
    let removed = cache.clear_all().context("Failed to clear cached cutouts")?;

    if removed.is_empty() {
        println!("💡 Cache was already empty");
    } else {
        println!("✅ Successfully removed {} cutout(s):", removed.len());
        for name in &removed {
            println!("   • {}", name);
        }
    }
    println!("   Cache location: {}", artifact_dir.display());

    Ok(())
}

/// Show where cutouts are cached and why
fn show_cache_dir(artifact_dir: &Path, from_flag: bool) {
    println!("📁 Current cache directory:");
    println!("   Path: {}", artifact_dir.display());

    if from_flag {
        println!("   Source: --output-dir flag");
    } else if std::env::var(ENV_CACHE_DIR).is_ok() {
        println!("   Source: {} environment variable", ENV_CACHE_DIR);
    } else {
        println!("   Source: platform cache directory");
    }

    if !artifact_dir.exists() {
        events::warning_with_recommendation(
            "Cache directory does not exist yet",
            "It is created on the first successful run",
        );
    }

    println!("\n💡 To use a custom cache directory:");
    println!("   bgcutout --output-dir /path/to/cache IMAGE");
    println!("   or set {} environment variable", ENV_CACHE_DIR);
}
