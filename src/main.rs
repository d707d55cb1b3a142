//! splitear - split-screen audio from a single listener
//!
//! Headless scene runner: moves scripted listeners through a scene and renders
//! every environmental source for the one physical listener, tick by tick.

mod config;
mod headless;
mod motion;

use anyhow::{Context, Result};
use clap::Parser;
use config::{SceneConfig, DEFAULT_SCENE_PATH};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about = "Split-screen audio scene runner", long_about = None)]
struct Args {
    /// Scene description (TOML)
    #[arg(short, long, default_value = DEFAULT_SCENE_PATH)]
    config: PathBuf,

    /// Number of simulation ticks to run (20 per second)
    #[arg(long, default_value_t = 200)]
    max_ticks: u64,

    /// Write one JSON line per source per tick to this file
    #[arg(long)]
    trace: Option<PathBuf>,

    /// Never open an audio device
    #[arg(long)]
    no_audio: bool,

    /// Sleep between ticks so audio plays at real speed
    #[arg(long)]
    realtime: bool,

    /// Write the built-in scene to this path and exit
    #[arg(long, value_name = "PATH")]
    write_default_config: Option<PathBuf>,
}

fn main() -> Result<()> {
    // Initialize tracing with WARN level by default (can be overridden via RUST_LOG env var)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();
    info!("Starting splitear v{}", env!("CARGO_PKG_VERSION"));

    if let Some(path) = args.write_default_config {
        SceneConfig::default()
            .save_to_path(&path)
            .with_context(|| format!("failed to write scene to {}", path.display()))?;
        info!(path = %path.display(), "Wrote default scene");
        return Ok(());
    }

    let scene = SceneConfig::load_from_path(&args.config);
    let scene_dir = args
        .config
        .parent()
        .map(|dir| dir.to_path_buf())
        .unwrap_or_default();

    let summary = headless::run(headless::HeadlessConfig {
        scene,
        scene_dir,
        max_ticks: args.max_ticks,
        trace: args.trace,
        no_audio: args.no_audio,
        realtime: args.realtime,
    })?;

    println!(
        "ran {} ticks: {} sources, {} started, {} failed, {} trace records",
        summary.ticks, summary.sources, summary.started, summary.failed, summary.records
    );
    Ok(())
}
