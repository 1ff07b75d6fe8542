use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use clap_complete::Shell;
use std::fs::{self, File};
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod addressing;
mod color;
mod config;
mod display;
mod fixture;
mod geometry;
mod net;
mod scene;

use config::Config;
use display::RunMode;
use scene::{Scene, SpatialConfig};

#[derive(Parser, Debug)]
#[command(name = "firesim")]
#[command(author, version, about = "LED scene simulator: receives strand frames over UDP and shows them on a fixture map")]
pub struct Args {
    /// Run mode: preview, headless or pattern
    #[arg(short, long)]
    mode: Option<RunMode>,

    /// Config file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Scene file (JSON)
    #[arg(short, long)]
    scene: Option<PathBuf>,

    /// UDP port to receive frames on
    #[arg(short, long)]
    port: Option<u16>,

    /// Address to bind the receiver to
    #[arg(long)]
    bind: Option<IpAddr>,

    /// Destination for the test pattern (pattern mode)
    #[arg(long)]
    target: Option<SocketAddr>,

    /// Fill all spatial caches after loading the scene
    #[arg(long)]
    warmup: bool,

    /// Write a default config file and exit
    #[arg(long)]
    init_config: bool,

    /// Print shell completions and exit
    #[arg(long, value_name = "SHELL")]
    completions: Option<Shell>,

    /// Log file used in preview mode
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if let Some(shell) = args.completions {
        clap_complete::generate(shell, &mut Args::command(), "firesim", &mut std::io::stdout());
        return Ok(());
    }

    if args.init_config {
        let path = Config::init_default_config()?;
        println!("Wrote default config to {}", path.display());
        return Ok(());
    }

    // Load config: explicit path, then default path, then built-in defaults
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::load_from_default_path().unwrap_or_default(),
    };
    config.merge_args(&args);

    init_logging(&config)?;
    info!("Starting FireSim in {:?} mode", config.mode);

    let mut scene = match &config.scene.path {
        Some(path) => load_scene(path)?,
        None => {
            info!("No scene file given, starting with an empty scene");
            Scene::new("")
        }
    };
    if config.scene.warmup {
        scene.warmup(&SpatialConfig::from(&config.spatial));
    }

    match config.mode {
        RunMode::Preview => {
            display::terminal::run(config, scene).await?;
        }
        RunMode::Headless => {
            display::headless::run(config, scene).await?;
        }
        RunMode::Pattern => {
            net::pattern::run(config.net.target, config.net.pattern_fps, &scene).await?;
        }
    }

    Ok(())
}

fn load_scene(path: &Path) -> Result<Scene> {
    Scene::load(path).with_context(|| format!("Failed to load scene {}", path.display()))
}

/// Logs go to stderr, except in preview mode where the terminal belongs to
/// the UI and they are written to a file instead.
fn init_logging(config: &Config) -> Result<()> {
    let filter = EnvFilter::from_default_env().add_directive("firesim=info".parse()?);

    if config.mode == RunMode::Preview {
        let path = config
            .preview
            .log_path()
            .ok_or_else(|| anyhow::anyhow!("Could not determine log file location"))?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(&path)
            .with_context(|| format!("Failed to create log file {}", path.display()))?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }

    Ok(())
}
