use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use crate::display::RunMode;
use crate::scene::SpatialConfig;

/// Default UDP port for strand data
pub const DEFAULT_PORT: u16 = 3020;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub mode: RunMode,
    #[serde(default)]
    pub net: NetConfig,
    #[serde(default)]
    pub scene: SceneConfig,
    #[serde(default)]
    pub spatial: SpatialSettings,
    #[serde(default)]
    pub preview: PreviewConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetConfig {
    /// Interface to receive frames on
    pub bind: IpAddr,
    pub port: u16,
    /// Where the test pattern sends its frames
    pub target: SocketAddr,
    /// Test pattern frames per second
    pub pattern_fps: f64,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            bind: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            target: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), DEFAULT_PORT),
            pattern_fps: 100.0,
        }
    }
}

impl NetConfig {
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub path: Option<PathBuf>,
    /// Fill every spatial cache right after loading
    pub warmup: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpatialSettings {
    pub neighbor_radius: f64,
    pub collision_radius: f64,
    pub intersection_threshold: f64,
    /// Click tolerance for fixture selection, in scene units
    pub hit_epsilon: f64,
}

impl Default for SpatialSettings {
    fn default() -> Self {
        let spatial = SpatialConfig::default();
        Self {
            neighbor_radius: spatial.neighbor_radius,
            collision_radius: spatial.collision_radius,
            intersection_threshold: spatial.intersection_threshold,
            hit_epsilon: 10.0,
        }
    }
}

impl From<&SpatialSettings> for SpatialConfig {
    fn from(settings: &SpatialSettings) -> Self {
        Self {
            neighbor_radius: settings.neighbor_radius,
            collision_radius: settings.collision_radius,
            intersection_threshold: settings.intersection_threshold,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    pub fps: u32,
    pub show_intersections: bool,
    /// Log file used while the preview owns the terminal
    pub log_file: Option<PathBuf>,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            fps: 30,
            show_intersections: false,
            log_file: None,
        }
    }
}

impl PreviewConfig {
    /// Log file path, defaulting to ~/.cache/firesim/firesim.log
    pub fn log_path(&self) -> Option<PathBuf> {
        self.log_file
            .clone()
            .or_else(|| dirs::cache_dir().map(|p| p.join("firesim").join("firesim.log")))
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        Ok(config)
    }

    /// Get the default XDG config path (~/.config/firesim/config.toml)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("firesim").join("config.toml"))
    }

    /// Load config from the default XDG path if it exists
    /// Returns None if file doesn't exist, warns on parse errors
    pub fn load_from_default_path() -> Option<Self> {
        let path = Self::default_path()?;
        if path.exists() {
            match Self::load(&path) {
                Ok(config) => Some(config),
                Err(e) => {
                    eprintln!("Warning: {:#}\nUsing defaults.", e);
                    None
                }
            }
        } else {
            None
        }
    }

    /// Initialize default config file at XDG path, returns the path
    pub fn init_default_config() -> Result<PathBuf> {
        let path = Self::default_path()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(&path, Self::generate_config_template())?;

        Ok(path)
    }

    /// Generate a commented TOML config template
    pub fn generate_config_template() -> String {
        r#"# FireSim Configuration
# This file is auto-generated. Edit as needed.

# Run mode: "preview", "headless" or "pattern"
mode = "preview"

[net]
# Address to receive strand data on
bind = "0.0.0.0"
port = 3020
# Destination for the test pattern sender
target = "127.0.0.1:3020"
# Test pattern frames per second
pattern_fps = 100.0

[scene]
# Scene file (JSON)
# path = "/path/to/scene.json"
# Fill all spatial caches after loading (slow for large scenes)
warmup = false

[spatial]
# Radius for pixel neighbor queries
neighbor_radius = 3.0
# Radius for fixture endpoint collisions
collision_radius = 50.0
# Endpoints closer than this are merged into one intersection
intersection_threshold = 50.0
# Click tolerance when selecting fixtures
hit_epsilon = 10.0

[preview]
# Redraw rate
fps = 30
# Draw fixture intersection markers
show_intersections = false
# Log file while the preview is running (default: ~/.cache/firesim/firesim.log)
# log_file = "/tmp/firesim.log"
"#
        .to_string()
    }

    /// Merge CLI arguments into config (CLI takes priority)
    pub fn merge_args(&mut self, args: &crate::Args) {
        if let Some(mode) = args.mode {
            self.mode = mode;
        }

        if let Some(bind) = args.bind {
            self.net.bind = bind;
        }
        if let Some(port) = args.port {
            self.net.port = port;
        }
        if let Some(target) = args.target {
            self.net.target = target;
        }

        if let Some(ref path) = args.scene {
            self.scene.path = Some(path.clone());
        }
        if args.warmup {
            self.scene.warmup = true;
        }

        if let Some(ref path) = args.log_file {
            self.preview.log_file = Some(path.clone());
        }
    }
}
