// File: src/config.rs
// Purpose: Configuration parsing from rssr.toml

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::assets::HashStyle;
use crate::options::SsrMode;

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub routing: RoutingConfig,

    #[serde(default)]
    pub render: RenderConfig,

    #[serde(default)]
    pub dev: DevConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,
}

/// Routing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Project root that the other directories are relative to (default: ".")
    #[serde(default = "default_base_dir")]
    pub base_dir: String,

    /// Directory containing page modules (default: "pages")
    #[serde(default = "default_pages_dir")]
    pub pages_dir: String,

    /// Bundler output directory (default: ".build")
    #[serde(default = "default_build_dir")]
    pub build_dir: String,

    /// Extensions scanned for server pages
    #[serde(default = "default_server_extensions")]
    pub server_extensions: Vec<String>,

    /// Extensions scanned for built client assets
    #[serde(default = "default_client_extensions")]
    pub client_extensions: Vec<String>,
}

/// Page composition and output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DisplayModeKind {
    #[default]
    None,
    Nextjs,
}

/// Render configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Stream markup as it renders instead of buffering the whole page
    #[serde(default = "default_true")]
    pub streaming: bool,

    #[serde(default)]
    pub display_mode: DisplayModeKind,

    /// Layout file stem used in nextjs display mode (default: "layout")
    #[serde(default = "default_layout")]
    pub layout: String,

    #[serde(default)]
    pub ssr_mode: SsrMode,

    #[serde(default)]
    pub hash_style: HashStyle,
}

/// Development configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DevConfig {
    #[serde(default = "default_true")]
    pub hot_reload: bool,

    #[serde(default = "default_watch_paths")]
    pub watch_paths: Vec<String>,

    /// Evict loaded page modules and their local imports on reload
    #[serde(default = "default_false")]
    pub cache_invalidation: bool,

    /// Glob patterns of module paths never evicted
    #[serde(default)]
    pub cache_exclude: Vec<String>,
}

// Default values
fn default_port() -> u16 {
    3000
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_base_dir() -> String {
    ".".to_string()
}

fn default_pages_dir() -> String {
    "pages".to_string()
}

fn default_build_dir() -> String {
    ".build".to_string()
}

fn default_server_extensions() -> Vec<String> {
    ["rs", "tsx", "ts", "jsx", "js"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_client_extensions() -> Vec<String> {
    vec!["js".to_string(), "mjs".to_string()]
}

fn default_layout() -> String {
    "layout".to_string()
}

fn default_watch_paths() -> Vec<String> {
    vec![".build".to_string()]
}

fn default_true() -> bool {
    true
}

fn default_false() -> bool {
    false
}

// Default implementations
impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
        }
    }
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            base_dir: default_base_dir(),
            pages_dir: default_pages_dir(),
            build_dir: default_build_dir(),
            server_extensions: default_server_extensions(),
            client_extensions: default_client_extensions(),
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            streaming: true,
            display_mode: DisplayModeKind::None,
            layout: default_layout(),
            ssr_mode: SsrMode::None,
            hash_style: HashStyle::Query,
        }
    }
}

impl Default for DevConfig {
    fn default() -> Self {
        Self {
            hot_reload: true,
            watch_paths: default_watch_paths(),
            cache_invalidation: false,
            cache_exclude: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from rssr.toml
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        // If file doesn't exist or is empty, return default config
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        Ok(config)
    }

    /// Load configuration from default path (./rssr.toml)
    pub fn load_default() -> Result<Self> {
        Self::load("rssr.toml")
    }

    /// `dev.hot_reload`, overridden by `RSSR_HOT_RELOAD` when it parses as a bool
    pub fn hot_reload_enabled(&self) -> bool {
        std::env::var("RSSR_HOT_RELOAD")
            .ok()
            .and_then(|v| v.parse::<bool>().ok())
            .unwrap_or(self.dev.hot_reload)
    }
}
