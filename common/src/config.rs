use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_keepalive_port")]
    pub keepalive_port: u16,
    /// Seconds between two keep-alive messages on one connection.
    #[serde(default = "default_keepalive_interval")]
    pub keepalive_interval_secs: u64,
    #[serde(default = "default_keepalive_message")]
    pub keepalive_message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
    #[serde(default = "default_max_dimension")]
    pub max_dimension: u32,
    #[serde(default = "default_min_contour_area")]
    pub min_contour_area: f64,
    #[serde(default = "default_canny_low")]
    pub canny_low: f32,
    #[serde(default = "default_canny_high")]
    pub canny_high: f32,
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BatchConfig {
    #[serde(default = "default_batch_input")]
    pub input: String,
    #[serde(default = "default_batch_output_dir")]
    pub output_dir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            keepalive_port: default_keepalive_port(),
            keepalive_interval_secs: default_keepalive_interval(),
            keepalive_message: default_keepalive_message(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: default_max_upload_bytes(),
            max_dimension: default_max_dimension(),
            min_contour_area: default_min_contour_area(),
            canny_low: default_canny_low(),
            canny_high: default_canny_high(),
            jpeg_quality: default_jpeg_quality(),
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            input: default_batch_input(),
            output_dir: default_batch_output_dir(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFile(path.display().to_string(), e))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load the config named on the command line, or `config.toml`.
    ///
    /// An explicit path must exist. Without one, a missing `config.toml`
    /// falls back to the built-in defaults.
    pub fn resolve(arg: Option<PathBuf>) -> Result<Self, ConfigError> {
        match arg {
            Some(path) => Self::load(&path),
            None => {
                let path = PathBuf::from(DEFAULT_CONFIG_PATH);
                if path.exists() {
                    Self::load(&path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }
}

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    ReadFile(String, std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(String),
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    5000
}
fn default_keepalive_port() -> u16 {
    8777
}
fn default_keepalive_interval() -> u64 {
    5000
}
fn default_keepalive_message() -> String {
    "ok".into()
}
fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}
fn default_max_dimension() -> u32 {
    1920
}
fn default_min_contour_area() -> f64 {
    100.0
}
fn default_canny_low() -> f32 {
    50.0
}
fn default_canny_high() -> f32 {
    150.0
}
fn default_jpeg_quality() -> u8 {
    95
}
fn default_batch_input() -> String {
    "image.jpg".into()
}
fn default_batch_output_dir() -> String {
    "edge-grids".into()
}
fn default_log_level() -> String {
    "info".into()
}
