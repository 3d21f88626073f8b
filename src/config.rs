use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server configuration
    pub server: ServerConfig,

    /// State backend configuration
    pub state: StateConfig,

    /// Model artifact configuration
    pub model: ModelConfig,

    /// Pipeline stage configuration
    pub pipeline: PipelineConfig,
}

impl Config {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self, config::ConfigError> {
        let config_path =
            std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config/default.toml".to_string());

        config::Config::builder()
            // Start with default values
            .add_source(config::File::from_str(
                include_str!("../config/default.toml"),
                config::FileFormat::Toml,
            ))
            // Override with config file if it exists
            .add_source(config::File::with_name(&config_path).required(false))
            // Override with environment variables (prefix: TRIAGE_)
            .add_source(
                config::Environment::with_prefix("TRIAGE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_http_port")]
    pub http_port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateConfig {
    /// Storage backend
    #[serde(default)]
    pub backend: StateBackend,

    /// Path for the sled database
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum StateBackend {
    #[default]
    Sled,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Serialized category classifier artifact
    #[serde(default = "default_category_model_path")]
    pub category_model_path: PathBuf,

    /// Serialized priority classifier artifact
    #[serde(default = "default_priority_model_path")]
    pub priority_model_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Directory for batch and monitoring artifacts
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Maximum tickets classified per batch run
    #[serde(default = "default_batch_limit")]
    pub batch_limit: usize,

    /// Seed for batch sampling
    #[serde(default = "default_batch_seed")]
    pub batch_seed: u64,

    /// Upper bound on events drained from the bus per batch run
    #[serde(default = "default_drain_bound")]
    pub drain_bound: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_http_port() -> u16 {
    8080
}

fn default_category_model_path() -> PathBuf {
    PathBuf::from("outputs/category_model.bin")
}

fn default_priority_model_path() -> PathBuf {
    PathBuf::from("outputs/priority_model.bin")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("outputs")
}

fn default_batch_limit() -> usize {
    200
}

fn default_batch_seed() -> u64 {
    42
}

fn default_drain_bound() -> usize {
    10_000
}
