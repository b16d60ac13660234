use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub logs: LogsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogsConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// URI scheme that marks a remote reference, without `://`.
    #[serde(default = "default_scheme")]
    pub scheme: String,
    #[serde(default)]
    pub backend: StorageBackend,
    /// Root directory for the `local` backend; each bucket is a subdirectory.
    #[serde(default = "default_local_root")]
    pub local_root: PathBuf,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    #[default]
    Gcs,
    Local,
}

/// External processing step invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_program")]
    pub program: String,
    #[serde(default = "default_model_args")]
    pub args: Vec<String>,
    #[serde(default = "default_input_flag")]
    pub input_flag: String,
    #[serde(default = "default_output_flag")]
    pub output_flag: String,
    /// Unset means wait for the process indefinitely.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub test_mode: bool,
    /// Parent directory for per-request workspaces. Defaults to the system temp dir.
    #[serde(default)]
    pub workspace_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_key_file")]
    pub key_file: PathBuf,
    /// Environment variable holding a base64-encoded service account key.
    #[serde(default = "default_key_env")]
    pub key_env: String,
    /// Bucket listed to verify credentials decoded from `key_env`.
    #[serde(default)]
    pub probe_bucket: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            logs: LogsConfig::default(),
        }
    }
}

impl Default for LogsConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            scheme: default_scheme(),
            backend: StorageBackend::default(),
            local_root: default_local_root(),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            args: default_model_args(),
            input_flag: default_input_flag(),
            output_flag: default_output_flag(),
            timeout_secs: None,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            key_file: default_key_file(),
            key_env: default_key_env(),
            probe_bucket: None,
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_scheme() -> String {
    "gs".to_string()
}

fn default_local_root() -> PathBuf {
    PathBuf::from("buckets")
}

fn default_program() -> String {
    "python".to_string()
}

fn default_model_args() -> Vec<String> {
    vec!["src/model.py".to_string()]
}

fn default_input_flag() -> String {
    "--input_file".to_string()
}

fn default_output_flag() -> String {
    "--out_folder".to_string()
}

fn default_key_file() -> PathBuf {
    PathBuf::from("/secrets/key.json")
}

fn default_key_env() -> String {
    "GCP_SERVICE_ACCOUNT_KEY".to_string()
}
