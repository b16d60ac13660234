use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use video_predict::{
    config::{Config, ModelConfig},
    pipeline::{Pipeline, PipelineSettings},
    runner::{ModelRunner, ScriptRunner},
    storage::Storage,
};

/// Writes one output file, like the reference model script.
pub const SUCCESS_SCRIPT: &str =
    r#"mkdir -p "$4" && echo "Simulated output based on input: $2" > "$4/simulated_output.txt""#;

/// Fails the way a broken decoder would.
pub const DECODE_FAILURE_SCRIPT: &str = r#"echo "decode failed" >&2; exit 1"#;

/// Create a test configuration with sensible defaults
pub fn create_test_config(workspace_dir: &Path) -> Config {
    let mut config = Config::default();
    config.server.host = "127.0.0.1".to_string();
    config.server.logs.level = "debug".to_string();
    config.pipeline.workspace_dir = Some(workspace_dir.to_path_buf());
    config
}

/// A processing step that runs `script` under `sh`, receiving the standard flags as
/// `$1`..`$4`.
pub fn shell_runner(script: &str, timeout_secs: Option<u64>) -> ScriptRunner {
    ScriptRunner::new(ModelConfig {
        program: "sh".to_string(),
        args: vec!["-c".to_string(), script.to_string(), "model".to_string()],
        timeout_secs,
        ..ModelConfig::default()
    })
}

pub fn test_settings(workspace_dir: &TempDir, test_mode: bool) -> PipelineSettings {
    PipelineSettings {
        scheme: "gs".to_string(),
        test_mode,
        workspace_dir: Some(workspace_dir.path().to_path_buf()),
    }
}

pub fn create_test_pipeline(
    storage: Arc<dyn Storage>,
    runner: Arc<dyn ModelRunner>,
    workspace_dir: &TempDir,
    test_mode: bool,
) -> Pipeline {
    Pipeline::new(storage, runner, test_settings(workspace_dir, test_mode))
}

/// Asserts no per-request workspace survived under `workspace_dir`.
pub fn assert_no_workspaces(workspace_dir: &TempDir) {
    let leftovers: Vec<_> = std::fs::read_dir(workspace_dir.path())
        .expect("workspace root should exist")
        .map(|entry| entry.unwrap().path())
        .collect();
    assert!(
        leftovers.is_empty(),
        "workspaces left behind: {:?}",
        leftovers
    );
}
