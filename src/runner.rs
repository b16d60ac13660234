use crate::{config::ModelConfig, Error, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

/// Captured result of one processing-step invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

#[async_trait]
pub trait ModelRunner: Send + Sync {
    /// Run the processing step on `input_file`, writing into `output_dir`.
    ///
    /// Errors only when the process could not be run to completion; a non-zero exit is
    /// reported through [`ProcessOutput`].
    async fn run(&self, input_file: &Path, output_dir: &Path) -> Result<ProcessOutput>;

    fn is_available(&self) -> bool;
}

/// Runs the processing step as a child process.
pub struct ScriptRunner {
    config: ModelConfig,
}

impl ScriptRunner {
    pub fn new(config: ModelConfig) -> Self {
        Self { config }
    }

    fn command(&self, input_file: &Path, output_dir: &Path) -> Command {
        let mut cmd = Command::new(&self.config.program);
        cmd.args(&self.config.args)
            .arg(&self.config.input_flag)
            .arg(input_file)
            .arg(&self.config.output_flag)
            .arg(output_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl ModelRunner for ScriptRunner {
    async fn run(&self, input_file: &Path, output_dir: &Path) -> Result<ProcessOutput> {
        debug!(
            "Command: {} {} {} {} {} {}",
            self.config.program,
            self.config.args.join(" "),
            self.config.input_flag,
            input_file.display(),
            self.config.output_flag,
            output_dir.display()
        );

        let child = self.command(input_file, output_dir).spawn().map_err(|e| {
            Error::processing(format!(
                "Failed to spawn {}: {}",
                self.config.program, e
            ))
        })?;

        let output = match self.config.timeout_secs {
            Some(secs) => {
                match tokio::time::timeout(Duration::from_secs(secs), child.wait_with_output())
                    .await
                {
                    Ok(output) => output?,
                    Err(_) => {
                        warn!("Processing step exceeded {}s and was killed", secs);
                        return Err(Error::processing(format!(
                            "Processing timed out after {}s",
                            secs
                        )));
                    }
                }
            }
            None => child.wait_with_output().await?,
        };

        Ok(ProcessOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    fn is_available(&self) -> bool {
        resolve_program(&self.config.program).is_some()
    }
}

/// Locates `program` the way a shell would: directly if it contains a separator,
/// otherwise on `PATH`.
pub fn resolve_program(program: &str) -> Option<PathBuf> {
    let candidate = Path::new(program);
    if candidate.components().count() > 1 {
        return candidate.is_file().then(|| candidate.to_path_buf());
    }

    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(program))
        .find(|full| full.is_file())
}
