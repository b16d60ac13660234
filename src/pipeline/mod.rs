mod types;
mod workspace;

pub use types::{PredictionRequest, PredictionResult, PredictionStatus};
pub use workspace::Workspace;

use crate::{
    auth::Credentials,
    config::{Config, StorageBackend},
    runner::{ModelRunner, ScriptRunner},
    storage::{ObjectStorage, Storage},
    Error, Result,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

pub const FALLBACK_SEQUENCE_NAME: &str = "test_sequence";
pub const TEST_MODE_PLACEHOLDER: &str = "Test data for Vertex AI deployment";

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Remote reference scheme, without `://`.
    pub scheme: String,
    /// Substitute a placeholder input when the download fails.
    pub test_mode: bool,
    pub workspace_dir: Option<PathBuf>,
}

impl PipelineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            scheme: config.storage.scheme.clone(),
            test_mode: config.pipeline.test_mode,
            workspace_dir: config.pipeline.workspace_dir.clone(),
        }
    }

    pub fn scheme_prefix(&self) -> String {
        format!("{}://", self.scheme)
    }

    pub fn default_input(&self) -> String {
        format!("{}test-bucket/test.txt", self.scheme_prefix())
    }

    pub fn default_output(&self) -> String {
        format!("{}test-bucket/output", self.scheme_prefix())
    }

    fn is_remote(&self, reference: &str) -> bool {
        reference.starts_with(&self.scheme_prefix())
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            scheme: "gs".to_string(),
            test_mode: false,
            workspace_dir: None,
        }
    }
}

/// Download, process, upload for a single request.
pub struct Pipeline {
    storage: Arc<dyn Storage>,
    runner: Arc<dyn ModelRunner>,
    settings: PipelineSettings,
}

impl Pipeline {
    pub fn new(
        storage: Arc<dyn Storage>,
        runner: Arc<dyn ModelRunner>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            storage,
            runner,
            settings,
        }
    }

    pub fn from_config(config: &Config, credentials: Credentials) -> Self {
        let scheme = config.storage.scheme.clone();
        let storage: Arc<dyn Storage> = match config.storage.backend {
            StorageBackend::Gcs => Arc::new(ObjectStorage::gcs(scheme, credentials)),
            StorageBackend::Local => {
                info!(
                    "Using local storage backend rooted at {}",
                    config.storage.local_root.display()
                );
                Arc::new(ObjectStorage::local(scheme, config.storage.local_root.clone()))
            }
        };
        let runner = Arc::new(ScriptRunner::new(config.model.clone()));

        Self::new(storage, runner, PipelineSettings::from_config(config))
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub fn runner_available(&self) -> bool {
        self.runner.is_available()
    }

    /// Runs one request to completion. Every failure is reported in the result.
    pub async fn run(&self, request: PredictionRequest) -> PredictionResult {
        let span = info_span!("prediction", request_id = %Uuid::new_v4());
        self.execute(request).instrument(span).await
    }

    async fn execute(&self, request: PredictionRequest) -> PredictionResult {
        let input_ref = request
            .input_video_path
            .unwrap_or_else(|| self.settings.default_input());
        let output_ref = request
            .output_gcs_path
            .unwrap_or_else(|| self.settings.default_output());

        debug!("Starting prediction with parameters:");
        debug!("- input_path: {}", input_ref);
        debug!("- output_path: {}", output_ref);

        let sequence_name = self.sequence_name(&input_ref);
        debug!("Generated sequence name: {}", sequence_name);

        let workspace =
            match Workspace::create(self.settings.workspace_dir.as_deref(), &input_ref).await {
                Ok(workspace) => workspace,
                Err(e) => {
                    error!("Failed to create workspace: {}", e);
                    return PredictionResult::error(format!("Failed to create workspace: {}", e));
                }
            };
        debug!("Created workspace: {}", workspace.path().display());

        let result = self
            .process(&workspace, &input_ref, &output_ref, &sequence_name)
            .await;
        workspace.close().await;
        result
    }

    async fn process(
        &self,
        workspace: &Workspace,
        input_ref: &str,
        output_ref: &str,
        sequence_name: &str,
    ) -> PredictionResult {
        if let Err(e) = self.stage_input(input_ref, workspace).await {
            error!("Error preparing input: {}", e);
            return PredictionResult::error(format!("Error with input preparation: {}", e))
                .with_input_path(input_ref)
                .with_output_path(output_ref);
        }

        debug!("Starting inference");
        let output = match self.invoke(workspace).await {
            Ok(output) => output,
            Err(e) => {
                error!("Error running model: {}", e);
                return PredictionResult::error(format!(
                    "Error occurred during model execution: {}",
                    e
                ))
                .with_input_path(input_ref)
                .with_output_path(format!("{}/{}", output_ref, sequence_name));
            }
        };

        if let Err(e) = self.stage_output(workspace, output_ref).await {
            error!("Upload error: {}", e);
            return PredictionResult::error(format!(
                "Model processed successfully but failed to upload results: {}",
                e
            ))
            .with_input_path(input_ref)
            .with_local_output_path(workspace.output_dir().display().to_string());
        }

        debug!("Model output: {}", output.stdout);
        info!("Model script finished successfully");
        PredictionResult::success(format!("{}/{}", output_ref, sequence_name))
    }

    /// Base name of the input without its extension, or a fixed fallback for
    /// references that are neither remote nor an existing local file.
    pub fn sequence_name(&self, input_ref: &str) -> String {
        let remote = self.settings.is_remote(input_ref);
        if !remote && !Path::new(input_ref).exists() {
            warn!(
                "Using placeholder sequence name for unresolvable input: {}",
                input_ref
            );
            return FALLBACK_SEQUENCE_NAME.to_string();
        }
        if !remote {
            warn!("Using local file: {}", input_ref);
        }

        let base = workspace::base_name(input_ref);
        Path::new(base)
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    async fn stage_input(&self, input_ref: &str, workspace: &Workspace) -> Result<()> {
        if !self.settings.is_remote(input_ref) {
            return Err(Error::input(format!(
                "Input path must start with {}",
                self.settings.scheme_prefix()
            )));
        }

        let local = workspace.input_file();
        debug!("Downloading {} to {}", input_ref, local.display());

        match self.fetch_input(input_ref, local).await {
            Ok(()) => Ok(()),
            Err(e) if self.settings.test_mode => {
                error!("Download error: {}", e);
                warn!("Creating placeholder input for test mode at {}", local.display());
                tokio::fs::write(local, TEST_MODE_PLACEHOLDER)
                    .await
                    .map_err(|e| Error::input(format!("Failed to write placeholder input: {}", e)))
            }
            Err(e) => {
                error!("Download error: {}", e);
                Err(Error::input(format!("Failed to download {}: {}", input_ref, e)))
            }
        }
    }

    async fn fetch_input(&self, input_ref: &str, local: &Path) -> Result<()> {
        self.storage.fetch(input_ref, local).await?;

        match tokio::fs::metadata(local).await {
            Ok(meta) if meta.len() > 0 => Ok(()),
            _ => Err(Error::input(format!(
                "{} is empty or was not written",
                local.display()
            ))),
        }
    }

    async fn invoke(&self, workspace: &Workspace) -> Result<crate::runner::ProcessOutput> {
        let output = self
            .runner
            .run(workspace.input_file(), workspace.output_dir())
            .await?;

        if !output.success() {
            error!(
                "Model exited with {:?}: {}",
                output.exit_code, output.stderr
            );
            return Err(Error::processing(format!(
                "Failed to process input: {}",
                output.stderr
            )));
        }

        Ok(output)
    }

    async fn stage_output(&self, workspace: &Workspace, output_ref: &str) -> Result<()> {
        if !self.settings.is_remote(output_ref) {
            info!("Using local path for output: {}", output_ref);
            return Ok(());
        }

        debug!(
            "Uploading results from {} to {}",
            workspace.output_dir().display(),
            output_ref
        );
        let uploaded = self
            .storage
            .store(workspace.output_dir(), output_ref)
            .await
            .map_err(|e| Error::upload(e.to_string()))?;
        debug!("Upload successful: {} files", uploaded);

        Ok(())
    }
}
