use serde::{Deserialize, Serialize};

/// One unit of work: where to read the video and where to put the results.
///
/// Both fields may be absent; the pipeline substitutes test defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionRequest {
    #[serde(default)]
    pub input_video_path: Option<String>,
    #[serde(default)]
    pub output_gcs_path: Option<String>,
}

impl PredictionRequest {
    pub fn new(input: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            input_video_path: Some(input.into()),
            output_gcs_path: Some(output.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PredictionStatus {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub status: PredictionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_output_path: Option<String>,
}

impl PredictionResult {
    pub fn success(output_path: impl Into<String>) -> Self {
        Self {
            status: PredictionStatus::Success,
            output_path: Some(output_path.into()),
            message: None,
            input_path: None,
            local_output_path: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: PredictionStatus::Error,
            output_path: None,
            message: Some(message.into()),
            input_path: None,
            local_output_path: None,
        }
    }

    pub fn with_input_path(mut self, path: impl Into<String>) -> Self {
        self.input_path = Some(path.into());
        self
    }

    pub fn with_output_path(mut self, path: impl Into<String>) -> Self {
        self.output_path = Some(path.into());
        self
    }

    pub fn with_local_output_path(mut self, path: impl Into<String>) -> Self {
        self.local_output_path = Some(path.into());
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == PredictionStatus::Success
    }
}
