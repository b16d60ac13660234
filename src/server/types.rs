use crate::{pipeline::PredictionResult, Error, Result};
use serde::Serialize;
use serde_json::Value;

/// Decoded `/predict` body.
#[derive(Debug, Clone, PartialEq)]
pub enum PredictBody {
    /// `{"instances": [...]}`. Entries stay raw so a malformed one only fails its own slot.
    Batch(Vec<Value>),
    /// A bare request object, checked against the request shape when it runs.
    Single(Value),
}

impl PredictBody {
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let value: Value = serde_json::from_slice(bytes)?;

        match value {
            Value::Object(mut map) if map.contains_key("instances") => {
                match map.remove("instances") {
                    Some(Value::Array(instances)) => Ok(Self::Batch(instances)),
                    Some(Value::Null) | None => Ok(Self::Batch(Vec::new())),
                    Some(other) => Err(Error::invalid_request(format!(
                        "`instances` must be an array, got {}",
                        other
                    ))),
                }
            }
            Value::Object(map) => Ok(Self::Single(Value::Object(map))),
            other => Err(Error::invalid_request(format!(
                "expected a JSON object, got {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub predictions: Vec<PredictionResult>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub architecture: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runner_status: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_mode: Option<String>,
}

impl HealthResponse {
    pub fn healthy() -> Self {
        Self {
            status: "healthy",
            architecture: None,
            version: None,
            runner_status: None,
            test_mode: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_batch() {
        let body = json!({"instances": [{"input_video_path": "gs://b/a.mp4"}, 7]});
        let decoded = PredictBody::decode(body.to_string().as_bytes()).unwrap();
        assert_eq!(
            decoded,
            PredictBody::Batch(vec![json!({"input_video_path": "gs://b/a.mp4"}), json!(7)])
        );
    }

    #[test]
    fn test_decode_null_instances_is_empty_batch() {
        let decoded = PredictBody::decode(br#"{"instances": null}"#).unwrap();
        assert_eq!(decoded, PredictBody::Batch(vec![]));
    }

    #[test]
    fn test_decode_single() {
        let decoded = PredictBody::decode(
            br#"{"input_video_path": "gs://b/a.mp4", "output_gcs_path": "gs://b/out"}"#,
        )
        .unwrap();
        assert_eq!(
            decoded,
            PredictBody::Single(json!({
                "input_video_path": "gs://b/a.mp4",
                "output_gcs_path": "gs://b/out"
            }))
        );
    }

    #[test]
    fn test_decode_empty_object_is_default_single() {
        let decoded = PredictBody::decode(b"{}").unwrap();
        assert_eq!(decoded, PredictBody::Single(json!({})));
    }

    #[test]
    fn test_decode_single_with_wrong_field_type_is_deferred() {
        let decoded = PredictBody::decode(br#"{"input_video_path": 5}"#).unwrap();
        assert_eq!(decoded, PredictBody::Single(json!({"input_video_path": 5})));
    }

    #[test]
    fn test_decode_rejects() {
        assert!(matches!(
            PredictBody::decode(br#"{"instances": "nope"}"#),
            Err(Error::InvalidRequest(_))
        ));
        assert!(matches!(
            PredictBody::decode(b"[1, 2]"),
            Err(Error::InvalidRequest(_))
        ));
        assert!(matches!(
            PredictBody::decode(b"not json"),
            Err(Error::Serialization(_))
        ));
    }
}
