use super::types::{ErrorResponse, HealthResponse, PredictBody, PredictResponse};
use crate::{
    pipeline::{Pipeline, PredictionRequest, PredictionResult},
    Result,
};
use axum::{
    body::Bytes,
    extract::State,
    response::{IntoResponse, Json, Response},
};
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, warn, Instrument};

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    info!("Health check called");

    let pipeline = state.pipeline.clone();
    match tokio::task::spawn_blocking(move || pipeline.runner_available()).await {
        Ok(available) => Json(HealthResponse {
            status: "healthy",
            architecture: Some(std::env::consts::ARCH),
            version: Some(env!("CARGO_PKG_VERSION")),
            runner_status: Some(if available { "available" } else { "not found" }),
            test_mode: Some(state.pipeline.settings().test_mode.to_string()),
        }),
        Err(e) => {
            error!("Health check error: {}", e);
            Json(HealthResponse::healthy())
        }
    }
}

/// Always answers 200; failures become `{"error": ...}` or per-instance error results.
pub async fn predict(State(state): State<AppState>, body: Bytes) -> Response {
    info!("Received predict request ({} bytes)", body.len());

    match dispatch(&state, &body).await {
        Ok(value) => Json(value).into_response(),
        Err(e) => {
            error!("Prediction error: {}", e);
            Json(ErrorResponse {
                error: e.to_string(),
            })
            .into_response()
        }
    }
}

pub async fn root(state: State<AppState>, body: Bytes) -> Response {
    info!("Root endpoint called, forwarding to /predict");
    predict(state, body).await
}

async fn dispatch(state: &AppState, body: &[u8]) -> Result<Value> {
    match PredictBody::decode(body)? {
        PredictBody::Batch(instances) => {
            info!("Processing {} instances", instances.len());

            let mut predictions = Vec::with_capacity(instances.len());
            for instance in instances {
                predictions.push(run_instance(&state.pipeline, instance).await);
            }

            Ok(serde_json::to_value(PredictResponse { predictions })?)
        }
        PredictBody::Single(instance) => {
            info!("Processing single direct request");
            let result = run_instance(&state.pipeline, instance).await;
            Ok(serde_json::to_value(result)?)
        }
    }
}

/// Runs one instance on its own task, so dropping the request does not cancel the run.
async fn run_instance(pipeline: &Arc<Pipeline>, instance: Value) -> PredictionResult {
    let request = match serde_json::from_value::<PredictionRequest>(instance) {
        Ok(request) => request,
        Err(e) => {
            warn!("Instance is not a valid request: {}", e);
            return PredictionResult::error(format!("Invalid instance: {}", e));
        }
    };

    let pipeline = pipeline.clone();
    let task = tokio::spawn(
        async move { pipeline.run(request).await }.instrument(tracing::Span::current()),
    );

    match task.await {
        Ok(result) => result,
        Err(e) => {
            error!("Prediction task failed: {}", e);
            PredictionResult::error(format!("Prediction task failed: {}", e))
        }
    }
}
