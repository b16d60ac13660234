pub mod handlers;
pub mod types;

use crate::{auth::Credentials, config::Config, pipeline::Pipeline, Result};
use axum::{
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use handlers::AppState;
use std::{any::Any, net::SocketAddr, sync::Arc};
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};
use tracing::{error, info};
use types::ErrorResponse;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/predict", post(handlers::predict))
        .route("/", post(handlers::root))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run(config: Config, credentials: Credentials) -> Result<()> {
    info!("Storage credentials source: {}", credentials.source());

    let pipeline = Pipeline::from_config(&config, credentials);
    info!(
        "Pipeline ready (scheme: {}, test mode: {})",
        pipeline.settings().scheme,
        pipeline.settings().test_mode
    );

    let app = router(AppState {
        pipeline: Arc::new(pipeline),
    });

    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);

    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Panics still answer 200 with an `{"error": ...}` body.
fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "Unknown panic".to_string()
    };

    error!("Request handler panicked: {}", message);
    Json(ErrorResponse { error: message }).into_response()
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
