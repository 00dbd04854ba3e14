use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use super::{FUNCTION_PATH, FunctionRequest, FunctionResponse, HEALTH_PATH};
use crate::app::Application;
use crate::classify::{self, Classifier};
use crate::config::HandlerSettings;
use crate::frame;
use crate::metrics::{Metrics, report};
use crate::utils::{Error, Result};

#[derive(Clone)]
struct HandlerState {
    classifier: Arc<dyn Classifier>,
    metrics: Arc<Metrics>,
}

type HandlerError = (StatusCode, String);

pub fn router(classifier: Arc<dyn Classifier>, metrics: Arc<Metrics>) -> Router {
    let state = HandlerState {
        classifier,
        metrics,
    };
    Router::new()
        .route(FUNCTION_PATH, post(invoke))
        .route(HEALTH_PATH, get(healthz))
        .with_state(state)
}

/// Binds the configured address and serves the function until the process
/// ends.
pub async fn serve(settings: HandlerSettings) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", settings.server.host, settings.server.port)
        .parse()
        .map_err(|e| Error::Config(format!("invalid handler address: {e}")))?;
    let classifier = classify::for_application(
        Application::ImageClassification,
        settings.classify_rounds,
        settings.cpu_threads,
    );

    let listener = TcpListener::bind(addr).await?;
    info!("Function handler listening on {addr}");
    axum::serve(listener, router(classifier, Arc::new(Metrics::new()))).await?;
    Ok(())
}

async fn healthz() -> &'static str {
    "ok"
}

async fn invoke(
    State(state): State<HandlerState>,
    Json(request): Json<FunctionRequest>,
) -> std::result::Result<Json<FunctionResponse>, HandlerError> {
    let arrived_ns = frame::now_ns();
    let started = Instant::now();

    let origin_ns: u64 = request
        .time
        .parse()
        .map_err(|_| bad_request(format!("invalid time field: {}", request.time)))?;
    debug!("One-way latency (ns): {}", arrived_ns.saturating_sub(origin_ns));

    let image = BASE64
        .decode(request.image.as_bytes())
        .map_err(|e| bad_request(format!("invalid image encoding: {e}")))?;

    let classifier = state.classifier.clone();
    let classification = tokio::task::spawn_blocking(move || classifier.classify(&image))
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .map_err(|e| {
            state.metrics.record_classify_error();
            warn!("{e}");
            (StatusCode::UNPROCESSABLE_ENTITY, e.to_string())
        })?;
    debug!("Labels: {:?}", classification.labels);

    report::processing(started.elapsed());
    state.metrics.record_processed();

    Ok(Json(FunctionResponse { time: origin_ns }))
}

fn bad_request(message: String) -> HandlerError {
    warn!("Rejected request: {message}");
    (StatusCode::BAD_REQUEST, message)
}
