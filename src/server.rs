use std::sync::Arc;
use axum::{routing::{get, post}, Router, Json};
use tower_http::cors::{CorsLayer, Any};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use axum::http::StatusCode;
use tracing::{info, warn};
use crate::error::AnalyticsError;
use crate::interface::{QueryInterface, Status};

#[derive(Deserialize)]
pub struct QueryRequest {
    pub operation: String,
    #[serde(default)]
    pub arguments: Value,
}

#[derive(Serialize)]
pub struct QueryResponse {
    pub status: String,
    pub elapsed_ms: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// HTTP status a failed query is answered with.
pub fn status_of(error: &AnalyticsError) -> StatusCode {
    match error {
        AnalyticsError::NotFound { .. } => StatusCode::NOT_FOUND,
        AnalyticsError::InvalidArgument(_) | AnalyticsError::UnknownOperation(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub fn router(interface: Arc<QueryInterface>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
        .allow_headers(Any);
    let status_interface = Arc::clone(&interface);
    Router::new()
        .route("/v1/status", get(move || {
            let iface = Arc::clone(&status_interface);
            async move { Json::<Status>(iface.status()) }
        }))
        .route("/v1/query", post(move |Json(req): Json<QueryRequest>| {
        let iface = Arc::clone(&interface);
        async move {
            // operations are synchronous scans over the snapshot, so they run off the async workers
            let started = std::time::Instant::now();
            let operation = req.operation.clone();
            let outcome = tokio::task::spawn_blocking(move || {
                iface.execute(&req.operation, &req.arguments)
            }).await.map_err(|e| {
                warn!(error=%e, "Join error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Join error")
            })?;
            let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
            match outcome {
                Ok(result) => {
                    info!(%operation, ms=elapsed_ms, "request complete");
                    let body = QueryResponse { status: "ok".into(), elapsed_ms, result: Some(result), error: None };
                    Ok::<_, (StatusCode, &'static str)>((StatusCode::OK, Json(body)))
                }
                Err(e) => {
                    let status = status_of(&e);
                    let msg = format!("{e}");
                    warn!(%operation, %msg, code=%status.as_u16(), "request error");
                    let body = QueryResponse { status: "error".into(), elapsed_ms, result: None, error: Some(msg) };
                    Ok::<_, (StatusCode, &'static str)>((status, Json(body)))
                }
            }
        }
    }))
    .layer(cors)
}
