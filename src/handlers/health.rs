use axum::{http::StatusCode, response::Json};
use serde_json::{json, Value};

use crate::utils::logging::*;

/// GET /_status
///
/// Sonda de liveness do ingress: sempre 200 com corpo vazio.
pub async fn liveness_probe() -> StatusCode {
    log_health_check();
    StatusCode::OK
}

pub async fn health_check() -> Json<Value> {
    log_health_check();

    Json(json!({
        "status": "healthy",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}
