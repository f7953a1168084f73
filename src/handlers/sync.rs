//! Disparo e acompanhamento da sincronização

use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    response::Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::storage::GarminCredentials;
use crate::sync::{StartOutcome, SyncMode};
use crate::utils::logging::*;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct SyncParams {
    #[serde(rename = "async")]
    pub run_async: Option<String>,
}

impl SyncParams {
    /// `?async=1` devolve logo após aceitar; qualquer outro valor espera o término
    pub fn mode(&self) -> SyncMode {
        match self.run_async.as_deref() {
            Some("1") => SyncMode::Background,
            _ => SyncMode::Wait,
        }
    }
}

/// POST /sync[?async=1]
///
/// Resposta `{success, message, output?}`. Pedido durante uma execução
/// retorna `success: false` sem afetar a execução em andamento.
pub async fn trigger_sync(
    State(state): State<Arc<AppState>>,
    params: Result<Query<SyncParams>, QueryRejection>,
) -> Json<Value> {
    log_request_received("/sync", "POST");

    // Query malformada não é erro: segue como pedido sem `async` (espera o término)
    let params = match params {
        Ok(Query(params)) => params,
        Err(e) => {
            log_validation_error("async", &e.body_text());
            SyncParams::default()
        }
    };

    let credentials = load_garmin_credentials(&state);

    let body = match state.runner.start_sync(credentials, params.mode()).await {
        StartOutcome::Busy => json!({
            "success": false,
            "message": "Sync already running"
        }),
        StartOutcome::Started { run_id } => json!({
            "success": true,
            "message": "Sync started",
            "run_id": run_id
        }),
        StartOutcome::Completed(report) => {
            let message = if report.success { "Sync completed" } else { "Sync failed" };
            json!({
                "success": report.success,
                "message": message,
                "run_id": report.run_id,
                "output": report.output
            })
        }
    };

    Json(body)
}

/// Arquivo ilegível não impede a execução: o processo roda sem credenciais Garmin
fn load_garmin_credentials(state: &AppState) -> Option<GarminCredentials> {
    match state.credentials.read_garmin_credentials() {
        Ok(credentials) => credentials,
        Err(e) => {
            log_warning(&format!("⚠️ Ignoring unreadable Garmin credentials: {}", e));
            None
        }
    }
}

/// GET /status
pub async fn sync_status(State(state): State<Arc<AppState>>) -> Json<Value> {
    let snapshot = state.runner.status().await;

    Json(json!({
        "withings_authenticated": state.credentials.is_withings_authenticated(),
        "garmin_authenticated": state.credentials.is_garmin_authenticated(),
        "sync_running": snapshot.running,
        "sync_log": snapshot.log,
        "last_result": snapshot.last_result,
        "run_id": snapshot.run_id,
        "started_at": snapshot.started_at
    }))
}
