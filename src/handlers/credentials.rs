//! Handlers de credenciais: Garmin, código de autorização Withings e limpeza

use std::sync::Arc;

use axum::{
    extract::{rejection::FormRejection, Form, State},
    response::Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::utils::logging::*;
use crate::utils::{AppError, AppResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct GarminForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct AuthorizeForm {
    #[serde(default)]
    pub code: String,
}

/// POST /garmin
pub async fn save_garmin_credentials(
    State(state): State<Arc<AppState>>,
    form: Result<Form<GarminForm>, FormRejection>,
) -> AppResult<Json<Value>> {
    log_request_received("/garmin", "POST");

    let Ok(Form(form)) = form else {
        log_validation_error("garmin", "missing or malformed form body");
        return Err(AppError::ValidationError("Email and password required".to_string()));
    };

    let email = form.email.trim();
    let password = form.password.trim();

    if email.is_empty() || password.is_empty() {
        log_validation_error("garmin", "email and password required");
        return Err(AppError::ValidationError("Email and password required".to_string()));
    }

    state.credentials.write_garmin_credentials(email, password)?;

    Ok(Json(json!({
        "success": true,
        "message": "Garmin credentials saved"
    })))
}

/// POST /authorize
///
/// Guarda o código de autorização; a troca por tokens fica a cargo do
/// `withings-sync` na próxima execução.
pub async fn save_authorization_code(
    State(state): State<Arc<AppState>>,
    form: Result<Form<AuthorizeForm>, FormRejection>,
) -> AppResult<Json<Value>> {
    log_request_received("/authorize", "POST");

    let Ok(Form(form)) = form else {
        log_validation_error("code", "missing or malformed form body");
        return Err(AppError::ValidationError("No code provided".to_string()));
    };

    let code = form.code.trim();
    if code.is_empty() {
        log_validation_error("code", "no code provided");
        return Err(AppError::ValidationError("No code provided".to_string()));
    }

    state.credentials.write_auth_code(code)?;

    Ok(Json(json!({
        "success": true,
        "message": "Auth code saved. Click 'Sync Now' to complete authentication."
    })))
}

/// POST /clear
///
/// Não consulta o flag de execução: limpar durante uma sincronização é permitido.
pub async fn clear_credentials(State(state): State<Arc<AppState>>) -> Json<Value> {
    log_request_received("/clear", "POST");

    if state.runner.is_running().await {
        log_warning("⚠️ Clearing credentials while a sync is running");
    }

    let report = state.credentials.clear_all();
    if report.is_complete() {
        log_info(&format!("🧹 Credentials cleared ({} removed)", report.removed.len()));
    } else {
        log_error(&format!("❌ {}", report.summary()));
    }

    Json(json!({
        "success": report.is_complete(),
        "message": report.summary()
    }))
}
