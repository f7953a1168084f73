use std::sync::Arc;

use axum::{extract::State, response::Json};
use serde_json::{json, Value};

use crate::auth::RequestContext;
use crate::utils::logging::*;
use crate::utils::{AppError, AppResult};
use crate::AppState;

/// GET /api/token
///
/// Entrega (gerando na primeira vez) o token bearer da API.
/// Apenas chamadores confiáveis; os demais recebem 403.
pub async fn get_api_token(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
) -> AppResult<Json<Value>> {
    log_request_received("/api/token", "GET");

    if !state.trust.is_trusted(&ctx) {
        log_warning(&format!("❌ Token requested by untrusted caller {:?}", ctx.remote_addr));
        return Err(AppError::Forbidden("Token is only available to trusted callers".to_string()));
    }

    let token = state.api_tokens.get_or_create().await?;

    Ok(Json(json!({
        "success": true,
        "message": "API token",
        "token": token
    })))
}
