//! Montagem do router HTTP

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::handlers::{
    clear_credentials, get_api_token, health_check, index_page, liveness_probe, save_authorization_code,
    save_garmin_credentials, sync_status, trigger_sync,
};
use crate::middleware::require_api_token;
use crate::AppState;

pub fn build_router(state: Arc<AppState>) -> Router {
    // Sincronização: única rota que pode exigir token bearer
    let sync_routes = Router::new()
        .route("/sync", post(trigger_sync))
        .layer(middleware::from_fn_with_state(state.clone(), require_api_token))
        .with_state(state.clone());

    Router::new()
        // Health checks (públicos)
        .route("/_status", get(liveness_probe))
        .route("/health", get(health_check))

        // Página e credenciais
        .route("/", get(index_page))
        .route("/garmin", post(save_garmin_credentials))
        .route("/authorize", post(save_authorization_code))
        .route("/clear", post(clear_credentials))
        .route("/status", get(sync_status))

        // Token da API (apenas chamadores confiáveis)
        .route("/api/token", get(get_api_token))
        .with_state(state)
        .merge(sync_routes)
        .layer(TraceLayer::new_for_http())
}
