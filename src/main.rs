/// Withings Sync add-on
///
/// Servidor HTTP que guarda as credenciais Withings/Garmin e dispara o
/// `withings-sync` sob demanda, expondo o log da execução para a página.
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use withings_sync_addon::config::Settings;
use withings_sync_addon::routes::build_router;
use withings_sync_addon::utils::logging::*;
use withings_sync_addon::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env é opcional; no container as variáveis vêm do ambiente
    let dotenv_loaded = dotenvy::dotenv().is_ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if dotenv_loaded {
        log_info("✅ .env file loaded");
    }

    let settings = Settings::new().context("failed to load settings")?;
    log_config_loaded(&std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string()));

    let state = AppState::from_settings(settings);
    state
        .credentials
        .ensure_data_dir()
        .with_context(|| format!("failed to create data dir {}", state.credentials.data_dir().display()))?;

    log_info(&format!(
        "📁 Data dir: {} - sync program: {}",
        state.credentials.data_dir().display(),
        state.settings.sync.program
    ));
    log_info(&format!("🔐 Trust policy: {}", state.trust.describe()));
    if state.settings.auth.require_token {
        log_info("🔐 Bearer token required for /sync from untrusted callers");
    }

    let host = state.settings.server.host.clone();
    let port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(state.settings.server.port);

    let app = build_router(Arc::new(state));

    log_server_startup(port);
    let listener = TcpListener::bind(format!("{}:{}", host, port))
        .await
        .with_context(|| format!("failed to bind {}:{}", host, port))?;
    log_server_ready(port);

    // Endereço de origem é usado pela política de confiança
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log_info("🛑 Server shut down gracefully");
    Ok(())
}

/// Signal handler para graceful shutdown
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log_error(&format!("❌ Failed to listen for Ctrl+C: {}", e));
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                log_error(&format!("❌ Failed to install SIGTERM handler: {}", e));
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            log_info("🛑 Received Ctrl+C, shutting down gracefully...");
        },
        _ = terminate => {
            log_info("🛑 Received SIGTERM, shutting down gracefully...");
        }
    }
}
