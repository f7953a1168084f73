use tracing::{debug, error, info, warn};

/// Target usado para espelhar a saída do `withings-sync` no log do processo
pub const SYNC_OUTPUT_TARGET: &str = "withings_sync::output";

pub fn log_request_received(endpoint: &str, method: &str) {
    info!("Request received: {} {}", method, endpoint);
}

pub fn log_config_loaded(env: &str) {
    info!("Configuration loaded successfully for environment: {}", env);
}

pub fn log_server_startup(port: u16) {
    info!("🚀 Withings sync add-on server starting on port {}", port);
}

pub fn log_server_ready(port: u16) {
    info!("✅ Server ready and listening on http://0.0.0.0:{}", port);
}

pub fn log_health_check() {
    debug!("Health check requested");
}

pub fn log_validation_error(field: &str, message: &str) {
    warn!("Validation error: {} - {}", field, message);
}

pub fn log_sync_started(run_id: &str, mode: &str) {
    info!("🔄 Sync started: run {} ({})", run_id, mode);
}

pub fn log_sync_rejected() {
    warn!("⏳ Sync request rejected - another sync is already running");
}

pub fn log_sync_finished(run_id: &str, success: bool, exit_code: Option<i32>) {
    if success {
        info!("✅ Sync finished: run {} - exit code {:?}", run_id, exit_code);
    } else {
        warn!("❌ Sync failed: run {} - exit code {:?}", run_id, exit_code);
    }
}

pub fn log_sync_output(line: &str) {
    info!(target: SYNC_OUTPUT_TARGET, "{}", line);
}

pub fn log_credentials_saved(kind: &str) {
    info!("💾 {} credentials saved", kind);
}

pub fn log_info(message: &str) {
    info!("{}", message);
}

pub fn log_error(message: &str) {
    error!("{}", message);
}

pub fn log_warning(message: &str) {
    warn!("{}", message);
}
