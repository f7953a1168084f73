// Biblioteca do add-on Withings Sync
// Expõe módulos para uso em testes e no binário

pub mod auth;
pub mod config;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod storage;
pub mod sync;
pub mod utils;

use std::sync::Arc;

use auth::{ApiTokenManager, TrustPolicy, WithingsOAuthConfig};
use storage::CredentialStore;
use sync::SyncJobRunner;

// AppState é definido aqui para ser compartilhado
#[derive(Clone)]
pub struct AppState {
    pub settings: config::Settings,
    pub credentials: CredentialStore,
    pub runner: SyncJobRunner,
    pub api_tokens: ApiTokenManager,
    pub trust: Arc<dyn TrustPolicy>,
    pub withings_oauth: WithingsOAuthConfig,
}

impl AppState {
    pub fn from_settings(settings: config::Settings) -> Self {
        let credentials = CredentialStore::new(settings.storage.data_dir.clone());
        let runner = SyncJobRunner::from_settings(&settings.sync, &credentials);
        let api_tokens = ApiTokenManager::new(credentials.api_token_file());
        let trust: Arc<dyn TrustPolicy> = Arc::from(auth::policy_from_settings(&settings.auth));
        let withings_oauth = WithingsOAuthConfig::from_settings(&settings.withings);

        Self {
            settings,
            credentials,
            runner,
            api_tokens,
            trust,
            withings_oauth,
        }
    }

    /// Troca a política de confiança (testes e variantes de implantação)
    pub fn with_trust_policy(mut self, trust: Arc<dyn TrustPolicy>) -> Self {
        self.trust = trust;
        self
    }
}
