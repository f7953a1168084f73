//! Withings OAuth2 Configuration
//!
//! Só monta a URL de autorização; a troca do código por tokens é feita
//! pelo próprio `withings-sync` na primeira execução.

use serde::{Deserialize, Serialize};

use crate::config::WithingsSettings;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithingsOAuthConfig {
    /// Client ID público do projeto withings-sync
    pub client_id: String,

    /// Página de callback que exibe o código para o usuário copiar
    pub callback_url: String,

    /// Endpoint de autorização da Withings
    pub authorize_endpoint: String,

    pub scope: String,
}

impl WithingsOAuthConfig {
    pub fn from_settings(settings: &WithingsSettings) -> Self {
        Self {
            client_id: settings.client_id.clone(),
            callback_url: settings.callback_url.clone(),
            authorize_endpoint: settings.authorize_endpoint.clone(),
            scope: settings.scope.clone(),
        }
    }

    /// Gerar URL de autorização da Withings
    pub fn authorization_url(&self) -> String {
        format!(
            "{}?response_type=code&client_id={}&state=OK&scope={}&redirect_uri={}",
            self.authorize_endpoint,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.scope),
            urlencoding::encode(&self.callback_url)
        )
    }
}
