//! # Autorização e OAuth Withings
//!
//! ## Responsabilidades:
//! - Montar a URL de autorização da Withings
//! - Decidir se um chamador é confiável (ingress / rede interna)
//! - Gerar, persistir e validar o token bearer da API
//!
//! ## Estrutura:
//! - `config.rs`: Configuração OAuth2 da Withings
//! - `policy.rs`: Regras de confiança (estratégias)
//! - `token_manager.rs`: Token bearer da API

pub mod config;
pub mod policy;
pub mod token_manager;

pub use config::WithingsOAuthConfig;
pub use policy::{
    policy_from_settings, AddressPrefixTrust, ProxyHeaderTrust, RequestContext, TrustAny, TrustNobody,
    TrustPolicy,
};
pub use token_manager::ApiTokenManager;
