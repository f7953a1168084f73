//! Middleware layer para o Axum router
//!
//! - Autorização do endpoint de sincronização (token bearer / chamador confiável)
//! - Extração do `RequestContext` (headers + endereço de origem)

pub mod api_auth;

pub use api_auth::require_api_token;
