//! Middleware de autenticação para o endpoint de sincronização
//!
//! Quando `auth.require_token` está ativo, o chamador precisa ser confiável
//! (ingress do Home Assistant / rede interna) ou enviar o token da API.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    async_trait,
    extract::{ConnectInfo, FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};

use crate::auth::RequestContext;
use crate::utils::logging::*;
use crate::utils::{AppError, AppResult};
use crate::AppState;

#[async_trait]
impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // ConnectInfo só existe quando o servidor usa into_make_service_with_connect_info
        let remote_addr = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());

        Ok(RequestContext::new(parts.headers.clone(), remote_addr))
    }
}

/// Middleware que exige chamador confiável ou `Authorization: Bearer <token>`
///
/// # Respostas
///
/// - Continua para o handler: autorização desligada, chamador confiável ou token correto
/// - **401 Unauthorized**: token ausente ou inválido
pub async fn require_api_token(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    request: Request,
    next: Next,
) -> AppResult<Response> {
    if !state.settings.auth.require_token {
        return Ok(next.run(request).await);
    }

    if state.trust.is_trusted(&ctx) {
        tracing::debug!("✅ Trusted caller ({})", state.trust.describe());
        return Ok(next.run(request).await);
    }

    let Some(presented) = ctx.bearer_token() else {
        log_warning(&format!("❌ Missing bearer token from {:?}", ctx.remote_addr));
        return Err(AppError::Unauthorized("Missing bearer token".to_string()));
    };

    if !state.api_tokens.verify(presented).await? {
        log_warning(&format!("❌ Invalid bearer token from {:?}", ctx.remote_addr));
        return Err(AppError::Unauthorized("Invalid bearer token".to_string()));
    }

    tracing::debug!("✅ Bearer token accepted");
    Ok(next.run(request).await)
}
