use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use crate::storage::CredentialError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    ValidationError(String),

    #[error("Storage error: {0}")]
    Storage(#[from] CredentialError),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),
}

impl AppError {
    /// Status HTTP da resposta. Apenas falhas de autorização saem de 2xx;
    /// os demais erros viram `success: false` para a UI tratar.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            _ => StatusCode::OK,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Validação já é logada no handler; aqui só o que é inesperado
        if let AppError::Storage(_) = &self {
            tracing::error!("❌ {}", self);
        }

        let body = json!({
            "success": false,
            "message": self.to_string(),
            "status": status.as_u16()
        });

        if status == StatusCode::UNAUTHORIZED {
            return (status, [(header::WWW_AUTHENTICATE, "Bearer")], axum::Json(body)).into_response();
        }

        (status, axum::Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
