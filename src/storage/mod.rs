//! # Armazenamento de credenciais
//!
//! Arquivos pequenos no diretório de dados do add-on:
//! - `.withings_user.json`: código de autorização / tokens Withings
//! - `.garmin_creds.json`: e-mail e senha do Garmin Connect
//! - `.garmin_session/`: cache de sessão mantido pelo `withings-sync`
//! - `.api_token`: token bearer da API (ver `auth::token_manager`)

pub mod credentials;
pub mod files;

pub use credentials::{ClearReport, CredentialStore, GarminCredentials, WithingsAuth};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("{0} required")]
    MissingField(&'static str),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type CredentialResult<T> = Result<T, CredentialError>;
