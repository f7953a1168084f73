//! API Token Manager
//!
//! Token bearer único do add-on: gerado sob demanda, persistido em disco
//! (0600) e mantido em cache na memória.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::storage::files::write_private;
use crate::storage::CredentialResult;
use crate::utils::logging::*;
use crate::utils::mask_secret;

/// Bytes aleatórios por token (64 caracteres em hex)
const TOKEN_BYTES: usize = 32;

/// Gerenciador do token bearer
#[derive(Debug, Clone)]
pub struct ApiTokenManager {
    path: PathBuf,
    // Mutex (e não RwLock): a primeira leitura pode gerar o token
    cache: Arc<Mutex<Option<String>>>,
}

impl ApiTokenManager {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: Arc::new(Mutex::new(None)),
        }
    }

    /// Obter token (cache → arquivo → gerar e persistir)
    pub async fn get_or_create(&self) -> CredentialResult<String> {
        let mut cache = self.cache.lock().await;

        if let Some(token) = cache.as_ref() {
            return Ok(token.clone());
        }

        let token = match self.load()? {
            Some(token) => token,
            None => {
                let token = generate_token();
                write_private(&self.path, token.as_bytes())?;
                log_info(&format!("🔑 [ApiToken] New API token generated: {}", mask_secret(&token, 6)));
                token
            }
        };

        *cache = Some(token.clone());
        Ok(token)
    }

    /// Compara o token apresentado com o armazenado (tempo constante)
    pub async fn verify(&self, presented: &str) -> CredentialResult<bool> {
        let expected = self.get_or_create().await?;
        Ok(constant_time_eq(presented.as_bytes(), expected.as_bytes()))
    }

    fn load(&self) -> CredentialResult<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => {
                let token = raw.trim().to_string();
                Ok((!token.is_empty()).then_some(token))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

fn generate_token() -> String {
    hex::encode(rand::random::<[u8; TOKEN_BYTES]>())
}

// Comparação de tempo constante para evitar timing attacks
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}
