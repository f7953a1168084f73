use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::files::{remove_dir_if_exists, remove_file_if_exists, write_private};
use super::{CredentialError, CredentialResult};
use crate::utils::logging::*;

const WITHINGS_USER_FILE: &str = ".withings_user.json";
const GARMIN_CREDS_FILE: &str = ".garmin_creds.json";
const GARMIN_SESSION_DIR: &str = ".garmin_session";
const API_TOKEN_FILE: &str = ".api_token";

/// Credenciais do Garmin Connect (formato do arquivo `.garmin_creds.json`)
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GarminCredentials {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl GarminCredentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

// Senha nunca aparece em logs
impl fmt::Debug for GarminCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GarminCredentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Conteúdo do `.withings_user.json`.
///
/// A UI grava apenas `authentification_code` (grafia do withings-sync); depois
/// da primeira execução o próprio withings-sync reescreve o arquivo com
/// `access_token`/`refresh_token` e outros campos, preservados como estão.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WithingsAuth {
    fields: Map<String, Value>,
}

impl WithingsAuth {
    pub fn from_fields(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    pub fn authorization_code(&self) -> Option<&str> {
        self.fields.get("authentification_code").and_then(Value::as_str)
    }

    /// Tokens trocados pelo withings-sync estão presentes
    pub fn has_tokens(&self) -> bool {
        self.fields.contains_key("access_token") && self.fields.contains_key("refresh_token")
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }
}

/// Resultado de `clear_all`: cada item é removido de forma independente
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ClearReport {
    pub removed: Vec<String>,
    pub failures: Vec<String>,
}

impl ClearReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn summary(&self) -> String {
        if self.is_complete() {
            "Credentials cleared".to_string()
        } else {
            format!("Some credentials could not be cleared: {}", self.failures.join("; "))
        }
    }
}

/// Leitura e escrita das credenciais no diretório de dados
#[derive(Debug, Clone)]
pub struct CredentialStore {
    data_dir: PathBuf,
}

impl CredentialStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn ensure_data_dir(&self) -> CredentialResult<()> {
        fs::create_dir_all(&self.data_dir)?;
        Ok(())
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn withings_user_file(&self) -> PathBuf {
        self.data_dir.join(WITHINGS_USER_FILE)
    }

    pub fn garmin_creds_file(&self) -> PathBuf {
        self.data_dir.join(GARMIN_CREDS_FILE)
    }

    pub fn garmin_session_dir(&self) -> PathBuf {
        self.data_dir.join(GARMIN_SESSION_DIR)
    }

    pub fn api_token_file(&self) -> PathBuf {
        self.data_dir.join(API_TOKEN_FILE)
    }

    // ------------------------------------------------------------------
    // Garmin
    // ------------------------------------------------------------------

    pub fn read_garmin_credentials(&self) -> CredentialResult<Option<GarminCredentials>> {
        let Some(raw) = read_if_exists(&self.garmin_creds_file())? else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_str(&raw)?))
    }

    /// Valida antes de tocar o disco: e-mail e senha são obrigatórios
    pub fn write_garmin_credentials(&self, email: &str, password: &str) -> CredentialResult<()> {
        let email = email.trim();
        let password = password.trim();

        if email.is_empty() {
            return Err(CredentialError::MissingField("Email"));
        }
        if password.is_empty() {
            return Err(CredentialError::MissingField("Password"));
        }

        let creds = GarminCredentials::new(email, password);
        write_private(&self.garmin_creds_file(), &serde_json::to_vec(&creds)?)?;

        log_credentials_saved("Garmin");
        Ok(())
    }

    pub fn has_cached_session(&self) -> bool {
        fs::read_dir(self.garmin_session_dir())
            .map(|mut entries| entries.next().is_some())
            .unwrap_or(false)
    }

    pub fn is_garmin_authenticated(&self) -> bool {
        self.garmin_creds_file().exists() || self.has_cached_session()
    }

    // ------------------------------------------------------------------
    // Withings
    // ------------------------------------------------------------------

    pub fn read_withings_auth(&self) -> CredentialResult<Option<WithingsAuth>> {
        let Some(raw) = read_if_exists(&self.withings_user_file())? else {
            return Ok(None);
        };
        let fields: Map<String, Value> = serde_json::from_str(&raw)?;
        Ok(Some(WithingsAuth::from_fields(fields)))
    }

    /// Grava o código de autorização; a troca por tokens fica com o withings-sync
    pub fn write_auth_code(&self, code: &str) -> CredentialResult<()> {
        let code = code.trim();
        if code.is_empty() {
            return Err(CredentialError::MissingField("Authorization code"));
        }

        let body = serde_json::to_vec_pretty(&json!({ "authentification_code": code }))?;
        write_private(&self.withings_user_file(), &body)?;

        log_credentials_saved("Withings");
        Ok(())
    }

    pub fn is_withings_authenticated(&self) -> bool {
        match self.read_withings_auth() {
            Ok(Some(auth)) => auth.has_tokens(),
            Ok(None) => false,
            Err(e) => {
                log_warning(&format!("⚠️ Withings user file unreadable: {}", e));
                false
            }
        }
    }

    // ------------------------------------------------------------------
    // Limpeza
    // ------------------------------------------------------------------

    /// Remove credenciais e sessão; uma falha não impede as demais remoções
    pub fn clear_all(&self) -> ClearReport {
        let mut report = ClearReport::default();

        let targets = [
            ("Withings user file", self.withings_user_file(), false),
            ("Garmin credentials", self.garmin_creds_file(), false),
            ("Garmin session", self.garmin_session_dir(), true),
        ];

        for (label, path, is_dir) in targets {
            let result = if is_dir {
                remove_dir_if_exists(&path)
            } else {
                remove_file_if_exists(&path)
            };

            match result {
                Ok(true) => report.removed.push(label.to_string()),
                Ok(false) => {}
                Err(e) => {
                    log_error(&format!("❌ Failed to remove {}: {}", path.display(), e));
                    report.failures.push(format!("{}: {}", label, e));
                }
            }
        }

        report
    }
}

fn read_if_exists(path: &Path) -> CredentialResult<Option<String>> {
    match fs::read_to_string(path) {
        Ok(raw) => Ok(Some(raw)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}
