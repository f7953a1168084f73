use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use config::builder::DefaultState;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub storage: StorageSettings,
    pub sync: SyncSettings,
    pub withings: WithingsSettings,
    pub auth: AuthSettings,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StorageSettings {
    /// Diretório persistente do add-on (credenciais, sessão Garmin, token)
    pub data_dir: PathBuf,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SyncSettings {
    /// Executável externo de sincronização
    pub program: String,
    /// Argumentos fixos antes das flags do Garmin
    #[serde(default)]
    pub args: Vec<String>,
    /// Espelha cada linha da saída no log do processo
    pub mirror_output: bool,
    /// Quantas linhas o /status devolve
    pub status_tail: usize,
    /// Sem valor = sem timeout (o withings-sync roda até terminar)
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
}

impl SyncSettings {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_seconds.map(Duration::from_secs)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct WithingsSettings {
    pub client_id: String,
    pub callback_url: String,
    pub authorize_endpoint: String,
    pub scope: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AuthSettings {
    /// Exige `Authorization: Bearer` de chamadores não confiáveis em /sync
    pub require_token: bool,
    /// Header injetado pelo proxy de ingress do Home Assistant
    pub proxy_header: String,
    /// Prefixos de IP considerados internos (rede do supervisor)
    pub trusted_networks: Vec<String>,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let mut builder = Self::defaults_builder()?
            // Arquivo de configuração base
            .add_source(File::with_name("config/default").required(false))
            // Arquivo específico do ambiente
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false));

        // Variáveis de ambiente do add-on
        if let Ok(data_dir) = std::env::var("DATA_DIR") {
            builder = builder.set_override("storage.data_dir", data_dir)?;
        }
        if let Ok(program) = std::env::var("WITHINGS_SYNC_BIN") {
            builder = builder.set_override("sync.program", program)?;
        }

        builder = builder.add_source(Environment::with_prefix("WITHINGS_SYNC").separator("__"));

        builder.build()?.try_deserialize()
    }

    /// Apenas os valores padrão, sem arquivos nem ambiente
    pub fn defaults() -> Result<Self, ConfigError> {
        Self::defaults_builder()?.build()?.try_deserialize()
    }

    fn defaults_builder() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8099)?
            .set_default("storage.data_dir", "/data")?
            .set_default("sync.program", "withings-sync")?
            .set_default("sync.args", Vec::<String>::new())?
            .set_default("sync.mirror_output", true)?
            .set_default("sync.status_tail", 50)?
            .set_default(
                "withings.client_id",
                "183e03e1f363110b3551f96765c98c10e8f1aa647a37067a1cb64bbbaf491626",
            )?
            .set_default(
                "withings.callback_url",
                "https://jaroslawhartman.github.io/withings-sync/contrib/withings.html",
            )?
            .set_default("withings.authorize_endpoint", "https://account.withings.com/oauth2_user/authorize2")?
            .set_default("withings.scope", "user.metrics")?
            .set_default("auth.require_token", false)?
            .set_default("auth.proxy_header", "X-Ingress-Path")?
            .set_default("auth.trusted_networks", vec!["172.30.32.", "127.0.0.1"])
    }
}
