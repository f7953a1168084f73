//! Montagem da invocação do `withings-sync`

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;

use crate::config::SyncSettings;
use crate::storage::{CredentialStore, GarminCredentials};

/// Programa + argumentos + ambiente do processo externo.
///
/// As variáveis de ambiente apontam o withings-sync para os arquivos do
/// diretório de dados, assim os tokens e a sessão Garmin que ele grava
/// persistem entre execuções.
#[derive(Debug, Clone)]
pub struct SyncCommand {
    program: String,
    leading_args: Vec<String>,
    home_dir: PathBuf,
    withings_user_file: PathBuf,
    garmin_session_dir: PathBuf,
}

impl SyncCommand {
    pub fn new(program: impl Into<String>, leading_args: Vec<String>, store: &CredentialStore) -> Self {
        Self {
            program: program.into(),
            leading_args,
            home_dir: store.data_dir().to_path_buf(),
            withings_user_file: store.withings_user_file(),
            garmin_session_dir: store.garmin_session_dir(),
        }
    }

    pub fn from_settings(settings: &SyncSettings, store: &CredentialStore) -> Self {
        Self::new(settings.program.clone(), settings.args.clone(), store)
    }

    /// Nome curto do executável, usado na primeira linha do log
    pub fn display_name(&self) -> String {
        Path::new(&self.program)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.program.clone())
    }

    /// Argumentos; flags do Garmin só quando preenchidas
    pub fn arguments(&self, credentials: Option<&GarminCredentials>) -> Vec<String> {
        let mut args = self.leading_args.clone();

        if let Some(creds) = credentials {
            if !creds.email.is_empty() {
                args.push("--garmin-username".to_string());
                args.push(creds.email.clone());
            }
            if !creds.password.is_empty() {
                args.push("--garmin-password".to_string());
                args.push(creds.password.clone());
            }
        }

        args
    }

    pub fn environment(&self) -> Vec<(&'static str, OsString)> {
        vec![
            ("HOME", self.home_dir.clone().into_os_string()),
            ("WITHINGS_USER", self.withings_user_file.clone().into_os_string()),
            ("GARMIN_SESSION", self.garmin_session_dir.clone().into_os_string()),
        ]
    }

    /// Comando pronto para `spawn`, com stdin nulo.
    /// stdout/stderr ficam por conta de quem executa.
    pub fn to_command(&self, credentials: Option<&GarminCredentials>) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(self.arguments(credentials))
            .envs(self.environment())
            .stdin(Stdio::null())
            .kill_on_drop(true);
        command
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command() -> SyncCommand {
        SyncCommand::new("/usr/local/bin/withings-sync", vec![], &CredentialStore::new("/data"))
    }

    #[test]
    fn test_arguments_without_credentials() {
        assert!(command().arguments(None).is_empty());
        assert!(command().arguments(Some(&GarminCredentials::default())).is_empty());
    }

    #[test]
    fn test_arguments_with_credentials() {
        let creds = GarminCredentials::new("user@example.com", "hunter2");
        assert_eq!(
            command().arguments(Some(&creds)),
            vec!["--garmin-username", "user@example.com", "--garmin-password", "hunter2"]
        );
    }

    #[test]
    fn test_only_non_empty_flags() {
        let creds = GarminCredentials::new("user@example.com", "");
        assert_eq!(
            command().arguments(Some(&creds)),
            vec!["--garmin-username", "user@example.com"]
        );
    }

    #[test]
    fn test_leading_args_come_first() {
        let cmd = SyncCommand::new("/bin/sh", vec!["-c".into(), "exit 0".into()], &CredentialStore::new("/data"));
        let creds = GarminCredentials::new("u", "p");
        assert_eq!(
            cmd.arguments(Some(&creds)),
            vec!["-c", "exit 0", "--garmin-username", "u", "--garmin-password", "p"]
        );
    }

    #[test]
    fn test_environment_points_at_data_dir() {
        let env = command().environment();
        assert_eq!(env[0], ("HOME", OsString::from("/data")));
        assert_eq!(env[1], ("WITHINGS_USER", OsString::from("/data/.withings_user.json")));
        assert_eq!(env[2], ("GARMIN_SESSION", OsString::from("/data/.garmin_session")));
    }

    #[test]
    fn test_display_name() {
        assert_eq!(command().display_name(), "withings-sync");
        let plain = SyncCommand::new("withings-sync", vec![], &CredentialStore::new("/data"));
        assert_eq!(plain.display_name(), "withings-sync");
    }
}
