//! SyncJobRunner
//!
//! Garante no máximo uma sincronização por vez, lança o `withings-sync`,
//! acumula a saída (stdout + stderr intercalados) e registra o resultado.

use std::io::{BufRead, BufReader, PipeReader};
use std::process::ExitStatus;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use super::command::SyncCommand;
use super::job::{JobState, StartOutcome, StatusSnapshot, SyncMode, SyncReport};
use crate::config::SyncSettings;
use crate::storage::{CredentialStore, GarminCredentials};
use crate::utils::logging::*;

/// Falhas internas de uma execução; viram a última linha do log
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("failed to start {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read sync output: {0}")]
    Output(std::io::Error),

    #[error("failed to wait for sync process: {0}")]
    Wait(std::io::Error),

    #[error("output reader stopped: {0}")]
    Reader(String),

    #[error("sync timed out after {0:?}")]
    TimedOut(Duration),
}

#[derive(Debug, Clone)]
pub struct RunnerOptions {
    pub mirror_output: bool,
    pub status_tail: usize,
    /// `None` = roda até o processo terminar
    pub timeout: Option<Duration>,
}

impl RunnerOptions {
    pub fn from_settings(settings: &SyncSettings) -> Self {
        Self {
            mirror_output: settings.mirror_output,
            status_tail: settings.status_tail,
            timeout: settings.timeout(),
        }
    }
}

/// Desfecho de uma execução antes de ser gravado no estado
#[derive(Debug)]
struct RunOutcome {
    success: bool,
    exit_code: Option<i32>,
    final_line: String,
}

impl RunOutcome {
    fn from_status(status: ExitStatus) -> Self {
        match status.code() {
            Some(0) => Self {
                success: true,
                exit_code: Some(0),
                final_line: "✓ Sync completed successfully!".to_string(),
            },
            Some(code) => Self {
                success: false,
                exit_code: Some(code),
                final_line: format!("✗ Sync failed with code {}", code),
            },
            None => Self {
                success: false,
                exit_code: None,
                final_line: "✗ Sync terminated by signal".to_string(),
            },
        }
    }

    fn from_error(error: &SyncError) -> Self {
        let final_line = match error {
            SyncError::TimedOut(limit) => format!("✗ Sync timed out after {:?}", limit),
            other => format!("✗ Error: {}", other),
        };
        Self {
            success: false,
            exit_code: None,
            final_line,
        }
    }
}

#[derive(Clone)]
pub struct SyncJobRunner {
    state: Arc<RwLock<JobState>>,
    command: Arc<SyncCommand>,
    options: RunnerOptions,
}

impl SyncJobRunner {
    pub fn new(command: SyncCommand, options: RunnerOptions) -> Self {
        Self {
            state: Arc::new(RwLock::new(JobState::default())),
            command: Arc::new(command),
            options,
        }
    }

    pub fn from_settings(settings: &SyncSettings, store: &CredentialStore) -> Self {
        Self::new(SyncCommand::from_settings(settings, store), RunnerOptions::from_settings(settings))
    }

    /// Inicia uma sincronização se nenhuma estiver em andamento.
    ///
    /// Pedidos concorrentes são rejeitados (`Busy`), nunca enfileirados.
    /// A execução roda numa task própria, então um chamador em modo `Wait`
    /// que desista (conexão fechada) não interrompe o processo.
    pub async fn start_sync(&self, credentials: Option<GarminCredentials>, mode: SyncMode) -> StartOutcome {
        let accepted = self.state.write().await.try_begin();
        let Some(run_id) = accepted else {
            log_sync_rejected();
            return StartOutcome::Busy;
        };

        log_sync_started(&run_id.to_string(), mode.as_str());

        let worker = {
            let runner = self.clone();
            tokio::spawn(async move { runner.execute(credentials).await })
        };

        // Supervisor: qualquer desfecho do worker, inclusive panic, volta o estado para ocioso
        let supervisor = {
            let runner = self.clone();
            tokio::spawn(async move {
                let outcome = match worker.await {
                    Ok(outcome) => outcome,
                    Err(e) => RunOutcome {
                        success: false,
                        exit_code: None,
                        final_line: format!("✗ Error: sync task aborted: {}", e),
                    },
                };
                runner.finish(run_id, outcome).await
            })
        };

        match mode {
            SyncMode::Background => StartOutcome::Started { run_id },
            SyncMode::Wait => match supervisor.await {
                Ok(report) => StartOutcome::Completed(report),
                Err(e) => {
                    log_error(&format!("❌ Sync supervisor failed for run {}: {}", run_id, e));
                    let output = self.state.read().await.log.clone();
                    StartOutcome::Completed(SyncReport {
                        run_id,
                        success: false,
                        output,
                    })
                }
            },
        }
    }

    /// Fotografia do estado; só segura o lock de leitura durante a cópia
    pub async fn status(&self) -> StatusSnapshot {
        self.state.read().await.snapshot(self.options.status_tail)
    }

    pub async fn is_running(&self) -> bool {
        self.state.read().await.running
    }

    async fn execute(&self, credentials: Option<GarminCredentials>) -> RunOutcome {
        self.append_line(format!("Running: {}", self.command.display_name())).await;

        match self.run_process(credentials.as_ref()).await {
            Ok(status) => RunOutcome::from_status(status),
            Err(e) => {
                log_error(&format!("❌ Sync execution error: {}", e));
                RunOutcome::from_error(&e)
            }
        }
    }

    async fn run_process(&self, credentials: Option<&GarminCredentials>) -> Result<ExitStatus, SyncError> {
        // stdout e stderr no mesmo pipe: a ordem do log é a ordem de escrita do processo
        let (reader, writer) = std::io::pipe().map_err(SyncError::Output)?;
        let stderr_writer = writer.try_clone().map_err(SyncError::Output)?;

        let mut command = self.command.to_command(credentials);
        command.stdout(writer).stderr(stderr_writer);
        let spawned = command.spawn();
        // O Command guarda as pontas de escrita; sem soltá-lo o leitor nunca recebe EOF
        drop(command);

        let mut child = spawned.map_err(|source| SyncError::Launch {
            program: self.command.display_name(),
            source,
        })?;

        // Sem limite de linhas: o modo Wait devolve o log completo da execução
        let (tx, mut rx) = mpsc::unbounded_channel();
        let pump = tokio::task::spawn_blocking(move || pump_lines(reader, tx));

        let drive = async {
            while let Some(line) = rx.recv().await {
                self.append_line(line).await;
            }
            pump.await
                .map_err(|e| SyncError::Reader(e.to_string()))?
                .map_err(SyncError::Output)?;
            let status = child.wait().await.map_err(SyncError::Wait)?;
            Ok::<ExitStatus, SyncError>(status)
        };

        let waited = match self.options.timeout {
            Some(limit) => tokio::time::timeout(limit, drive).await.map_err(|_| limit),
            None => Ok(drive.await),
        };

        match waited {
            Ok(result) => result,
            Err(limit) => {
                log_warning(&format!("⏱️ Sync exceeded {:?}, killing process", limit));
                if let Err(e) = child.kill().await {
                    log_error(&format!("❌ Failed to kill sync process: {}", e));
                }
                Err(SyncError::TimedOut(limit))
            }
        }
    }

    async fn append_line(&self, line: String) {
        if self.options.mirror_output {
            log_sync_output(&line);
        }
        self.state.write().await.log.push(line);
    }

    async fn finish(&self, run_id: Uuid, outcome: RunOutcome) -> SyncReport {
        let (result, output) = {
            let mut state = self.state.write().await;
            let result = state.finish(outcome.final_line, outcome.success, outcome.exit_code);
            (result, state.log.clone())
        };

        log_sync_finished(&run_id.to_string(), result.success, result.exit_code);

        SyncReport {
            run_id,
            success: result.success,
            output,
        }
    }
}

/// Lê o pipe linha a linha (thread bloqueante) e repassa para a task assíncrona
fn pump_lines(reader: PipeReader, tx: mpsc::UnboundedSender<String>) -> std::io::Result<()> {
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            return Ok(());
        }
        let line = String::from_utf8_lossy(&buf).trim().to_string();
        if tx.send(line).is_err() {
            // Receptor descartado (timeout); nada mais a fazer
            return Ok(());
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::path::Path;

    const SUCCESS_LINE: &str = "✓ Sync completed successfully!";

    fn options() -> RunnerOptions {
        RunnerOptions {
            mirror_output: false,
            status_tail: 50,
            timeout: None,
        }
    }

    /// Stub do withings-sync: `/bin/sh -c <script> withings-sync [flags...]`
    fn stub_runner(dir: &Path, script: &str, options: RunnerOptions) -> SyncJobRunner {
        let store = CredentialStore::new(dir);
        let command = SyncCommand::new(
            "/bin/sh",
            vec!["-c".to_string(), script.to_string(), "withings-sync".to_string()],
            &store,
        );
        SyncJobRunner::new(command, options)
    }

    async fn wait_until_idle(runner: &SyncJobRunner) -> StatusSnapshot {
        for _ in 0..1000 {
            let status = runner.status().await;
            if !status.running {
                return status;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("sync did not finish in time");
    }

    fn completed(outcome: StartOutcome) -> SyncReport {
        match outcome {
            StartOutcome::Completed(report) => report,
            other => panic!("expected Completed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_exit_zero_records_success() {
        let dir = tempfile::tempdir().unwrap();
        let runner = stub_runner(dir.path(), "echo hello; echo world", options());

        let report = completed(runner.start_sync(None, SyncMode::Wait).await);

        assert!(report.success);
        assert_eq!(report.output, vec!["Running: sh", "hello", "world", SUCCESS_LINE]);

        let status = runner.status().await;
        assert!(!status.running);
        assert_eq!(status.log.last().map(String::as_str), Some(SUCCESS_LINE));
        let last = status.last_result.unwrap();
        assert!(last.success);
        assert_eq!(last.exit_code, Some(0));
        assert_eq!(status.run_id, Some(report.run_id));
    }

    #[tokio::test]
    async fn test_exit_one_records_failure() {
        let dir = tempfile::tempdir().unwrap();
        let runner = stub_runner(dir.path(), "echo oops >&2; exit 1", options());

        let report = completed(runner.start_sync(None, SyncMode::Wait).await);

        assert!(!report.success);
        assert_eq!(report.output.last().map(String::as_str), Some("✗ Sync failed with code 1"));
        assert!(report.output.contains(&"oops".to_string()));

        let status = runner.status().await;
        assert!(!status.running);
        assert_eq!(status.last_result.as_ref().map(|r| r.success), Some(false));
        assert_eq!(status.last_result.and_then(|r| r.exit_code), Some(1));
    }

    #[tokio::test]
    async fn test_log_preserves_interleaved_emission_order() {
        let dir = tempfile::tempdir().unwrap();
        let script = "echo one; echo two >&2; sleep 0.05; echo three >&2; echo four; sleep 0.05; echo five >&2";
        let runner = stub_runner(dir.path(), script, options());

        let report = completed(runner.start_sync(None, SyncMode::Wait).await);

        assert_eq!(
            report.output,
            vec!["Running: sh", "one", "two", "three", "four", "five", SUCCESS_LINE]
        );
    }

    #[tokio::test]
    async fn test_second_start_while_running_is_busy_and_leaves_log_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let runner = stub_runner(dir.path(), "echo first; sleep 0.5; echo done", options());

        let outcome = runner.start_sync(None, SyncMode::Background).await;
        assert!(matches!(outcome, StartOutcome::Started { .. }));

        let before = runner.status().await;
        assert!(before.running);

        assert_eq!(runner.start_sync(None, SyncMode::Background).await, StartOutcome::Busy);
        assert_eq!(runner.start_sync(None, SyncMode::Wait).await, StartOutcome::Busy);

        let after = runner.status().await;
        assert!(after.running);
        assert_eq!(after.run_id, before.run_id);
        assert!(after.log.starts_with(&before.log));

        // A primeira execução termina normalmente
        let done = wait_until_idle(&runner).await;
        assert_eq!(done.log.last().map(String::as_str), Some(SUCCESS_LINE));
        assert!(done.log.contains(&"done".to_string()));

        // E uma nova pode ser aceita
        assert!(matches!(
            runner.start_sync(None, SyncMode::Wait).await,
            StartOutcome::Completed(_)
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_starts_accept_exactly_one() {
        let dir = tempfile::tempdir().unwrap();
        let runner = stub_runner(dir.path(), "sleep 0.3", options());

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let runner = runner.clone();
                tokio::spawn(async move { runner.start_sync(None, SyncMode::Background).await })
            })
            .collect();

        let mut started = 0;
        let mut busy = 0;
        for handle in handles {
            match handle.await.unwrap() {
                StartOutcome::Started { .. } => started += 1,
                StartOutcome::Busy => busy += 1,
                other => panic!("unexpected outcome {:?}", other),
            }
        }

        assert_eq!(started, 1);
        assert_eq!(busy, 9);
        assert!(!wait_until_idle(&runner).await.running);
    }

    #[tokio::test]
    async fn test_missing_executable_is_a_failed_run() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::new(dir.path());
        let command = SyncCommand::new("/nonexistent/withings-sync", vec![], &store);
        let runner = SyncJobRunner::new(command, options());

        let report = completed(runner.start_sync(None, SyncMode::Wait).await);

        assert!(!report.success);
        assert_eq!(report.output.first().map(String::as_str), Some("Running: withings-sync"));
        let last = report.output.last().unwrap();
        assert!(last.starts_with("✗ Error: failed to start withings-sync"), "{}", last);

        let status = runner.status().await;
        assert!(!status.running);
        assert_eq!(status.last_result.map(|r| r.success), Some(false));
    }

    #[tokio::test]
    async fn test_credentials_and_environment_reach_the_process() {
        let dir = tempfile::tempdir().unwrap();
        let script = r#"echo "args: $*"; echo "home=$HOME"; echo "user=$WITHINGS_USER"; echo "session=$GARMIN_SESSION""#;
        let runner = stub_runner(dir.path(), script, options());
        let creds = GarminCredentials::new("user@example.com", "hunter2");

        let report = completed(runner.start_sync(Some(creds), SyncMode::Wait).await);
        let root = dir.path().display();

        assert!(report.success);
        assert_eq!(report.output[1], "args: --garmin-username user@example.com --garmin-password hunter2");
        assert_eq!(report.output[2], format!("home={}", root));
        assert_eq!(report.output[3], format!("user={}/.withings_user.json", root));
        assert_eq!(report.output[4], format!("session={}/.garmin_session", root));
    }

    #[tokio::test]
    async fn test_status_returns_tail_while_report_has_everything() {
        let dir = tempfile::tempdir().unwrap();
        let script = r#"i=1; while [ $i -le 80 ]; do echo "line $i"; i=$((i+1)); done"#;
        let runner = stub_runner(dir.path(), script, options());

        let report = completed(runner.start_sync(None, SyncMode::Wait).await);
        assert_eq!(report.output.len(), 82);

        let status = runner.status().await;
        assert_eq!(status.log.len(), 50);
        assert_eq!(status.log[0], "line 32");
        assert_eq!(status.log.last().map(String::as_str), Some(SUCCESS_LINE));
    }

    #[tokio::test]
    async fn test_background_run_is_observable_while_running() {
        let dir = tempfile::tempdir().unwrap();
        let runner = stub_runner(dir.path(), "echo started; sleep 0.3", options());

        let StartOutcome::Started { run_id } = runner.start_sync(None, SyncMode::Background).await else {
            panic!("expected background start");
        };
        assert!(runner.is_running().await);

        let mut seen_partial = false;
        for _ in 0..100 {
            let status = runner.status().await;
            if status.running && status.log.contains(&"started".to_string()) {
                seen_partial = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(seen_partial);

        let done = wait_until_idle(&runner).await;
        assert_eq!(done.run_id, Some(run_id));
        assert_eq!(done.last_result.map(|r| r.success), Some(true));
    }

    #[tokio::test]
    async fn test_each_run_replaces_the_log() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::new(dir.path());
        let marker = dir.path().join("second");
        let script = format!(
            "if [ -e '{m}' ]; then echo second; else echo first; touch '{m}'; fi",
            m = marker.display()
        );
        let runner = SyncJobRunner::new(
            SyncCommand::new("/bin/sh", vec!["-c".into(), script, "withings-sync".into()], &store),
            options(),
        );

        let first = completed(runner.start_sync(None, SyncMode::Wait).await);
        let second = completed(runner.start_sync(None, SyncMode::Wait).await);

        assert!(first.output.contains(&"first".to_string()));
        assert!(!second.output.contains(&"first".to_string()));
        assert!(second.output.contains(&"second".to_string()));
        assert_ne!(first.run_id, second.run_id);
    }

    #[tokio::test]
    async fn test_killed_by_signal_is_a_failure() {
        let dir = tempfile::tempdir().unwrap();
        let runner = stub_runner(dir.path(), "kill -9 $$", options());

        let report = completed(runner.start_sync(None, SyncMode::Wait).await);

        assert!(!report.success);
        assert_eq!(report.output.last().map(String::as_str), Some("✗ Sync terminated by signal"));
        assert_eq!(runner.status().await.last_result.and_then(|r| r.exit_code), None);
    }

    #[tokio::test]
    async fn test_optional_timeout_kills_the_process() {
        let dir = tempfile::tempdir().unwrap();
        let runner = stub_runner(
            dir.path(),
            "echo waiting; exec sleep 5",
            RunnerOptions {
                timeout: Some(Duration::from_millis(200)),
                ..options()
            },
        );

        let started = std::time::Instant::now();
        let report = completed(runner.start_sync(None, SyncMode::Wait).await);

        assert!(started.elapsed() < Duration::from_secs(4));
        assert!(!report.success);
        assert!(report.output.contains(&"waiting".to_string()));
        assert_eq!(report.output.last().map(String::as_str), Some("✗ Sync timed out after 200ms"));
        assert!(!runner.is_running().await);
    }

    #[test]
    fn test_outcome_mapping() {
        let timed_out = RunOutcome::from_error(&SyncError::TimedOut(Duration::from_secs(90)));
        assert_eq!(timed_out.final_line, "✗ Sync timed out after 90s");

        let reader = RunOutcome::from_error(&SyncError::Reader("cancelled".into()));
        assert_eq!(reader.final_line, "✗ Error: output reader stopped: cancelled");
        assert!(!reader.success);
    }
}
