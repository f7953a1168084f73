//! Estado compartilhado da execução de sincronização

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Como o chamador quer acompanhar a execução
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Aguarda o término e recebe o log completo
    Wait,
    /// Retorna logo após aceitar; o chamador consulta o status
    Background,
}

impl SyncMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncMode::Wait => "wait",
            SyncMode::Background => "background",
        }
    }
}

/// Resultado final de uma execução
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncResult {
    pub success: bool,
    pub exit_code: Option<i32>,
    pub finished_at: DateTime<Utc>,
}

/// Retorno de `start_sync`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    /// Já existe uma execução em andamento; nada foi alterado
    Busy,
    /// Aceita em segundo plano
    Started { run_id: Uuid },
    /// Aceita e concluída (modo `Wait`)
    Completed(SyncReport),
}

/// Resultado entregue a quem esperou a execução
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub run_id: Uuid,
    pub success: bool,
    pub output: Vec<String>,
}

/// Fotografia do estado para leitores concorrentes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusSnapshot {
    pub running: bool,
    pub log: Vec<String>,
    pub last_result: Option<SyncResult>,
    pub run_id: Option<Uuid>,
    pub started_at: Option<DateTime<Utc>>,
}

/// Estado único do processo. Sempre acessado como um todo, sob o mesmo lock.
#[derive(Debug, Default)]
pub(crate) struct JobState {
    pub running: bool,
    /// Log completo da execução atual; o /status recorta só o final
    pub log: Vec<String>,
    pub last_result: Option<SyncResult>,
    pub run_id: Option<Uuid>,
    pub started_at: Option<DateTime<Utc>>,
}

impl JobState {
    /// Aceita uma nova execução se estiver ocioso
    pub fn try_begin(&mut self) -> Option<Uuid> {
        if self.running {
            return None;
        }

        let run_id = Uuid::new_v4();
        self.running = true;
        self.log.clear();
        self.run_id = Some(run_id);
        self.started_at = Some(Utc::now());
        Some(run_id)
    }

    /// Registra o resultado e volta para ocioso
    pub fn finish(&mut self, final_line: String, success: bool, exit_code: Option<i32>) -> SyncResult {
        self.log.push(final_line);
        let result = SyncResult {
            success,
            exit_code,
            finished_at: Utc::now(),
        };
        self.last_result = Some(result.clone());
        self.running = false;
        result
    }

    pub fn snapshot(&self, tail: usize) -> StatusSnapshot {
        let start = self.log.len().saturating_sub(tail);
        StatusSnapshot {
            running: self.running,
            log: self.log[start..].to_vec(),
            last_result: self.last_result.clone(),
            run_id: self.run_id,
            started_at: self.started_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_is_single_flight() {
        let mut state = JobState::default();

        let first = state.try_begin();
        assert!(first.is_some());
        state.log.push("line".to_string());

        // Segunda tentativa não altera nada
        assert!(state.try_begin().is_none());
        assert_eq!(state.log, vec!["line"]);
        assert_eq!(state.run_id, first);
    }

    #[test]
    fn test_begin_clears_previous_log_but_keeps_last_result() {
        let mut state = JobState::default();
        state.try_begin();
        state.log.push("old".to_string());
        state.finish("done".to_string(), true, Some(0));

        state.try_begin();
        assert!(state.running);
        assert!(state.log.is_empty());
        assert_eq!(state.last_result.as_ref().map(|r| r.success), Some(true));
    }

    #[test]
    fn test_snapshot_tail() {
        let mut state = JobState::default();
        state.log = (0..80).map(|i| format!("line {}", i)).collect();

        let snapshot = state.snapshot(50);
        assert_eq!(snapshot.log.len(), 50);
        assert_eq!(snapshot.log.first().map(String::as_str), Some("line 30"));
        assert_eq!(snapshot.log.last().map(String::as_str), Some("line 79"));

        assert_eq!(state.snapshot(500).log.len(), 80);
    }
}
