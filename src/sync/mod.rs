//! # Orquestração da sincronização
//!
//! - `job.rs`: estado compartilhado, modos e resultados
//! - `command.rs`: invocação do executável externo
//! - `runner.rs`: execução única, captura de saída e resultado

pub mod command;
pub mod job;
pub mod runner;

pub use command::SyncCommand;
pub use job::{StartOutcome, StatusSnapshot, SyncMode, SyncReport, SyncResult};
pub use runner::{RunnerOptions, SyncError, SyncJobRunner};
