//! Crate-wide error type for the handful of truly exceptional conditions
//! (§7): everything else in this engine follows the log-and-continue
//! policy and returns `Option`/sentinel values rather than `Result`. This
//! mirrors the board module's existing `FenError`/`SanError` style
//! ([`crate::board::FenError`]).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to allocate {mb} MB transposition table: {source}")]
    TranspositionTableAlloc {
        mb: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to bind {purpose} socket on port {port}: {source}")]
    SocketBind {
        purpose: &'static str,
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid tuning file {path}: {reason}")]
    InvalidTuningFile { path: String, reason: String },
}
