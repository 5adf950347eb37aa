//! Application-level errors
//!
//! Nothing in this crate is fatal to the process: every failure is scoped
//! to the operation that produced it and leaves the session in a
//! recoverable state. The per-concern enums live next to the modules that
//! raise them; this is the aggregate the binary reports.

use thiserror::Error;

use crate::ai::AiError;
use crate::deck::ExportError;
use crate::session::SessionError;
use crate::storage::StorageError;
use crate::wav::WavError;

/// Top-level error for the versedeck pipeline.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("AI service error: {0}")]
    Ai(#[from] AiError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    #[error("Audio container error: {0}")]
    Wav(#[from] WavError),
}
