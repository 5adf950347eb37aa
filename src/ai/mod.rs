//! Hosted-AI collaborators
//!
//! Transcription, chord detection, translation, speech synthesis and slide
//! art are all delegated to an external generative-AI service. The engine
//! only depends on the trait seams here, so every pipeline stage is
//! testable without the network; [`GeminiClient`] is the real
//! implementation.

mod gemini;

pub use gemini::GeminiClient;

use async_trait::async_trait;
use thiserror::Error;

use crate::transcript::Transcript;

/// Grouping hint for the transcription request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscriptionMode {
    /// Song lyrics: short lines grouped into verses.
    Lyrical,
    /// Spoken content: sentence-length lines.
    Prose,
}

/// AI service errors.
///
/// A response that parses as text but not as the expected structured schema
/// is `InvalidResponse`, deliberately distinct from transport failures:
/// the former is a model-output problem worth logging, the latter is
/// usually transient.
#[derive(Debug, Error)]
pub enum AiError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Server error ({status}): {message}")]
    ServerError { status: u16, message: String },

    #[error("Invalid response from AI service: {0}")]
    InvalidResponse(String),
}

/// Audio-to-transcript collaborator.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(
        &self,
        audio: &[u8],
        mime_type: &str,
        mode: TranscriptionMode,
    ) -> Result<Transcript, AiError>;
}

/// Advisory chord-detection collaborator.
///
/// `Ok(None)` means the service found no chords. Callers treat failures as
/// advisory too: they log and continue, never blocking the main flow.
#[async_trait]
pub trait ChordDetector: Send + Sync {
    async fn detect_chords(
        &self,
        audio: &[u8],
        mime_type: &str,
        transcript_text: &str,
    ) -> Result<Option<String>, AiError>;
}

/// Text translation collaborator.
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str, target_language: &str) -> Result<String, AiError>;
}

/// Text-to-speech collaborator.
///
/// Returns raw little-endian 16-bit mono PCM at 24 kHz; wrap it with
/// [`crate::wav`] before playback.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str, language: &str) -> Result<Vec<i16>, AiError>;
}

/// Slide background image collaborator.
///
/// Returns encoded PNG bytes for one slide's text. Per-slide failures are
/// handled by the export pipeline with a flat-color fallback.
#[async_trait]
pub trait SlideArtist: Send + Sync {
    async fn slide_art(&self, slide_text: &str) -> Result<Vec<u8>, AiError>;
}
