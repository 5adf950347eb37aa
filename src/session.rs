//! Session lifecycle
//!
//! One `Session` owns all mutable state for a loaded audio file: the raw
//! bytes, the transcript once transcription succeeds, and the advisory
//! chord/translation results. It replaces the ambient "current file"
//! globals the UI callbacks used to share: a session is created, mutated by
//! exactly one caller, and reset, with nothing leaking between files.
//!
//! Failures are retryable by design: a failed transcription marks the
//! session failed but keeps the loaded audio and any earlier results for
//! inspection and retry.

use std::path::Path;

use thiserror::Error;
use tracing::info;

use crate::transcript::Transcript;

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionPhase {
    /// No file loaded.
    Empty,
    /// Audio loaded, no transcript yet.
    Loaded,
    /// Transcription succeeded.
    Transcribed,
    /// The last operation failed; prior state is kept and retryable.
    Failed { reason: String },
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Not an audio file: {name} ({mime})")]
    NotAudio { name: String, mime: String },

    #[error("No audio file loaded")]
    NoAudio,

    #[error("No transcript available; run transcription first")]
    NoTranscript,
}

/// State for one audio file's processing session.
#[derive(Debug)]
pub struct Session {
    file_name: String,
    mime_type: String,
    audio: Vec<u8>,
    transcript: Option<Transcript>,
    chords: Option<String>,
    translation: Option<String>,
    phase: SessionPhase,
}

impl Session {
    pub fn new() -> Self {
        Self {
            file_name: String::new(),
            mime_type: String::new(),
            audio: Vec::new(),
            transcript: None,
            chords: None,
            translation: None,
            phase: SessionPhase::Empty,
        }
    }

    /// Load an audio file into the session.
    ///
    /// Rejects non-audio MIME types before anything touches the network.
    /// Loading a new file discards all state derived from the previous one.
    pub fn load_audio(
        &mut self,
        file_name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Result<(), SessionError> {
        let file_name = file_name.into();
        let mime_type = mime_type.into();
        if !mime_type.starts_with("audio/") {
            return Err(SessionError::NotAudio {
                name: file_name,
                mime: mime_type,
            });
        }

        self.reset();
        info!(file = %file_name, mime = %mime_type, bytes = bytes.len(), "Audio loaded");
        self.file_name = file_name;
        self.mime_type = mime_type;
        self.audio = bytes;
        self.phase = SessionPhase::Loaded;
        Ok(())
    }

    /// The loaded audio bytes and MIME type.
    pub fn audio(&self) -> Result<(&[u8], &str), SessionError> {
        if self.audio.is_empty() {
            return Err(SessionError::NoAudio);
        }
        Ok((&self.audio, &self.mime_type))
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// File name without its extension, used for derived output names.
    pub fn file_stem(&self) -> &str {
        Path::new(&self.file_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(&self.file_name)
    }

    pub fn phase(&self) -> &SessionPhase {
        &self.phase
    }

    pub fn set_transcript(&mut self, transcript: Transcript) {
        self.transcript = Some(transcript);
        self.phase = SessionPhase::Transcribed;
    }

    pub fn transcript(&self) -> Result<&Transcript, SessionError> {
        self.transcript.as_ref().ok_or(SessionError::NoTranscript)
    }

    pub fn set_chords(&mut self, chords: Option<String>) {
        self.chords = chords;
    }

    pub fn chords(&self) -> Option<&str> {
        self.chords.as_deref()
    }

    pub fn set_translation(&mut self, translation: String) {
        self.translation = Some(translation);
    }

    pub fn translation(&self) -> Option<&str> {
        self.translation.as_deref()
    }

    /// Mark the last operation failed, keeping loaded audio and any earlier
    /// results so the caller can inspect and retry.
    pub fn mark_failed(&mut self, reason: impl Into<String>) {
        self.phase = SessionPhase::Failed {
            reason: reason.into(),
        };
    }

    /// Discard everything: loaded audio and all derived state.
    pub fn reset(&mut self) {
        self.file_name.clear();
        self.mime_type.clear();
        self.audio.clear();
        self.transcript = None;
        self.chords = None;
        self.translation = None;
        self.phase = SessionPhase::Empty;
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Guess an audio MIME type from a file extension.
///
/// Returns `None` for extensions that are not audio, which the caller
/// should reject before any network call.
pub fn mime_for_extension(ext: &str) -> Option<&'static str> {
    match ext.to_ascii_lowercase().as_str() {
        "mp3" => Some("audio/mpeg"),
        "wav" => Some("audio/wav"),
        "ogg" | "oga" => Some("audio/ogg"),
        "m4a" => Some("audio/mp4"),
        "aac" => Some("audio/aac"),
        "flac" => Some("audio/flac"),
        "webm" => Some("audio/webm"),
        _ => None,
    }
}
