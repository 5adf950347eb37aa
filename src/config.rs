//! Configuration loading
//!
//! The API key comes from the `VERSEDECK_API_KEY` environment variable
//! (a `.env` file is honored) and is required before any request is made.
//! Everything else is optional and read from `versedeck.toml` in the
//! working directory, falling back to the user's config directory.

use std::fs;
use std::path::PathBuf;

use serde::Deserialize;
use tracing::{info, warn};

use crate::error::AppError;
use crate::slides::DEFAULT_CHAR_BUDGET;

/// Environment variable holding the AI service API key.
pub const API_KEY_VAR: &str = "VERSEDECK_API_KEY";

/// Default text/transcription model.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
/// Default speech-synthesis model.
pub const DEFAULT_TTS_MODEL: &str = "gemini-2.5-flash-preview-tts";
/// Default slide background image model.
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.0-flash-preview-image-generation";
/// Default API endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Optional settings from `versedeck.toml`.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct Settings {
    /// Text/transcription model name.
    pub model: Option<String>,
    /// Speech-synthesis model name.
    pub tts_model: Option<String>,
    /// Slide background image model name.
    pub image_model: Option<String>,
    /// API endpoint base URL.
    pub endpoint: Option<String>,
    /// Lines per slide for grouped-lines decks.
    pub group_size: Option<usize>,
    /// Character budget for word-packed decks.
    pub char_budget: Option<usize>,
    /// Default translation target language (e.g. "Spanish").
    pub target_language: Option<String>,
    /// Output directory override for transcripts and decks.
    pub export_dir: Option<PathBuf>,
}

/// Resolved application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub settings: Settings,
}

impl Config {
    /// Load configuration, failing fast when the API key is absent.
    pub fn load() -> Result<Self, AppError> {
        // Pick up a .env file if present; ignore when there is none.
        let _ = dotenvy::dotenv();

        let api_key = std::env::var(API_KEY_VAR).map_err(|_| {
            AppError::Config(format!(
                "{API_KEY_VAR} is not set; export it or add it to a .env file"
            ))
        })?;
        if api_key.trim().is_empty() {
            return Err(AppError::Config(format!("{API_KEY_VAR} is empty")));
        }

        Ok(Self {
            api_key,
            settings: load_settings(),
        })
    }

    pub fn model(&self) -> &str {
        self.settings.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }

    pub fn tts_model(&self) -> &str {
        self.settings
            .tts_model
            .as_deref()
            .unwrap_or(DEFAULT_TTS_MODEL)
    }

    pub fn image_model(&self) -> &str {
        self.settings
            .image_model
            .as_deref()
            .unwrap_or(DEFAULT_IMAGE_MODEL)
    }

    pub fn endpoint(&self) -> &str {
        self.settings
            .endpoint
            .as_deref()
            .unwrap_or(DEFAULT_ENDPOINT)
    }

    pub fn char_budget(&self) -> usize {
        self.settings.char_budget.unwrap_or(DEFAULT_CHAR_BUDGET)
    }
}

/// Candidate locations for `versedeck.toml`, in priority order.
fn settings_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("versedeck.toml")];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("versedeck").join("versedeck.toml"));
    }
    paths
}

/// Load settings from the first readable config file.
///
/// Missing files are normal; a file that exists but fails to parse is
/// reported and skipped rather than aborting startup.
fn load_settings() -> Settings {
    for path in settings_paths() {
        if !path.exists() {
            continue;
        }
        match fs::read_to_string(&path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(settings) => {
                    info!(path = %path.display(), "Loaded settings");
                    return settings;
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Ignoring unparsable settings file");
                }
            },
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read settings file");
            }
        }
    }
    Settings::default()
}
