//! Local storage for transcript downloads
//!
//! Writes the plain-text transcript next to the user's other documents,
//! or to a custom directory from the settings file. The file contains the
//! transcript's `full_text` verbatim.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::info;

/// Default output directory under the user's documents folder.
pub fn default_export_dir() -> Option<PathBuf> {
    dirs::document_dir().map(|d| d.join("Versedeck"))
}

/// Ensure an output directory exists, creating it when needed.
pub fn ensure_dir(dir: &Path) -> Result<(), StorageError> {
    if !dir.exists() {
        fs::create_dir_all(dir).map_err(|e| StorageError::CreateDirectory {
            path: dir.to_path_buf(),
            source: e,
        })?;
        info!(path = %dir.display(), "Created output directory");
    }
    Ok(())
}

/// Save a transcript as `<stem>_transcript.txt` in `dir`.
///
/// Returns the path to the saved file.
pub fn save_transcript(dir: &Path, stem: &str, full_text: &str) -> Result<PathBuf, StorageError> {
    if full_text.trim().is_empty() {
        return Err(StorageError::EmptyTranscript);
    }

    ensure_dir(dir)?;
    let path = dir.join(transcript_file_name(stem));

    let mut file = fs::File::create(&path).map_err(|e| StorageError::CreateFile {
        path: path.clone(),
        source: e,
    })?;
    file.write_all(full_text.as_bytes())
        .map_err(|e| StorageError::WriteFile {
            path: path.clone(),
            source: e,
        })?;
    file.flush().map_err(|e| StorageError::WriteFile {
        path: path.clone(),
        source: e,
    })?;

    info!(path = %path.display(), "Saved transcript");
    Ok(path)
}

/// File name for a transcript download: `<stem>_transcript.txt`.
pub fn transcript_file_name(stem: &str) -> String {
    format!("{stem}_transcript.txt")
}

/// Storage errors with contextual information
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Transcript is empty")]
    EmptyTranscript,

    #[error("Failed to create directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create file {path}: {source}")]
    CreateFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write to file {path}: {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transcript_file_name() {
        assert_eq!(transcript_file_name("my song"), "my song_transcript.txt");
        assert_eq!(transcript_file_name("take-2"), "take-2_transcript.txt");
    }

    #[test]
    fn test_save_transcript_round_trip() {
        let dir = std::env::temp_dir().join("versedeck-storage-test");
        let text = "line one\nline two";
        let path = save_transcript(&dir, "demo", text).expect("save succeeds");
        assert!(path.ends_with("demo_transcript.txt"));
        let read_back = fs::read_to_string(&path).expect("file readable");
        assert_eq!(read_back, text);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_empty_transcript_rejected() {
        let dir = std::env::temp_dir();
        assert!(matches!(
            save_transcript(&dir, "demo", "  \n "),
            Err(StorageError::EmptyTranscript)
        ));
    }
}
