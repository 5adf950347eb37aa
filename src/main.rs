#![deny(clippy::all)]

//! versedeck CLI: thin glue over the library pipeline.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn};

use versedeck::ai::{
    ChordDetector, GeminiClient, SpeechSynthesizer, TranscriptionMode, Transcriber, Translator,
};
use versedeck::config::Config;
use versedeck::deck::{DeckExporter, ExportEvent, PdfDeckRenderer};
use versedeck::session::{mime_for_extension, Session};
use versedeck::slides::{self, GroupPolicy};
use versedeck::{storage, wav};

#[derive(Parser)]
#[command(name = "versedeck", version, about = "Audio to synchronized transcript and slide deck")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    /// Song lyrics: verse-oriented lines, 4 per slide.
    Lyrical,
    /// Spoken content: sentence lines, 3 per slide.
    Prose,
}

impl From<Mode> for TranscriptionMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Lyrical => TranscriptionMode::Lyrical,
            Mode::Prose => TranscriptionMode::Prose,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Transcribe an audio file and save the plain-text transcript
    Transcribe {
        audio: PathBuf,
        #[arg(long, value_enum, default_value_t = Mode::Lyrical)]
        mode: Mode,
        /// Also ask the service for a chord listing (advisory)
        #[arg(long)]
        chords: bool,
    },
    /// Transcribe an audio file and translate the transcript
    Translate {
        audio: PathBuf,
        #[arg(long, value_enum, default_value_t = Mode::Prose)]
        mode: Mode,
        /// Target language (falls back to versedeck.toml)
        #[arg(long)]
        to: Option<String>,
    },
    /// Synthesize speech from text into a 24 kHz mono WAV file
    Speak {
        text: String,
        #[arg(long, default_value = "English")]
        language: String,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Transcribe an audio file and export a slide deck PDF
    Export {
        audio: PathBuf,
        #[arg(long, value_enum, default_value_t = Mode::Lyrical)]
        mode: Mode,
        /// Lines per slide (grouped-lines layout)
        #[arg(long)]
        group_size: Option<usize>,
        /// Pack words by character budget instead of grouping lines
        #[arg(long)]
        by_chars: bool,
        #[arg(long)]
        out: Option<PathBuf>,
        /// Concurrent slide-art requests
        #[arg(long, default_value_t = 1)]
        parallel: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing for structured logging
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = Config::load()?;
    let client = GeminiClient::new(&config)?;

    match cli.command {
        Command::Transcribe { audio, mode, chords } => {
            let mut session = load_session(&audio)?;
            transcribe_into(&client, &mut session, mode.into()).await?;
            let full_text = session.transcript()?.full_text.clone();
            println!("{full_text}");

            if chords {
                detect_chords_advisory(&client, &mut session).await;
                if let Some(chords) = session.chords() {
                    println!("\nChords:\n{chords}");
                }
            }

            let dir = output_dir(&config);
            let path = storage::save_transcript(&dir, session.file_stem(), &full_text)?;
            println!("\nTranscript saved to {}", path.display());
        }

        Command::Translate { audio, mode, to } => {
            let target = to
                .or_else(|| config.settings.target_language.clone())
                .context("No target language: pass --to or set target_language in versedeck.toml")?;

            let mut session = load_session(&audio)?;
            transcribe_into(&client, &mut session, mode.into()).await?;
            let full_text = session.transcript()?.full_text.clone();

            match client.translate(&full_text, &target).await {
                Ok(translated) => {
                    session.set_translation(translated.clone());
                    println!("{translated}");
                }
                Err(e) => {
                    session.mark_failed(format!("Translation failed: {e}"));
                    bail!("Translation failed: {e}");
                }
            }
        }

        Command::Speak { text, language, out } => {
            let samples = client.synthesize(&text, &language).await?;
            let path = out.unwrap_or_else(|| output_dir(&config).join("speech.wav"));
            if let Some(parent) = path.parent() {
                storage::ensure_dir(parent)?;
            }
            wav::write_wav(&path, &samples)?;
            println!("Speech saved to {}", path.display());
        }

        Command::Export {
            audio,
            mode,
            group_size,
            by_chars,
            out,
            parallel,
        } => {
            let mut session = load_session(&audio)?;
            transcribe_into(&client, &mut session, mode.into()).await?;
            let transcript = session.transcript()?;

            let chunks = if by_chars {
                let words: Vec<_> = transcript.words().cloned().collect();
                slides::chunk_words(&words, config.char_budget())
            } else {
                let mut policy = match mode {
                    Mode::Lyrical => GroupPolicy::lyrical(),
                    Mode::Prose => GroupPolicy::prose(),
                };
                if let Some(size) = group_size.or(config.settings.group_size) {
                    policy.group_size = size;
                }
                slides::chunk_lines(&transcript.lines, &policy)
            };
            info!(slides = chunks.len(), "Transcript chunked");

            let stem = session.file_stem().to_string();
            // Timestamped default so repeated exports never clobber each other.
            let out_path = out.unwrap_or_else(|| {
                let ts = chrono::Local::now().format("%Y%m%d_%H%M%S");
                output_dir(&config).join(format!("{stem}_deck_{ts}.pdf"))
            });
            if let Some(parent) = out_path.parent() {
                storage::ensure_dir(parent)?;
            }

            let exporter = DeckExporter::new().with_max_in_flight(parallel);

            // Ctrl-C cancels between slides; in-flight requests finish.
            let cancel = exporter.cancel_flag();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Cancellation requested, stopping after the current slide");
                    cancel.store(true, std::sync::atomic::Ordering::SeqCst);
                }
            });

            let mut events = exporter.subscribe();
            let progress = tokio::spawn(async move {
                while let Ok(event) = events.recv().await {
                    match event {
                        ExportEvent::SlideReady { index, total } => {
                            println!("slide {}/{} ready", index + 1, total);
                        }
                        ExportEvent::SlideFailed { index, total, reason } => {
                            println!("slide {}/{} fell back to flat color ({reason})", index + 1, total);
                        }
                        ExportEvent::Cancelled { completed } => {
                            println!("export cancelled after {completed} slides");
                        }
                        ExportEvent::Finished { total, path } => {
                            println!("deck with {total} slides saved to {}", path.display());
                        }
                    }
                }
            });

            let renderer = PdfDeckRenderer::new(&stem);
            let result = exporter
                .export(chunks, &client, &renderer, session.file_name(), &out_path)
                .await;
            drop(exporter);
            let _ = progress.await;
            result?;
        }
    }

    Ok(())
}

/// Read an audio file into a fresh session, rejecting non-audio input
/// before anything touches the network.
fn load_session(path: &Path) -> anyhow::Result<Session> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();
    let Some(mime) = mime_for_extension(ext) else {
        bail!(
            "{} does not look like an audio file (extension .{ext})",
            path.display()
        );
    };

    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("audio")
        .to_string();

    let mut session = Session::new();
    session.load_audio(name, mime, bytes)?;
    Ok(session)
}

/// Transcribe the session's audio, marking the session failed (but
/// retryable) when the service call does not produce a transcript.
async fn transcribe_into(
    client: &GeminiClient,
    session: &mut Session,
    mode: TranscriptionMode,
) -> anyhow::Result<()> {
    let (audio, mime) = session.audio()?;
    let (audio, mime) = (audio.to_vec(), mime.to_string());
    match client.transcribe(&audio, &mime, mode).await {
        Ok(transcript) => {
            session.set_transcript(transcript);
            Ok(())
        }
        Err(e) => {
            session.mark_failed(format!("Transcription failed: {e}"));
            bail!("Transcription failed: {e}");
        }
    }
}

/// Chord detection is advisory: failures are logged and swallowed, never
/// blocking the main flow.
async fn detect_chords_advisory(client: &GeminiClient, session: &mut Session) {
    let Ok((audio, mime)) = session.audio() else {
        return;
    };
    let (audio, mime) = (audio.to_vec(), mime.to_string());
    let text = session
        .transcript()
        .map(|t| t.full_text.clone())
        .unwrap_or_default();

    match client.detect_chords(&audio, &mime, &text).await {
        Ok(Some(chords)) => session.set_chords(Some(chords)),
        Ok(None) => info!("No chords identified"),
        Err(e) => warn!(error = %e, "Chord detection failed; continuing without chords"),
    }
}

/// Resolve the output directory: settings override, then the user's
/// documents folder, then the working directory.
fn output_dir(config: &Config) -> PathBuf {
    config
        .settings
        .export_dir
        .clone()
        .or_else(storage::default_export_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}
