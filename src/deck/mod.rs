//! Deck export pipeline
//!
//! Turns an ordered slide-chunk sequence into a rendered deck. Each chunk
//! gets a background image from the [`SlideArtist`] collaborator; a chunk
//! whose art generation fails falls back to a flat color instead of
//! aborting the export. Art requests run through a bounded pipeline
//! (`max_in_flight`, default 1 for deterministic service-call ordering) and
//! results are consumed strictly in chunk order, with a progress event
//! after each completed slide.
//!
//! Exports can run for minutes on long transcripts, so a cancellation flag
//! is checked as each slide completes; in-flight requests finish, nothing
//! new is started, and the export returns `ExportError::Cancelled`.

mod pdf;

pub use pdf::PdfDeckRenderer;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_util::stream::{self, StreamExt};
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::ai::SlideArtist;
use crate::slides::SlideChunk;

/// Default fallback background color (dark slate) for slides whose art
/// generation failed.
pub const DEFAULT_FALLBACK_COLOR: (u8, u8, u8) = (30, 41, 59);

/// Progress events for subscribers (CLI progress line, UI counters).
#[derive(Clone, Debug)]
pub enum ExportEvent {
    /// A slide finished, art included.
    SlideReady { index: usize, total: usize },
    /// A slide finished on the fallback visual.
    SlideFailed {
        index: usize,
        total: usize,
        reason: String,
    },
    /// Export stopped early; `completed` slides were finished.
    Cancelled { completed: usize },
    /// Deck rendered to `path`.
    Finished { total: usize, path: PathBuf },
}

/// Visual for one slide: generated art, or a flat fallback color.
#[derive(Debug, Clone)]
pub struct SlideVisual {
    pub image_png: Option<Vec<u8>>,
    pub fallback_color: (u8, u8, u8),
}

/// A fully assembled slide, ready for rendering.
#[derive(Debug, Clone)]
pub struct DeckSlide {
    pub chunk: SlideChunk,
    pub visual: SlideVisual,
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Export cancelled after {completed} slides")]
    Cancelled { completed: usize },

    #[error("No slides to export")]
    EmptyDeck,

    #[error("Failed to render deck: {0}")]
    Render(String),

    #[error("Failed to write deck file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Renders an assembled slide sequence to an output file.
///
/// The output format has no native word-level sync, so each slide's time
/// span travels as an annotation rather than driving playback. The
/// original audio is referenced on the first slide.
pub trait DeckRenderer {
    fn render(
        &self,
        slides: &[DeckSlide],
        audio_file_name: &str,
        out_path: &Path,
    ) -> Result<(), ExportError>;
}

/// Drives the per-slide enrichment pipeline and final render.
pub struct DeckExporter {
    max_in_flight: usize,
    fallback_color: (u8, u8, u8),
    cancel: Arc<AtomicBool>,
    event_tx: broadcast::Sender<ExportEvent>,
}

impl DeckExporter {
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(100);
        Self {
            max_in_flight: 1,
            fallback_color: DEFAULT_FALLBACK_COLOR,
            cancel: Arc::new(AtomicBool::new(false)),
            event_tx,
        }
    }

    /// Allow up to `n` concurrent art requests. Results are still consumed
    /// in slide order.
    pub fn with_max_in_flight(mut self, n: usize) -> Self {
        self.max_in_flight = n.max(1);
        self
    }

    pub fn with_fallback_color(mut self, color: (u8, u8, u8)) -> Self {
        self.fallback_color = color;
        self
    }

    /// Subscribe to progress events.
    pub fn subscribe(&self) -> broadcast::Receiver<ExportEvent> {
        self.event_tx.subscribe()
    }

    /// Handle that cancels the running export when set.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.cancel.clone()
    }

    /// Request cancellation; takes effect between slides.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    /// Run the export: art per chunk, then render the deck to `out_path`.
    pub async fn export<A, R>(
        &self,
        chunks: Vec<SlideChunk>,
        artist: &A,
        renderer: &R,
        audio_file_name: &str,
        out_path: &Path,
    ) -> Result<PathBuf, ExportError>
    where
        A: SlideArtist,
        R: DeckRenderer,
    {
        if chunks.is_empty() {
            return Err(ExportError::EmptyDeck);
        }
        let total = chunks.len();
        info!(
            slides = total,
            max_in_flight = self.max_in_flight,
            "Starting deck export"
        );

        let mut art_stream = stream::iter(chunks.iter().enumerate().map(|(index, chunk)| {
            let text = chunk.text.clone();
            async move { (index, artist.slide_art(&text).await) }
        }))
        .buffered(self.max_in_flight);

        let mut slides: Vec<DeckSlide> = Vec::with_capacity(total);
        while let Some((index, art)) = art_stream.next().await {
            if self.cancel.load(Ordering::SeqCst) {
                let completed = slides.len();
                info!(completed, total, "Deck export cancelled");
                let _ = self.event_tx.send(ExportEvent::Cancelled { completed });
                return Err(ExportError::Cancelled { completed });
            }

            let visual = match art {
                Ok(png) => {
                    let _ = self.event_tx.send(ExportEvent::SlideReady {
                        index,
                        total,
                    });
                    SlideVisual {
                        image_png: Some(png),
                        fallback_color: self.fallback_color,
                    }
                }
                Err(e) => {
                    // Per-slide enrichment is best-effort: fall back to a
                    // flat color and keep going.
                    warn!(slide = index, error = %e, "Slide art failed, using fallback color");
                    let _ = self.event_tx.send(ExportEvent::SlideFailed {
                        index,
                        total,
                        reason: e.to_string(),
                    });
                    SlideVisual {
                        image_png: None,
                        fallback_color: self.fallback_color,
                    }
                }
            };

            slides.push(DeckSlide {
                chunk: chunks[index].clone(),
                visual,
            });
        }

        renderer.render(&slides, audio_file_name, out_path)?;
        info!(path = %out_path.display(), slides = total, "Deck export finished");
        let _ = self.event_tx.send(ExportEvent::Finished {
            total,
            path: out_path.to_path_buf(),
        });
        Ok(out_path.to_path_buf())
    }
}

impl Default for DeckExporter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::AiError;
    use crate::transcript::TimeSpan;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    fn chunk(text: &str, start: f64, end: f64) -> SlideChunk {
        SlideChunk {
            text: text.to_string(),
            span: Some(TimeSpan::new(start, end)),
        }
    }

    /// Artist that fails for slides whose text contains "fail".
    struct FlakyArtist {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SlideArtist for FlakyArtist {
        async fn slide_art(&self, slide_text: &str) -> Result<Vec<u8>, AiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if slide_text.contains("fail") {
                Err(AiError::InvalidResponse("no image in response".into()))
            } else {
                Ok(vec![0x89, b'P', b'N', b'G'])
            }
        }
    }

    /// Renderer that records what it was asked to draw.
    #[derive(Default)]
    struct RecordingRenderer {
        rendered: Mutex<Vec<(String, bool)>>,
    }

    impl DeckRenderer for RecordingRenderer {
        fn render(
            &self,
            slides: &[DeckSlide],
            _audio_file_name: &str,
            _out_path: &Path,
        ) -> Result<(), ExportError> {
            let mut rendered = self.rendered.lock().unwrap();
            *rendered = slides
                .iter()
                .map(|s| (s.chunk.text.clone(), s.visual.image_png.is_some()))
                .collect();
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_art_failure_falls_back_not_aborts() {
        let exporter = DeckExporter::new();
        let mut events = exporter.subscribe();
        let artist = FlakyArtist {
            calls: AtomicUsize::new(0),
        };
        let renderer = RecordingRenderer::default();
        let chunks = vec![
            chunk("first verse", 0.0, 4.0),
            chunk("this one will fail", 4.0, 8.0),
            chunk("third verse", 8.0, 12.0),
        ];

        let out = std::env::temp_dir().join("versedeck-deck-test.pdf");
        exporter
            .export(chunks, &artist, &renderer, "song.mp3", &out)
            .await
            .expect("export succeeds despite one failed slide");

        let rendered = renderer.rendered.lock().unwrap();
        assert_eq!(rendered.len(), 3);
        assert!(rendered[0].1, "first slide has art");
        assert!(!rendered[1].1, "failed slide uses fallback");
        assert!(rendered[2].1, "third slide has art");

        // One progress event per slide, in order, plus a finish.
        assert!(matches!(
            events.try_recv().unwrap(),
            ExportEvent::SlideReady { index: 0, total: 3 }
        ));
        assert!(matches!(
            events.try_recv().unwrap(),
            ExportEvent::SlideFailed { index: 1, .. }
        ));
        assert!(matches!(
            events.try_recv().unwrap(),
            ExportEvent::SlideReady { index: 2, total: 3 }
        ));
        assert!(matches!(
            events.try_recv().unwrap(),
            ExportEvent::Finished { total: 3, .. }
        ));
    }

    #[tokio::test]
    async fn test_cancellation_stops_between_slides() {
        let exporter = DeckExporter::new();
        let artist = FlakyArtist {
            calls: AtomicUsize::new(0),
        };
        let renderer = RecordingRenderer::default();
        let chunks = vec![chunk("one", 0.0, 1.0), chunk("two", 1.0, 2.0)];

        // Cancel before the export starts consuming results.
        exporter.cancel();
        let out = std::env::temp_dir().join("versedeck-deck-cancel.pdf");
        let err = exporter
            .export(chunks, &artist, &renderer, "song.mp3", &out)
            .await
            .expect_err("cancelled export fails");
        assert!(matches!(err, ExportError::Cancelled { completed: 0 }));
        assert!(renderer.rendered.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_deck_is_an_error() {
        let exporter = DeckExporter::new();
        let artist = FlakyArtist {
            calls: AtomicUsize::new(0),
        };
        let renderer = RecordingRenderer::default();
        let out = std::env::temp_dir().join("versedeck-deck-empty.pdf");
        assert!(matches!(
            exporter
                .export(Vec::new(), &artist, &renderer, "song.mp3", &out)
                .await,
            Err(ExportError::EmptyDeck)
        ));
    }

    #[tokio::test]
    async fn test_bounded_parallelism_preserves_order() {
        let exporter = DeckExporter::new().with_max_in_flight(4);
        let artist = FlakyArtist {
            calls: AtomicUsize::new(0),
        };
        let renderer = RecordingRenderer::default();
        let chunks: Vec<SlideChunk> = (0..8)
            .map(|i| chunk(&format!("slide {i}"), i as f64, i as f64 + 1.0))
            .collect();

        let out = std::env::temp_dir().join("versedeck-deck-parallel.pdf");
        exporter
            .export(chunks, &artist, &renderer, "song.mp3", &out)
            .await
            .expect("export succeeds");

        let rendered = renderer.rendered.lock().unwrap();
        let texts: Vec<&str> = rendered.iter().map(|(t, _)| t.as_str()).collect();
        let expected: Vec<String> = (0..8).map(|i| format!("slide {i}")).collect();
        assert_eq!(texts, expected.iter().map(|s| s.as_str()).collect::<Vec<_>>());
        assert_eq!(artist.calls.load(Ordering::SeqCst), 8);
    }
}
