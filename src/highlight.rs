//! Highlight state machine
//!
//! Converts the playback clock into word/line highlight state and scroll
//! intent, re-evaluated on every media tick (typically 4-66 Hz). The active
//! indices are computed from scratch each tick; the only state carried
//! between ticks is the previously active line, used to dampen scrolling.
//!
//! The rendering layer receives explicit indices rather than being asked to
//! locate the active word in its own output.

use crate::timeline::TimelineIndex;
use crate::transcript::Transcript;

/// Highlight signals for one playback tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HighlightState {
    /// Active line, if any. Lines use closed intervals, so at an exact line
    /// boundary this is the later of the two touching lines.
    pub active_line: Option<usize>,
    /// Active word as `(line index, word index within line)`. Words use
    /// half-open intervals; at most one word is ever active.
    pub active_word: Option<(usize, usize)>,
}

impl HighlightState {
    pub const NONE: HighlightState = HighlightState {
        active_line: None,
        active_word: None,
    };
}

/// Vertical bounds of the scrollable transcript view, in the caller's units.
#[derive(Debug, Clone, Copy)]
pub struct Viewport {
    pub top: f64,
    pub height: f64,
    /// Inset applied to both edges before the visibility check; keeps the
    /// active line away from the very edge without re-scrolling every tick.
    pub margin: f64,
}

/// Rendered bounding box of a line, supplied by the rendering layer.
#[derive(Debug, Clone, Copy)]
pub struct LineBox {
    pub top: f64,
    pub bottom: f64,
}

impl LineBox {
    fn fully_inside(&self, viewport: &Viewport) -> bool {
        self.top >= viewport.top + viewport.margin
            && self.bottom <= viewport.top + viewport.height - viewport.margin
    }
}

/// Scroll request emitted when a newly active line is out of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollTo {
    pub line: usize,
}

/// Per-session highlight tracker.
///
/// Owns the word- and line-level timeline indexes for one transcript.
/// Recreate (or [`reset`](Self::reset)) when a new transcript is loaded.
pub struct HighlightTracker {
    line_index: TimelineIndex,
    word_index: TimelineIndex,
    /// Flat word index -> (line, word-within-line).
    word_locations: Vec<(usize, usize)>,
    /// Last line that produced a scroll evaluation; dampens repeat scrolls.
    previous_line: Option<usize>,
}

impl HighlightTracker {
    pub fn new(transcript: &Transcript) -> Self {
        let word_locations: Vec<(usize, usize)> = transcript
            .lines
            .iter()
            .enumerate()
            .flat_map(|(li, line)| (0..line.words.len()).map(move |wi| (li, wi)))
            .collect();

        Self {
            line_index: TimelineIndex::from_lines(&transcript.lines),
            word_index: TimelineIndex::from_words(transcript.words()),
            word_locations,
            previous_line: None,
        }
    }

    /// An empty tracker; every tick reports no highlight.
    pub fn empty() -> Self {
        Self {
            line_index: TimelineIndex::build(Vec::new(), crate::timeline::IntervalKind::Closed),
            word_index: TimelineIndex::build(Vec::new(), crate::timeline::IntervalKind::HalfOpen),
            word_locations: Vec::new(),
            previous_line: None,
        }
    }

    /// Compute the highlight state for playback time `t`.
    ///
    /// Pure with respect to tracker state: seeks and resets need no special
    /// handling, the next tick simply reflects the new clock value.
    pub fn on_tick(&self, t: f64) -> HighlightState {
        HighlightState {
            active_line: self.line_index.active_at(t),
            active_word: self
                .word_index
                .active_at(t)
                .and_then(|flat| self.word_locations.get(flat).copied()),
        }
    }

    /// Decide whether the rendering layer should scroll.
    ///
    /// Fires only when the active line changed since the last evaluation and
    /// its rendered box is not fully inside the inset viewport. Passing
    /// `None` for `line_box` (layout unknown, e.g. right after a transcript
    /// load) counts as out of view. Silent while the active line is
    /// unchanged, so a line that stays active never jitters.
    pub fn scroll_intent(
        &mut self,
        state: &HighlightState,
        line_box: Option<LineBox>,
        viewport: &Viewport,
    ) -> Option<ScrollTo> {
        let line = state.active_line?;
        if self.previous_line == Some(line) {
            return None;
        }
        self.previous_line = Some(line);

        let visible = line_box.is_some_and(|b| b.fully_inside(viewport));
        if visible {
            None
        } else {
            Some(ScrollTo { line })
        }
    }

    /// Forget the previously active line so the first active line of a new
    /// transcript (or after a seek to the start) triggers a fresh scroll
    /// evaluation.
    pub fn reset(&mut self) {
        self.previous_line = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::{LineSegment, WordSegment};

    fn transcript() -> Transcript {
        Transcript::from_lines(vec![
            LineSegment::new(
                "hello there",
                vec![
                    WordSegment::new("hello", 1.0, 1.4),
                    WordSegment::new("there", 1.4, 2.0),
                ],
            ),
            LineSegment::new(
                "second line",
                vec![
                    WordSegment::new("second", 3.0, 3.5),
                    WordSegment::new("line", 3.5, 4.0),
                ],
            ),
        ])
    }

    fn viewport() -> Viewport {
        Viewport {
            top: 0.0,
            height: 100.0,
            margin: 10.0,
        }
    }

    #[test]
    fn test_tick_inside_word() {
        let tracker = HighlightTracker::new(&transcript());
        let state = tracker.on_tick(1.2);
        assert_eq!(state.active_line, Some(0));
        assert_eq!(state.active_word, Some((0, 0)));

        let state = tracker.on_tick(3.7);
        assert_eq!(state.active_line, Some(1));
        assert_eq!(state.active_word, Some((1, 1)));
    }

    #[test]
    fn test_tick_outside_transcript_is_none_not_error() {
        let tracker = HighlightTracker::new(&transcript());
        assert_eq!(tracker.on_tick(0.5), HighlightState::NONE);
        assert_eq!(tracker.on_tick(99.0), HighlightState::NONE);
        // Gap between the lines: no word, no line.
        assert_eq!(tracker.on_tick(2.5), HighlightState::NONE);
    }

    #[test]
    fn test_empty_transcript_never_highlights() {
        let tracker = HighlightTracker::new(&Transcript::from_lines(vec![]));
        for t in [0.0, 1.0, 60.0] {
            assert_eq!(tracker.on_tick(t), HighlightState::NONE);
        }
    }

    #[test]
    fn test_scroll_fires_once_per_line_change() {
        let mut tracker = HighlightTracker::new(&transcript());
        let out_of_view = Some(LineBox {
            top: 150.0,
            bottom: 170.0,
        });

        let state = tracker.on_tick(1.2);
        assert_eq!(
            tracker.scroll_intent(&state, out_of_view, &viewport()),
            Some(ScrollTo { line: 0 })
        );
        // Same line on the next tick: silent even if still out of view.
        let state = tracker.on_tick(1.3);
        assert_eq!(tracker.scroll_intent(&state, out_of_view, &viewport()), None);

        // New line becomes active: re-triggerable.
        let state = tracker.on_tick(3.2);
        assert_eq!(
            tracker.scroll_intent(&state, out_of_view, &viewport()),
            Some(ScrollTo { line: 1 })
        );
    }

    #[test]
    fn test_no_scroll_when_line_already_visible() {
        let mut tracker = HighlightTracker::new(&transcript());
        let visible = Some(LineBox {
            top: 30.0,
            bottom: 50.0,
        });
        let state = tracker.on_tick(1.2);
        assert_eq!(tracker.scroll_intent(&state, visible, &viewport()), None);
    }

    #[test]
    fn test_box_inside_margin_counts_as_out_of_view() {
        let mut tracker = HighlightTracker::new(&transcript());
        // Inside the raw viewport but crossing the 10-unit inset.
        let edge = Some(LineBox {
            top: 5.0,
            bottom: 25.0,
        });
        let state = tracker.on_tick(1.2);
        assert_eq!(
            tracker.scroll_intent(&state, edge, &viewport()),
            Some(ScrollTo { line: 0 })
        );
    }

    #[test]
    fn test_unknown_layout_counts_as_out_of_view() {
        let mut tracker = HighlightTracker::new(&transcript());
        let state = tracker.on_tick(1.2);
        assert_eq!(
            tracker.scroll_intent(&state, None, &viewport()),
            Some(ScrollTo { line: 0 })
        );
    }

    #[test]
    fn test_reset_rearms_scroll_for_same_line() {
        let mut tracker = HighlightTracker::new(&transcript());
        let state = tracker.on_tick(1.2);
        assert!(tracker
            .scroll_intent(&state, None, &viewport())
            .is_some());
        assert!(tracker.scroll_intent(&state, None, &viewport()).is_none());

        tracker.reset();
        assert!(tracker
            .scroll_intent(&state, None, &viewport())
            .is_some());
    }
}
