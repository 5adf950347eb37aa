//! Timeline index for playback-time lookups
//!
//! Maps a playback clock value to the segment (word or line) active at that
//! instant. Built once per transcript, queried on every playback tick, so
//! word-level lookups use binary search over the segment start times.
//!
//! The index never rejects its input: if the segment starts turn out not to
//! be non-decreasing, or one span overlaps the next (the service does not
//! strictly guarantee line order or disjointness), lookups silently degrade
//! to a linear scan instead of returning wrong answers or panicking.

use crate::transcript::{LineSegment, WordSegment};

/// Interval semantics for a segment's active range.
///
/// Words use half-open intervals so at most one word is active at any
/// instant. Lines use closed intervals, which makes two adjacent lines both
/// active at their exact shared boundary; [`TimelineIndex::active_at`]
/// resolves that to the later line, and [`TimelineIndex::all_active_at`]
/// exposes every match for callers that care.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntervalKind {
    /// `start <= t < end`
    HalfOpen,
    /// `start <= t <= end`
    Closed,
}

impl IntervalKind {
    fn contains(self, start: f64, end: f64, t: f64) -> bool {
        match self {
            IntervalKind::HalfOpen => t >= start && t < end,
            IntervalKind::Closed => t >= start && t <= end,
        }
    }
}

/// Immutable lookup structure over timed segments.
#[derive(Debug, Clone)]
pub struct TimelineIndex {
    spans: Vec<(f64, f64)>,
    kind: IntervalKind,
    /// Starts verified non-decreasing and spans non-overlapping at build
    /// time; gates binary search. A span engulfing its successor would make
    /// the last-start-before-`t` candidate the wrong one, so overlap forces
    /// the linear path.
    sorted: bool,
}

impl TimelineIndex {
    /// Build an index over `(start, end)` pairs.
    pub fn build(spans: Vec<(f64, f64)>, kind: IntervalKind) -> Self {
        let sorted = spans
            .windows(2)
            .all(|w| w[0].0 <= w[1].0 && w[0].1 <= w[1].0);
        Self { spans, kind, sorted }
    }

    /// Index over the words of a transcript, flattened across lines.
    /// Untimed words get a degenerate `[0, 0)` span and are never active.
    pub fn from_words<'a>(words: impl IntoIterator<Item = &'a WordSegment>) -> Self {
        let spans = words
            .into_iter()
            .map(|w| (w.start_time, w.end_time))
            .collect();
        Self::build(spans, IntervalKind::HalfOpen)
    }

    /// Index over transcript lines. A line with no timed words collapses to
    /// `[0, 0]` rather than failing the build.
    pub fn from_lines(lines: &[LineSegment]) -> Self {
        let spans = lines
            .iter()
            .map(|l| l.span().map(|s| (s.start, s.end)).unwrap_or((0.0, 0.0)))
            .collect();
        Self::build(spans, IntervalKind::Closed)
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// The segment active at time `t`, or `None` when `t` falls outside all
    /// segments (before the first, after the last, or in a gap).
    ///
    /// When several closed intervals touch `t`, the latest-starting one
    /// wins; use [`all_active_at`](Self::all_active_at) to see all of them.
    pub fn active_at(&self, t: f64) -> Option<usize> {
        if self.spans.is_empty() {
            return None;
        }

        if !self.sorted {
            // Same winner the sorted path picks: the latest-starting match.
            let mut best: Option<(usize, f64)> = None;
            for (i, &(s, e)) in self.spans.iter().enumerate() {
                if !self.kind.contains(s, e, t) {
                    continue;
                }
                match best {
                    Some((_, bs)) if bs > s => {}
                    _ => best = Some((i, s)),
                }
            }
            return best.map(|(i, _)| i);
        }

        // Last segment whose start is <= t is the candidate when segments
        // do not overlap. Zero-width spans (untimed words) can sit in front
        // of the real candidate; skip past them.
        let mut idx = self.spans.partition_point(|&(s, _)| s <= t);
        while idx > 0 {
            let (s, e) = self.spans[idx - 1];
            if self.kind.contains(s, e, t) {
                return Some(idx - 1);
            }
            if s == e {
                idx -= 1;
                continue;
            }
            break;
        }
        None
    }

    /// Every segment active at `t`, in index order.
    ///
    /// Linear scan; intended for line-level queries where the segment count
    /// is small and closed intervals can double-match at boundaries.
    pub fn all_active_at(&self, t: f64) -> Vec<usize> {
        self.spans
            .iter()
            .enumerate()
            .filter(|(_, &(s, e))| self.kind.contains(s, e, t))
            .map(|(i, _)| i)
            .collect()
    }
}
