//! Transcript data model
//!
//! A `Transcript` is built once per successful transcription call and is
//! read-only afterwards: the highlighting engine and the slide chunker only
//! ever borrow it. It is discarded when the session is reset or a new file
//! is loaded.

use serde::{Deserialize, Serialize};

/// A closed span of playback time, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeSpan {
    pub start: f64,
    pub end: f64,
}

impl TimeSpan {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }
}

/// A single timed word.
///
/// The hosted service occasionally omits timestamps for a word; those
/// deserialize as `0.0` and the word is treated as untimed by everything
/// that derives spans (see [`WordSegment::is_timed`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordSegment {
    pub text: String,
    /// Start offset in seconds. Word intervals are half-open: `[start, end)`.
    #[serde(default, rename = "startTime")]
    pub start_time: f64,
    /// End offset in seconds.
    #[serde(default, rename = "endTime")]
    pub end_time: f64,
}

impl WordSegment {
    pub fn new(text: impl Into<String>, start_time: f64, end_time: f64) -> Self {
        Self {
            text: text.into(),
            start_time,
            end_time,
        }
    }

    /// Whether this word carries real timing information.
    ///
    /// Words the service failed to time come through as `0.0/0.0`; a real
    /// word starting at zero still has a positive end.
    pub fn is_timed(&self) -> bool {
        self.start_time > 0.0 || self.end_time > 0.0
    }
}

/// One line of the transcript with its word-level timings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineSegment {
    pub content: String,
    #[serde(default)]
    pub words: Vec<WordSegment>,
}

impl LineSegment {
    pub fn new(content: impl Into<String>, words: Vec<WordSegment>) -> Self {
        Self {
            content: content.into(),
            words,
        }
    }

    /// The line's span, from the first timed word's start to the last timed
    /// word's end. `None` when the line has no timed words.
    pub fn span(&self) -> Option<TimeSpan> {
        let first = self.words.iter().find(|w| w.is_timed())?;
        let last = self.words.iter().rev().find(|w| w.is_timed())?;
        Some(TimeSpan::new(first.start_time, last.end_time))
    }
}

/// A complete transcription result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    pub lines: Vec<LineSegment>,
    /// The newline join of all line contents, kept verbatim for translation
    /// requests and the plain-text download.
    pub full_text: String,
}

impl Transcript {
    /// Build a transcript from its lines, deriving `full_text`.
    pub fn from_lines(lines: Vec<LineSegment>) -> Self {
        let full_text = lines
            .iter()
            .map(|l| l.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        Self { lines, full_text }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// All words in transcript order, flattened across lines.
    pub fn words(&self) -> impl Iterator<Item = &WordSegment> {
        self.lines.iter().flat_map(|l| l.words.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(text: &str, start: f64, end: f64) -> WordSegment {
        WordSegment::new(text, start, end)
    }

    #[test]
    fn test_full_text_is_join_of_lines() {
        let transcript = Transcript::from_lines(vec![
            LineSegment::new("first line", vec![word("first", 0.0, 0.5)]),
            LineSegment::new("second line", vec![word("second", 0.6, 1.0)]),
        ]);
        assert_eq!(transcript.full_text, "first line\nsecond line");
    }

    #[test]
    fn test_line_span_skips_untimed_words() {
        let line = LineSegment::new(
            "a b c",
            vec![
                word("a", 0.0, 0.0),
                word("b", 1.2, 1.5),
                word("c", 1.5, 2.0),
            ],
        );
        let span = line.span().expect("line has timed words");
        assert_eq!(span.start, 1.2);
        assert_eq!(span.end, 2.0);
    }

    #[test]
    fn test_line_span_none_without_timed_words() {
        let line = LineSegment::new("hm", vec![word("hm", 0.0, 0.0)]);
        assert!(line.span().is_none());

        let empty = LineSegment::new("", vec![]);
        assert!(empty.span().is_none());
    }

    #[test]
    fn test_word_at_zero_with_positive_end_is_timed() {
        assert!(word("hello", 0.0, 0.4).is_timed());
        assert!(!word("hello", 0.0, 0.0).is_timed());
    }

    #[test]
    fn test_missing_timestamps_deserialize_as_zero() {
        let json = r#"{"text": "word"}"#;
        let w: WordSegment = serde_json::from_str(json).expect("deserialize");
        assert_eq!(w.start_time, 0.0);
        assert_eq!(w.end_time, 0.0);
        assert!(!w.is_timed());
    }

    #[test]
    fn test_words_flattens_in_order() {
        let transcript = Transcript::from_lines(vec![
            LineSegment::new("a b", vec![word("a", 0.0, 0.1), word("b", 0.1, 0.2)]),
            LineSegment::new("c", vec![word("c", 0.2, 0.3)]),
        ]);
        let texts: Vec<_> = transcript.words().map(|w| w.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "b", "c"]);
    }
}
