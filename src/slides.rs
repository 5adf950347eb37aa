//! Slide chunker
//!
//! Partitions a transcript into slide-sized chunks with an aggregate audio
//! time span, in two modes:
//!
//! - grouped lines: a fixed number of consecutive lines per slide, never
//!   splitting a line (lyrical decks take 4 newline-joined lines, prose
//!   decks 3 space-joined lines);
//! - character budget: consecutive words packed greedily until the next
//!   word would exceed the budget, always breaking at whitespace.
//!
//! Chunking is a pure function of its input. A chunk whose lines carry no
//! timed words gets `span: None`, and a follow-up pass borrows the nearest
//! timed neighbor's boundary instead of stamping time zero on it.

use crate::transcript::{LineSegment, TimeSpan, WordSegment};

/// Default character budget for word-packed slides.
pub const DEFAULT_CHAR_BUDGET: usize = 150;

/// How lines are joined inside one slide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinStyle {
    Newline,
    Space,
}

impl JoinStyle {
    fn separator(self) -> &'static str {
        match self {
            JoinStyle::Newline => "\n",
            JoinStyle::Space => " ",
        }
    }
}

/// Line-grouping policy for a deck layout.
#[derive(Debug, Clone, Copy)]
pub struct GroupPolicy {
    pub group_size: usize,
    pub join: JoinStyle,
}

impl GroupPolicy {
    /// Verse/stanza layout: four lines per slide, kept on separate rows.
    pub fn lyrical() -> Self {
        Self {
            group_size: 4,
            join: JoinStyle::Newline,
        }
    }

    /// Paragraph layout: three lines per slide, flowed together.
    pub fn prose() -> Self {
        Self {
            group_size: 3,
            join: JoinStyle::Space,
        }
    }
}

/// One slide's worth of transcript text with its audio span.
#[derive(Debug, Clone, PartialEq)]
pub struct SlideChunk {
    pub text: String,
    /// `None` when no word in the chunk carried a timestamp and no timed
    /// neighbor existed to borrow from.
    pub span: Option<TimeSpan>,
}

/// Span of a run of words: first timed word's start to last timed word's end.
fn words_span<'a>(words: impl Iterator<Item = &'a WordSegment> + Clone) -> Option<TimeSpan> {
    let start = words.clone().find(|w| w.is_timed())?.start_time;
    let end = words.filter(|w| w.is_timed()).last()?.end_time;
    Some(TimeSpan::new(start, end))
}

/// Group consecutive lines into slides of `policy.group_size` lines.
///
/// Deterministic: the same lines and policy always produce the same chunk
/// boundaries. Ten lines at group size 4 yield chunks of 4, 4 and 2 lines.
/// A line is never split across two chunks.
pub fn chunk_lines(lines: &[LineSegment], policy: &GroupPolicy) -> Vec<SlideChunk> {
    let group_size = policy.group_size.max(1);
    let mut chunks: Vec<SlideChunk> = lines
        .chunks(group_size)
        .map(|group| {
            let text = group
                .iter()
                .map(|l| l.content.as_str())
                .collect::<Vec<_>>()
                .join(policy.join.separator());
            let span = words_span(group.iter().flat_map(|l| l.words.iter()));
            SlideChunk { text, span }
        })
        .collect();
    fill_missing_spans(&mut chunks);
    chunks
}

/// Pack whole words into slides of at most `budget` word characters.
///
/// The budget counts the characters of the words themselves; joining spaces
/// are not charged against it. A single word longer than the budget still
/// gets its own chunk rather than being split mid-word. The final partial
/// chunk is kept even when far under budget.
pub fn chunk_words(words: &[WordSegment], budget: usize) -> Vec<SlideChunk> {
    let budget = budget.max(1);
    let mut chunks = Vec::new();
    let mut current: Vec<&WordSegment> = Vec::new();
    let mut current_chars = 0usize;

    for word in words {
        let word_chars = word.text.chars().count();
        if !current.is_empty() && current_chars + word_chars > budget {
            chunks.push(flush_words(&current));
            current.clear();
            current_chars = 0;
        }
        current.push(word);
        current_chars += word_chars;
    }
    if !current.is_empty() {
        chunks.push(flush_words(&current));
    }

    fill_missing_spans(&mut chunks);
    chunks
}

fn flush_words(words: &[&WordSegment]) -> SlideChunk {
    let text = words
        .iter()
        .map(|w| w.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    let span = words_span(words.iter().copied());
    SlideChunk { text, span }
}

/// Fill untimed chunks from their nearest timed neighbors.
///
/// A chunk with no timing inherits a zero-length span at the preceding
/// chunk's end (or, at the head of the deck, the following chunk's start).
/// Chunks stay `None` only when the whole deck is untimed.
fn fill_missing_spans(chunks: &mut [SlideChunk]) {
    // Forward pass: inherit the previous chunk's end.
    let mut prev_end: Option<f64> = None;
    for chunk in chunks.iter_mut() {
        match chunk.span {
            Some(span) => prev_end = Some(span.end),
            None => {
                if let Some(end) = prev_end {
                    chunk.span = Some(TimeSpan::new(end, end));
                }
            }
        }
    }
    // Backward pass: leading untimed chunks inherit the next chunk's start.
    let mut next_start: Option<f64> = None;
    for chunk in chunks.iter_mut().rev() {
        match chunk.span {
            Some(span) => next_start = Some(span.start),
            None => {
                if let Some(start) = next_start {
                    chunk.span = Some(TimeSpan::new(start, start));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timed_line(content: &str, start: f64, end: f64) -> LineSegment {
        let mid = (start + end) / 2.0;
        LineSegment::new(
            content,
            vec![
                WordSegment::new(content.split(' ').next().unwrap_or(content), start, mid),
                WordSegment::new(content.split(' ').last().unwrap_or(content), mid, end),
            ],
        )
    }

    fn untimed_line(content: &str) -> LineSegment {
        LineSegment::new(content, vec![WordSegment::new(content, 0.0, 0.0)])
    }

    fn words(texts: &[&str]) -> Vec<WordSegment> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| WordSegment::new(*t, i as f64, i as f64 + 0.5))
            .collect()
    }

    #[test]
    fn test_ten_lines_group_four_yields_4_4_2() {
        let lines: Vec<LineSegment> = (0..10)
            .map(|i| timed_line(&format!("line {i}"), i as f64, i as f64 + 0.5))
            .collect();
        let chunks = chunk_lines(&lines, &GroupPolicy::lyrical());
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].text.lines().count(), 4);
        assert_eq!(chunks[1].text.lines().count(), 4);
        assert_eq!(chunks[2].text.lines().count(), 2);
        // Spans come from the first and last word of each group.
        assert_eq!(chunks[0].span, Some(TimeSpan::new(0.0, 3.5)));
        assert_eq!(chunks[2].span, Some(TimeSpan::new(8.0, 9.5)));
    }

    #[test]
    fn test_chunking_is_idempotent() {
        let lines: Vec<LineSegment> = (0..7)
            .map(|i| timed_line(&format!("line {i}"), i as f64, i as f64 + 0.5))
            .collect();
        let first = chunk_lines(&lines, &GroupPolicy::prose());
        let second = chunk_lines(&lines, &GroupPolicy::prose());
        assert_eq!(first, second);
    }

    #[test]
    fn test_prose_joins_with_spaces() {
        let lines = vec![
            timed_line("one two", 0.0, 1.0),
            timed_line("three four", 1.0, 2.0),
        ];
        let chunks = chunk_lines(&lines, &GroupPolicy::prose());
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "one two three four");
    }

    #[test]
    fn test_empty_input_empty_output() {
        assert!(chunk_lines(&[], &GroupPolicy::lyrical()).is_empty());
        assert!(chunk_words(&[], DEFAULT_CHAR_BUDGET).is_empty());
    }

    #[test]
    fn test_char_budget_packs_hello_world_foo_bar() {
        let chunks = chunk_words(&words(&["hello", "world", "foo", "bar"]), 10);
        let texts: Vec<_> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["hello world", "foo bar"]);
    }

    #[test]
    fn test_char_budget_oversized_word_kept_whole() {
        let chunks = chunk_words(&words(&["hi", "incomprehensibilities", "ok"]), 8);
        let texts: Vec<_> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["hi", "incomprehensibilities", "ok"]);
    }

    #[test]
    fn test_char_budget_spans_follow_words() {
        let chunks = chunk_words(&words(&["aaaa", "bbbb", "cccc"]), 8);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].span, Some(TimeSpan::new(0.0, 1.5)));
        assert_eq!(chunks[1].span, Some(TimeSpan::new(2.0, 2.5)));
    }

    #[test]
    fn test_untimed_chunk_borrows_neighbor_not_zero() {
        let lines = vec![
            timed_line("early words", 10.0, 12.0),
            untimed_line("mystery line"),
            timed_line("late words", 20.0, 22.0),
        ];
        let policy = GroupPolicy {
            group_size: 1,
            join: JoinStyle::Newline,
        };
        let chunks = chunk_lines(&lines, &policy);
        // The untimed middle slide sits at the previous slide's end, not at 0.
        assert_eq!(chunks[1].span, Some(TimeSpan::new(12.0, 12.0)));
    }

    #[test]
    fn test_leading_untimed_chunk_borrows_following_start() {
        let lines = vec![untimed_line("intro"), timed_line("first real", 5.0, 7.0)];
        let policy = GroupPolicy {
            group_size: 1,
            join: JoinStyle::Newline,
        };
        let chunks = chunk_lines(&lines, &policy);
        assert_eq!(chunks[0].span, Some(TimeSpan::new(5.0, 5.0)));
    }

    #[test]
    fn test_fully_untimed_deck_keeps_none() {
        let lines = vec![untimed_line("a"), untimed_line("b")];
        let policy = GroupPolicy {
            group_size: 1,
            join: JoinStyle::Newline,
        };
        let chunks = chunk_lines(&lines, &policy);
        assert!(chunks.iter().all(|c| c.span.is_none()));
    }
}
