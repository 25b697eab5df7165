//! Recursive separator-based text chunking.
//!
//! Text is split on the most meaningful separator present; any piece still
//! larger than `chunk_size` is split again on the next separator, down to
//! single characters. Small pieces are then merged back into chunks of at most
//! `chunk_size` characters, carrying up to `chunk_overlap` characters of the
//! previous chunk's tail. Every chunk is an exact span of the input, so the
//! original text can be rebuilt by dropping each chunk's overlap.

use crate::config::IngestionConfig;
use crate::error::{AuditError, Result};
use regex::Regex;
use std::collections::VecDeque;
use std::ops::Range;
use std::sync::LazyLock;

static HORIZONTAL_WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]+").expect("invalid horizontal whitespace pattern"));

static BLANK_LINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n+").expect("invalid blank line pattern"));

/// Chunking parameters.
#[derive(Debug, Clone)]
pub struct ChunkConfig {
    /// Maximum characters per chunk.
    pub chunk_size: usize,
    /// Overlap between consecutive chunks, in characters.
    pub chunk_overlap: usize,
    /// Separators from most to least meaningful.
    pub separators: Vec<String>,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        let ingestion = IngestionConfig::default();
        Self {
            chunk_size: ingestion.chunk_size,
            chunk_overlap: ingestion.chunk_overlap,
            separators: ingestion.separators,
        }
    }
}

impl From<&IngestionConfig> for ChunkConfig {
    fn from(config: &IngestionConfig) -> Self {
        Self {
            chunk_size: config.chunk_size,
            chunk_overlap: config.chunk_overlap,
            separators: config.separators.clone(),
        }
    }
}

/// A chunk of text with its position in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    /// Chunk text content.
    pub content: String,
    /// Start byte offset in the source text.
    pub start: usize,
    /// End byte offset (exclusive) in the source text.
    pub end: usize,
    /// Bytes at the start of `content` already covered by the previous chunk.
    pub overlap: usize,
}

impl TextChunk {
    /// The part of this chunk not shared with the previous one.
    pub fn fresh_content(&self) -> &str {
        &self.content[self.overlap..]
    }
}

/// Rebuild the source text from its chunks by dropping shared prefixes.
pub fn reconstruct(chunks: &[TextChunk]) -> String {
    chunks.iter().map(TextChunk::fresh_content).collect()
}

/// Splits text recursively on an ordered list of separators.
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    config: ChunkConfig,
}

impl RecursiveChunker {
    /// Create a chunker, rejecting parameters that cannot make progress.
    pub fn new(config: ChunkConfig) -> Result<Self> {
        if config.chunk_size == 0 {
            return Err(AuditError::Config("chunk_size must be positive".to_string()));
        }
        if config.chunk_overlap >= config.chunk_size {
            return Err(AuditError::Config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                config.chunk_overlap, config.chunk_size
            )));
        }
        if config.separators.is_empty() {
            return Err(AuditError::Config("at least one separator is required".to_string()));
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &ChunkConfig {
        &self.config
    }

    /// Split text into ordered chunks.
    ///
    /// Chunks are never whitespace-only and together cover the whole input, so
    /// [`reconstruct`] gives the text back. Whitespace-only input yields nothing.
    pub fn split(&self, text: &str) -> Vec<TextChunk> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let spans = self.split_range(text, 0..text.len(), &self.config.separators);

        let mut chunks: Vec<TextChunk> = Vec::with_capacity(spans.len());
        let mut covered: usize = 0;
        for span in spans {
            if text[span.clone()].trim().is_empty() || span.end <= covered {
                continue;
            }
            // A gap left by a skipped span is folded into this chunk.
            let start = span.start.min(covered);
            chunks.push(TextChunk {
                content: text[start..span.end].to_string(),
                start,
                end: span.end,
                overlap: covered - start,
            });
            covered = span.end;
        }

        if let Some(last) = chunks.last_mut() {
            if last.end < text.len() {
                last.content.push_str(&text[last.end..]);
                last.end = text.len();
            }
        }
        chunks
    }

    fn split_range(&self, text: &str, range: Range<usize>, separators: &[String]) -> Vec<Range<usize>> {
        let segment = &text[range.clone()];

        // First separator that is empty or present in this segment.
        let position = separators
            .iter()
            .position(|s| s.is_empty() || segment.contains(s.as_str()))
            .unwrap_or(separators.len() - 1);
        let separator = separators[position].as_str();
        let remaining = &separators[position + 1..];

        let mut out = Vec::new();
        let mut small: Vec<Range<usize>> = Vec::new();

        for piece in split_keep_start(segment, separator, range.start) {
            if char_len(text, &piece) < self.config.chunk_size {
                small.push(piece);
                continue;
            }

            if !small.is_empty() {
                out.extend(self.merge(text, &small));
                small.clear();
            }
            if remaining.is_empty() {
                out.push(piece);
            } else {
                out.extend(self.split_range(text, piece, remaining));
            }
        }

        if !small.is_empty() {
            out.extend(self.merge(text, &small));
        }
        out
    }

    /// Merge contiguous small pieces into chunks with overlap.
    fn merge(&self, text: &str, pieces: &[Range<usize>]) -> Vec<Range<usize>> {
        let size = self.config.chunk_size;
        let overlap = self.config.chunk_overlap;

        let mut docs = Vec::new();
        let mut current: VecDeque<(Range<usize>, usize)> = VecDeque::new();
        let mut total = 0;

        for piece in pieces {
            let len = char_len(text, piece);

            if total + len > size {
                if let (Some(first), Some(last)) = (current.front(), current.back()) {
                    docs.push(first.0.start..last.0.end);
                }
                while total > overlap || (total + len > size && total > 0) {
                    match current.pop_front() {
                        Some((_, popped)) => total -= popped,
                        None => break,
                    }
                }
            }

            current.push_back((piece.clone(), len));
            total += len;
        }

        if let (Some(first), Some(last)) = (current.front(), current.back()) {
            docs.push(first.0.start..last.0.end);
        }
        docs
    }
}

/// Split `segment` on `separator`, keeping each separator at the start of the
/// piece that follows it. Offsets are shifted by `base`.
///
/// Whitespace-only pieces are attached to the next piece (or to the last one
/// at the end of the segment), so no piece is blank unless the segment is.
fn split_keep_start(segment: &str, separator: &str, base: usize) -> Vec<Range<usize>> {
    let raw: Vec<Range<usize>> = if separator.is_empty() {
        segment
            .char_indices()
            .map(|(i, c)| i..i + c.len_utf8())
            .collect()
    } else {
        let mut raw = Vec::new();
        let mut start = 0;
        for (idx, _) in segment.match_indices(separator) {
            if idx > start {
                raw.push(start..idx);
            }
            start = idx;
        }
        if start < segment.len() {
            raw.push(start..segment.len());
        }
        raw
    };

    let mut pieces: Vec<Range<usize>> = Vec::with_capacity(raw.len());
    let mut pending: Option<usize> = None;
    for piece in raw {
        if segment[piece.clone()].trim().is_empty() {
            pending.get_or_insert(piece.start);
            continue;
        }
        let start = pending.take().unwrap_or(piece.start);
        pieces.push(base + start..base + piece.end);
    }
    if let Some(start) = pending {
        match pieces.last_mut() {
            Some(last) => last.end = base + segment.len(),
            None => pieces.push(base + start..base + segment.len()),
        }
    }
    pieces
}

fn char_len(text: &str, range: &Range<usize>) -> usize {
    text[range.clone()].chars().count()
}

/// Normalize extracted text before chunking.
///
/// Runs of spaces and tabs become one space. Any whitespace run holding two or
/// more line breaks becomes exactly one blank line. The result is trimmed.
pub fn normalize_text(raw: &str) -> String {
    let horizontal = HORIZONTAL_WHITESPACE.replace_all(raw, " ");
    BLANK_LINES.replace_all(&horizontal, "\n\n").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunker(size: usize, overlap: usize, separators: &[&str]) -> RecursiveChunker {
        RecursiveChunker::new(ChunkConfig {
            chunk_size: size,
            chunk_overlap: overlap,
            separators: separators.iter().map(|s| s.to_string()).collect(),
        })
        .unwrap()
    }

    #[test]
    fn test_article_example_splits_at_paragraph() {
        let text = normalize_text("Article 1. Purpose.\n\nThis regulation applies.");
        let c = chunker(20, 5, &["\nArticle ", "\n\n", " ", ""]);

        let chunks = c.split(&text);

        assert!(chunks.len() >= 2);
        assert_eq!(chunks[0].content, "Article 1. Purpose.");
        assert!(chunks.iter().all(|ch| ch.content.chars().count() <= 20));
        assert_eq!(reconstruct(&chunks), text);
    }

    #[test]
    fn test_overlap_is_shared_and_removed_on_reconstruction() {
        let text = "alpha beta gamma delta epsilon zeta eta theta iota kappa lambda mu";
        let c = chunker(20, 8, &["\n\n", "\n", " ", ""]);

        let chunks = c.split(text);

        assert!(chunks.len() > 2);
        assert!(chunks.iter().skip(1).any(|ch| ch.overlap > 0));
        for ch in &chunks {
            assert!(ch.content.chars().count() <= 20);
            assert!(ch.content[..ch.overlap].chars().count() <= 8);
        }
        assert_eq!(reconstruct(&chunks), text);
    }

    #[test]
    fn test_rechunking_is_idempotent() {
        let text = normalize_text(
            "Article 9\nRisk management system.\n\nArticle 10\nData governance applies to training, validation and testing sets.",
        );
        let c = chunker(40, 10, &["\nArticle ", "\n\n", "\n", " ", ""]);

        let first = c.split(&text);
        let second = c.split(&text);

        assert_eq!(first, second);
        assert_eq!(reconstruct(&first), text);
    }

    #[test]
    fn test_falls_back_to_characters() {
        let text = "abcdefghijklmnopqrstuvwxyz";
        let c = chunker(10, 2, &[" ", ""]);

        let chunks = c.split(text);

        assert!(chunks.len() >= 3);
        assert!(chunks.iter().all(|ch| ch.content.chars().count() <= 10));
        assert_eq!(reconstruct(&chunks), text);
    }

    #[test]
    fn test_multibyte_text_is_split_on_char_boundaries() {
        let text = "Articolo 1 è applicabile à tutti i sistemi ad alto rischio";
        let c = chunker(12, 3, &[" ", ""]);

        let chunks = c.split(text);

        assert!(chunks.iter().all(|ch| ch.content.chars().count() <= 12));
        assert_eq!(reconstruct(&chunks), text);
    }

    #[test]
    fn test_empty_text_yields_no_chunks() {
        let c = chunker(10, 2, &[" ", ""]);
        assert!(c.split("").is_empty());
    }

    #[test]
    fn test_chunks_are_never_empty() {
        let text = normalize_text("one two\n\n\n\nthree   four\n \n five");
        let c = chunker(6, 2, &["\n\n", "\n", " ", ""]);
        assert!(c.split(&text).iter().all(|ch| !ch.content.trim().is_empty()));
    }

    #[test]
    fn test_paragraph_break_survives_resplitting() {
        let text = normalize_text("Scope.\n\nThe provider shall keep records of every run.");
        let c = chunker(20, 5, &["\nArticle ", "\n\n", "\n", " ", ""]);

        let chunks = c.split(&text);

        assert_eq!(chunks[0].content, "Scope.");
        assert!(chunks[1].content.starts_with("\n\nThe"));
        assert!(chunks.iter().all(|ch| ch.content.chars().count() <= 20));
        assert_eq!(reconstruct(&chunks), text);
    }

    #[test]
    fn test_long_paragraphs_with_default_separators() {
        let sentence = "The provider shall document the data governance measures applied to training sets. ";
        let paragraph = sentence.repeat(15);
        let text = normalize_text(&format!(
            "Article 10\nData governance\n\n{}\n\n{}\nArticle 11\n{}",
            paragraph, paragraph, paragraph
        ));
        let c = RecursiveChunker::new(ChunkConfig::default()).unwrap();

        let chunks = c.split(&text);

        assert!(chunks.len() > 3);
        assert!(chunks.iter().all(|ch| ch.content.chars().count() <= c.config().chunk_size));
        assert!(chunks.iter().all(|ch| !ch.content.trim().is_empty()));
        assert_eq!(reconstruct(&chunks), text);
    }

    #[test]
    fn test_blank_pieces_attach_to_next_piece() {
        let pieces = split_keep_start("a\n\nb\n", "\n", 10);
        assert_eq!(pieces, vec![10..11, 11..15]);

        let pieces = split_keep_start(" \nx", "", 0);
        assert_eq!(pieces, vec![0..3]);
    }

    #[test]
    fn test_rejects_overlap_not_smaller_than_size() {
        let result = RecursiveChunker::new(ChunkConfig {
            chunk_size: 10,
            chunk_overlap: 10,
            separators: vec!["".to_string()],
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_normalize_collapses_whitespace() {
        assert_eq!(normalize_text("a  \t b"), "a b");
        assert_eq!(normalize_text("a\n\n\n\nb"), "a\n\nb");
        assert_eq!(normalize_text("a\n \n\t\n b"), "a\n\n b");
        assert_eq!(normalize_text("a\nb"), "a\nb");
        assert_eq!(normalize_text("\n  title \n"), "title");
    }
}
