//! Document chunking strategies.
//!
//! Provides the `Chunker` trait and the recursive character splitter used by
//! the ingestion pipeline.

use crate::config::ChunkingConfig;

/// A raw chunk before being assigned IDs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawChunk {
    /// The text content of this chunk.
    pub content: String,
}

impl RawChunk {
    pub fn new(content: String) -> Self {
        Self { content }
    }

    /// Get character count.
    pub fn char_count(&self) -> usize {
        self.content.chars().count()
    }
}

/// Trait for document chunking strategies.
pub trait Chunker: Send + Sync {
    /// Split page text into chunks.
    fn chunk(&self, text: &str, config: &ChunkingConfig) -> Vec<RawChunk>;
}

/// Recursive character splitter: semantic boundaries first, raw cuts last.
///
/// Algorithm:
/// 1. Split by paragraphs (blank line)
/// 2. Split oversized paragraphs into sentences
/// 3. Split oversized sentences into words
/// 4. Cut an indivisible oversized fragment into raw character windows
///    sharing exactly `overlap_chars` characters at each boundary
/// 5. Greedily merge adjacent fragments up to `max_chunk_chars`, carrying
///    trailing fragments of up to `overlap_chars` into the next chunk
///
/// Boundaries are heuristic: cross-fragment joins are normalized to a single
/// space, and the overlap carried between merged chunks is made of whole
/// fragments, so it may be shorter than `overlap_chars`.
#[derive(Debug, Default)]
pub struct RecursiveChunker;

impl RecursiveChunker {
    pub fn new() -> Self {
        Self
    }
}

impl Chunker for RecursiveChunker {
    fn chunk(&self, text: &str, config: &ChunkingConfig) -> Vec<RawChunk> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let pieces = split_recursive(text, config);
        merge_pieces(pieces, config)
    }
}

/// A fragment produced by the recursive split, each at most
/// `max_chunk_chars` characters.
#[derive(Debug, Clone)]
enum Piece {
    /// Mergeable fragment from a semantic boundary split.
    Plain(String),
    /// Raw character window. Already carries exact overlap with its
    /// neighboring windows, so it is emitted as a chunk unchanged.
    Sealed(String),
}

/// Break text into fragments no larger than the chunk window.
fn split_recursive(text: &str, config: &ChunkingConfig) -> Vec<Piece> {
    let max = config.max_chunk_chars;
    let mut pieces = Vec::new();

    for para in split_paragraphs(text) {
        if char_len(para) <= max {
            pieces.push(Piece::Plain(para.to_string()));
            continue;
        }

        for sentence in split_sentences(para) {
            if char_len(&sentence) <= max {
                pieces.push(Piece::Plain(sentence));
                continue;
            }

            for word in sentence.split_whitespace() {
                if char_len(word) <= max {
                    pieces.push(Piece::Plain(word.to_string()));
                } else {
                    // No semantic boundary left; fall back to raw cuts.
                    for window in char_windows(word, max, config.overlap_chars) {
                        pieces.push(Piece::Sealed(window));
                    }
                }
            }
        }
    }

    pieces
}

/// Split content into paragraphs on blank lines.
fn split_paragraphs(text: &str) -> Vec<&str> {
    text.split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect()
}

/// Split a paragraph into sentences.
///
/// A sentence ends after `.`, `!` or `?` followed by whitespace, or at a
/// line break.
fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut prev_terminator = false;

    for (i, c) in text.char_indices() {
        if c == '\n' {
            push_trimmed(&mut sentences, &text[start..i]);
            start = i + c.len_utf8();
            prev_terminator = false;
            continue;
        }

        if prev_terminator && c.is_whitespace() {
            push_trimmed(&mut sentences, &text[start..i]);
            start = i;
        }

        prev_terminator = matches!(c, '.' | '!' | '?');
    }

    push_trimmed(&mut sentences, &text[start..]);
    sentences
}

fn push_trimmed(out: &mut Vec<String>, segment: &str) {
    let trimmed = segment.trim();
    if !trimmed.is_empty() {
        out.push(trimmed.to_string());
    }
}

/// Cut text into character windows of `max_chars` with exact overlap.
fn char_windows(text: &str, max_chars: usize, overlap_chars: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let step = max_chars.saturating_sub(overlap_chars).max(1);

    let mut windows = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let end = (start + max_chars).min(chars.len());
        windows.push(chars[start..end].iter().collect());
        if end >= chars.len() {
            break;
        }
        start += step;
    }

    windows
}

/// Character length of joining `parts` with single spaces.
fn joined_char_len(parts: &[String]) -> usize {
    if parts.is_empty() {
        return 0;
    }
    parts.iter().map(|p| char_len(p)).sum::<usize>() + parts.len() - 1
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Take whole fragments from the end of `parts` totaling at most
/// `overlap_chars` characters when joined.
fn overlap_tail(mut parts: Vec<String>, overlap_chars: usize) -> Vec<String> {
    let mut tail: Vec<String> = Vec::new();

    while let Some(last) = parts.pop() {
        let sep = usize::from(!tail.is_empty());
        if joined_char_len(&tail) + sep + char_len(&last) <= overlap_chars {
            tail.insert(0, last);
        } else {
            break;
        }
    }

    tail
}

/// Merge fragments into chunks bounded by `max_chunk_chars`.
fn merge_pieces(pieces: Vec<Piece>, config: &ChunkingConfig) -> Vec<RawChunk> {
    let max = config.max_chunk_chars;
    let mut chunks = Vec::new();

    // Fragments accumulating toward the next chunk. `has_new` distinguishes
    // fresh content from a carried overlap tail, which must not be emitted
    // on its own.
    let mut current: Vec<String> = Vec::new();
    let mut has_new = false;

    for piece in pieces {
        match piece {
            Piece::Sealed(window) => {
                if has_new && !current.is_empty() {
                    chunks.push(RawChunk::new(current.join(" ")));
                }
                current.clear();
                has_new = false;
                chunks.push(RawChunk::new(window));
            }
            Piece::Plain(text) => {
                let len = char_len(&text);

                if !current.is_empty() && joined_char_len(&current) + 1 + len > max {
                    if has_new {
                        chunks.push(RawChunk::new(current.join(" ")));
                    }
                    current = overlap_tail(current, config.overlap_chars);
                    has_new = false;

                    // Drop carried fragments that would push the incoming
                    // fragment past the window.
                    while !current.is_empty() && joined_char_len(&current) + 1 + len > max {
                        current.remove(0);
                    }
                }

                current.push(text);
                has_new = true;
            }
        }
    }

    if has_new && !current.is_empty() {
        chunks.push(RawChunk::new(current.join(" ")));
    }

    chunks
}
