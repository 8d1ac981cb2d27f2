//! Core types shared across the ingestion pipeline.

use serde::{Deserialize, Serialize};
use std::num::{NonZeroU32, NonZeroUsize};
use std::path::PathBuf;

/// Unique identifier for a document chunk.
///
/// Chunk IDs are allocated sequentially during ingestion, starting at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkId(NonZeroU32);

impl ChunkId {
    /// Create a ChunkId from a u32, returning None if zero.
    pub fn from_u32(value: u32) -> Option<Self> {
        NonZeroU32::new(value).map(Self)
    }

    /// Get the inner value as u32.
    pub fn get(&self) -> u32 {
        self.0.get()
    }

    /// Convert to bytes for storage (little-endian).
    pub fn to_bytes(&self) -> [u8; 4] {
        self.0.get().to_le_bytes()
    }

    /// Create from bytes (little-endian).
    pub fn from_bytes(bytes: [u8; 4]) -> Option<Self> {
        Self::from_u32(u32::from_le_bytes(bytes))
    }
}

/// Dimension of embedding vectors stored in an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorDimension(NonZeroUsize);

impl VectorDimension {
    /// Create a dimension, returning None if zero.
    pub fn new(value: usize) -> Option<Self> {
        NonZeroUsize::new(value).map(Self)
    }

    /// The 384-dimension space used by AllMiniLML6V2.
    pub fn dimension_384() -> Self {
        Self(NonZeroUsize::new(384).expect("384 is not zero"))
    }

    /// Get the inner value.
    pub fn get(&self) -> usize {
        self.0.get()
    }
}

/// One logical page of a source document, as produced by the loader.
///
/// Immutable once created; the chunker consumes these and inherits the
/// source metadata into each chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageDocument {
    /// Path to the source PDF file.
    pub source_path: PathBuf,

    /// Page number within the source file (1-based).
    pub page_number: usize,

    /// Extracted text of the page.
    pub text: String,
}

impl PageDocument {
    pub fn new(source_path: PathBuf, page_number: usize, text: String) -> Self {
        Self {
            source_path,
            page_number,
            text,
        }
    }
}

/// A chunk of a page with inherited metadata, ready for embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentChunk {
    /// Unique identifier for this chunk.
    pub id: ChunkId,

    /// Path to the source PDF file.
    pub source_path: PathBuf,

    /// Page number within the source file (1-based).
    pub page_number: usize,

    /// Position of this chunk among the chunks of the same page (0-based).
    pub chunk_index: usize,

    /// The actual text content of this chunk.
    pub content: String,
}

impl DocumentChunk {
    pub fn new(
        id: ChunkId,
        source_path: PathBuf,
        page_number: usize,
        chunk_index: usize,
        content: String,
    ) -> Self {
        Self {
            id,
            source_path,
            page_number,
            chunk_index,
            content,
        }
    }

    /// Get a preview of the content (first N characters, UTF-8 safe).
    pub fn preview(&self, max_chars: usize) -> String {
        self.content.chars().take(max_chars).collect()
    }

    /// Get the length of the content in characters.
    pub fn char_count(&self) -> usize {
        self.content.chars().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_id_roundtrip() {
        let id = ChunkId::from_u32(42).unwrap();
        let bytes = id.to_bytes();
        let recovered = ChunkId::from_bytes(bytes).unwrap();
        assert_eq!(id, recovered);
    }

    #[test]
    fn test_chunk_id_zero_returns_none() {
        assert!(ChunkId::from_u32(0).is_none());
        assert!(ChunkId::from_bytes([0, 0, 0, 0]).is_none());
    }

    #[test]
    fn test_vector_dimension() {
        assert!(VectorDimension::new(0).is_none());
        assert_eq!(VectorDimension::dimension_384().get(), 384);
    }

    #[test]
    fn test_document_chunk_preview() {
        let chunk = DocumentChunk::new(
            ChunkId::from_u32(1).unwrap(),
            PathBuf::from("test.pdf"),
            1,
            0,
            "Hello, world! This is a test.".to_string(),
        );

        assert_eq!(chunk.preview(5), "Hello");
        assert_eq!(chunk.preview(100), "Hello, world! This is a test.");
        assert_eq!(chunk.char_count(), 29);
    }
}
