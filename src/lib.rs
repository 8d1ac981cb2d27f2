//! PDF ingestion pipeline for semantic retrieval.
//!
//! Loads PDF documents, splits them into overlapping text chunks, embeds
//! each chunk with a sentence-embedding model, and persists the result into
//! a local vector index:
//!
//! ```text
//! loader -> chunker -> embedding -> store
//! ```
//!
//! The pipeline is a strictly sequential batch job driven by [`pipeline::ingest`].

pub mod chunker;
pub mod config;
pub mod embedding;
pub mod loader;
pub mod logging;
pub mod pipeline;
pub mod store;
pub mod types;

pub use chunker::{Chunker, RawChunk, RecursiveChunker};
pub use config::{ChunkingConfig, EmbeddingConfig, LoggingConfig, Settings};
pub use embedding::{EmbeddingError, EmbeddingGenerator, FastEmbedGenerator};
pub use loader::{
    LoadError, PageExtractor, PdfExtractor, discover_pdf_files, load_documents,
    load_documents_with,
};
pub use pipeline::{IngestProgress, IngestStats, PipelineError, ingest};
pub use store::{IndexMeta, StoreError, StoredChunk, VectorIndex, VectorIndexBuilder};
pub use types::{ChunkId, DocumentChunk, PageDocument, VectorDimension};
