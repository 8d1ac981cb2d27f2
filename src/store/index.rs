//! Vector index construction and retrieval.
//!
//! An index directory is built in bulk, once, at the end of the ingestion
//! pipeline and is never mutated afterwards:
//!
//! ```text
//! <index_path>/
//!   meta.json      index-level metadata (version, dimension, model, counts)
//!   vectors.bin    flat vector file, one record per chunk
//!   docstore/      tantivy index holding chunk payloads
//! ```
//!
//! Building **overwrites** any prior contents at the target path; there is
//! no merge or versioned migration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tantivy::collector::TopDocs;
use tantivy::directory::MmapDirectory;
use tantivy::directory::error::OpenDirectoryError;
use tantivy::query::TermQuery;
use tantivy::schema::Value;
use tantivy::{
    Index, IndexReader, IndexSettings, IndexWriter, ReloadPolicy, TantivyDocument, Term,
};
use thiserror::Error;

use super::schema::ChunkSchema;
use super::vectors::{VectorFile, VectorFileError, VectorFileWriter};
use crate::types::{ChunkId, DocumentChunk, VectorDimension};

/// Tantivy writer heap, in bytes.
const WRITER_HEAP: usize = 50_000_000;

/// Name of the metadata file inside an index directory.
const META_FILE: &str = "meta.json";

/// Name of the vector file inside an index directory.
const VECTORS_FILE: &str = "vectors.bin";

/// Name of the tantivy docstore directory inside an index directory.
const DOCSTORE_DIR: &str = "docstore";

/// Current on-disk format version.
const FORMAT_VERSION: u32 = 1;

/// Errors from index operations.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("tantivy error: {0}")]
    Tantivy(#[from] tantivy::TantivyError),

    #[error("directory error: {0}")]
    Directory(#[from] OpenDirectoryError),

    #[error("vector file error: {0}")]
    Vectors(#[from] VectorFileError),

    #[error("index not found at {0}")]
    NotFound(PathBuf),

    #[error("corrupt index: {0}")]
    Corrupt(String),

    #[error("query has {actual} dimensions, index stores {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Result type for index operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Index-level metadata persisted as `meta.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexMeta {
    /// On-disk format version.
    pub format_version: u32,

    /// Vector dimension.
    pub dimension: usize,

    /// Embedding model identifier the vectors were generated with.
    pub model: String,

    /// Number of chunks (== vectors) stored.
    pub chunk_count: usize,

    /// UTC seconds when the index was built.
    pub created_at: u64,
}

/// A chunk payload read back from the docstore.
#[derive(Debug, Clone, Serialize)]
pub struct StoredChunk {
    pub id: ChunkId,
    pub source_path: PathBuf,
    pub page_number: usize,
    pub chunk_index: usize,
    pub content: String,
}

/// Write-once builder for a vector index directory.
pub struct VectorIndexBuilder {
    base_path: PathBuf,
    writer: IndexWriter<TantivyDocument>,
    schema: ChunkSchema,
    vectors: VectorFileWriter,
    dimension: VectorDimension,
    model: String,
    indexed_at: u64,
}

impl VectorIndexBuilder {
    /// Start building an index at `base_path`, replacing any prior contents.
    pub fn create(
        base_path: impl AsRef<Path>,
        dimension: VectorDimension,
        model: &str,
    ) -> StoreResult<Self> {
        let base_path = base_path.as_ref().to_path_buf();

        // Overwrite semantics: wipe whatever was there before.
        if base_path.exists() {
            tracing::debug!(target: "store", "replacing existing index at {}", base_path.display());
            std::fs::remove_dir_all(&base_path)?;
        }

        let docstore_path = base_path.join(DOCSTORE_DIR);
        std::fs::create_dir_all(&docstore_path)?;

        let (tantivy_schema, schema) = ChunkSchema::build();
        let dir = MmapDirectory::open(&docstore_path)?;
        let index = Index::create(dir, tantivy_schema, IndexSettings::default())?;
        let writer = index.writer(WRITER_HEAP)?;

        let vectors = VectorFileWriter::create(base_path.join(VECTORS_FILE), dimension)?;

        Ok(Self {
            base_path,
            writer,
            schema,
            vectors,
            dimension,
            model: model.to_string(),
            indexed_at: utc_timestamp(),
        })
    }

    /// Add one (chunk, embedding) pair.
    pub fn add(&mut self, chunk: &DocumentChunk, vector: &[f32]) -> StoreResult<()> {
        // The vector file enforces the dimension.
        self.vectors.append(chunk.id, vector)?;

        let mut doc = TantivyDocument::new();
        doc.add_text(self.schema.doc_type, "chunk");
        doc.add_u64(self.schema.chunk_id, chunk.id.get() as u64);
        doc.add_text(
            self.schema.source_path,
            chunk.source_path.to_string_lossy().as_ref(),
        );
        doc.add_u64(self.schema.page_number, chunk.page_number as u64);
        doc.add_u64(self.schema.chunk_index, chunk.chunk_index as u64);
        doc.add_text(self.schema.content, &chunk.content);
        doc.add_text(self.schema.content_preview, &chunk.preview(200));
        doc.add_u64(self.schema.char_count, chunk.char_count() as u64);
        doc.add_u64(self.schema.indexed_at, self.indexed_at);

        self.writer.add_document(doc)?;
        Ok(())
    }

    /// Number of pairs added so far.
    pub fn len(&self) -> usize {
        self.vectors.count()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.count() == 0
    }

    /// Commit the docstore, seal the vector file, and write `meta.json`.
    ///
    /// An index built from zero pairs is valid: it reopens cleanly and
    /// nearest-neighbor queries return no results.
    pub fn finish(mut self) -> StoreResult<IndexMeta> {
        self.writer.commit()?;

        let chunk_count = self.vectors.count();
        self.vectors.finish()?;

        let meta = IndexMeta {
            format_version: FORMAT_VERSION,
            dimension: self.dimension.get(),
            model: self.model,
            chunk_count,
            created_at: self.indexed_at,
        };

        let content = serde_json::to_string_pretty(&meta)
            .map_err(|e| StoreError::Corrupt(format!("failed to serialize meta: {e}")))?;
        std::fs::write(self.base_path.join(META_FILE), content)?;

        tracing::info!(
            target: "store",
            "built index with {} chunks at {}",
            chunk_count,
            self.base_path.display()
        );

        Ok(meta)
    }
}

/// Read-only handle on a persisted vector index.
pub struct VectorIndex {
    reader: IndexReader,
    schema: ChunkSchema,
    vectors: VectorFile,
    meta: IndexMeta,
}

impl std::fmt::Debug for VectorIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorIndex")
            .field("chunk_count", &self.meta.chunk_count)
            .field("dimension", &self.meta.dimension)
            .field("model", &self.meta.model)
            .finish()
    }
}

impl VectorIndex {
    /// Open an index directory, validating metadata against its contents.
    pub fn open(base_path: impl AsRef<Path>) -> StoreResult<Self> {
        let base_path = base_path.as_ref();
        let meta_path = base_path.join(META_FILE);
        if !meta_path.exists() {
            return Err(StoreError::NotFound(base_path.to_path_buf()));
        }

        let meta: IndexMeta = serde_json::from_str(&std::fs::read_to_string(&meta_path)?)
            .map_err(|e| StoreError::Corrupt(format!("failed to parse meta.json: {e}")))?;

        if meta.format_version != FORMAT_VERSION {
            return Err(StoreError::Corrupt(format!(
                "unsupported index format version {}",
                meta.format_version
            )));
        }

        let vectors = VectorFile::open(base_path.join(VECTORS_FILE))?;

        if vectors.dimension().get() != meta.dimension {
            return Err(StoreError::Corrupt(format!(
                "meta.json declares dimension {}, vector file stores {}",
                meta.dimension,
                vectors.dimension().get()
            )));
        }

        if vectors.len() != meta.chunk_count {
            return Err(StoreError::Corrupt(format!(
                "meta.json declares {} chunks, vector file stores {}",
                meta.chunk_count,
                vectors.len()
            )));
        }

        let index = Index::open_in_dir(base_path.join(DOCSTORE_DIR))?;
        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;
        reader.reload()?;

        let (_, schema) = ChunkSchema::build();

        Ok(Self {
            reader,
            schema,
            vectors,
            meta,
        })
    }

    /// Index-level metadata.
    pub fn meta(&self) -> &IndexMeta {
        &self.meta
    }

    /// Number of stored chunks.
    pub fn len(&self) -> usize {
        self.meta.chunk_count
    }

    pub fn is_empty(&self) -> bool {
        self.meta.chunk_count == 0
    }

    /// Find the `limit` chunks most similar to `query`, best first.
    ///
    /// Exact scan over the vector file with cosine similarity; an empty
    /// index returns an empty Vec.
    pub fn nearest(&self, query: &[f32], limit: usize) -> StoreResult<Vec<(ChunkId, f32)>> {
        if query.len() != self.meta.dimension {
            return Err(StoreError::DimensionMismatch {
                expected: self.meta.dimension,
                actual: query.len(),
            });
        }

        let mut scored: Vec<(ChunkId, f32)> = self
            .vectors
            .iter()
            .map(|(id, vector)| (id, cosine_similarity(query, &vector)))
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit);

        Ok(scored)
    }

    /// Fetch the stored payload for a chunk.
    pub fn get_chunk(&self, id: ChunkId) -> StoreResult<Option<StoredChunk>> {
        let searcher = self.reader.searcher();

        let term = Term::from_field_u64(self.schema.chunk_id, id.get() as u64);
        let query = TermQuery::new(term, tantivy::schema::IndexRecordOption::Basic);

        let top_docs = searcher.search(&query, &TopDocs::with_limit(1))?;
        let Some((_score, doc_address)) = top_docs.first() else {
            return Ok(None);
        };

        let doc: TantivyDocument = searcher.doc(*doc_address)?;

        let source_path = doc
            .get_first(self.schema.source_path)
            .and_then(|v| v.as_str())
            .map(PathBuf::from)
            .unwrap_or_default();

        let page_number = doc
            .get_first(self.schema.page_number)
            .and_then(|v| v.as_u64())
            .unwrap_or(0) as usize;

        let chunk_index = doc
            .get_first(self.schema.chunk_index)
            .and_then(|v| v.as_u64())
            .unwrap_or(0) as usize;

        let content = doc
            .get_first(self.schema.content)
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string();

        Ok(Some(StoredChunk {
            id,
            source_path,
            page_number,
            chunk_index,
            content,
        }))
    }
}

/// Calculate cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let magnitude_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let magnitude_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        return 0.0;
    }

    dot_product / (magnitude_a * magnitude_b)
}

fn utc_timestamp() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
