//! Persistent vector index: flat vector file plus tantivy chunk docstore.

pub mod index;
pub mod schema;
pub mod vectors;

pub use index::{
    IndexMeta, StoreError, StoreResult, StoredChunk, VectorIndex, VectorIndexBuilder,
    cosine_similarity,
};
pub use schema::ChunkSchema;
pub use vectors::{VectorFile, VectorFileError, VectorFileWriter};
