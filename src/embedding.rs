//! Embedding generation for document chunks.
//!
//! The pipeline talks to the [`EmbeddingGenerator`] trait; production code
//! uses [`FastEmbedGenerator`] backed by fastembed's ONNX models.

use std::sync::Mutex;

use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use thiserror::Error;

use crate::types::VectorDimension;

/// Errors from embedding operations.
#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("unknown embedding model: {0}")]
    UnknownModel(String),

    #[error("failed to initialize embedding model: {0}")]
    ModelInit(String),

    #[error("failed to generate embedding: {0}")]
    Generation(String),

    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("embedding model lock poisoned")]
    LockPoisoned,
}

/// Generates dense vectors for chunk text.
///
/// Implementations must be deterministic for a fixed model version:
/// embedding the same text twice yields the same vector.
pub trait EmbeddingGenerator: Send + Sync {
    /// Generate one embedding per input text, in input order.
    fn generate_embeddings(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// The dimension of vectors this generator produces.
    fn dimension(&self) -> VectorDimension;

    /// Human-readable model identifier, recorded in index metadata.
    fn model_name(&self) -> &str;
}

/// Embedding generation backed by fastembed.
pub struct FastEmbedGenerator {
    /// The embedding model (wrapped in Mutex for interior mutability).
    model: Mutex<TextEmbedding>,

    /// Declared model dimension, validated against generated vectors.
    dimension: VectorDimension,

    /// Model identifier as configured.
    name: String,
}

impl FastEmbedGenerator {
    /// Create a generator with the default model (AllMiniLML6V2, 384 dims).
    pub fn new() -> Result<Self, EmbeddingError> {
        Self::from_name("AllMiniLML6V2")
    }

    /// Create a generator from a configured model name.
    pub fn from_name(name: &str) -> Result<Self, EmbeddingError> {
        let (model, dimension) = resolve_model(name)?;

        let text_model = TextEmbedding::try_new(
            InitOptions::new(model).with_show_download_progress(true),
        )
        .map_err(|e| EmbeddingError::ModelInit(e.to_string()))?;

        Ok(Self {
            model: Mutex::new(text_model),
            dimension,
            name: name.to_string(),
        })
    }
}

impl EmbeddingGenerator for FastEmbedGenerator {
    fn generate_embeddings(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let embeddings = self
            .model
            .lock()
            .map_err(|_| EmbeddingError::LockPoisoned)?
            .embed(texts.to_vec(), None)
            .map_err(|e| EmbeddingError::Generation(e.to_string()))?;

        let expected = self.dimension.get();
        for embedding in &embeddings {
            if embedding.len() != expected {
                return Err(EmbeddingError::DimensionMismatch {
                    expected,
                    actual: embedding.len(),
                });
            }
        }

        Ok(embeddings)
    }

    fn dimension(&self) -> VectorDimension {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.name
    }
}

/// Map a configured model name to a fastembed model and its dimension.
fn resolve_model(name: &str) -> Result<(EmbeddingModel, VectorDimension), EmbeddingError> {
    let (model, dimension) = match name {
        "AllMiniLML6V2" => (EmbeddingModel::AllMiniLML6V2, 384),
        "AllMiniLML12V2" => (EmbeddingModel::AllMiniLML12V2, 384),
        "BGESmallENV15" => (EmbeddingModel::BGESmallENV15, 384),
        other => return Err(EmbeddingError::UnknownModel(other.to_string())),
    };

    let dimension =
        VectorDimension::new(dimension).ok_or_else(|| EmbeddingError::UnknownModel(name.into()))?;

    Ok((model, dimension))
}
