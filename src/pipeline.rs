//! The ingestion pipeline: load, chunk, embed, index.
//!
//! A single forward pass with no retries and no partial-progress
//! checkpointing. Each stage consumes the previous stage's output; nothing
//! reaches disk until the final index build, so a failure at any stage
//! discards the whole run.

use std::path::Path;

use thiserror::Error;

use crate::chunker::{Chunker, RecursiveChunker};
use crate::config::Settings;
use crate::embedding::{EmbeddingError, EmbeddingGenerator};
use crate::loader::{self, LoadError, PageExtractor};
use crate::store::{IndexMeta, StoreError, VectorIndexBuilder};
use crate::types::{ChunkId, DocumentChunk};

/// Errors from a pipeline run.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("invalid chunking configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("chunk count exceeds the index format limit")]
    TooManyChunks,
}

/// Statistics from an ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestStats {
    /// Number of PDF files discovered and parsed.
    pub files: usize,
    /// Number of page documents loaded.
    pub pages: usize,
    /// Number of chunks created.
    pub chunks: usize,
    /// Number of embeddings generated (always equals `chunks`).
    pub embeddings: usize,
}

/// Progress updates during an ingestion run.
#[derive(Debug, Clone)]
pub enum IngestProgress<'a> {
    /// Extracting text from a file.
    ExtractingFile {
        current: usize,
        total: usize,
        path: &'a Path,
    },
    /// Generating embeddings for chunks.
    GeneratingEmbeddings { current: usize, total: usize },
}

/// Run the full pipeline described by `settings`.
///
/// Stages run strictly in order:
/// 1. discover and load PDFs under `settings.data_path`
/// 2. split each page into chunks
/// 3. embed every chunk
/// 4. build the index at `settings.index_path`, replacing prior contents
///
/// An empty data directory is not an error: it produces an empty, openable
/// index.
pub fn ingest<F>(
    settings: &Settings,
    extractor: &dyn PageExtractor,
    generator: &dyn EmbeddingGenerator,
    mut on_progress: F,
) -> Result<IngestStats, PipelineError>
where
    F: FnMut(IngestProgress<'_>),
{
    settings.chunking.validate().map_err(PipelineError::Config)?;

    let mut stats = IngestStats::default();

    // Stage 1: load page documents.
    let mut file_count = 0;
    let documents = loader::load_documents_with(
        &settings.data_path,
        extractor,
        |current, total, path| {
            file_count = total;
            on_progress(IngestProgress::ExtractingFile {
                current,
                total,
                path,
            });
        },
    )?;
    stats.files = file_count;
    stats.pages = documents.len();

    // Stage 2: chunk.
    let chunker = RecursiveChunker::new();
    let mut chunks: Vec<DocumentChunk> = Vec::new();
    let mut next_id: u64 = 1;

    for document in &documents {
        let raw_chunks = chunker.chunk(&document.text, &settings.chunking);

        for (chunk_idx, raw) in raw_chunks.into_iter().enumerate() {
            if next_id > u64::from(u32::MAX) {
                return Err(PipelineError::TooManyChunks);
            }
            let id = ChunkId::from_u32(next_id as u32).ok_or(PipelineError::TooManyChunks)?;
            next_id += 1;

            chunks.push(DocumentChunk::new(
                id,
                document.source_path.clone(),
                document.page_number,
                chunk_idx,
                raw.content,
            ));
        }
    }
    stats.chunks = chunks.len();

    tracing::info!(
        target: "pipeline",
        "chunked {} pages into {} chunks",
        stats.pages,
        stats.chunks
    );

    // Stage 3: embed, in batches.
    let batch_size = settings.embedding.batch_size.max(1);
    let mut embeddings: Vec<Vec<f32>> = Vec::with_capacity(chunks.len());

    for batch in chunks.chunks(batch_size) {
        let texts: Vec<&str> = batch.iter().map(|c| c.content.as_str()).collect();
        let mut batch_embeddings = generator.generate_embeddings(&texts)?;

        if batch_embeddings.len() != batch.len() {
            return Err(EmbeddingError::Generation(format!(
                "model returned {} embeddings for {} texts",
                batch_embeddings.len(),
                batch.len()
            ))
            .into());
        }

        embeddings.append(&mut batch_embeddings);

        on_progress(IngestProgress::GeneratingEmbeddings {
            current: embeddings.len(),
            total: chunks.len(),
        });
    }
    stats.embeddings = embeddings.len();

    // Stage 4: build and persist the index.
    let meta = build_index(settings, generator, &chunks, &embeddings)?;
    debug_assert_eq!(meta.chunk_count, stats.chunks);

    Ok(stats)
}

fn build_index(
    settings: &Settings,
    generator: &dyn EmbeddingGenerator,
    chunks: &[DocumentChunk],
    embeddings: &[Vec<f32>],
) -> Result<IndexMeta, PipelineError> {
    let mut builder = VectorIndexBuilder::create(
        &settings.index_path,
        generator.dimension(),
        generator.model_name(),
    )?;

    for (chunk, embedding) in chunks.iter().zip(embeddings.iter()) {
        builder.add(chunk, embedding)?;
    }

    Ok(builder.finish()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::LoadResult;
    use crate::store::VectorIndex;
    use crate::types::VectorDimension;
    use std::fs;
    use tempfile::TempDir;

    /// Extractor that splits a plain-text file into pages on form feeds.
    struct PlainTextExtractor;

    impl PageExtractor for PlainTextExtractor {
        fn extract_pages(&self, path: &Path) -> LoadResult<Vec<String>> {
            let text = fs::read_to_string(path).map_err(|source| LoadError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            Ok(text.split('\x0c').map(str::to_string).collect())
        }
    }

    /// Deterministic generator: hashes text into a small vector.
    struct MockEmbeddingGenerator {
        dimension: usize,
    }

    impl EmbeddingGenerator for MockEmbeddingGenerator {
        fn generate_embeddings(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            Ok(texts
                .iter()
                .map(|text| {
                    let mut vector = vec![0.0f32; self.dimension];
                    for (i, byte) in text.bytes().enumerate() {
                        vector[i % self.dimension] += f32::from(byte) / 255.0;
                    }
                    let magnitude: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
                    if magnitude > 0.0 {
                        for value in &mut vector {
                            *value /= magnitude;
                        }
                    }
                    vector
                })
                .collect())
        }

        fn dimension(&self) -> VectorDimension {
            VectorDimension::new(self.dimension).unwrap()
        }

        fn model_name(&self) -> &str {
            "mock"
        }
    }

    fn settings_for(dir: &TempDir) -> Settings {
        Settings {
            data_path: dir.path().join("data"),
            index_path: dir.path().join("vectorstore").join("db_faiss"),
            ..Settings::default()
        }
    }

    #[test]
    fn test_ingest_counts_line_up() {
        let tmp = TempDir::new().unwrap();
        let settings = settings_for(&tmp);
        fs::create_dir_all(&settings.data_path).unwrap();

        // One "two-page" file and one single-page file.
        fs::write(
            settings.data_path.join("a.pdf"),
            format!("{}\x0c{}", "alpha text. ".repeat(60), "short second page."),
        )
        .unwrap();
        fs::write(settings.data_path.join("b.pdf"), "single page here.").unwrap();

        let generator = MockEmbeddingGenerator { dimension: 8 };
        let stats = ingest(&settings, &PlainTextExtractor, &generator, |_| {}).unwrap();

        assert_eq!(stats.files, 2);
        assert_eq!(stats.pages, 3);
        assert!(stats.chunks >= stats.pages);
        assert_eq!(stats.embeddings, stats.chunks);

        let index = VectorIndex::open(&settings.index_path).unwrap();
        assert_eq!(index.len(), stats.chunks);
    }

    #[test]
    fn test_empty_data_directory_builds_empty_index() {
        let tmp = TempDir::new().unwrap();
        let settings = settings_for(&tmp);
        fs::create_dir_all(&settings.data_path).unwrap();

        let generator = MockEmbeddingGenerator { dimension: 8 };
        let stats = ingest(&settings, &PlainTextExtractor, &generator, |_| {}).unwrap();

        assert_eq!(stats, IngestStats::default());

        let index = VectorIndex::open(&settings.index_path).unwrap();
        assert!(index.is_empty());
    }

    #[test]
    fn test_missing_data_directory_fails() {
        let tmp = TempDir::new().unwrap();
        let settings = settings_for(&tmp);
        // data_path never created.

        let generator = MockEmbeddingGenerator { dimension: 8 };
        let result = ingest(&settings, &PlainTextExtractor, &generator, |_| {});
        assert!(matches!(
            result,
            Err(PipelineError::Load(LoadError::MissingRoot(_)))
        ));
    }

    #[test]
    fn test_invalid_chunking_config_rejected() {
        let tmp = TempDir::new().unwrap();
        let mut settings = settings_for(&tmp);
        fs::create_dir_all(&settings.data_path).unwrap();
        settings.chunking.overlap_chars = settings.chunking.max_chunk_chars;

        let generator = MockEmbeddingGenerator { dimension: 8 };
        let result = ingest(&settings, &PlainTextExtractor, &generator, |_| {});
        assert!(matches!(result, Err(PipelineError::Config(_))));
    }

    #[test]
    fn test_progress_reports_both_phases() {
        let tmp = TempDir::new().unwrap();
        let settings = settings_for(&tmp);
        fs::create_dir_all(&settings.data_path).unwrap();
        fs::write(settings.data_path.join("doc.pdf"), "some page text.").unwrap();

        let generator = MockEmbeddingGenerator { dimension: 8 };
        let mut extracting = 0;
        let mut embedding = 0;

        ingest(&settings, &PlainTextExtractor, &generator, |progress| {
            match progress {
                IngestProgress::ExtractingFile { .. } => extracting += 1,
                IngestProgress::GeneratingEmbeddings { .. } => embedding += 1,
            }
        })
        .unwrap();

        assert_eq!(extracting, 1);
        assert!(embedding >= 1);
    }

    #[test]
    fn test_mock_embeddings_are_deterministic() {
        let generator = MockEmbeddingGenerator { dimension: 8 };
        let first = generator.generate_embeddings(&["same text"]).unwrap();
        let second = generator.generate_embeddings(&["same text"]).unwrap();
        assert_eq!(first, second);
    }
}
