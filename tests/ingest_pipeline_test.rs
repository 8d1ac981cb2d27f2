//! End-to-end pipeline tests: load -> chunk -> embed -> index -> reopen.
//!
//! Uses a plain-text page extractor and a deterministic mock embedding
//! generator so the tests run without model downloads or binary fixtures.

use std::fs;
use std::path::Path;

use pdfrag::loader::{LoadError, LoadResult, PageExtractor};
use pdfrag::store::VectorIndex;
use pdfrag::types::VectorDimension;
use pdfrag::{EmbeddingError, EmbeddingGenerator, IngestStats, Settings, ingest};
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

/// Deterministic embedding generator for testing.
///
/// Hashes bytes into a fixed-dimension vector and normalizes it, so
/// identical texts embed identically and a chunk is always its own nearest
/// neighbor.
struct MockEmbeddingGenerator {
    dimension: usize,
}

impl MockEmbeddingGenerator {
    fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl EmbeddingGenerator for MockEmbeddingGenerator {
    fn generate_embeddings(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts
            .iter()
            .map(|text| {
                let mut vector = vec![0.0f32; self.dimension];
                for (i, byte) in text.bytes().enumerate() {
                    let slot = (i * 31 + usize::from(byte)) % self.dimension;
                    vector[slot] += f32::from(byte) / 255.0;
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

fn settings_for(tmp: &TempDir) -> Settings {
    Settings {
        data_path: tmp.path().join("data"),
        index_path: tmp.path().join("vectorstore").join("db_faiss"),
        ..Settings::default()
    }
}

#[test]
fn test_two_page_document_scenario() {
    let tmp = TempDir::new().unwrap();
    let settings = settings_for(&tmp);
    fs::create_dir_all(&settings.data_path).unwrap();

    // Page 1: 1200 characters with no split boundaries; raw character cuts
    // at window 500 / overlap 50 produce windows at 0, 450, 900 = 3 chunks.
    // Page 2: 300 characters = 1 chunk. Total 4.
    let page1: String = (0..1200)
        .map(|i| char::from(b'a' + (i % 26) as u8))
        .collect();
    let page2: String = (0..300)
        .map(|i| char::from(b'A' + (i % 26) as u8))
        .collect();
    fs::write(
        settings.data_path.join("report.pdf"),
        format!("{page1}\x0c{page2}"),
    )
    .unwrap();

    let generator = MockEmbeddingGenerator::new(384);
    let stats = ingest(&settings, &PlainTextExtractor, &generator, |_| {}).unwrap();

    assert_eq!(stats.files, 1);
    assert_eq!(stats.pages, 2);
    assert_eq!(stats.chunks, 4);
    assert_eq!(stats.embeddings, 4);

    let index = VectorIndex::open(&settings.index_path).unwrap();
    assert_eq!(index.len(), 4);
    assert_eq!(index.meta().dimension, 384);
}

#[test]
fn test_round_trip_self_retrieval() {
    let tmp = TempDir::new().unwrap();
    let settings = settings_for(&tmp);
    fs::create_dir_all(&settings.data_path).unwrap();

    fs::write(
        settings.data_path.join("a.pdf"),
        "Migraine treatment options include rest and hydration.",
    )
    .unwrap();
    fs::write(
        settings.data_path.join("b.pdf"),
        "Quarterly revenue grew by twelve percent year over year.",
    )
    .unwrap();
    fs::write(
        settings.data_path.join("c.pdf"),
        "The hiking trail climbs steeply through the forest.",
    )
    .unwrap();

    let generator = MockEmbeddingGenerator::new(64);
    let stats = ingest(&settings, &PlainTextExtractor, &generator, |_| {}).unwrap();
    assert_eq!(stats.chunks, 3);

    // Reload the persisted index and query each chunk with its own
    // embedding: the chunk itself must come back as the top hit.
    let index = VectorIndex::open(&settings.index_path).unwrap();

    for id in 1..=3u32 {
        let chunk_id = pdfrag::ChunkId::from_u32(id).unwrap();
        let stored = index
            .get_chunk(chunk_id)
            .unwrap()
            .expect("chunk should be stored");

        let embedding = generator
            .generate_embeddings(&[stored.content.as_str()])
            .unwrap()
            .remove(0);

        let results = index.nearest(&embedding, 1).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, chunk_id, "chunk {id} was not its own top hit");
        assert!(results[0].1 > 0.999);
    }
}

#[test]
fn test_reingest_replaces_index() {
    let tmp = TempDir::new().unwrap();
    let settings = settings_for(&tmp);
    fs::create_dir_all(&settings.data_path).unwrap();

    fs::write(settings.data_path.join("one.pdf"), "first corpus document.").unwrap();
    fs::write(settings.data_path.join("two.pdf"), "second corpus document.").unwrap();

    let generator = MockEmbeddingGenerator::new(32);
    let stats = ingest(&settings, &PlainTextExtractor, &generator, |_| {}).unwrap();
    assert_eq!(stats.chunks, 2);

    // Shrink the corpus and re-run: the index is rebuilt, not merged.
    fs::remove_file(settings.data_path.join("two.pdf")).unwrap();
    let stats = ingest(&settings, &PlainTextExtractor, &generator, |_| {}).unwrap();
    assert_eq!(stats.chunks, 1);

    let index = VectorIndex::open(&settings.index_path).unwrap();
    assert_eq!(index.len(), 1);
}

#[test]
fn test_empty_corpus_round_trip() {
    let tmp = TempDir::new().unwrap();
    let settings = settings_for(&tmp);
    fs::create_dir_all(&settings.data_path).unwrap();

    let generator = MockEmbeddingGenerator::new(16);
    let stats = ingest(&settings, &PlainTextExtractor, &generator, |_| {}).unwrap();
    assert_eq!(stats, IngestStats::default());

    let index = VectorIndex::open(&settings.index_path).unwrap();
    assert!(index.is_empty());
    assert!(index.nearest(&vec![0.5f32; 16], 10).unwrap().is_empty());
}

#[test]
fn test_chunk_ordering_follows_sorted_paths() {
    let tmp = TempDir::new().unwrap();
    let settings = settings_for(&tmp);
    fs::create_dir_all(&settings.data_path).unwrap();
    fs::create_dir_all(settings.data_path.join("sub")).unwrap();

    fs::write(settings.data_path.join("zzz.pdf"), "last document.").unwrap();
    fs::write(settings.data_path.join("sub").join("aaa.pdf"), "first document.").unwrap();

    let generator = MockEmbeddingGenerator::new(16);
    ingest(&settings, &PlainTextExtractor, &generator, |_| {}).unwrap();

    let index = VectorIndex::open(&settings.index_path).unwrap();

    // Chunk IDs are allocated in ingestion order, which follows the
    // lexicographic path sort: sub/aaa.pdf before zzz.pdf.
    let first = index
        .get_chunk(pdfrag::ChunkId::from_u32(1).unwrap())
        .unwrap()
        .unwrap();
    assert!(first.source_path.ends_with("sub/aaa.pdf"));
    assert_eq!(first.content, "first document.");

    let second = index
        .get_chunk(pdfrag::ChunkId::from_u32(2).unwrap())
        .unwrap()
        .unwrap();
    assert!(second.source_path.ends_with("zzz.pdf"));
}
