//! Document loading: PDF discovery and page-level text extraction.
//!
//! Given a directory, finds every `*.pdf` file below it and turns each file
//! into one [`PageDocument`] per page. Discovery order is pinned to a
//! lexicographic path sort so ingestion runs are reproducible across
//! platforms; pages keep their native order within a file.
//!
//! There is no per-file isolation: a corrupt or unreadable PDF fails the
//! entire batch.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::types::PageDocument;

/// Glob pattern matched against the data directory.
const PDF_PATTERN: &str = "**/*.pdf";

/// Errors from document loading.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("data directory not found: {0}")]
    MissingRoot(PathBuf),

    #[error("invalid glob pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to extract text from {path}: {message}")]
    Extract { path: PathBuf, message: String },
}

/// Result type for loader operations.
pub type LoadResult<T> = Result<T, LoadError>;

/// Extracts per-page text from a source file.
///
/// The production implementation is [`PdfExtractor`]. Tests substitute a
/// plain-text extractor so pipeline behavior can be exercised without
/// binary fixtures.
pub trait PageExtractor: Send + Sync {
    /// Extract the text of each logical page, in page order.
    fn extract_pages(&self, path: &Path) -> LoadResult<Vec<String>>;
}

/// PDF text extraction backed by the `pdf-extract` crate.
#[derive(Debug, Default)]
pub struct PdfExtractor;

impl PdfExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl PageExtractor for PdfExtractor {
    fn extract_pages(&self, path: &Path) -> LoadResult<Vec<String>> {
        let bytes = std::fs::read(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        pdf_extract::extract_text_from_mem_by_pages(&bytes).map_err(|e| LoadError::Extract {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}

/// Find all PDF files under `root`, sorted lexicographically by path.
pub fn discover_pdf_files(root: &Path) -> LoadResult<Vec<PathBuf>> {
    if !root.exists() {
        return Err(LoadError::MissingRoot(root.to_path_buf()));
    }

    let pattern = root.join(PDF_PATTERN);
    let pattern_str = pattern.to_string_lossy();

    // Traversal errors (e.g. an unreadable subdirectory) fail discovery;
    // dropping them would silently build an incomplete index.
    let mut files = Vec::new();
    for entry in glob::glob(&pattern_str)? {
        let path = entry.map_err(|e| {
            let path = e.path().to_path_buf();
            LoadError::Io {
                path,
                source: e.into_error(),
            }
        })?;
        if path.is_file() {
            files.push(path);
        }
    }

    // Canonical ordering: lexicographic by full path.
    files.sort();

    tracing::debug!(target: "loader", "discovered {} pdf files under {}", files.len(), root.display());

    Ok(files)
}

/// Load all PDFs under `root` into page-level documents.
///
/// Returns one [`PageDocument`] per page, ordered by (sorted file order,
/// page order). Pages with no extractable text are kept; the chunker
/// produces no chunks for them downstream.
pub fn load_documents(
    root: &Path,
    extractor: &dyn PageExtractor,
) -> LoadResult<Vec<PageDocument>> {
    load_documents_with(root, extractor, |_, _, _| {})
}

/// [`load_documents`] with a per-file callback, invoked as
/// `(current, total, path)` before each file is extracted.
pub fn load_documents_with<F>(
    root: &Path,
    extractor: &dyn PageExtractor,
    mut on_file: F,
) -> LoadResult<Vec<PageDocument>>
where
    F: FnMut(usize, usize, &Path),
{
    let files = discover_pdf_files(root)?;
    let mut documents = Vec::new();

    for (idx, path) in files.iter().enumerate() {
        on_file(idx + 1, files.len(), path);

        let pages = extractor.extract_pages(path)?;
        tracing::debug!(target: "loader", "{}: {} pages", path.display(), pages.len());

        for (idx, text) in pages.into_iter().enumerate() {
            documents.push(PageDocument::new(path.clone(), idx + 1, text));
        }
    }

    tracing::info!(
        target: "loader",
        "loaded {} pages from {} files",
        documents.len(),
        files.len()
    );

    Ok(documents)
}
