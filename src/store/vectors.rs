//! Flat binary vector storage, write-once.
//!
//! Layout (all integers little-endian):
//!
//! ```text
//! [magic: 4 bytes "PVEC"] [version: u32] [dimension: u32] [count: u32]
//! count * ( [chunk_id: u32] [dimension * f32] )
//! ```
//!
//! The file is written sequentially through [`VectorFileWriter`] and read
//! back through a memory map in [`VectorFile`]. Values are copied out of the
//! map on access, so reads never depend on platform alignment.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use memmap2::Mmap;
use thiserror::Error;

use crate::types::{ChunkId, VectorDimension};

/// File magic, first four bytes of every vector file.
const MAGIC: [u8; 4] = *b"PVEC";

/// Current format version.
const FORMAT_VERSION: u32 = 1;

/// Header length in bytes.
const HEADER_LEN: usize = 16;

/// Byte offset of the record count within the header.
const COUNT_OFFSET: u64 = 12;

/// Errors from vector file operations.
#[derive(Error, Debug)]
pub enum VectorFileError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("not a vector file (bad magic): {0}")]
    BadMagic(PathBuf),

    #[error("unsupported vector file version {found} (expected {FORMAT_VERSION}): {path}")]
    UnsupportedVersion { path: PathBuf, found: u32 },

    #[error("vector file truncated: {path} ({actual} bytes, expected {expected})")]
    Truncated {
        path: PathBuf,
        expected: usize,
        actual: usize,
    },

    #[error("vector has {actual} dimensions, file stores {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("invalid dimension in vector file header: {0}")]
    InvalidDimension(u32),
}

/// Result type for vector file operations.
pub type VectorFileResult<T> = Result<T, VectorFileError>;

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> VectorFileError + '_ {
    move |source| VectorFileError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Sequential writer for a new vector file.
pub struct VectorFileWriter {
    writer: BufWriter<File>,
    path: PathBuf,
    dimension: VectorDimension,
    count: u32,
}

impl VectorFileWriter {
    /// Create a new vector file, truncating any existing file at `path`.
    pub fn create(path: impl AsRef<Path>, dimension: VectorDimension) -> VectorFileResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .map_err(io_err(&path))?;

        let mut writer = BufWriter::new(file);
        writer.write_all(&MAGIC).map_err(io_err(&path))?;
        writer
            .write_all(&FORMAT_VERSION.to_le_bytes())
            .map_err(io_err(&path))?;
        writer
            .write_all(&(dimension.get() as u32).to_le_bytes())
            .map_err(io_err(&path))?;
        // Count is patched in finish().
        writer.write_all(&0u32.to_le_bytes()).map_err(io_err(&path))?;

        Ok(Self {
            writer,
            path,
            dimension,
            count: 0,
        })
    }

    /// Append one vector record.
    pub fn append(&mut self, id: ChunkId, vector: &[f32]) -> VectorFileResult<()> {
        if vector.len() != self.dimension.get() {
            return Err(VectorFileError::DimensionMismatch {
                expected: self.dimension.get(),
                actual: vector.len(),
            });
        }

        self.writer
            .write_all(&id.to_bytes())
            .map_err(io_err(&self.path))?;
        for value in vector {
            self.writer
                .write_all(&value.to_le_bytes())
                .map_err(io_err(&self.path))?;
        }

        self.count += 1;
        Ok(())
    }

    /// Number of records appended so far.
    pub fn count(&self) -> usize {
        self.count as usize
    }

    /// Flush records, patch the header count, and sync to disk.
    pub fn finish(self) -> VectorFileResult<()> {
        let Self {
            writer,
            path,
            count,
            ..
        } = self;

        let mut file = writer
            .into_inner()
            .map_err(|e| VectorFileError::Io {
                path: path.clone(),
                source: e.into_error(),
            })?;

        file.seek(SeekFrom::Start(COUNT_OFFSET)).map_err(io_err(&path))?;
        file.write_all(&count.to_le_bytes()).map_err(io_err(&path))?;
        file.sync_all().map_err(io_err(&path))?;

        Ok(())
    }
}

/// Read-only memory-mapped vector file.
pub struct VectorFile {
    mmap: Mmap,
    dimension: VectorDimension,
    count: usize,
}

impl std::fmt::Debug for VectorFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorFile")
            .field("dimension", &self.dimension.get())
            .field("count", &self.count)
            .finish()
    }
}

impl VectorFile {
    /// Open and validate an existing vector file.
    pub fn open(path: impl AsRef<Path>) -> VectorFileResult<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(io_err(path))?;
        // Write-once file: nothing mutates it after finish().
        let mmap = unsafe { Mmap::map(&file) }.map_err(io_err(path))?;

        if mmap.len() < HEADER_LEN {
            return Err(VectorFileError::Truncated {
                path: path.to_path_buf(),
                expected: HEADER_LEN,
                actual: mmap.len(),
            });
        }

        if mmap[0..4] != MAGIC {
            return Err(VectorFileError::BadMagic(path.to_path_buf()));
        }

        let version = read_u32(&mmap, 4);
        if version != FORMAT_VERSION {
            return Err(VectorFileError::UnsupportedVersion {
                path: path.to_path_buf(),
                found: version,
            });
        }

        let raw_dimension = read_u32(&mmap, 8);
        let dimension = VectorDimension::new(raw_dimension as usize)
            .ok_or(VectorFileError::InvalidDimension(raw_dimension))?;
        let count = read_u32(&mmap, 12) as usize;

        let expected_len = HEADER_LEN + count * record_len(dimension);
        if mmap.len() < expected_len {
            return Err(VectorFileError::Truncated {
                path: path.to_path_buf(),
                expected: expected_len,
                actual: mmap.len(),
            });
        }

        Ok(Self {
            mmap,
            dimension,
            count,
        })
    }

    /// Number of stored vectors.
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Dimension of stored vectors.
    pub fn dimension(&self) -> VectorDimension {
        self.dimension
    }

    /// Read the record at `index`, or None if out of range.
    pub fn record(&self, index: usize) -> Option<(ChunkId, Vec<f32>)> {
        if index >= self.count {
            return None;
        }

        let stride = record_len(self.dimension);
        let offset = HEADER_LEN + index * stride;

        let id_bytes: [u8; 4] = self.mmap[offset..offset + 4].try_into().ok()?;
        let id = ChunkId::from_bytes(id_bytes)?;

        let mut vector = Vec::with_capacity(self.dimension.get());
        let mut cursor = offset + 4;
        for _ in 0..self.dimension.get() {
            let bytes: [u8; 4] = self.mmap[cursor..cursor + 4].try_into().ok()?;
            vector.push(f32::from_le_bytes(bytes));
            cursor += 4;
        }

        Some((id, vector))
    }

    /// Iterate over all stored records in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (ChunkId, Vec<f32>)> + '_ {
        (0..self.count).filter_map(|i| self.record(i))
    }
}

fn record_len(dimension: VectorDimension) -> usize {
    4 + dimension.get() * 4
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes(
        bytes[offset..offset + 4]
            .try_into()
            .expect("slice is 4 bytes"),
    )
}
