//! Layered configuration for the ingestion pipeline.
//!
//! Sources are merged in order:
//! - Default values
//! - `pdfrag.toml` in the working directory
//! - Environment variable overrides
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `PDFRAG_` and use double
//! underscores to separate nested levels:
//! - `PDFRAG_DATA_PATH=docs/` sets `data_path`
//! - `PDFRAG_CHUNKING__MAX_CHUNK_CHARS=800` sets `chunking.max_chunk_chars`
//! - `PDFRAG_EMBEDDING__MODEL=AllMiniLML6V2` sets `embedding.model`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE: &str = "pdfrag.toml";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    /// Directory scanned recursively for `*.pdf` files
    #[serde(default = "default_data_path")]
    pub data_path: PathBuf,

    /// Directory the serialized vector index is written to
    #[serde(default = "default_index_path")]
    pub index_path: PathBuf,

    /// Chunking configuration
    #[serde(default)]
    pub chunking: ChunkingConfig,

    /// Embedding model configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Configuration for splitting page text into chunks.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ChunkingConfig {
    /// Maximum chunk size in characters. Larger fragments are split.
    #[serde(default = "default_max_chunk_chars")]
    pub max_chunk_chars: usize,

    /// Overlap between adjacent chunks in characters.
    #[serde(default = "default_overlap_chars")]
    pub overlap_chars: usize,
}

impl ChunkingConfig {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_chunk_chars == 0 {
            return Err("max_chunk_chars must be greater than zero".to_string());
        }

        if self.overlap_chars >= self.max_chunk_chars {
            return Err(format!(
                "overlap_chars ({}) must be less than max_chunk_chars ({})",
                self.overlap_chars, self.max_chunk_chars
            ));
        }

        Ok(())
    }
}

/// Configuration for the embedding model.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EmbeddingConfig {
    /// Model to use for embeddings
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Batch size for embedding generation
    #[serde(default = "default_embedding_batch_size")]
    pub batch_size: usize,
}

/// Logging configuration with a default level and per-module overrides.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Default log level filter (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-module level overrides, e.g. `loader = "debug"`
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

// Default value functions
fn default_version() -> u32 {
    1
}
fn default_data_path() -> PathBuf {
    PathBuf::from("data")
}
fn default_index_path() -> PathBuf {
    PathBuf::from("vectorstore/db_faiss")
}
fn default_max_chunk_chars() -> usize {
    500
}
fn default_overlap_chars() -> usize {
    50
}
fn default_embedding_model() -> String {
    "AllMiniLML6V2".to_string()
}
fn default_embedding_batch_size() -> usize {
    64
}
fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            data_path: default_data_path(),
            index_path: default_index_path(),
            chunking: ChunkingConfig::default(),
            embedding: EmbeddingConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chunk_chars: default_max_chunk_chars(),
            overlap_chars: default_overlap_chars(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: default_embedding_model(),
            batch_size: default_embedding_batch_size(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: HashMap::new(),
        }
    }
}

impl Settings {
    /// Load configuration from all sources.
    pub fn load() -> Result<Self, Box<figment::Error>> {
        Self::load_from(CONFIG_FILE)
    }

    /// Load configuration from a specific file plus defaults and environment.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        Figment::new()
            // Start with defaults
            .merge(Serialized::defaults(Settings::default()))
            // Layer in config file if it exists
            .merge(Toml::file(path.as_ref()))
            // Layer in environment variables with PDFRAG_ prefix.
            // Double underscore separates nested levels.
            .merge(Env::prefixed("PDFRAG_").map(|key| {
                key.as_str().to_lowercase().replace("__", ".").into()
            }))
            .extract()
            .map_err(Box::new)
    }

    /// Save current configuration to file as pretty TOML.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = path.as_ref().parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_source_constants() {
        let settings = Settings::default();
        assert_eq!(settings.data_path, PathBuf::from("data"));
        assert_eq!(settings.index_path, PathBuf::from("vectorstore/db_faiss"));
        assert_eq!(settings.chunking.max_chunk_chars, 500);
        assert_eq!(settings.chunking.overlap_chars, 50);
        assert_eq!(settings.embedding.model, "AllMiniLML6V2");
    }

    #[test]
    fn test_chunking_config_validation() {
        let mut config = ChunkingConfig::default();
        assert!(config.validate().is_ok());

        config.overlap_chars = 500;
        assert!(config.validate().is_err());

        config.overlap_chars = 50;
        config.max_chunk_chars = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pdfrag.toml");

        let mut settings = Settings::default();
        settings.chunking.max_chunk_chars = 800;
        settings.save(&path).unwrap();

        let loaded = Settings::load_from(&path).unwrap();
        assert_eq!(loaded.chunking.max_chunk_chars, 800);
        assert_eq!(loaded.chunking.overlap_chars, 50);
    }
}
