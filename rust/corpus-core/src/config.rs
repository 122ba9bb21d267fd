// rust/corpus-core/src/config.rs

//! Configuration management for the corpus pipeline.
//!
//! This module provides configuration parsing from TOML files, environment
//! variable overrides, and validation of configuration values.

use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::dataset::MaterializationUnit;
use crate::error::{CorpusError, Result};

// Top-level pipeline configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpusConfig {
    pub storage: StorageConfig,
    pub reader: ReaderConfig,
    pub batch: BatchConfig,
    pub vocab: VocabConfig,
}

// Storage configuration options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    // Base path that relative shard and vocabulary paths resolve against.
    pub base_path: PathBuf,
    // Buffer size in bytes for I/O operations.
    pub buffer_size: usize,
    // Whether to use memory-mapped I/O for large shards.
    pub use_mmap: bool,
    // File size threshold (bytes) above which to use mmap.
    pub mmap_threshold: u64,
}

/// Shard reader options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Directory holding the shard files, relative to `storage.base_path`.
    pub shard_dir: PathBuf,
    /// Shuffle shard order once and row order per materialized unit.
    pub shuffle: bool,
    /// Optional seed for reproducible shuffling.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Rows materialized at once; unset means one whole shard.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_rows: Option<usize>,
}

/// Batch assembly options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Maximum number of pairs per batch.
    pub batch_size: usize,
    /// Width of every encoded row; longer sequences are truncated.
    pub max_sequence_length: usize,
}

/// Vocabulary construction and persistence options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VocabConfig {
    /// Minimum token frequency required for a dedicated id.
    pub cutoff: u32,
    /// Where the source-side vocabulary is stored.
    pub source_path: PathBuf,
    /// Where the target-side vocabulary is stored.
    pub target_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_path: PathBuf::from("./data"),
            buffer_size: 64 * 1024, // 64 KB
            use_mmap: true,
            mmap_threshold: 1024 * 1024, // 1 MB
        }
    }
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            shard_dir: PathBuf::from("shards"),
            shuffle: false,
            seed: None,
            unit_rows: None,
        }
    }
}

impl ReaderConfig {
    /// The materialization unit described by `unit_rows`.
    pub fn unit(&self) -> MaterializationUnit {
        match self.unit_rows.and_then(NonZeroUsize::new) {
            Some(rows) => MaterializationUnit::Rows(rows),
            None => MaterializationUnit::Shard,
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 64,
            max_sequence_length: 50,
        }
    }
}

impl BatchConfig {
    /// Checks the values an assembler cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(CorpusError::config("batch.batch_size must be greater than 0"));
        }
        if self.max_sequence_length == 0 {
            return Err(CorpusError::config(
                "batch.max_sequence_length must be greater than 0",
            ));
        }
        Ok(())
    }
}

impl Default for VocabConfig {
    fn default() -> Self {
        Self {
            cutoff: 2,
            source_path: PathBuf::from("vocab/source.vocab"),
            target_path: PathBuf::from("vocab/target.vocab"),
        }
    }
}

impl FromStr for CorpusConfig {
    type Err = CorpusError;

    /// Parse configuration from a TOML string.
    fn from_str(s: &str) -> Result<Self> {
        toml::from_str(s)
            .map_err(|e| CorpusError::config_with_source("failed to parse TOML config", e))
    }
}

impl CorpusConfig {
    // Load configuration from a TOML file.
    //
    // # Errors
    //
    // Returns an error if the file cannot be read, parsed, or is invalid.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            CorpusError::storage_with_source(path, "failed to read config file", e)
        })?;
        let config: Self = content.parse()?;
        config.validate()?;
        Ok(config)
    }

    // Apply environment variable overrides.
    //
    // Environment variables are prefixed with `CORPUS_` and use underscores
    // to separate nested fields. For example:
    // - `CORPUS_STORAGE_BASE_PATH` overrides `storage.base_path`
    // - `CORPUS_READER_SHUFFLE` overrides `reader.shuffle`
    // - `CORPUS_BATCH_BATCH_SIZE` overrides `batch.batch_size`
    // - `CORPUS_VOCAB_CUTOFF` overrides `vocab.cutoff`
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        // Storage overrides
        if let Ok(val) = std::env::var("CORPUS_STORAGE_BASE_PATH") {
            self.storage.base_path = PathBuf::from(val);
        }
        if let Ok(val) = std::env::var("CORPUS_STORAGE_BUFFER_SIZE") {
            if let Ok(v) = val.parse() {
                self.storage.buffer_size = v;
            }
        }
        if let Ok(val) = std::env::var("CORPUS_STORAGE_USE_MMAP") {
            if let Ok(v) = val.parse() {
                self.storage.use_mmap = v;
            }
        }
        if let Ok(val) = std::env::var("CORPUS_STORAGE_MMAP_THRESHOLD") {
            if let Ok(v) = val.parse() {
                self.storage.mmap_threshold = v;
            }
        }

        // Reader overrides
        if let Ok(val) = std::env::var("CORPUS_READER_SHARD_DIR") {
            self.reader.shard_dir = PathBuf::from(val);
        }
        if let Ok(val) = std::env::var("CORPUS_READER_SHUFFLE") {
            if let Ok(v) = val.parse() {
                self.reader.shuffle = v;
            }
        }
        if let Ok(val) = std::env::var("CORPUS_READER_SEED") {
            if let Ok(v) = val.parse() {
                self.reader.seed = Some(v);
            }
        }
        if let Ok(val) = std::env::var("CORPUS_READER_UNIT_ROWS") {
            if let Ok(v) = val.parse() {
                self.reader.unit_rows = Some(v);
            }
        }

        // Batch overrides
        if let Ok(val) = std::env::var("CORPUS_BATCH_BATCH_SIZE") {
            if let Ok(v) = val.parse() {
                self.batch.batch_size = v;
            }
        }
        if let Ok(val) = std::env::var("CORPUS_BATCH_MAX_SEQUENCE_LENGTH") {
            if let Ok(v) = val.parse() {
                self.batch.max_sequence_length = v;
            }
        }

        // Vocabulary overrides
        if let Ok(val) = std::env::var("CORPUS_VOCAB_CUTOFF") {
            if let Ok(v) = val.parse() {
                self.vocab.cutoff = v;
            }
        }
        if let Ok(val) = std::env::var("CORPUS_VOCAB_SOURCE_PATH") {
            self.vocab.source_path = PathBuf::from(val);
        }
        if let Ok(val) = std::env::var("CORPUS_VOCAB_TARGET_PATH") {
            self.vocab.target_path = PathBuf::from(val);
        }

        self
    }

    // Validate all configuration values.
    //
    // # Errors
    //
    // Returns an error if any configuration value is invalid.
    pub fn validate(&self) -> Result<()> {
        if self.storage.buffer_size == 0 {
            return Err(CorpusError::config(
                "storage.buffer_size must be greater than 0",
            ));
        }

        if self.reader.unit_rows == Some(0) {
            return Err(CorpusError::config(
                "reader.unit_rows must be greater than 0 when set",
            ));
        }

        self.batch.validate()?;

        if self.vocab.cutoff == 0 {
            return Err(CorpusError::config("vocab.cutoff must be at least 1"));
        }
        if self.vocab.source_path == self.vocab.target_path {
            return Err(CorpusError::config(
                "vocab.source_path and vocab.target_path must differ",
            ));
        }

        Ok(())
    }
}
