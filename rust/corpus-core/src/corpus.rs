// rust/corpus-core/src/corpus.rs

//! Pipeline orchestration.
//!
//! [`Corpus`] ties configuration, storage, the shard reader, vocabulary
//! persistence and batch assembly together.
//!
//! # Example
//!
//! ```no_run
//! use corpus_core::Corpus;
//!
//! let corpus = Corpus::from_config_file("corpus.toml").unwrap();
//!
//! // First run: build and persist vocabularies
//! let (source, target) = corpus.build_vocabularies().unwrap();
//! corpus.save_vocabularies(&source, &target).unwrap();
//!
//! // Training: stream batches
//! let (source, target) = corpus.load_vocabularies().unwrap();
//! let reader = corpus.open_reader().unwrap();
//! for batch in corpus.batches(reader, source, target).unwrap() {
//!     let batch = batch.unwrap();
//!     // Feed batch.source / batch.target to the model
//! }
//! ```

use std::path::Path;
use std::sync::Arc;

use crate::config::CorpusConfig;
use crate::dataset::{
    BatchAssembler, ReaderOptions, ShardStream, ShardedCorpusReader, StorageShardSource,
};
use crate::error::Result;
use crate::storage::{LocalStorage, StorageBackend};
use crate::vocab::{build_pair_vocabularies, Vocabulary, VocabularyStore};

/// Entry point owning the configuration and the storage backend.
pub struct Corpus {
    config: CorpusConfig,
    storage: Arc<dyn StorageBackend>,
    vocab_store: VocabularyStore,
}

impl Corpus {
    /// Creates a corpus with default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend cannot be initialized.
    pub fn new() -> Result<Self> {
        Self::from_config(CorpusConfig::default())
    }

    /// Creates a corpus from a TOML configuration file, with environment
    /// overrides applied after loading.
    pub fn from_config_file(path: impl AsRef<Path>) -> Result<Self> {
        let config = CorpusConfig::from_file(path)?.with_env_overrides();
        Self::from_config(config)
    }

    /// Creates a corpus from a configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the storage
    /// backend cannot be initialized.
    pub fn from_config(config: CorpusConfig) -> Result<Self> {
        config.validate()?;

        let storage: Arc<dyn StorageBackend> = Arc::new(LocalStorage::new(&config.storage)?);
        let vocab_store = VocabularyStore::new(storage.clone());

        Ok(Self {
            config,
            storage,
            vocab_store,
        })
    }

    /// Opens a reader over the configured shard directory.
    ///
    /// Every call enumerates and counts the shards again and, when shuffling,
    /// draws a new shard order unless a seed is configured.
    pub fn open_reader(&self) -> Result<ShardedCorpusReader> {
        let source = Arc::new(StorageShardSource::new(
            self.storage.clone(),
            &self.config.reader.shard_dir,
        ));
        ShardedCorpusReader::new(source, ReaderOptions::from(&self.config.reader))
    }

    /// Builds source and target vocabularies from a fresh reader.
    pub fn build_vocabularies(&self) -> Result<(Vocabulary, Vocabulary)> {
        let mut reader = self.open_reader()?;
        build_pair_vocabularies(&mut reader, self.config.vocab.cutoff)
    }

    /// Saves both vocabularies to their configured paths.
    pub fn save_vocabularies(&self, source: &Vocabulary, target: &Vocabulary) -> Result<()> {
        self.vocab_store.save(&self.config.vocab.source_path, source)?;
        self.vocab_store.save(&self.config.vocab.target_path, target)
    }

    /// Loads both vocabularies from their configured paths.
    pub fn load_vocabularies(&self) -> Result<(Vocabulary, Vocabulary)> {
        let source = self.vocab_store.load(&self.config.vocab.source_path)?;
        let target = self.vocab_store.load(&self.config.vocab.target_path)?;
        Ok((source, target))
    }

    /// Wraps a stream in a batch assembler using the configured batch options.
    pub fn batches<S: ShardStream>(
        &self,
        stream: S,
        source: impl Into<Arc<Vocabulary>>,
        target: impl Into<Arc<Vocabulary>>,
    ) -> Result<BatchAssembler<S>> {
        BatchAssembler::new(stream, self.config.batch, source, target)
    }

    /// Returns the current configuration.
    pub fn config(&self) -> &CorpusConfig {
        &self.config
    }

    /// Returns a reference to the storage backend.
    pub fn storage(&self) -> &Arc<dyn StorageBackend> {
        &self.storage
    }

    pub fn vocab_store(&self) -> &VocabularyStore {
        &self.vocab_store
    }
}
