// rust/corpus-core/src/lib.rs

//! Sharded Corpus Pipeline - Core Library
//!
//! This crate streams (source, target) pairs from a parallel corpus split
//! across many shard files, builds token vocabularies from the stream, and
//! assembles padded id batches for model training.

pub mod config;
pub mod error;
pub mod storage;

// Re-export commonly used types for convenience
pub use config::CorpusConfig;
pub use error::{CorpusError, Result};
pub use storage::{LocalStorage, ObjectMeta, StorageBackend, StorageReader, StorageWriter};

pub mod dataset;
pub use dataset::{
    Batch, BatchAssembler, Field, MaterializationUnit, Pair, ReaderOptions, ShardSource,
    ShardStream, ShardedCorpusReader, StorageShardSource,
};

pub mod vocab;
pub use vocab::{build_pair_vocabularies, Vocabulary, VocabularyStore};

pub mod corpus;
pub use corpus::Corpus;
