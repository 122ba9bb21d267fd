// rust/corpus-core/src/dataset/mod.rs

//! Streaming parallel-corpus shards and batching them.
//!
//! A corpus is a directory of shard files, each holding comma-delimited
//! `source,target` rows. [`ShardedCorpusReader`] streams pairs from the shards
//! one shard at a time, optionally shuffling shard order and the rows within
//! each materialized unit. [`BatchAssembler`] turns a pair stream into padded
//! id matrices using a source and a target vocabulary.
//!
//! # Example
//!
//! ```ignore
//! use corpus_core::dataset::{BatchAssembler, ShardedCorpusReader};
//!
//! let reader = ShardedCorpusReader::open_dir("data/shards", true)?;
//! let assembler = BatchAssembler::builder()
//!     .batch_size(64)
//!     .max_sequence_length(50)
//!     .source_vocab(source_vocab)
//!     .target_vocab(target_vocab)
//!     .build(reader)?;
//!
//! for batch in assembler {
//!     let batch = batch?;
//!     // Feed batch.source / batch.target to the training loop
//! }
//! ```

mod batch;
mod reader;
mod record_count;
mod source;
mod traits;

pub use batch::{Batch, BatchAssembler, BatchAssemblerBuilder};
pub use record_count::count_records;
pub use reader::{ReaderOptions, ShardInfo, ShardManifest, ShardedCorpusReader};
pub use source::StorageShardSource;
pub use traits::{Field, MaterializationUnit, Pair, Pairs, ShardSource, ShardStream};
