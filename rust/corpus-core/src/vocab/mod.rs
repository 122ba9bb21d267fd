// rust/corpus-core/src/vocab/mod.rs

//! Token vocabularies.
//!
//! A [`Vocabulary`] is built from one full pass over a [`ShardStream`],
//! counting whitespace-separated tokens on one side of each pair. Tokens below
//! the frequency cutoff share the unknown id. Built vocabularies are saved and
//! loaded with [`VocabularyStore`].
//!
//! # Example
//!
//! ```ignore
//! use corpus_core::dataset::ShardedCorpusReader;
//! use corpus_core::vocab::build_pair_vocabularies;
//!
//! let mut reader = ShardedCorpusReader::open_dir("data/shards", false)?;
//! let (source, target) = build_pair_vocabularies(&mut reader, 2)?;
//!
//! let ids = source.encode("the cat sat");
//! ```
//!
//! [`ShardStream`]: crate::dataset::ShardStream

mod format;
mod store;
mod vocabulary;

pub use format::VocabHeader;
pub use store::VocabularyStore;
pub use vocabulary::{
    build_pair_vocabularies, tokenize, Vocabulary, PAD_ID, PAD_TOKEN, UNK_ID, UNK_TOKEN,
};
