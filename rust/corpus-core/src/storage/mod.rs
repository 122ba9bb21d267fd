// rust/corpus-core/src/storage/mod.rs

//! Storage abstraction for the corpus pipeline.
//!
//! # Example
//!
//! ```no_run
//! use corpus_core::config::StorageConfig;
//! use corpus_core::storage::{LocalStorage, StorageBackend};
//! use std::io::{Read, Write};
//! use std::path::Path;
//!
//! let config = StorageConfig::default();
//! let storage = LocalStorage::new(&config).unwrap();
//!
//! let mut writer = storage.open_write(Path::new("shards/part-0000.csv")).unwrap();
//! writer.write_all(b"hello world,bonjour le monde\n").unwrap();
//! writer.finish().unwrap();
//!
//! let mut reader = storage.open_read(Path::new("shards/part-0000.csv")).unwrap();
//! let mut content = String::new();
//! reader.read_to_string(&mut content).unwrap();
//! ```

mod local;
mod traits;

pub use local::LocalStorage;
pub use traits::{ObjectMeta, StorageBackend, StorageReader, StorageWriter};
