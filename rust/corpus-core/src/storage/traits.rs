// rust/corpus-core/src/storage/traits.rs

//! Storage abstraction traits for the corpus pipeline.
//!
//! Shards, vocabulary files and anything else the pipeline touches go
//! through a `StorageBackend`, so a directory on local disk and a remote
//! object store can back the same reader.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Metadata about a stored object.
#[derive(Debug, Clone)]
pub struct ObjectMeta {
    /// Size of the object in bytes.
    pub size: u64,
    /// Last modification time, if available.
    pub modified: Option<std::time::SystemTime>,
    /// Whether this object is a directory.
    pub is_dir: bool,
}

/// A handle for sequentially reading an object.
pub trait StorageReader: Read + Send {
    /// Returns the total size of the object in bytes.
    fn size(&self) -> u64;
}

/// A handle for writing to storage.
///
/// This trait extends `Write` with a method to finalize the write operation.
pub trait StorageWriter: Write + Send {
    /// Finishes the write operation, ensuring all data is persisted.
    ///
    /// This method must be called to complete the write. After calling
    /// `finish`, the writer should not be used again.
    ///
    /// # Errors
    ///
    /// Returns an error if flushing or syncing the object fails.
    fn finish(self: Box<Self>) -> Result<()>;
}

/// The core storage backend trait.
///
/// This trait is object-safe and is normally held as `Arc<dyn StorageBackend>`.
pub trait StorageBackend: Send + Sync {
    /// Checks if an object exists at the given path.
    fn exists(&self, path: &Path) -> Result<bool>;

    /// Retrieves metadata for an object.
    ///
    /// # Errors
    ///
    /// Returns an error if the object doesn't exist or metadata cannot be read.
    fn metadata(&self, path: &Path) -> Result<ObjectMeta>;

    /// Opens an object for reading.
    ///
    /// # Errors
    ///
    /// Returns an error if the object doesn't exist or cannot be opened.
    fn open_read(&self, path: &Path) -> Result<Box<dyn StorageReader>>;

    /// Opens an object for writing.
    ///
    /// If the object already exists, it will be overwritten.
    /// Parent directories will be created if they don't exist.
    fn open_write(&self, path: &Path) -> Result<Box<dyn StorageWriter>>;

    /// Deletes an object.
    fn delete(&self, path: &Path) -> Result<()>;

    /// Lists the direct entries under `prefix`, as names relative to it.
    ///
    /// Names are returned as paths so entries that are not valid UTF-8 are
    /// kept.
    ///
    /// # Errors
    ///
    /// Returns an error if `prefix` does not exist, is not a directory, or
    /// cannot be read.
    fn list(&self, prefix: &Path) -> Result<Vec<PathBuf>>;

    /// Renames an object from one path to another.
    fn rename(&self, from: &Path, to: &Path) -> Result<()>;

    /// Creates a directory and all parent directories.
    fn create_dir_all(&self, path: &Path) -> Result<()>;
}
