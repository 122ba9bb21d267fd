// rust/corpus-core/src/storage/local.rs

//! Local filesystem storage backend implementation.
//!
//! Small objects are read through a `BufReader`; objects at or above the
//! configured threshold are memory-mapped, which keeps the row pre-scan over
//! large shards cheap.

use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use memmap2::Mmap;

use super::traits::{ObjectMeta, StorageBackend, StorageReader, StorageWriter};
use crate::config::StorageConfig;
use crate::error::{CorpusError, Result};

/// Local filesystem storage backend.
pub struct LocalStorage {
    /// Base path for all storage operations.
    base_path: PathBuf,
    /// Buffer size for buffered I/O operations.
    buffer_size: usize,
    /// Whether to use memory-mapped I/O.
    use_mmap: bool,
    /// File size threshold above which to use mmap.
    mmap_threshold: u64,
}

impl LocalStorage {
    /// Creates a new `LocalStorage` instance from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the base path cannot be created.
    pub fn new(config: &StorageConfig) -> Result<Self> {
        let base_path = config.base_path.clone();

        if !base_path.exists() {
            fs::create_dir_all(&base_path).map_err(|e| {
                CorpusError::storage_with_source(&base_path, "failed to create base directory", e)
            })?;
        }

        Ok(Self {
            base_path,
            buffer_size: config.buffer_size,
            use_mmap: config.use_mmap,
            mmap_threshold: config.mmap_threshold,
        })
    }

    /// Returns the directory relative paths are resolved against.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_path.join(path)
        }
    }
}

impl StorageBackend for LocalStorage {
    fn exists(&self, path: &Path) -> Result<bool> {
        let full_path = self.resolve_path(path);
        Ok(full_path.exists())
    }

    fn metadata(&self, path: &Path) -> Result<ObjectMeta> {
        let full_path = self.resolve_path(path);
        let meta = fs::metadata(&full_path).map_err(|e| {
            CorpusError::storage_with_source(&full_path, "failed to read metadata", e)
        })?;

        Ok(ObjectMeta {
            size: meta.len(),
            modified: meta.modified().ok(),
            is_dir: meta.is_dir(),
        })
    }

    fn open_read(&self, path: &Path) -> Result<Box<dyn StorageReader>> {
        let full_path = self.resolve_path(path);
        let file = File::open(&full_path)
            .map_err(|e| CorpusError::storage_with_source(&full_path, "failed to open file", e))?;

        let meta = file.metadata().map_err(|e| {
            CorpusError::storage_with_source(&full_path, "failed to read file metadata", e)
        })?;
        if meta.is_dir() {
            return Err(CorpusError::storage(&full_path, "path is a directory, not a file"));
        }
        let size = meta.len();

        // Zero-length files cannot be mapped on every platform.
        if self.use_mmap && size > 0 && size >= self.mmap_threshold {
            // SAFETY: The file is opened read-only and the map is owned by the
            // reader for its whole lifetime. Shards are assumed static for the
            // duration of a run.
            let mmap = unsafe { Mmap::map(&file) }.map_err(|e| {
                CorpusError::storage_with_source(&full_path, "failed to memory-map file", e)
            })?;

            Ok(Box::new(MmapReader::new(mmap)))
        } else {
            Ok(Box::new(LocalReader::new(file, size, self.buffer_size)))
        }
    }

    fn open_write(&self, path: &Path) -> Result<Box<dyn StorageWriter>> {
        let full_path = self.resolve_path(path);

        if let Some(parent) = full_path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| {
                    CorpusError::storage_with_source(
                        parent,
                        "failed to create parent directories",
                        e,
                    )
                })?;
            }
        }

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&full_path)
            .map_err(|e| {
                CorpusError::storage_with_source(&full_path, "failed to create file", e)
            })?;

        Ok(Box::new(LocalWriter::new(file, full_path, self.buffer_size)))
    }

    fn delete(&self, path: &Path) -> Result<()> {
        let full_path = self.resolve_path(path);

        if full_path.is_dir() {
            fs::remove_dir_all(&full_path).map_err(|e| {
                CorpusError::storage_with_source(&full_path, "failed to delete directory", e)
            })
        } else {
            fs::remove_file(&full_path).map_err(|e| {
                CorpusError::storage_with_source(&full_path, "failed to delete file", e)
            })
        }
    }

    fn list(&self, prefix: &Path) -> Result<Vec<PathBuf>> {
        let full_path = self.resolve_path(prefix);

        let meta = fs::metadata(&full_path).map_err(|e| {
            CorpusError::storage_with_source(&full_path, "failed to read directory", e)
        })?;
        if !meta.is_dir() {
            return Err(CorpusError::storage(&full_path, "path is not a directory"));
        }

        let mut entries = Vec::new();

        for entry in fs::read_dir(&full_path).map_err(|e| {
            CorpusError::storage_with_source(&full_path, "failed to read directory", e)
        })? {
            let entry = entry.map_err(|e| {
                CorpusError::storage_with_source(&full_path, "failed to read directory entry", e)
            })?;

            entries.push(PathBuf::from(entry.file_name()));
        }

        entries.sort();
        Ok(entries)
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        let from_path = self.resolve_path(from);
        let to_path = self.resolve_path(to);

        if let Some(parent) = to_path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| {
                    CorpusError::storage_with_source(
                        parent,
                        "failed to create parent directories",
                        e,
                    )
                })?;
            }
        }

        fs::rename(&from_path, &to_path).map_err(|e| {
            CorpusError::storage_with_source(
                &from_path,
                format!("failed to rename to {}", to_path.display()),
                e,
            )
        })
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        let full_path = self.resolve_path(path);
        fs::create_dir_all(&full_path).map_err(|e| {
            CorpusError::storage_with_source(&full_path, "failed to create directories", e)
        })
    }
}

/// Buffered file reader for local storage.
struct LocalReader {
    reader: BufReader<File>,
    size: u64,
}

impl LocalReader {
    fn new(file: File, size: u64, buffer_size: usize) -> Self {
        Self {
            reader: BufReader::with_capacity(buffer_size, file),
            size,
        }
    }
}

impl Read for LocalReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.reader.read(buf)
    }
}

impl StorageReader for LocalReader {
    fn size(&self) -> u64 {
        self.size
    }
}

/// Memory-mapped file reader for local storage.
struct MmapReader {
    mmap: Mmap,
    position: usize,
}

impl MmapReader {
    fn new(mmap: Mmap) -> Self {
        Self { mmap, position: 0 }
    }
}

impl Read for MmapReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let remaining = &self.mmap[self.position..];
        let to_read = buf.len().min(remaining.len());

        if to_read == 0 {
            return Ok(0);
        }

        buf[..to_read].copy_from_slice(&remaining[..to_read]);
        self.position += to_read;
        Ok(to_read)
    }
}

impl StorageReader for MmapReader {
    fn size(&self) -> u64 {
        self.mmap.len() as u64
    }
}

/// Buffered file writer for local storage.
struct LocalWriter {
    writer: BufWriter<File>,
    path: PathBuf,
}

impl LocalWriter {
    fn new(file: File, path: PathBuf, buffer_size: usize) -> Self {
        Self {
            writer: BufWriter::with_capacity(buffer_size, file),
            path,
        }
    }
}

impl Write for LocalWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.writer.flush()
    }
}

impl StorageWriter for LocalWriter {
    fn finish(mut self: Box<Self>) -> Result<()> {
        self.writer
            .flush()
            .map_err(|e| CorpusError::storage_with_source(&self.path, "failed to flush writer", e))?;

        self.writer.get_ref().sync_all().map_err(|e| {
            CorpusError::storage_with_source(&self.path, "failed to sync file to disk", e)
        })?;

        Ok(())
    }
}
