// rust/corpus-core/src/dataset/source.rs

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{CorpusError, Result};
use crate::storage::StorageBackend;

use super::traits::ShardSource;

/// Shards stored as the direct entries of one directory of a storage backend.
///
/// Every entry is treated as a shard; no naming convention is relied on.
/// Shard order is the backend's listing order.
pub struct StorageShardSource {
    storage: Arc<dyn StorageBackend>,
    dir: PathBuf,
}

impl StorageShardSource {
    pub fn new(storage: Arc<dyn StorageBackend>, dir: impl Into<PathBuf>) -> Self {
        Self {
            storage,
            dir: dir.into(),
        }
    }

    /// The directory shards are listed from.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl std::fmt::Debug for StorageShardSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageShardSource")
            .field("dir", &self.dir)
            .finish()
    }
}

impl ShardSource for StorageShardSource {
    fn list_shards(&self) -> Result<Vec<PathBuf>> {
        let meta = self.storage.metadata(&self.dir)?;
        if !meta.is_dir {
            return Err(CorpusError::storage(
                &self.dir,
                "shard location is not a directory",
            ));
        }

        Ok(self
            .storage
            .list(&self.dir)?
            .into_iter()
            .map(|name| self.dir.join(name))
            .collect())
    }

    fn open_shard(&self, shard: &Path) -> Result<Box<dyn Read + Send>> {
        let reader = self.storage.open_read(shard)?;
        Ok(Box::new(reader))
    }

    fn describe(&self) -> String {
        self.dir.display().to_string()
    }
}
