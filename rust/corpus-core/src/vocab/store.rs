// rust/corpus-core/src/vocab/store.rs

//! Saving and loading vocabularies through a storage backend.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{CorpusError, Result};
use crate::storage::StorageBackend;

use super::format::{self, VocabHeader};
use super::vocabulary::Vocabulary;

/// Persists vocabularies with integrity verification.
///
/// Writes are atomic: the file is written under a hidden temporary name in
/// the same directory and renamed into place.
pub struct VocabularyStore {
    storage: Arc<dyn StorageBackend>,
}

impl VocabularyStore {
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        Self { storage }
    }

    /// Write `vocab` to `path`, replacing any existing file.
    pub fn save(&self, path: &Path, vocab: &Vocabulary) -> Result<()> {
        let data = format::encode(vocab)?;

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| CorpusError::storage(path, "vocabulary path has no file name"))?;
        let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        if !dir.as_os_str().is_empty() {
            self.storage.create_dir_all(&dir)?;
        }

        let temp_path: PathBuf = dir.join(format!(".{file_name}.tmp"));
        let mut writer = self.storage.open_write(&temp_path)?;
        writer.write_all(&data).map_err(|e| {
            CorpusError::storage_with_source(&temp_path, "failed to write vocabulary", e)
        })?;
        writer.finish()?;

        self.storage.rename(&temp_path, path)?;

        tracing::info!(
            "Saved vocabulary of {} tokens to {}",
            vocab.len(),
            path.display()
        );
        Ok(())
    }

    /// Read and verify the vocabulary at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, its magic, version,
    /// checksum or entry count is wrong, or the entries are not a valid
    /// vocabulary.
    pub fn load(&self, path: &Path) -> Result<Vocabulary> {
        let data = self.read_all(path)?;
        let vocab = format::decode(&data)?;

        tracing::info!(
            "Loaded vocabulary of {} tokens from {}",
            vocab.len(),
            path.display()
        );
        Ok(vocab)
    }

    /// Read only the header of a vocabulary file.
    pub fn read_header(&self, path: &Path) -> Result<VocabHeader> {
        let data = self.read_all(path)?;
        let (header, _) = format::decode_header(&data)?;
        Ok(header)
    }

    pub fn exists(&self, path: &Path) -> Result<bool> {
        self.storage.exists(path)
    }

    fn read_all(&self, path: &Path) -> Result<Vec<u8>> {
        let mut reader = self.storage.open_read(path)?;
        let mut data = Vec::with_capacity(reader.size() as usize);
        reader.read_to_end(&mut data).map_err(|e| {
            CorpusError::storage_with_source(path, "failed to read vocabulary file", e)
        })?;
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageConfig;
    use crate::dataset::{Field, Pair, ShardStream};
    use crate::storage::LocalStorage;
    use tempfile::TempDir;

    struct OneShot(Vec<Pair>);

    impl ShardStream for OneShot {
        fn len(&self) -> u64 {
            self.0.len() as u64
        }

        fn next_pair(&mut self) -> Result<Option<Pair>> {
            Ok(self.0.pop())
        }

        fn reset(&mut self) {}
    }

    fn create_test_store() -> (VocabularyStore, Arc<dyn StorageBackend>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config = StorageConfig {
            base_path: temp_dir.path().to_path_buf(),
            ..Default::default()
        };
        let storage: Arc<dyn StorageBackend> = Arc::new(LocalStorage::new(&config).unwrap());
        (VocabularyStore::new(storage.clone()), storage, temp_dir)
    }

    fn built_vocab() -> Vocabulary {
        let mut stream = OneShot(vec![
            Pair::new("the cat sat", "x"),
            Pair::new("the mat", "x"),
        ]);
        Vocabulary::build_field(&mut stream, Field::Source, 1).unwrap()
    }

    #[test]
    fn test_save_load_roundtrip() {
        let (store, _storage, _temp) = create_test_store();
        let vocab = built_vocab();
        let path = Path::new("vocab/source.vocab");

        store.save(path, &vocab).unwrap();
        assert!(store.exists(path).unwrap());

        let loaded = store.load(path).unwrap();
        assert_eq!(loaded, vocab);
        assert_eq!(loaded.pad_id(), vocab.pad_id());
        assert_eq!(loaded.unk_id(), vocab.unk_id());
        for (token, id) in vocab.entries() {
            assert_eq!(loaded.get(token), Some(id));
        }
    }

    #[test]
    fn test_save_leaves_no_temp_file() {
        let (store, storage, _temp) = create_test_store();
        store.save(Path::new("vocab/source.vocab"), &built_vocab()).unwrap();

        let entries = storage.list(Path::new("vocab")).unwrap();
        assert_eq!(entries, vec![PathBuf::from("source.vocab")]);
    }

    #[test]
    fn test_save_overwrites() {
        let (store, _storage, _temp) = create_test_store();
        let path = Path::new("target.vocab");

        store.save(path, &built_vocab()).unwrap();
        let mut stream = OneShot(vec![Pair::new("other", "x")]);
        let smaller = Vocabulary::build_field(&mut stream, Field::Source, 1).unwrap();
        store.save(path, &smaller).unwrap();

        assert_eq!(store.load(path).unwrap().len(), 3);
    }

    #[test]
    fn test_read_header() {
        let (store, _storage, _temp) = create_test_store();
        let path = Path::new("source.vocab");
        store.save(path, &built_vocab()).unwrap();

        let header = store.read_header(path).unwrap();
        assert_eq!(header.entry_count, 6);
        assert_eq!(header.cutoff, 1);
    }

    #[test]
    fn test_load_corrupted_file() {
        let (store, _storage, temp) = create_test_store();
        let path = Path::new("source.vocab");
        store.save(path, &built_vocab()).unwrap();

        let full = temp.path().join("source.vocab");
        let mut data = std::fs::read(&full).unwrap();
        let last = data.len() - 1;
        data[last] ^= 0x55;
        std::fs::write(&full, data).unwrap();

        assert!(matches!(
            store.load(path),
            Err(CorpusError::Vocabulary { .. })
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let (store, _storage, _temp) = create_test_store();
        assert!(matches!(
            store.load(Path::new("missing.vocab")),
            Err(CorpusError::Storage { .. })
        ));
    }
}
