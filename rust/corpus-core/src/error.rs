// rust/corpus-core/src/error.rs

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CorpusError {

    #[error("Storage error at '{path}': {message}")]
    Storage {
        path: PathBuf,
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Malformed record in shard '{shard}' at row {row}: {message}")]
    MalformedRecord {
        shard: PathBuf,
        row: u64,
        message: String,
    },

    #[error("Stream halted after a failure in shard '{shard}' at row {row}; call reset() to restart")]
    StreamHalted {
        shard: PathBuf,
        row: u64,
    },

    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Vocabulary error: {message}")]
    Vocabulary {
        message: String,
    },

    #[error("Serialization error: {message}")]
    Serialization {
        message: String,
    },
}

pub type Result<T> = std::result::Result<T, CorpusError>;

// Convenience constructors
impl CorpusError {

    pub fn storage(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Storage {
            path: path.into(),
            message: message.into(),
            source: None,
        }
    }

    pub fn storage_with_source(
        path: impl Into<PathBuf>,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        Self::Storage {
            path: path.into(),
            message: message.into(),
            source: Some(source),
        }
    }

    pub fn malformed(shard: impl Into<PathBuf>, row: u64, message: impl Into<String>) -> Self {
        Self::MalformedRecord {
            shard: shard.into(),
            row,
            message: message.into(),
        }
    }

    pub fn halted(shard: impl Into<PathBuf>, row: u64) -> Self {
        Self::StreamHalted {
            shard: shard.into(),
            row,
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
        }
    }

    pub fn config_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Config {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn vocabulary(message: impl Into<String>) -> Self {
        Self::Vocabulary {
            message: message.into(),
        }
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Returns the shard path and row a record-level failure points at.
    pub fn record_location(&self) -> Option<(&std::path::Path, u64)> {
        match self {
            Self::MalformedRecord { shard, row, .. } | Self::StreamHalted { shard, row } => {
                Some((shard.as_path(), *row))
            }
            _ => None,
        }
    }
}
