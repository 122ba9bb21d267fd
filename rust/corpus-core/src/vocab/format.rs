// rust/corpus-core/src/vocab/format.rs

//! Vocabulary file format.
//!
//! A vocabulary file is:
//! ```text
//! +---------------------+
//! | Header length (u32) |  <- little-endian byte count of the header
//! +---------------------+
//! | Header (bincode)    |  <- VocabHeader
//! +---------------------+
//! | Entries (bincode)   |  <- Vec<(String, u32)> in id order
//! +---------------------+
//! ```

use std::hash::Hasher;

use serde::{Deserialize, Serialize};
use twox_hash::XxHash64;

use crate::error::{CorpusError, Result};

use super::vocabulary::Vocabulary;

/// Header for a vocabulary file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VocabHeader {
    /// Magic bytes identifying a vocabulary file ("SVOC")
    pub magic: [u8; 4],
    /// Format version number
    pub version: u32,
    pub pad_id: u32,
    pub unk_id: u32,
    pub cutoff: u32,
    /// Number of (token, id) entries in the payload
    pub entry_count: u64,
    /// XXHash64 checksum of the payload bytes
    pub checksum: u64,
}

impl VocabHeader {
    /// Magic bytes for vocabulary files
    pub const MAGIC: [u8; 4] = *b"SVOC";

    /// Current format version
    pub const VERSION: u32 = 1;

    /// Validates the header magic bytes.
    pub fn validate_magic(&self) -> bool {
        self.magic == Self::MAGIC
    }

    /// Validates the header version.
    pub fn validate_version(&self) -> bool {
        self.version == Self::VERSION
    }
}

fn checksum(data: &[u8]) -> u64 {
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(data);
    hasher.finish()
}

/// Serialize a vocabulary into the on-disk layout.
pub fn encode(vocab: &Vocabulary) -> Result<Vec<u8>> {
    let entries: Vec<(&str, u32)> = vocab.entries().collect();
    let payload = bincode::serialize(&entries)
        .map_err(|e| CorpusError::serialization(format!("failed to serialize entries: {e}")))?;

    let header = VocabHeader {
        magic: VocabHeader::MAGIC,
        version: VocabHeader::VERSION,
        pad_id: vocab.pad_id(),
        unk_id: vocab.unk_id(),
        cutoff: vocab.cutoff(),
        entry_count: entries.len() as u64,
        checksum: checksum(&payload),
    };
    let header_bytes = bincode::serialize(&header)
        .map_err(|e| CorpusError::serialization(format!("failed to serialize header: {e}")))?;

    let mut data = Vec::with_capacity(4 + header_bytes.len() + payload.len());
    data.extend_from_slice(&(header_bytes.len() as u32).to_le_bytes());
    data.extend_from_slice(&header_bytes);
    data.extend_from_slice(&payload);
    Ok(data)
}

/// Split raw file bytes into a validated header and its payload.
pub fn decode_header(data: &[u8]) -> Result<(VocabHeader, &[u8])> {
    let Some(len_bytes) = data.get(..4) else {
        return Err(CorpusError::vocabulary("vocabulary file too small"));
    };
    let mut len = [0u8; 4];
    len.copy_from_slice(len_bytes);
    let header_len = u32::from_le_bytes(len) as usize;

    let Some(header_bytes) = data.get(4..4 + header_len) else {
        return Err(CorpusError::vocabulary(
            "vocabulary file truncated: header incomplete",
        ));
    };

    let header: VocabHeader = bincode::deserialize(header_bytes)
        .map_err(|e| CorpusError::vocabulary(format!("failed to deserialize header: {e}")))?;

    if !header.validate_magic() {
        return Err(CorpusError::vocabulary(format!(
            "invalid magic bytes: expected {:?}, got {:?}",
            VocabHeader::MAGIC,
            header.magic
        )));
    }
    if !header.validate_version() {
        return Err(CorpusError::vocabulary(format!(
            "unsupported version: expected {}, got {}",
            VocabHeader::VERSION,
            header.version
        )));
    }

    Ok((header, &data[4 + header_len..]))
}

/// Parse and verify a vocabulary from raw file bytes.
pub fn decode(data: &[u8]) -> Result<Vocabulary> {
    let (header, payload) = decode_header(data)?;

    let computed = checksum(payload);
    if computed != header.checksum {
        return Err(CorpusError::vocabulary(format!(
            "checksum mismatch: expected {}, got {}",
            header.checksum, computed
        )));
    }

    let entries: Vec<(String, u32)> = bincode::deserialize(payload)
        .map_err(|e| CorpusError::serialization(format!("failed to deserialize entries: {e}")))?;

    if entries.len() as u64 != header.entry_count {
        return Err(CorpusError::vocabulary(format!(
            "entry count mismatch: expected {}, got {}",
            header.entry_count,
            entries.len()
        )));
    }

    Vocabulary::from_entries(entries, header.pad_id, header.unk_id, header.cutoff)
}
