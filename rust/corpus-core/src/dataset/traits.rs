// rust/corpus-core/src/dataset/traits.rs

use std::io::Read;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use crate::error::{CorpusError, Result};

use super::record_count::count_records;

/// One aligned (source, target) example.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Pair {
    pub source: String,
    pub target: String,
}

impl Pair {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

/// Selects one side of a [`Pair`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Source,
    Target,
}

impl Field {
    pub fn select(self, pair: &Pair) -> &str {
        match self {
            Field::Source => &pair.source,
            Field::Target => &pair.target,
        }
    }
}

/// A finite, restartable sequence of pairs.
///
/// `next_pair` is a forward-only cursor: `Ok(Some(pair))` is a value,
/// `Ok(None)` is end-of-stream (and stays so on repeated calls), `Err` is a
/// failure. A stream is restarted with [`reset`](ShardStream::reset), never by
/// re-iterating.
///
/// One instance serves one consumer at a time. Two logical consumers pulling
/// from the same instance see interleaved slices of a single sequence, not two
/// independent sequences; callers that need two full passes (source and
/// target vocabularies, say) must run them one after another with a `reset()`
/// in between.
pub trait ShardStream {
    /// Total number of pairs, known before any pair is pulled.
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Pulls the next pair.
    fn next_pair(&mut self) -> Result<Option<Pair>>;

    /// Returns to the initial read position, replaying the same shard order.
    fn reset(&mut self);

    /// Borrows the stream as an iterator of `Result<Pair>`.
    fn pairs(&mut self) -> Pairs<'_, Self>
    where
        Self: Sized,
    {
        Pairs { stream: self }
    }
}

impl<S: ShardStream + ?Sized> ShardStream for &mut S {
    fn len(&self) -> u64 {
        (**self).len()
    }

    fn next_pair(&mut self) -> Result<Option<Pair>> {
        (**self).next_pair()
    }

    fn reset(&mut self) {
        (**self).reset()
    }
}

impl<S: ShardStream + ?Sized> ShardStream for Box<S> {
    fn len(&self) -> u64 {
        (**self).len()
    }

    fn next_pair(&mut self) -> Result<Option<Pair>> {
        (**self).next_pair()
    }

    fn reset(&mut self) {
        (**self).reset()
    }
}

/// Iterator returned by [`ShardStream::pairs`].
pub struct Pairs<'a, S> {
    stream: &'a mut S,
}

impl<S: ShardStream> Iterator for Pairs<'_, S> {
    type Item = Result<Pair>;

    fn next(&mut self) -> Option<Self::Item> {
        self.stream.next_pair().transpose()
    }
}

/// Where shards come from.
///
/// Implementations enumerate shard identifiers and open them by identifier,
/// so a local directory, an object store prefix or a database table can feed
/// the same reader.
pub trait ShardSource: Send + Sync {
    /// Lists the shard identifiers in their natural order.
    fn list_shards(&self) -> Result<Vec<PathBuf>>;

    /// Opens a shard for sequential reading.
    fn open_shard(&self, shard: &Path) -> Result<Box<dyn Read + Send>>;

    /// Counts the records in a shard. The default parses the whole shard with
    /// the same CSV rules the reader uses.
    fn count_rows(&self, shard: &Path) -> Result<u64> {
        let reader = self.open_shard(shard)?;
        count_records(reader)
            .map_err(|e| CorpusError::storage_with_source(shard, "failed to count shard rows", e))
    }

    /// Short label used in log messages.
    fn describe(&self) -> String;
}

/// How many rows are held in memory at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MaterializationUnit {
    /// Read one whole shard into memory.
    #[default]
    Shard,
    /// Read at most this many rows of the current shard at a time.
    Rows(NonZeroUsize),
}

impl MaterializationUnit {
    pub(crate) fn max_rows(self) -> Option<usize> {
        match self {
            MaterializationUnit::Shard => None,
            MaterializationUnit::Rows(n) => Some(n.get()),
        }
    }
}
