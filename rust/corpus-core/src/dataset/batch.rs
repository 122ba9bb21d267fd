// rust/corpus-core/src/dataset/batch.rs

use std::sync::Arc;

use crate::config::BatchConfig;
use crate::error::{CorpusError, Result};
use crate::vocab::Vocabulary;

use super::traits::{Pair, ShardStream};

/// A padded, index-encoded group of pairs.
///
/// `source` and `target` are row-major `rows x seq_len` matrices. Each row
/// holds the ids of one pair, left-aligned and right-padded with the side's
/// pad id; sequences longer than `seq_len` are truncated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    pub source: Vec<u32>,
    pub target: Vec<u32>,
    /// Number of pairs in this batch, at most the assembler's batch size.
    pub rows: usize,
    /// Width of every row.
    pub seq_len: usize,
    /// Non-padding ids per source row.
    pub source_lengths: Vec<usize>,
    /// Non-padding ids per target row.
    pub target_lengths: Vec<usize>,
    /// Position of this batch since the assembler was created or reset.
    pub batch_index: u64,
}

impl Batch {
    /// Ids of one source row, or `None` if `row >= rows`.
    pub fn source_row(&self, row: usize) -> Option<&[u32]> {
        row_slice(&self.source, row, self.rows, self.seq_len)
    }

    /// Ids of one target row, or `None` if `row >= rows`.
    pub fn target_row(&self, row: usize) -> Option<&[u32]> {
        row_slice(&self.target, row, self.rows, self.seq_len)
    }

    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }
}

fn row_slice(matrix: &[u32], row: usize, rows: usize, seq_len: usize) -> Option<&[u32]> {
    if row >= rows {
        return None;
    }
    matrix.get(row * seq_len..(row + 1) * seq_len)
}

/// Groups pairs from a stream into fixed-size, padded id batches.
///
/// Each call to [`next_batch`](Self::next_batch) pulls at most `batch_size`
/// pairs; the final batch may be short. No pair is pulled and then dropped, so
/// draining the assembler consumes the stream exactly once.
pub struct BatchAssembler<S> {
    stream: S,
    batch_size: usize,
    max_sequence_length: usize,
    source_vocab: Arc<Vocabulary>,
    target_vocab: Arc<Vocabulary>,
    batch_index: u64,
}

impl BatchAssembler<()> {
    pub fn builder() -> BatchAssemblerBuilder {
        BatchAssemblerBuilder::default()
    }
}

impl<S: ShardStream> BatchAssembler<S> {
    /// Create an assembler from batch options and the two vocabularies.
    pub fn new(
        stream: S,
        config: BatchConfig,
        source_vocab: impl Into<Arc<Vocabulary>>,
        target_vocab: impl Into<Arc<Vocabulary>>,
    ) -> Result<Self> {
        BatchAssemblerBuilder::default()
            .config(config)
            .source_vocab(source_vocab)
            .target_vocab(target_vocab)
            .build(stream)
    }

    /// Assemble the next batch.
    ///
    /// Returns `Ok(None)` once the stream yields no more pairs.
    pub fn next_batch(&mut self) -> Result<Option<Batch>> {
        // Never reserve more than the whole stream could fill
        let total = usize::try_from(self.stream.len()).unwrap_or(usize::MAX);
        let mut pairs: Vec<Pair> = Vec::with_capacity(self.batch_size.min(total));
        while pairs.len() < self.batch_size {
            match self.stream.next_pair()? {
                Some(pair) => pairs.push(pair),
                None => break,
            }
        }

        if pairs.is_empty() {
            return Ok(None);
        }

        let rows = pairs.len();
        let seq_len = self.max_sequence_length;
        let cells = rows.checked_mul(seq_len).ok_or_else(|| {
            CorpusError::config(format!(
                "a batch of {rows} rows x {seq_len} ids does not fit in memory"
            ))
        })?;
        let mut source = vec![self.source_vocab.pad_id(); cells];
        let mut target = vec![self.target_vocab.pad_id(); cells];
        let mut source_lengths = Vec::with_capacity(rows);
        let mut target_lengths = Vec::with_capacity(rows);

        for (row, pair) in pairs.iter().enumerate() {
            let span = row * seq_len..(row + 1) * seq_len;
            source_lengths.push(
                self.source_vocab
                    .encode_into(&pair.source, &mut source[span.clone()]),
            );
            target_lengths.push(self.target_vocab.encode_into(&pair.target, &mut target[span]));
        }

        let batch = Batch {
            source,
            target,
            rows,
            seq_len,
            source_lengths,
            target_lengths,
            batch_index: self.batch_index,
        };
        self.batch_index += 1;

        Ok(Some(batch))
    }

    /// Restart from the beginning of the stream.
    pub fn reset(&mut self) {
        self.stream.reset();
        self.batch_index = 0;
    }

    /// Number of batches a full pass yields.
    pub fn expected_batches(&self) -> u64 {
        self.stream.len().div_ceil(self.batch_size as u64)
    }
}

impl<S> BatchAssembler<S> {
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn max_sequence_length(&self) -> usize {
        self.max_sequence_length
    }

    pub fn source_vocab(&self) -> &Vocabulary {
        &self.source_vocab
    }

    pub fn target_vocab(&self) -> &Vocabulary {
        &self.target_vocab
    }

    pub fn stream(&self) -> &S {
        &self.stream
    }

    /// Give back the underlying stream.
    pub fn into_inner(self) -> S {
        self.stream
    }
}

impl<S: ShardStream> Iterator for BatchAssembler<S> {
    type Item = Result<Batch>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_batch() {
            Ok(Some(batch)) => Some(Ok(batch)),
            Ok(None) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

/// Builder for [`BatchAssembler`].
///
/// Batch size and sequence length default to [`BatchConfig::default`]; both
/// vocabularies are required.
#[derive(Debug, Default, Clone)]
pub struct BatchAssemblerBuilder {
    batch_size: Option<usize>,
    max_sequence_length: Option<usize>,
    source_vocab: Option<Arc<Vocabulary>>,
    target_vocab: Option<Arc<Vocabulary>>,
}

impl BatchAssemblerBuilder {
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = Some(batch_size);
        self
    }

    pub fn max_sequence_length(mut self, max_sequence_length: usize) -> Self {
        self.max_sequence_length = Some(max_sequence_length);
        self
    }

    /// Take batch size and sequence length from `config`.
    pub fn config(self, config: BatchConfig) -> Self {
        self.batch_size(config.batch_size)
            .max_sequence_length(config.max_sequence_length)
    }

    pub fn source_vocab(mut self, vocab: impl Into<Arc<Vocabulary>>) -> Self {
        self.source_vocab = Some(vocab.into());
        self
    }

    pub fn target_vocab(mut self, vocab: impl Into<Arc<Vocabulary>>) -> Self {
        self.target_vocab = Some(vocab.into());
        self
    }

    /// Validate the options and attach the stream.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the batch size or sequence length is
    /// zero, or if either vocabulary is missing or holds only reserved tokens.
    pub fn build<S: ShardStream>(self, stream: S) -> Result<BatchAssembler<S>> {
        let defaults = BatchConfig::default();
        let config = BatchConfig {
            batch_size: self.batch_size.unwrap_or(defaults.batch_size),
            max_sequence_length: self
                .max_sequence_length
                .unwrap_or(defaults.max_sequence_length),
        };
        config.validate()?;

        let source_vocab = require_vocab(self.source_vocab, "source")?;
        let target_vocab = require_vocab(self.target_vocab, "target")?;

        Ok(BatchAssembler {
            stream,
            batch_size: config.batch_size,
            max_sequence_length: config.max_sequence_length,
            source_vocab,
            target_vocab,
            batch_index: 0,
        })
    }
}

fn require_vocab(vocab: Option<Arc<Vocabulary>>, side: &str) -> Result<Arc<Vocabulary>> {
    let vocab =
        vocab.ok_or_else(|| CorpusError::config(format!("{side} vocabulary is required")))?;
    if vocab.token_count() == 0 {
        return Err(CorpusError::config(format!(
            "{side} vocabulary has no tokens beyond the reserved ones"
        )));
    }
    Ok(vocab)
}
