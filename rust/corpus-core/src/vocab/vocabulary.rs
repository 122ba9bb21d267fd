// rust/corpus-core/src/vocab/vocabulary.rs

use std::collections::HashMap;

use crate::dataset::{Field, Pair, ShardStream};
use crate::error::{CorpusError, Result};

/// Token reserved for padding.
pub const PAD_TOKEN: &str = "<pad>";
/// Token reserved for out-of-vocabulary words.
pub const UNK_TOKEN: &str = "<unk>";
/// Id of [`PAD_TOKEN`] in every built vocabulary.
pub const PAD_ID: u32 = 0;
/// Id of [`UNK_TOKEN`] in every built vocabulary.
pub const UNK_ID: u32 = 1;

/// Split text into tokens on runs of whitespace.
///
/// Vocabulary construction and batch encoding both go through this, so a
/// token counted during the build is the same token looked up later.
pub fn tokenize(text: &str) -> impl Iterator<Item = &str> {
    text.split_whitespace()
}

/// A bijection between tokens and dense integer ids.
///
/// Ids run from 0 to `len() - 1`. The padding and unknown tokens are always
/// present; any token that did not reach the frequency cutoff during
/// construction has no id of its own and encodes to [`unk_id`](Self::unk_id).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vocabulary {
    index: HashMap<String, u32>,
    tokens: Vec<String>,
    pad_id: u32,
    unk_id: u32,
    cutoff: u32,
}

impl Vocabulary {
    /// Build a vocabulary from a full pass over `stream`.
    ///
    /// Every pair is pulled until end-of-stream and `extractor` selects the
    /// text to count. Tokens seen at least `cutoff` times get ids in the order
    /// they were first seen, after the reserved ids. A cutoff of 0 behaves as 1.
    ///
    /// The stream is not reset before or after the pass.
    pub fn build<S, F>(stream: &mut S, extractor: F, cutoff: u32) -> Result<Self>
    where
        S: ShardStream + ?Sized,
        F: Fn(&Pair) -> &str,
    {
        let cutoff = cutoff.max(1);
        let mut counts: HashMap<String, u32> = HashMap::new();
        let mut first_seen: Vec<String> = Vec::new();
        let mut pairs = 0u64;

        while let Some(pair) = stream.next_pair()? {
            pairs += 1;
            for token in tokenize(extractor(&pair)) {
                match counts.get_mut(token) {
                    Some(count) => *count = count.saturating_add(1),
                    None => {
                        counts.insert(token.to_string(), 1);
                        first_seen.push(token.to_string());
                    }
                }
            }
        }

        let mut vocab = Self::reserved(cutoff);
        for token in first_seen {
            if counts.get(&token).copied().unwrap_or(0) >= cutoff {
                vocab.insert(token);
            }
        }

        tracing::info!(
            "Built vocabulary with {} tokens from {} pairs ({} distinct, cutoff {})",
            vocab.len(),
            pairs,
            counts.len(),
            cutoff
        );

        Ok(vocab)
    }

    /// Build a vocabulary over one side of every pair.
    pub fn build_field<S>(stream: &mut S, field: Field, cutoff: u32) -> Result<Self>
    where
        S: ShardStream + ?Sized,
    {
        Self::build(stream, |pair| field.select(pair), cutoff)
    }

    /// Rebuild a vocabulary from persisted `(token, id)` entries.
    ///
    /// # Errors
    ///
    /// Returns a vocabulary error if the entries are not a bijection onto
    /// `0..entries.len()`, or if the reserved ids do not name distinct entries.
    pub fn from_entries(
        entries: Vec<(String, u32)>,
        pad_id: u32,
        unk_id: u32,
        cutoff: u32,
    ) -> Result<Self> {
        let mut slots: Vec<Option<String>> = vec![None; entries.len()];
        let mut index = HashMap::with_capacity(entries.len());

        for (token, id) in entries {
            let slot = slots.get_mut(id as usize).ok_or_else(|| {
                CorpusError::vocabulary(format!("id {id} for token '{token}' is out of range"))
            })?;
            if slot.is_some() {
                return Err(CorpusError::vocabulary(format!("id {id} is assigned twice")));
            }
            if index.insert(token.clone(), id).is_some() {
                return Err(CorpusError::vocabulary(format!(
                    "token '{token}' appears more than once"
                )));
            }
            *slot = Some(token);
        }

        // Every slot is filled: n distinct ids below n
        let tokens: Vec<String> = slots.into_iter().flatten().collect();

        if pad_id == unk_id {
            return Err(CorpusError::vocabulary(
                "padding and unknown ids must differ",
            ));
        }
        for (name, id) in [("padding", pad_id), ("unknown", unk_id)] {
            if id as usize >= tokens.len() {
                return Err(CorpusError::vocabulary(format!(
                    "{name} id {id} has no entry"
                )));
            }
        }

        Ok(Self {
            index,
            tokens,
            pad_id,
            unk_id,
            cutoff,
        })
    }

    /// A vocabulary holding only the reserved tokens.
    fn reserved(cutoff: u32) -> Self {
        let mut vocab = Self {
            index: HashMap::new(),
            tokens: Vec::new(),
            pad_id: PAD_ID,
            unk_id: UNK_ID,
            cutoff,
        };
        vocab.insert(PAD_TOKEN.to_string());
        vocab.insert(UNK_TOKEN.to_string());
        vocab
    }

    fn insert(&mut self, token: String) {
        if self.index.contains_key(&token) {
            return;
        }
        let id = self.tokens.len() as u32;
        self.index.insert(token.clone(), id);
        self.tokens.push(token);
    }

    /// Id of `token`, or the unknown id when it has none.
    pub fn id(&self, token: &str) -> u32 {
        self.get(token).unwrap_or(self.unk_id)
    }

    pub fn get(&self, token: &str) -> Option<u32> {
        self.index.get(token).copied()
    }

    pub fn token(&self, id: u32) -> Option<&str> {
        self.tokens.get(id as usize).map(String::as_str)
    }

    pub fn contains(&self, token: &str) -> bool {
        self.index.contains_key(token)
    }

    /// Encode whitespace-separated text into ids.
    pub fn encode(&self, text: &str) -> Vec<u32> {
        tokenize(text).map(|token| self.id(token)).collect()
    }

    /// Encode text into `out`, stopping when it is full.
    ///
    /// Returns the number of ids written; slots past that are left untouched.
    pub fn encode_into(&self, text: &str, out: &mut [u32]) -> usize {
        let mut written = 0;
        for (slot, token) in out.iter_mut().zip(tokenize(text)) {
            *slot = self.id(token);
            written += 1;
        }
        written
    }

    /// Map ids back to tokens; ids outside the vocabulary become the unknown
    /// token.
    pub fn decode(&self, ids: &[u32]) -> Vec<&str> {
        let unk = self.token(self.unk_id).unwrap_or(UNK_TOKEN);
        ids.iter().map(|&id| self.token(id).unwrap_or(unk)).collect()
    }

    /// Number of ids, reserved ones included.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Number of ids learned from the corpus, reserved ones excluded.
    pub fn token_count(&self) -> usize {
        // pad and unk are always two distinct entries
        self.tokens.len().saturating_sub(2)
    }

    /// `(token, id)` entries in id order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, u32)> + '_ {
        self.tokens
            .iter()
            .enumerate()
            .map(|(id, token)| (token.as_str(), id as u32))
    }

    pub fn pad_id(&self) -> u32 {
        self.pad_id
    }

    pub fn unk_id(&self) -> u32 {
        self.unk_id
    }

    /// The frequency cutoff the vocabulary was built with.
    pub fn cutoff(&self) -> u32 {
        self.cutoff
    }
}

/// Build source and target vocabularies with two sequential passes.
///
/// The stream is drained for the source side, reset, then drained again for
/// the target side. It is left at end-of-stream.
pub fn build_pair_vocabularies<S>(stream: &mut S, cutoff: u32) -> Result<(Vocabulary, Vocabulary)>
where
    S: ShardStream + ?Sized,
{
    let source = Vocabulary::build_field(stream, Field::Source, cutoff)?;
    stream.reset();
    let target = Vocabulary::build_field(stream, Field::Target, cutoff)?;
    Ok((source, target))
}
