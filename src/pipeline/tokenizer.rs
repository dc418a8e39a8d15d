use crate::{Error, Result};
use std::path::Path;
use tokenizers::{PaddingParams, PaddingStrategy, Tokenizer, TruncationParams};

/// Token ids and attention mask of exactly `max_length` positions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedInput {
    pub input_ids: Vec<u32>,
    pub attention_mask: Vec<u32>,
}

impl EncodedInput {
    /// Number of non-padding positions.
    pub fn real_len(&self) -> usize {
        self.attention_mask.iter().filter(|&&m| m != 0).count()
    }
}

/// A tokenizer that always truncates and right-pads to a fixed width.
pub struct GrammarTokenizer {
    inner: Tokenizer,
    max_length: usize,
}

impl GrammarTokenizer {
    pub fn from_file(path: impl AsRef<Path>, max_length: usize, pad_id: u32) -> Result<Self> {
        let path = path.as_ref();
        let inner = Tokenizer::from_file(path).map_err(|e| {
            Error::tokenizer(format!("failed to load {}: {}", path.display(), e))
        })?;
        Self::new(inner, max_length, pad_id)
    }

    pub fn new(mut inner: Tokenizer, max_length: usize, pad_id: u32) -> Result<Self> {
        let pad_token = inner
            .id_to_token(pad_id)
            .ok_or_else(|| Error::tokenizer(format!("pad id {} is not in the vocabulary", pad_id)))?;

        inner.with_padding(Some(PaddingParams {
            strategy: PaddingStrategy::Fixed(max_length),
            pad_id,
            pad_token,
            ..Default::default()
        }));
        inner
            .with_truncation(Some(TruncationParams {
                max_length,
                ..Default::default()
            }))
            .map_err(Error::tokenizer)?;

        Ok(Self { inner, max_length })
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    pub fn encode(&self, text: &str) -> Result<EncodedInput> {
        let encoding = self.inner.encode(text, true).map_err(Error::tokenizer)?;
        Ok(EncodedInput {
            input_ids: encoding.get_ids().to_vec(),
            attention_mask: encoding.get_attention_mask().to_vec(),
        })
    }

    /// Decodes generated ids, dropping special tokens such as padding and
    /// end-of-sequence markers.
    pub fn decode(&self, ids: &[u32]) -> Result<String> {
        self.inner.decode(ids, true).map_err(Error::tokenizer)
    }
}
