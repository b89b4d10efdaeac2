//! Tokenization with the offsets and word ids needed for entity aggregation

use std::path::Path;

use tokenizers::Tokenizer as HFTokenizer;
use tokenizers::utils::truncation::TruncationParams;
use tracing::warn;

use crate::ml::error::{MLError, Result};

/// One encoded text.
///
/// `offsets` are `[start, end)` positions in chars of the input text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenizedText {
    pub ids: Vec<u32>,
    pub type_ids: Vec<u32>,
    pub attention_mask: Vec<u32>,
    pub offsets: Vec<(usize, usize)>,
    pub word_ids: Vec<Option<u32>>,
    pub special_tokens_mask: Vec<u32>,
    /// Whether tokens past `max_length` were dropped
    pub truncated: bool,
}

impl TokenizedText {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn is_special(&self, index: usize) -> bool {
        self.special_tokens_mask.get(index).copied().unwrap_or(0) == 1
    }
}

/// HuggingFace fast tokenizer configured for single-text classification.
pub struct PiiTokenizer {
    inner: HFTokenizer,
    max_length: usize,
}

impl PiiTokenizer {
    /// Load `tokenizer.json`, disabling padding and truncating to `max_length` tokens.
    pub fn from_file(path: impl AsRef<Path>, max_length: usize) -> Result<Self> {
        let path = path.as_ref();
        let inner = HFTokenizer::from_file(path).map_err(|e| {
            MLError::model_loading(format!("Failed to load tokenizer {}: {}", path.display(), e))
        })?;
        Self::new(inner, max_length)
    }

    pub fn new(mut inner: HFTokenizer, max_length: usize) -> Result<Self> {
        if max_length == 0 {
            return Err(MLError::configuration("max_length must be greater than zero"));
        }

        inner.with_padding(None);
        inner
            .with_truncation(Some(TruncationParams {
                max_length,
                ..Default::default()
            }))
            .map_err(|e| MLError::configuration(format!("Invalid truncation settings: {}", e)))?;

        Ok(Self { inner, max_length })
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Encode one text with special tokens and char offsets.
    pub fn encode(&self, text: &str) -> Result<TokenizedText> {
        let encoding = self
            .inner
            .encode_char_offsets(text, true)
            .map_err(MLError::tokenization)?;

        let truncated = !encoding.get_overflowing().is_empty();
        if truncated {
            warn!(
                max_length = self.max_length,
                chars = text.chars().count(),
                "Input truncated to the model's maximum sequence length"
            );
        }

        Ok(TokenizedText {
            ids: encoding.get_ids().to_vec(),
            type_ids: encoding.get_type_ids().to_vec(),
            attention_mask: encoding.get_attention_mask().to_vec(),
            offsets: encoding.get_offsets().to_vec(),
            word_ids: encoding.get_word_ids().to_vec(),
            special_tokens_mask: encoding.get_special_tokens_mask().to_vec(),
            truncated,
        })
    }
}
