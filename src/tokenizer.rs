//! Token accounting used for chunking, ranking and context assembly.
//!
//! Token ids are only ever counted here; model input is encoded by the
//! provider.

use std::path::Path;

use crate::core::errors::RagError;

/// Subword tokenizer adapter. Implementations must be deterministic.
pub trait TokenCounter: Send + Sync {
    /// Encodes `text` into token ids.
    fn encode(&self, text: &str) -> Result<Vec<u32>, RagError>;

    /// Number of tokens in `text`.
    fn count(&self, text: &str) -> Result<usize, RagError> {
        Ok(self.encode(text)?.len())
    }
}

/// Adapter over a Hugging Face `tokenizer.json`.
pub struct HfTokenizer {
    inner: tokenizers::Tokenizer,
}

impl HfTokenizer {
    pub fn from_file(path: &Path) -> Result<Self, RagError> {
        let inner = tokenizers::Tokenizer::from_file(path).map_err(|err| {
            RagError::InvalidConfiguration(format!(
                "failed to load tokenizer {}: {}",
                path.display(),
                err
            ))
        })?;
        Ok(Self { inner })
    }
}

impl TokenCounter for HfTokenizer {
    fn encode(&self, text: &str) -> Result<Vec<u32>, RagError> {
        let encoding = self
            .inner
            .encode(text, false)
            .map_err(RagError::tokenization)?;
        Ok(encoding.get_ids().to_vec())
    }
}

/// Splits text into runs of alphanumeric characters plus one token per
/// punctuation character. Whitespace produces no tokens.
///
/// Used when no tokenizer file is configured. Counts are additive over
/// concatenation at whitespace or punctuation boundaries.
#[derive(Debug, Clone, Copy, Default)]
pub struct WordTokenizer;

impl TokenCounter for WordTokenizer {
    fn encode(&self, text: &str) -> Result<Vec<u32>, RagError> {
        let mut ids = Vec::new();
        let mut word = String::new();
        for ch in text.chars() {
            if ch.is_alphanumeric() {
                word.push(ch);
                continue;
            }
            if !word.is_empty() {
                ids.push(fnv1a(&word));
                word.clear();
            }
            if !ch.is_whitespace() {
                let mut buf = [0u8; 4];
                ids.push(fnv1a(ch.encode_utf8(&mut buf)));
            }
        }
        if !word.is_empty() {
            ids.push(fnv1a(&word));
        }
        Ok(ids)
    }
}

fn fnv1a(piece: &str) -> u32 {
    piece
        .bytes()
        .fold(0x811c_9dc5_u32, |hash, byte| {
            (hash ^ u32::from(byte)).wrapping_mul(0x0100_0193)
        })
}
