//! Sentence chunker.
//!
//! Splits text on `". "` and packs consecutive sentences into chunks whose
//! token count stays within a limit.

use serde::{Deserialize, Serialize};

use crate::core::errors::RagError;
use crate::tokenizer::TokenCounter;

const SENTENCE_DELIMITER: &str = ". ";

/// A labelled span of text with its token count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    label: String,
    text: String,
    token_count: usize,
}

impl Chunk {
    /// Builds a chunk, counting its tokens with `tokenizer`.
    pub fn new(
        label: impl Into<String>,
        text: impl Into<String>,
        tokenizer: &dyn TokenCounter,
    ) -> Result<Self, RagError> {
        let text = text.into();
        let token_count = tokenizer.count(&text)?;
        Ok(Self {
            label: label.into(),
            text,
            token_count,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn token_count(&self) -> usize {
        self.token_count
    }
}

/// Splits `text` into sentence chunks of at most `max_tokens` tokens.
///
/// Each sentence is measured with a leading space, and the running count adds
/// one token for the separator (or final period) that follows it. A sentence
/// whose measured length alone exceeds `max_tokens` is dropped. One that lands
/// exactly on the limit is kept as a chunk of its own, so its trailing period
/// may take that chunk one token past `max_tokens`.
///
/// Empty input yields no chunks. Any other input, whitespace included, yields
/// at least one unless every sentence is dropped.
pub fn chunk_sentences(
    text: &str,
    max_tokens: usize,
    tokenizer: &dyn TokenCounter,
) -> Result<Vec<String>, RagError> {
    let mut chunks = Vec::new();
    if text.is_empty() {
        return Ok(chunks);
    }

    let mut current: Vec<&str> = Vec::new();
    let mut tokens_so_far = 0usize;

    for sentence in text.split(SENTENCE_DELIMITER) {
        let token_length = tokenizer.count(&format!(" {}", sentence))?;

        if tokens_so_far + token_length + 1 > max_tokens {
            flush(&mut current, &mut chunks);
            tokens_so_far = 0;
        }

        // TODO: hard-truncate oversized sentences instead of dropping them, pending product sign-off.
        if token_length > max_tokens {
            tracing::debug!(
                "Dropping sentence of {} tokens (limit {})",
                token_length,
                max_tokens
            );
            continue;
        }

        current.push(sentence);
        tokens_so_far += token_length + 1;
    }

    flush(&mut current, &mut chunks);
    Ok(chunks)
}

fn flush(current: &mut Vec<&str>, chunks: &mut Vec<String>) {
    if current.is_empty() {
        return;
    }
    chunks.push(format!("{}.", current.join(SENTENCE_DELIMITER)));
    current.clear();
}
