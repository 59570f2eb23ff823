//! Source records scraped from the abbreviation glossary.
//!
//! The file has a `Title,Abbreviation` header followed by one quoted row per
//! glossary entry.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::chunker::{chunk_sentences, Chunk};
use super::csv::read_rows;
use crate::core::errors::RagError;
use crate::tokenizer::TokenCounter;

pub const RECORD_HEADER: [&str; 2] = ["Title", "Abbreviation"];

/// One glossary entry: a title and its abbreviation/definition text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRecord {
    pub title: String,
    pub text: String,
}

/// Parses the contents of a source-record file.
///
/// Rows missing the second column keep an empty text and are skipped later
/// by `prepare_chunks`.
pub fn parse_records(input: &str) -> Result<Vec<SourceRecord>, RagError> {
    let rows = read_rows(input).map_err(|err| RagError::record_format(err.line, err.message))?;
    let mut rows = rows.into_iter();

    let header = rows
        .next()
        .ok_or_else(|| RagError::record_format(1, "missing header row"))?;
    let columns: Vec<&str> = header.fields.iter().map(|f| f.trim()).collect();
    if columns != RECORD_HEADER {
        return Err(RagError::record_format(
            header.line,
            format!("expected header {:?}, found {:?}", RECORD_HEADER, columns),
        ));
    }

    rows.map(|row| {
        if row.fields.len() > RECORD_HEADER.len() {
            return Err(RagError::record_format(
                row.line,
                format!("expected 2 columns, found {}", row.fields.len()),
            ));
        }
        let mut fields = row.fields.into_iter();
        let title = fields.next().unwrap_or_default();
        let text = fields.next().unwrap_or_default();
        Ok(SourceRecord {
            title: title.trim().to_string(),
            text: text.trim().to_string(),
        })
    })
    .collect()
}

pub fn load_records(path: &Path) -> Result<Vec<SourceRecord>, RagError> {
    let contents = fs::read_to_string(path)?;
    parse_records(&contents)
}

/// Turns records into embeddable chunks, preserving record order.
///
/// Records without text are skipped. Records longer than `chunk_token_limit`
/// are split into sentence chunks that keep the record's title as label.
pub fn prepare_chunks(
    records: &[SourceRecord],
    chunk_token_limit: usize,
    tokenizer: &dyn TokenCounter,
) -> Result<Vec<Chunk>, RagError> {
    let mut chunks = Vec::with_capacity(records.len());
    let mut skipped = 0usize;

    for record in records {
        if record.text.is_empty() {
            skipped += 1;
            continue;
        }

        let chunk = Chunk::new(record.title.as_str(), record.text.as_str(), tokenizer)?;
        if chunk.token_count() <= chunk_token_limit {
            chunks.push(chunk);
            continue;
        }

        for piece in chunk_sentences(&record.text, chunk_token_limit, tokenizer)? {
            chunks.push(Chunk::new(record.title.as_str(), piece, tokenizer)?);
        }
    }

    tracing::info!(
        "Prepared {} chunks from {} records ({} without text)",
        chunks.len(),
        records.len(),
        skipped
    );
    Ok(chunks)
}
