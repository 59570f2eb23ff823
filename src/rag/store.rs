//! Embedding store: the ordered set of embedded chunks and its file format.
//!
//! The file is UTF-8 with a `Title,Abbreviation,Embedding` header and one row
//! per record. The embedding column holds the vector components joined by
//! `|`, so it never collides with the `,` field separator.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::chunker::Chunk;
use super::csv::{read_rows, write_row};
use crate::core::errors::RagError;
use crate::llm::ModelProvider;

pub const STORE_HEADER: [&str; 3] = ["Title", "Abbreviation", "Embedding"];
pub const VECTOR_DELIMITER: char = '|';

/// One embedded chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    pub label: String,
    pub text: String,
    pub vector: Vec<f32>,
}

/// Ordered embedding records sharing one vector length.
///
/// Built fresh by each ingestion and read-only afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingStore {
    dimension: usize,
    records: Vec<EmbeddingRecord>,
}

impl EmbeddingStore {
    /// Embeds every chunk with a single batched provider call.
    pub async fn build(
        chunks: Vec<Chunk>,
        provider: &dyn ModelProvider,
        dimension: usize,
    ) -> Result<Self, RagError> {
        let inputs: Vec<String> = chunks.iter().map(|chunk| chunk.text().to_string()).collect();
        let vectors = if inputs.is_empty() {
            Vec::new()
        } else {
            provider.embed(&inputs).await?
        };
        Self::from_parts(chunks, vectors, dimension)
    }

    /// Pairs chunks with their vectors by position.
    ///
    /// Fails when the counts differ or any vector has the wrong length.
    pub fn from_parts(
        chunks: Vec<Chunk>,
        vectors: Vec<Vec<f32>>,
        dimension: usize,
    ) -> Result<Self, RagError> {
        if chunks.len() != vectors.len() {
            return Err(RagError::EmbeddingProvider(format!(
                "provider returned {} embeddings for {} inputs",
                vectors.len(),
                chunks.len()
            )));
        }

        let records = chunks
            .into_iter()
            .zip(vectors)
            .enumerate()
            .map(|(index, (chunk, vector))| {
                if vector.len() != dimension {
                    return Err(RagError::EmbeddingProvider(format!(
                        "embedding {} has {} components, expected {}",
                        index,
                        vector.len(),
                        dimension
                    )));
                }
                Ok(EmbeddingRecord {
                    label: chunk.label().to_string(),
                    text: chunk.text().to_string(),
                    vector,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { dimension, records })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn records(&self) -> &[EmbeddingRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Renders the store in its file format.
    pub fn serialize(&self) -> String {
        let mut out = String::new();
        write_row(&mut out, &STORE_HEADER);
        for record in &self.records {
            let vector = record
                .vector
                .iter()
                .map(|value| value.to_string())
                .collect::<Vec<_>>()
                .join(&VECTOR_DELIMITER.to_string());
            write_row(
                &mut out,
                &[record.label.as_str(), record.text.as_str(), vector.as_str()],
            );
        }
        out
    }

    /// Parses a whole store file. Any malformed row fails the entire parse.
    pub fn parse(input: &str, dimension: usize) -> Result<Self, RagError> {
        let rows = read_rows(input).map_err(|err| RagError::store_format(err.line, err.message))?;
        let mut rows = rows.into_iter();

        let header = rows
            .next()
            .ok_or_else(|| RagError::store_format(1, "missing header row"))?;
        let columns: Vec<&str> = header.fields.iter().map(|f| f.trim()).collect();
        if columns != STORE_HEADER {
            return Err(RagError::store_format(
                header.line,
                format!("expected header {:?}, found {:?}", STORE_HEADER, columns),
            ));
        }

        let records = rows
            .map(|row| {
                let line = row.line;
                let [label, text, embedding]: [String; 3] =
                    row.fields.try_into().map_err(|fields: Vec<String>| {
                        RagError::store_format(
                            line,
                            format!("expected 3 columns, found {}", fields.len()),
                        )
                    })?;
                let vector = parse_vector(&embedding, line)?;
                if vector.len() != dimension {
                    return Err(RagError::store_format(
                        line,
                        format!(
                            "vector has {} components, expected {}",
                            vector.len(),
                            dimension
                        ),
                    ));
                }
                Ok(EmbeddingRecord {
                    label,
                    text,
                    vector,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { dimension, records })
    }

    /// Writes the store to `path`, replacing any previous file.
    pub fn save(&self, path: &Path) -> Result<(), RagError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp_path = path.with_extension("csv.tmp");
        fs::write(&tmp_path, self.serialize())?;
        fs::rename(&tmp_path, path)?;
        tracing::info!("Saved {} embeddings to {}", self.len(), path.display());
        Ok(())
    }

    pub fn load(path: &Path, dimension: usize) -> Result<Self, RagError> {
        let contents = fs::read_to_string(path)?;
        let store = Self::parse(&contents, dimension)?;
        tracing::info!(
            "Loaded {} embeddings ({} dimensions) from {}",
            store.len(),
            dimension,
            path.display()
        );
        Ok(store)
    }
}

fn parse_vector(raw: &str, line: usize) -> Result<Vec<f32>, RagError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(RagError::store_format(line, "empty embedding column"));
    }
    raw.split(VECTOR_DELIMITER)
        .map(|component| {
            let component = component.trim();
            match component.parse::<f32>() {
                Ok(value) if value.is_finite() => Ok(value),
                _ => Err(RagError::store_format(
                    line,
                    format!("non-numeric embedding component '{}'", component),
                )),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::StaticProvider;
    use crate::tokenizer::WordTokenizer;

    fn chunk(label: &str, text: &str) -> Chunk {
        Chunk::new(label, text, &WordTokenizer).unwrap()
    }

    fn sample_store() -> EmbeddingStore {
        EmbeddingStore::from_parts(
            vec![
                chunk("ABS", "Anti-lock braking system"),
                chunk("ACC", "Adaptive cruise control, keeps distance"),
            ],
            vec![vec![0.25, -1.5e-3], vec![-0.125, 0.99]],
            2,
        )
        .unwrap()
    }

    #[test]
    fn serializes_with_header_and_pipe_delimited_vectors() {
        let text = sample_store().serialize();
        let mut lines = text.lines();

        assert_eq!(lines.next(), Some("Title,Abbreviation,Embedding"));
        assert_eq!(lines.next(), Some("ABS,Anti-lock braking system,0.25|-0.0015"));
        assert_eq!(
            lines.next(),
            Some("ACC,\"Adaptive cruise control, keeps distance\",-0.125|0.99")
        );
    }

    #[test]
    fn parses_existing_store_rows() {
        let input = "Title,Abbreviation,Embedding\n\
            \"ABS\",\"Anti-lock braking system\",0.1|0.2|0.3\n\
            ESC,Electronic stability control,-1|0|1e-3\n";
        let store = EmbeddingStore::parse(input, 3).unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(store.records()[0].label, "ABS");
        assert_eq!(store.records()[1].vector, vec![-1.0, 0.0, 0.001]);
    }

    #[test]
    fn non_numeric_component_is_a_format_error() {
        let input = "Title,Abbreviation,Embedding\nABS,Anti-lock,0.1|abc\n";
        let err = EmbeddingStore::parse(input, 2).unwrap_err();
        assert!(matches!(err, RagError::StoreFormat { line: 2, .. }));
    }

    #[test]
    fn nan_component_is_a_format_error() {
        let input = "Title,Abbreviation,Embedding\nABS,Anti-lock,NaN|1\n";
        assert!(matches!(
            EmbeddingStore::parse(input, 2),
            Err(RagError::StoreFormat { .. })
        ));
    }

    #[test]
    fn wrong_column_count_is_a_format_error() {
        let input = "Title,Abbreviation,Embedding\nABS,Anti,lock,0.1|0.2\n";
        assert!(matches!(
            EmbeddingStore::parse(input, 2),
            Err(RagError::StoreFormat { line: 2, .. })
        ));
    }

    #[test]
    fn vector_length_mismatch_is_a_format_error() {
        let input = "Title,Abbreviation,Embedding\nA,a,1|0\nB,b,1|0|0\n";
        let err = EmbeddingStore::parse(input, 2).unwrap_err();
        assert!(matches!(err, RagError::StoreFormat { line: 3, .. }));
    }

    #[test]
    fn missing_header_is_a_format_error() {
        assert!(matches!(
            EmbeddingStore::parse("", 2),
            Err(RagError::StoreFormat { line: 1, .. })
        ));
        assert!(matches!(
            EmbeddingStore::parse("A,a,1|0\n", 2),
            Err(RagError::StoreFormat { line: 1, .. })
        ));
    }

    #[test]
    fn header_only_file_is_an_empty_store() {
        let store = EmbeddingStore::parse("Title,Abbreviation,Embedding\n", 4).unwrap();
        assert!(store.is_empty());
        assert_eq!(store.dimension(), 4);
    }

    #[test]
    fn from_parts_rejects_count_mismatch() {
        let err = EmbeddingStore::from_parts(vec![chunk("A", "a")], vec![], 2).unwrap_err();
        assert!(matches!(err, RagError::EmbeddingProvider(_)));
    }

    #[test]
    fn from_parts_rejects_wrong_dimension() {
        let err =
            EmbeddingStore::from_parts(vec![chunk("A", "a")], vec![vec![1.0, 0.0, 0.0]], 2)
                .unwrap_err();
        assert!(matches!(err, RagError::EmbeddingProvider(_)));
    }

    #[test]
    fn save_and_load_replace_previous_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("processed").join("embeddings.csv");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "stale contents").unwrap();

        let store = sample_store();
        store.save(&path).unwrap();
        let loaded = EmbeddingStore::load(&path, 2).unwrap();

        assert_eq!(loaded, store);
        assert!(!path.with_extension("csv.tmp").exists());
    }

    #[tokio::test]
    async fn build_embeds_chunks_in_input_order() {
        let provider = StaticProvider::new(2)
            .with_vector("Anti-lock braking system", vec![1.0, 0.0])
            .with_vector("Adaptive cruise control", vec![0.0, 1.0]);
        let chunks = vec![
            chunk("ABS", "Anti-lock braking system"),
            chunk("ACC", "Adaptive cruise control"),
        ];

        let store = EmbeddingStore::build(chunks, &provider, 2).await.unwrap();

        assert_eq!(store.records()[0].vector, vec![1.0, 0.0]);
        assert_eq!(store.records()[1].label, "ACC");
        assert_eq!(store.records()[1].vector, vec![0.0, 1.0]);
        assert_eq!(provider.embed_calls(), 1);
    }

    #[tokio::test]
    async fn build_rejects_short_provider_batches() {
        let provider = StaticProvider::new(2).truncating_batches();
        let chunks = vec![chunk("A", "one"), chunk("B", "two")];

        let err = EmbeddingStore::build(chunks, &provider, 2).await.unwrap_err();
        assert!(matches!(err, RagError::EmbeddingProvider(_)));
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn record() -> impl Strategy<Value = (String, String, Vec<f32>)> {
            (
                "[A-Za-z0-9 ,\"-]{1,12}",
                "[A-Za-z0-9 ,.\"|-]{0,40}",
                proptest::collection::vec(-1.0e3f32..1.0e3, 3),
            )
        }

        proptest! {
            #[test]
            fn serialize_then_parse_round_trips(
                rows in proptest::collection::vec(record(), 0..12),
            ) {
                let (chunks, vectors): (Vec<Chunk>, Vec<Vec<f32>>) = rows
                    .into_iter()
                    .map(|(label, text, vector)| {
                        (Chunk::new(label, text, &WordTokenizer).unwrap(), vector)
                    })
                    .unzip();
                let store = EmbeddingStore::from_parts(chunks, vectors, 3).unwrap();

                let parsed = EmbeddingStore::parse(&store.serialize(), 3).unwrap();

                prop_assert_eq!(parsed.len(), store.len());
                for (left, right) in parsed.records().iter().zip(store.records()) {
                    prop_assert_eq!(&left.label, &right.label);
                    prop_assert_eq!(&left.text, &right.text);
                    for (a, b) in left.vector.iter().zip(&right.vector) {
                        prop_assert!((a - b).abs() <= 1e-6 * b.abs().max(1.0));
                    }
                }
            }
        }
    }
}
