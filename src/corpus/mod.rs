//! In-memory corpus: the paragraph table grouped into speeches, with
//! annotations decoded on demand against the blob's vocabulary.

mod speech;
mod validate;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::annotation::{AnnotatedDocument, AnnotationError, Vocab};
use crate::cache::{load_annotations, CacheError, LoadedAnnotations};
use crate::models::{columns, ParagraphColumns};
use crate::storage::{read_table, write_table, StorageError, Table};

pub use speech::{Paragraph, ParagraphAnnotation, Speech};
pub use validate::{IndexGap, ValidationReport};

/// Blob file name looked up next to the paragraph table by [`Corpus::load`].
pub const DEFAULT_ANNOTATIONS_FILE: &str = "annotations.msgpack";

/// Columns that [`Corpus::append_column`] refuses to overwrite.
const PROTECTED_COLUMNS: &[&str] = &[
    columns::DOCUMENT_ID,
    columns::PARAGRAPH_INDEX,
    columns::PARAGRAPH_ID,
    columns::SESSION,
    columns::YEAR,
    columns::COUNTRY,
    columns::COUNTRY_NAME,
    columns::TEXT,
    columns::BAG_OF_WORDS,
];

/// Errors from loading or using a corpus.
#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("Paragraph table not found: {}", path.display())]
    MissingTable { path: PathBuf },

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Malformed value {value:?} in column '{column}' at row {row}")]
    MalformedStoredValue {
        row: usize,
        column: String,
        value: String,
    },

    #[error("No annotation available for document {document_id}")]
    AnnotationNotFound { document_id: String },

    #[error("Paragraph {paragraph_id} not found in annotation of document {document_id}")]
    ParagraphNotFound {
        document_id: String,
        paragraph_id: String,
    },

    #[error("Column '{column}' needs {expected} values, got {actual}")]
    ColumnLengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },

    #[error("Column '{column}' is part of the paragraph table and cannot be replaced")]
    ProtectedColumn { column: String },

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("Failed to decode annotation: {0}")]
    Annotation(#[from] AnnotationError),
}

/// The paragraph table grouped into speeches.
///
/// Speeches appear in the order their document ids are first seen in the
/// table, which is the order the preprocessing run wrote them.
#[derive(Debug)]
pub struct Corpus {
    path: PathBuf,
    table: Table,
    vocab: Vocab,
    engine: Option<String>,
    speeches: Vec<Speech>,
    by_id: HashMap<String, usize>,
    orphaned: Vec<String>,
}

impl Corpus {
    /// Load a paragraph table, with annotations from the sibling blob if present.
    pub fn load(table_path: &Path) -> Result<Self, CorpusError> {
        let blob_path = table_path.with_file_name(DEFAULT_ANNOTATIONS_FILE);
        Self::load_with_annotations(table_path, &blob_path)
    }

    /// Load a paragraph table and an explicit annotation blob.
    ///
    /// A missing blob is not an error; the corpus loads without annotations
    /// and every annotation request fails with [`CorpusError::AnnotationNotFound`].
    pub fn load_with_annotations(table_path: &Path, blob_path: &Path) -> Result<Self, CorpusError> {
        let table = read_table(table_path).map_err(|e| match e {
            StorageError::NotFound(path) => CorpusError::MissingTable { path },
            other => CorpusError::Storage(other),
        })?;
        let annotations = load_annotations(blob_path)?;
        Self::from_table(table_path.to_path_buf(), table, annotations)
    }

    fn from_table(
        path: PathBuf,
        table: Table,
        annotations: Option<LoadedAnnotations>,
    ) -> Result<Self, CorpusError> {
        let layout = ParagraphColumns::resolve(&path, &table)?;

        let mut groups: Vec<(String, Vec<Paragraph>)> = Vec::new();
        let mut by_id: HashMap<String, usize> = HashMap::new();
        for (row, cells) in table.rows().iter().enumerate() {
            let record = layout
                .parse(cells)
                .map_err(|e| CorpusError::MalformedStoredValue {
                    row,
                    column: e.column,
                    value: e.value,
                })?;

            let speech = match by_id.get(&record.document_id) {
                Some(&idx) => idx,
                None => {
                    let idx = groups.len();
                    by_id.insert(record.document_id.clone(), idx);
                    groups.push((record.document_id.clone(), Vec::new()));
                    idx
                }
            };
            groups[speech].1.push(Paragraph::new(record, row, speech));
        }

        let (vocab, engine, speeches, orphaned) = match annotations {
            Some(mut loaded) => {
                let engine = loaded.engine().to_string();
                let speeches: Vec<Speech> = groups
                    .into_iter()
                    .map(|(id, paragraphs)| {
                        let bytes = loaded.take(&id);
                        Speech::new(id, paragraphs, bytes)
                    })
                    .collect();
                let orphaned = loaded.remaining_ids();
                let (vocab, _) = loaded.into_parts();
                (vocab, Some(engine), speeches, orphaned)
            }
            None => {
                let speeches = groups
                    .into_iter()
                    .map(|(id, paragraphs)| Speech::new(id, paragraphs, None))
                    .collect();
                (Vocab::new(), None, speeches, Vec::new())
            }
        };

        if !orphaned.is_empty() {
            tracing::warn!(
                "{} annotations in the blob match no document in {}",
                orphaned.len(),
                path.display()
            );
        }
        tracing::debug!(
            "Loaded {} speeches ({} paragraphs) from {}",
            speeches.len(),
            table.len(),
            path.display()
        );

        Ok(Self {
            path,
            table,
            vocab,
            engine,
            speeches,
            by_id,
            orphaned,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    /// Vocabulary restored from the blob; empty without one.
    pub fn vocab(&self) -> &Vocab {
        &self.vocab
    }

    /// Engine recorded in the blob, if a blob was loaded.
    pub fn engine(&self) -> Option<&str> {
        self.engine.as_deref()
    }

    pub fn has_annotations(&self) -> bool {
        self.engine.is_some()
    }

    pub fn speeches(&self) -> &[Speech] {
        &self.speeches
    }

    pub fn speech(&self, document_id: &str) -> Option<&Speech> {
        self.by_id.get(document_id).map(|&idx| &self.speeches[idx])
    }

    /// Every paragraph, speech by speech.
    pub fn paragraphs(&self) -> impl Iterator<Item = &Paragraph> {
        self.speeches.iter().flat_map(|s| s.paragraphs().iter())
    }

    pub fn paragraph_count(&self) -> usize {
        self.table.len()
    }

    /// The speech a paragraph belongs to.
    pub fn speech_of(&self, paragraph: &Paragraph) -> &Speech {
        &self.speeches[paragraph.speech_index()]
    }

    /// Blob entries left over after every speech took its bytes, sorted.
    pub fn orphaned_annotations(&self) -> &[String] {
        &self.orphaned
    }

    /// A speech's annotation, decoded on first use.
    pub fn annotation<'a>(&'a self, speech: &'a Speech) -> Result<&'a AnnotatedDocument, CorpusError> {
        speech.annotation(&self.vocab)
    }

    /// A paragraph's span within its speech's annotation.
    pub fn paragraph_annotation<'a>(
        &'a self,
        paragraph: &Paragraph,
    ) -> Result<ParagraphAnnotation<'a>, CorpusError> {
        paragraph.annotation(self.speech_of(paragraph), &self.vocab)
    }

    /// Any table cell for a paragraph, including appended columns.
    pub fn value(&self, paragraph: &Paragraph, column: &str) -> Option<&str> {
        self.table.get(paragraph.row(), column)
    }

    /// Add (or replace) a column aligned by row and rewrite the table file.
    pub fn append_column(&mut self, name: &str, values: Vec<String>) -> Result<(), CorpusError> {
        if PROTECTED_COLUMNS.contains(&name) {
            return Err(CorpusError::ProtectedColumn {
                column: name.to_string(),
            });
        }
        if values.len() != self.table.len() {
            return Err(CorpusError::ColumnLengthMismatch {
                column: name.to_string(),
                expected: self.table.len(),
                actual: values.len(),
            });
        }

        // The in-memory table only changes once the file does.
        let replaced = self.table.column_index(name).is_some();
        let mut table = self.table.clone();
        table.set_column(name, values);
        write_table(&self.path, &table)?;
        self.table = table;

        tracing::info!(
            "{} column '{}' in {}",
            if replaced { "Replaced" } else { "Appended" },
            name,
            self.path.display()
        );
        Ok(())
    }

    /// Decode every speech's annotation now. Stops at the first failure.
    pub fn preload_annotations(&self) -> Result<usize, CorpusError> {
        self.preload_annotations_with_progress(|_| {})
    }

    /// Like [`Corpus::preload_annotations`], reporting each decoded speech.
    pub fn preload_annotations_with_progress<F>(&self, mut on_loaded: F) -> Result<usize, CorpusError>
    where
        F: FnMut(&Speech),
    {
        for speech in &self.speeches {
            speech.annotation(&self.vocab)?;
            on_loaded(speech);
        }
        Ok(self.speeches.len())
    }

    /// Check paragraph ordering, id uniqueness and blob coverage.
    pub fn validate(&self) -> ValidationReport {
        validate::validate(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::{AnnotationEngine, RegexEngine};
    use crate::cache::AnnotationBlob;
    use crate::models::{ParagraphRecord, SpeechRecord};
    use tempfile::tempdir;

    const SPEECHES: &[(i32, &str, &str)] = &[
        (1970, "ALB", "Peace first.\nThen development."),
        (1970, "FRA", "Liberty.\n\nEquality.\n\nFraternity."),
    ];

    /// Write a paragraph table and blob the same way the pipeline lays them out.
    fn write_fixture(dir: &Path, with_blob: bool) -> PathBuf {
        let mut engine = RegexEngine::new();
        let mut table = Table::new(ParagraphRecord::table_headers(&[]));
        let mut docs = Vec::new();

        for (year, country, text) in SPEECHES {
            let doc = engine.annotate(text).unwrap();
            let speech = SpeechRecord {
                document_id: doc.id(),
                session: year - 1945,
                year: *year,
                country: Some(country.to_string()),
                country_name: None,
                text: text.to_string(),
                extra: Vec::new(),
            };
            for (idx, span) in doc.paragraphs().iter().enumerate() {
                let record = ParagraphRecord::from_speech(
                    &speech,
                    idx,
                    span.id.clone(),
                    span.text(&doc).to_string(),
                    doc.bag_of_words(span),
                );
                table.push_row(record.to_row(&[]));
            }
            docs.push(doc);
        }

        let table_path = dir.join("debates_paragraphs.csv");
        write_table(&table_path, &table).unwrap();

        if with_blob {
            let mut blob = AnnotationBlob::new(engine.engine_id(), engine.vocab()).unwrap();
            for doc in &docs {
                blob.docs.insert(doc.id(), doc.to_bytes().unwrap());
            }
            blob.docs.insert("stale".to_string(), Vec::new());
            blob.write(&dir.join(DEFAULT_ANNOTATIONS_FILE)).unwrap();
        }
        table_path
    }

    #[test]
    fn test_groups_rows_into_speeches() {
        let dir = tempdir().unwrap();
        let corpus = Corpus::load(&write_fixture(dir.path(), true)).unwrap();

        assert_eq!(corpus.speeches().len(), 2);
        assert_eq!(corpus.paragraph_count(), 5);
        assert_eq!(corpus.speeches()[0].country_code(), Some("ALB"));
        assert_eq!(corpus.speeches()[1].paragraphs().len(), 3);

        let rows: Vec<usize> = corpus.paragraphs().map(Paragraph::row).collect();
        assert_eq!(rows, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_paragraph_annotation_matches_row() {
        let dir = tempdir().unwrap();
        let corpus = Corpus::load(&write_fixture(dir.path(), true)).unwrap();

        for paragraph in corpus.paragraphs() {
            let annotation = corpus.paragraph_annotation(paragraph).unwrap();
            assert_eq!(annotation.text(), paragraph.text());
            assert_eq!(&annotation.bag_of_words(), paragraph.bag_of_words());
        }
    }

    #[test]
    fn test_leftover_blob_entries_are_orphaned() {
        let dir = tempdir().unwrap();
        let corpus = Corpus::load(&write_fixture(dir.path(), true)).unwrap();

        assert_eq!(corpus.orphaned_annotations(), ["stale".to_string()]);
        let report = corpus.validate();
        assert!(!report.is_clean());
        assert!(report.index_gaps.is_empty());
        assert!(report.duplicate_paragraph_ids.is_empty());
    }

    #[test]
    fn test_load_without_blob() {
        let dir = tempdir().unwrap();
        let corpus = Corpus::load(&write_fixture(dir.path(), false)).unwrap();

        assert!(!corpus.has_annotations());
        let speech = &corpus.speeches()[0];
        assert_eq!(speech.year(), Some(1970));
        assert_eq!(speech.paragraphs()[0].text(), "Peace first.");
        assert!(matches!(
            corpus.annotation(speech),
            Err(CorpusError::AnnotationNotFound { .. })
        ));
        assert!(corpus.preload_annotations().is_err());
        assert!(corpus.validate().is_clean());
    }

    #[test]
    fn test_missing_table() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            Corpus::load(&dir.path().join("nope.csv")),
            Err(CorpusError::MissingTable { .. })
        ));
    }

    #[test]
    fn test_malformed_bag_of_words_fails_load() {
        let dir = tempdir().unwrap();
        let path = write_fixture(dir.path(), false);
        let mut table = read_table(&path).unwrap();
        let values: Vec<String> = (0..table.len()).map(|_| "{broken".to_string()).collect();
        table.set_column(columns::BAG_OF_WORDS, values);
        write_table(&path, &table).unwrap();

        match Corpus::load(&path) {
            Err(CorpusError::MalformedStoredValue { row, column, .. }) => {
                assert_eq!(row, 0);
                assert_eq!(column, columns::BAG_OF_WORDS);
            }
            other => panic!("expected MalformedStoredValue, got {:?}", other.map(|c| c.paragraph_count())),
        }
    }

    #[test]
    fn test_append_column_checks_length_and_protects_core_columns() {
        let dir = tempdir().unwrap();
        let mut corpus = Corpus::load(&write_fixture(dir.path(), false)).unwrap();

        assert!(matches!(
            corpus.append_column("topic", vec!["a".to_string()]),
            Err(CorpusError::ColumnLengthMismatch { expected: 5, actual: 1, .. })
        ));
        assert!(matches!(
            corpus.append_column(columns::TEXT, vec![String::new(); 5]),
            Err(CorpusError::ProtectedColumn { .. })
        ));

        let values: Vec<String> = (0..5).map(|i| format!("t{}", i)).collect();
        corpus.append_column("topic", values).unwrap();

        let reloaded = Corpus::load(corpus.path()).unwrap();
        let last = reloaded.paragraphs().last().unwrap();
        assert_eq!(reloaded.value(last, "topic"), Some("t4"));
    }

    #[test]
    fn test_failed_append_leaves_table_unchanged() {
        let dir = tempdir().unwrap();
        let corpus_dir = dir.path().join("corpus");
        let mut corpus = Corpus::load(&write_fixture(&corpus_dir, false)).unwrap();

        // A file where the table's directory was makes the rewrite fail.
        std::fs::remove_dir_all(&corpus_dir).unwrap();
        std::fs::write(&corpus_dir, b"").unwrap();

        let values: Vec<String> = (0..5).map(|i| format!("t{}", i)).collect();
        assert!(matches!(
            corpus.append_column("topic", values),
            Err(CorpusError::Storage(_))
        ));
        assert!(corpus.table().column_index("topic").is_none());
        let first = corpus.paragraphs().next().unwrap();
        assert_eq!(corpus.value(first, "topic"), None);
    }
}
