//! The preprocessing run.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::annotation::{AnnotatedDocument, AnnotationEngine};
use crate::cache::AnnotationBlob;
use crate::config::DEFAULT_BATCH_SIZE;
use crate::models::{columns, non_empty, parse_int, ParagraphRecord, SpeechRecord};
use crate::storage::{read_table, write_table, Table};
use crate::utils::{find_duplicate_ids, generate_document_id, normalize_text};

use super::reference::{CountryReference, ReferenceColumns};
use super::report::{file_checksum, PreprocessReport};
use super::PipelineError;

/// Raw columns that would collide with derived output columns.
const RESERVED_COLUMNS: &[&str] = &[
    columns::DOCUMENT_ID,
    columns::COUNTRY_NAME,
    columns::PARAGRAPH_INDEX,
    columns::PARAGRAPH_ID,
    columns::BAG_OF_WORDS,
];

/// Input and output locations for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelinePaths {
    pub raw_corpus: PathBuf,
    pub reference_table: PathBuf,
    pub speeches: PathBuf,
    pub paragraphs: PathBuf,
    pub annotations: PathBuf,
    pub manifest: PathBuf,
}

impl PipelinePaths {
    /// Default file names under an external (inputs) and processed (outputs) directory.
    pub fn new(external_dir: &Path, processed_dir: &Path) -> Self {
        Self {
            raw_corpus: external_dir.join("un-general-debates.csv"),
            reference_table: external_dir.join("wikipedia-iso-country-codes.csv"),
            speeches: processed_dir.join("debates.csv"),
            paragraphs: processed_dir.join("debates_paragraphs.csv"),
            annotations: processed_dir.join("annotations.msgpack"),
            manifest: processed_dir.join("manifest.json"),
        }
    }
}

/// Progress notifications emitted during a run.
#[derive(Debug, Clone)]
pub enum PreprocessEvent {
    /// Raw speeches parsed and sorted.
    Loaded {
        speeches: usize,
        unmatched_countries: usize,
    },
    /// Annotation is starting.
    AnnotationStarted { total: usize },
    /// One document annotated.
    DocumentAnnotated { document_id: String },
    /// One document failed; the run continues.
    DocumentFailed { document_id: String, error: String },
    /// Writing outputs.
    Writing,
}

/// Runs the preprocessing pipeline with an annotation engine.
pub struct Preprocessor<E> {
    engine: E,
    paths: PipelinePaths,
    reference_columns: ReferenceColumns,
    batch_size: usize,
}

impl<E: AnnotationEngine> Preprocessor<E> {
    pub fn new(engine: E, paths: PipelinePaths) -> Self {
        Self {
            engine,
            paths,
            reference_columns: ReferenceColumns::default(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Documents handed to the engine per `annotate_batch` call.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Use non-default column names for the country reference table.
    pub fn with_reference_columns(mut self, columns: ReferenceColumns) -> Self {
        self.reference_columns = columns;
        self
    }

    pub fn paths(&self) -> &PipelinePaths {
        &self.paths
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Run without progress reporting.
    pub fn run(&mut self) -> Result<PreprocessReport, PipelineError> {
        self.run_with_progress(|_| {})
    }

    /// Run the full pipeline, reporting progress through `on_event`.
    ///
    /// Inputs are validated before anything is written. Outputs are written
    /// only once every stage has succeeded, each one atomically.
    pub fn run_with_progress<F>(&mut self, mut on_event: F) -> Result<PreprocessReport, PipelineError>
    where
        F: FnMut(PreprocessEvent),
    {
        for path in [&self.paths.raw_corpus, &self.paths.reference_table] {
            if !path.exists() {
                return Err(PipelineError::MissingInputFile { path: path.clone() });
            }
        }

        let reference =
            CountryReference::load(&self.paths.reference_table, &self.reference_columns)?;
        let raw = read_table(&self.paths.raw_corpus)?;
        let parsed = parse_speeches(&self.paths.raw_corpus, &raw, &reference)?;
        let ParsedSpeeches {
            mut speeches,
            extra_columns,
            unmatched_countries,
        } = parsed;
        speeches.sort_by(|a, b| a.sort_cmp(b));

        tracing::info!(
            "Loaded {} speeches from {}",
            speeches.len(),
            self.paths.raw_corpus.display()
        );
        if !unmatched_countries.is_empty() {
            tracing::warn!(
                "{} country values have no reference match: {}",
                unmatched_countries.len(),
                unmatched_countries
                    .iter()
                    .cloned()
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
        on_event(PreprocessEvent::Loaded {
            speeches: speeches.len(),
            unmatched_countries: unmatched_countries.len(),
        });

        let duplicate_documents =
            find_duplicate_ids(speeches.iter().map(|s| s.document_id.as_str()));
        for (id, count) in &duplicate_documents {
            tracing::warn!("Document id {} occurs {} times (identical speech text)", id, count);
        }

        let (mut docs, failed) = self.annotate(&speeches, &mut on_event);
        let empty_documents = drop_empty_documents(&mut docs);

        on_event(PreprocessEvent::Writing);

        let mut speech_table = Table::new(SpeechRecord::table_headers(&extra_columns));
        for speech in &speeches {
            speech_table.push_row(speech.to_row());
        }

        let mut blob = AnnotationBlob::new(self.engine.engine_id(), self.engine.vocab())?;
        for (id, doc) in &docs {
            blob.docs.insert(id.clone(), doc.to_bytes()?);
        }

        let (paragraph_table, paragraph_ids) = build_paragraphs(&speeches, &extra_columns, &docs);
        let duplicate_paragraphs = find_duplicate_ids(paragraph_ids.iter().map(String::as_str));
        if !duplicate_paragraphs.is_empty() {
            tracing::warn!(
                "Paragraph ids aren't unique: {} ids occur more than once",
                duplicate_paragraphs.len()
            );
        }

        write_table(&self.paths.speeches, &speech_table)?;
        blob.write(&self.paths.annotations)?;
        write_table(&self.paths.paragraphs, &paragraph_table)?;

        let report = PreprocessReport {
            created_at: Utc::now(),
            engine: self.engine.engine_id().to_string(),
            raw_corpus_blake3: file_checksum(&self.paths.raw_corpus)?,
            reference_blake3: file_checksum(&self.paths.reference_table)?,
            speeches: speeches.len(),
            paragraphs: paragraph_table.len(),
            annotated: docs.len(),
            failed_documents: failed,
            empty_documents,
            unmatched_countries: unmatched_countries.into_iter().collect(),
            duplicate_document_ids: duplicate_documents.into_iter().map(Into::into).collect(),
            duplicate_paragraph_ids: duplicate_paragraphs.into_iter().map(Into::into).collect(),
        };
        report.write(&self.paths.manifest)?;

        tracing::info!(
            "Wrote {} speeches, {} paragraphs, {} annotations ({} failed)",
            report.speeches,
            report.paragraphs,
            report.annotated,
            report.failed_documents.len()
        );

        Ok(report)
    }

    /// Annotate every speech, matching results back by id rather than position.
    ///
    /// Returns the annotated documents by id and the sorted ids of failures.
    fn annotate<F>(
        &mut self,
        speeches: &[SpeechRecord],
        on_event: &mut F,
    ) -> (HashMap<String, AnnotatedDocument>, Vec<String>)
    where
        F: FnMut(PreprocessEvent),
    {
        let expected: HashSet<&str> = speeches.iter().map(|s| s.document_id.as_str()).collect();
        let texts: Vec<String> = speeches.iter().map(|s| s.text.clone()).collect();

        on_event(PreprocessEvent::AnnotationStarted { total: texts.len() });

        let mut docs = HashMap::new();
        let mut failed = Vec::new();
        for (batch, chunk) in texts.chunks(self.batch_size).enumerate() {
            tracing::debug!("Annotating batch {} ({} documents)", batch + 1, chunk.len());
            for item in self.engine.annotate_batch(chunk) {
                match item {
                    Ok(doc) => {
                        let id = doc.id();
                        if !expected.contains(id.as_str()) {
                            tracing::warn!(
                                "Engine returned a document matching no input ({}), skipping",
                                id
                            );
                            continue;
                        }
                        on_event(PreprocessEvent::DocumentAnnotated {
                            document_id: id.clone(),
                        });
                        docs.insert(id, doc);
                    }
                    Err(failure) => {
                        let id = generate_document_id(&failure.text);
                        tracing::warn!("Failed to annotate document {}: {}", id, failure.error);
                        on_event(PreprocessEvent::DocumentFailed {
                            document_id: id.clone(),
                            error: failure.error.to_string(),
                        });
                        failed.push(id);
                    }
                }
            }
        }

        failed.sort();
        failed.dedup();

        // Engines that drop a document without reporting it.
        let missing: Vec<String> = expected
            .iter()
            .filter(|id| {
                !docs.contains_key(**id) && failed.binary_search_by(|f| f.as_str().cmp(**id)).is_err()
            })
            .map(|id| id.to_string())
            .collect();
        for id in missing {
            tracing::warn!("Engine returned no result for document {}", id);
            on_event(PreprocessEvent::DocumentFailed {
                document_id: id.clone(),
                error: "engine returned no result".to_string(),
            });
            failed.push(id);
        }
        failed.sort();

        (docs, failed)
    }
}

/// Remove documents that segment into no paragraphs, returning their sorted ids.
///
/// Such documents would have a blob entry but no paragraph rows.
fn drop_empty_documents(docs: &mut HashMap<String, AnnotatedDocument>) -> Vec<String> {
    let mut empty: Vec<String> = docs
        .iter()
        .filter(|(_, doc)| doc.paragraphs().is_empty())
        .map(|(id, _)| id.clone())
        .collect();
    empty.sort();

    for id in &empty {
        docs.remove(id);
        tracing::warn!(
            "Document {} has no paragraphs, leaving it out of the annotation blob",
            id
        );
    }
    empty
}

struct ParsedSpeeches {
    speeches: Vec<SpeechRecord>,
    extra_columns: Vec<String>,
    unmatched_countries: BTreeSet<String>,
}

/// Turn raw rows into speech records: resolve countries, normalize text, assign ids.
fn parse_speeches(
    path: &Path,
    raw: &Table,
    reference: &CountryReference,
) -> Result<ParsedSpeeches, PipelineError> {
    let country_col = raw.require_column(path, columns::COUNTRY)?;
    let year_col = raw.require_column(path, columns::YEAR)?;
    let session_col = raw.require_column(path, columns::SESSION)?;
    let text_col = raw.require_column(path, columns::TEXT)?;
    let known = [country_col, year_col, session_col, text_col];

    let extra: Vec<(usize, String)> = raw
        .headers()
        .iter()
        .enumerate()
        .filter(|(idx, name)| !known.contains(idx) && !RESERVED_COLUMNS.contains(&name.as_str()))
        .map(|(idx, name)| (idx, name.clone()))
        .collect();

    let mut speeches = Vec::with_capacity(raw.len());
    let mut unmatched_countries = BTreeSet::new();

    for (row_idx, row) in raw.rows().iter().enumerate() {
        // Record number as a reader would count it, header included.
        let line = row_idx + 2;
        let malformed = |e: crate::models::FieldError| PipelineError::MalformedInput {
            path: path.to_path_buf(),
            line,
            column: e.column,
            value: e.value,
        };

        let year = parse_int(columns::YEAR, &row[year_col]).map_err(malformed)?;
        let session = parse_int(columns::SESSION, &row[session_col]).map_err(malformed)?;

        let raw_country = row[country_col].trim();
        let (country, country_name) = match reference.resolve(raw_country) {
            Some(resolved) => (Some(resolved.code.clone()), Some(resolved.name.clone())),
            None => {
                if !raw_country.is_empty() {
                    unmatched_countries.insert(raw_country.to_string());
                }
                (None, non_empty(raw_country))
            }
        };

        let text = normalize_text(&row[text_col]);
        speeches.push(SpeechRecord {
            document_id: generate_document_id(&text),
            session,
            year,
            country,
            country_name,
            text,
            extra: extra
                .iter()
                .map(|(idx, name)| (name.clone(), row[*idx].clone()))
                .collect(),
        });
    }

    Ok(ParsedSpeeches {
        speeches,
        extra_columns: extra.into_iter().map(|(_, name)| name).collect(),
        unmatched_countries,
    })
}

/// Paragraph rows for every annotated speech, in speech order.
///
/// Speeches without an annotation contribute no rows.
fn build_paragraphs(
    speeches: &[SpeechRecord],
    extra_columns: &[String],
    docs: &HashMap<String, AnnotatedDocument>,
) -> (Table, Vec<String>) {
    let mut table = Table::new(ParagraphRecord::table_headers(extra_columns));
    let mut ids = Vec::new();

    for speech in speeches {
        let Some(doc) = docs.get(&speech.document_id) else {
            continue;
        };
        for (idx, span) in doc.paragraphs().iter().enumerate() {
            let record = ParagraphRecord::from_speech(
                speech,
                idx,
                span.id.clone(),
                span.text(doc).to_string(),
                doc.bag_of_words(span),
            );
            ids.push(record.paragraph_id.clone());
            table.push_row(record.to_row(&speech.extra));
        }
    }

    (table, ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::RegexEngine;
    use tempfile::tempdir;

    fn write(path: &Path, content: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn setup(raw: &str) -> (tempfile::TempDir, PipelinePaths) {
        let dir = tempdir().unwrap();
        let paths = PipelinePaths::new(&dir.path().join("external"), &dir.path().join("processed"));
        write(&paths.raw_corpus, raw);
        write(
            &paths.reference_table,
            "English short name lower case,Alpha-3 code\nAlbania,ALB\nFrance,FRA\n",
        );
        (dir, paths)
    }

    #[test]
    fn test_missing_input_writes_nothing() {
        let dir = tempdir().unwrap();
        let paths = PipelinePaths::new(&dir.path().join("external"), &dir.path().join("processed"));
        write(&paths.raw_corpus, "session,year,country,text\n");

        let mut pipeline = Preprocessor::new(RegexEngine::new(), paths.clone());
        let err = pipeline.run().unwrap_err();
        assert!(matches!(
            err,
            PipelineError::MissingInputFile { ref path } if path == &paths.reference_table
        ));
        assert!(!paths.speeches.exists());
        assert!(!paths.annotations.exists());
    }

    #[test]
    fn test_malformed_year_reports_location() {
        let (_dir, paths) = setup("session,year,country,text\n25,nineteen,ALB,Hello.\n");
        let mut pipeline = Preprocessor::new(RegexEngine::new(), paths.clone());
        match pipeline.run() {
            Err(PipelineError::MalformedInput { line, column, .. }) => {
                assert_eq!(line, 2);
                assert_eq!(column, "year");
            }
            other => panic!("expected MalformedInput, got {:?}", other.map(|r| r.speeches)),
        }
        assert!(!paths.speeches.exists());
    }

    #[test]
    fn test_countries_resolved_and_extras_kept() {
        let (_dir, paths) = setup(
            "session,year,country,speaker,text\n\
             25,1970,fra,Someone,Bonjour.\n\
             25,1970,Atlantis,Nobody,Hello.\n\
             25,1970,ALB,Other,Hi.\n",
        );
        let mut pipeline = Preprocessor::new(RegexEngine::new(), paths.clone());
        let report = pipeline.run().unwrap();
        assert_eq!(report.unmatched_countries, vec!["Atlantis".to_string()]);

        let table = read_table(&paths.speeches).unwrap();
        let countries: Vec<_> = (0..table.len())
            .map(|row| table.get(row, columns::COUNTRY).unwrap())
            .collect();
        assert_eq!(countries, vec!["ALB", "FRA", ""]);
        assert_eq!(table.get(1, columns::COUNTRY_NAME), Some("France"));
        assert_eq!(table.get(2, columns::COUNTRY_NAME), Some("Atlantis"));
        assert_eq!(table.get(0, "speaker"), Some("Other"));
    }

    #[test]
    fn test_progress_events_cover_every_document() {
        let (_dir, paths) = setup(
            "session,year,country,text\n25,1970,ALB,One.\n25,1970,FRA,Two.\n",
        );
        let mut annotated = 0;
        let mut total = 0;
        let mut pipeline = Preprocessor::new(RegexEngine::new(), paths);
        pipeline
            .run_with_progress(|event| match event {
                PreprocessEvent::AnnotationStarted { total: t } => total = t,
                PreprocessEvent::DocumentAnnotated { .. } => annotated += 1,
                _ => {}
            })
            .unwrap();
        assert_eq!(total, 2);
        assert_eq!(annotated, 2);
    }
}
