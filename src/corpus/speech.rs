//! Speeches and paragraphs with lazily decoded annotations.

use std::cell::OnceCell;

use crate::annotation::{AnnotatedDocument, AnnotatedSpan, BagOfWords, Vocab};
use crate::models::ParagraphRecord;

use super::CorpusError;

/// One row of the paragraph table.
///
/// Refers back to its speech by position in the corpus, never by ownership.
#[derive(Debug, Clone)]
pub struct Paragraph {
    record: ParagraphRecord,
    row: usize,
    speech: usize,
}

impl Paragraph {
    pub(crate) fn new(record: ParagraphRecord, row: usize, speech: usize) -> Self {
        Self {
            record,
            row,
            speech,
        }
    }

    pub fn id(&self) -> &str {
        &self.record.paragraph_id
    }

    pub fn document_id(&self) -> &str {
        &self.record.document_id
    }

    /// 0-based position within the speech.
    pub fn index(&self) -> usize {
        self.record.paragraph_index
    }

    pub fn text(&self) -> &str {
        &self.record.text
    }

    pub fn bag_of_words(&self) -> &BagOfWords {
        &self.record.bag_of_words
    }

    pub fn session(&self) -> i32 {
        self.record.session
    }

    pub fn year(&self) -> i32 {
        self.record.year
    }

    pub fn country_code(&self) -> Option<&str> {
        self.record.country.as_deref()
    }

    pub fn country(&self) -> Option<&str> {
        self.record.country_name.as_deref()
    }

    /// Row in the backing table.
    pub fn row(&self) -> usize {
        self.row
    }

    /// Position of the owning speech in [`Corpus::speeches`](super::Corpus::speeches).
    pub fn speech_index(&self) -> usize {
        self.speech
    }

    pub fn record(&self) -> &ParagraphRecord {
        &self.record
    }

    /// Resolve this paragraph inside its speech's annotation.
    ///
    /// The speech is segmented the same way the preprocessing run segmented
    /// it. The span at this paragraph's index is used when its id matches, so
    /// a paragraph repeated within one speech resolves to its own copy;
    /// otherwise the first span with a matching id is returned.
    pub fn annotation<'s>(
        &self,
        speech: &'s Speech,
        vocab: &Vocab,
    ) -> Result<ParagraphAnnotation<'s>, CorpusError> {
        let doc = speech.annotation(vocab)?;
        let mut spans = doc.paragraphs();
        let id = &self.record.paragraph_id;

        let position = match spans.get(self.record.paragraph_index) {
            Some(span) if &span.id == id => Some(self.record.paragraph_index),
            _ => spans.iter().position(|span| &span.id == id),
        };
        position
            .map(|idx| ParagraphAnnotation {
                doc,
                span: spans.swap_remove(idx),
            })
            .ok_or_else(|| CorpusError::ParagraphNotFound {
                document_id: self.record.document_id.clone(),
                paragraph_id: self.record.paragraph_id.clone(),
            })
    }
}

/// A paragraph span borrowed from its speech's decoded annotation.
#[derive(Debug, Clone)]
pub struct ParagraphAnnotation<'a> {
    doc: &'a AnnotatedDocument,
    span: AnnotatedSpan,
}

impl<'a> ParagraphAnnotation<'a> {
    pub fn document(&self) -> &'a AnnotatedDocument {
        self.doc
    }

    pub fn span(&self) -> &AnnotatedSpan {
        &self.span
    }

    pub fn text(&self) -> &'a str {
        self.span.text(self.doc)
    }

    pub fn token_count(&self) -> usize {
        self.span.tokens.len()
    }

    pub fn bag_of_words(&self) -> BagOfWords {
        self.doc.bag_of_words(&self.span)
    }
}

/// A speech: the contiguous group of paragraphs sharing a document id.
///
/// The annotation is decoded on first request and kept for the speech's
/// lifetime. A speech without annotation bytes fails every request with
/// [`CorpusError::AnnotationNotFound`].
#[derive(Debug)]
pub struct Speech {
    id: String,
    paragraphs: Vec<Paragraph>,
    annotation_bytes: Option<Vec<u8>>,
    annotation: OnceCell<AnnotatedDocument>,
}

impl Speech {
    pub(crate) fn new(id: String, paragraphs: Vec<Paragraph>, annotation_bytes: Option<Vec<u8>>) -> Self {
        Self {
            id,
            paragraphs,
            annotation_bytes,
            annotation: OnceCell::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn paragraphs(&self) -> &[Paragraph] {
        &self.paragraphs
    }

    pub fn session(&self) -> Option<i32> {
        self.paragraphs.first().map(Paragraph::session)
    }

    pub fn year(&self) -> Option<i32> {
        self.paragraphs.first().map(Paragraph::year)
    }

    pub fn country_code(&self) -> Option<&str> {
        self.paragraphs.first().and_then(Paragraph::country_code)
    }

    pub fn country(&self) -> Option<&str> {
        self.paragraphs.first().and_then(Paragraph::country)
    }

    /// Whether an annotation can be produced without error from missing bytes.
    pub fn has_annotation(&self) -> bool {
        self.annotation.get().is_some() || self.annotation_bytes.is_some()
    }

    /// Whether the annotation has already been decoded.
    pub fn is_annotation_loaded(&self) -> bool {
        self.annotation.get().is_some()
    }

    /// Decode (once) and return the speech's annotation.
    pub fn annotation(&self, vocab: &Vocab) -> Result<&AnnotatedDocument, CorpusError> {
        if let Some(doc) = self.annotation.get() {
            return Ok(doc);
        }

        let bytes = self
            .annotation_bytes
            .as_deref()
            .ok_or_else(|| CorpusError::AnnotationNotFound {
                document_id: self.id.clone(),
            })?;
        let doc = AnnotatedDocument::from_bytes(bytes, vocab)?;
        Ok(self.annotation.get_or_init(|| doc))
    }
}
