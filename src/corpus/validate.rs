//! Consistency checks over a loaded corpus.

use serde::Serialize;

use crate::utils::find_duplicate_ids;

use super::Corpus;

/// A speech whose paragraph indices are not `0..n`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexGap {
    pub document_id: String,
    pub indices: Vec<usize>,
}

/// Result of [`Corpus::validate`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub speeches: usize,
    pub paragraphs: usize,
    pub speeches_without_annotation: usize,
    pub index_gaps: Vec<IndexGap>,
    /// Documents whose rows are not contiguous in the table.
    pub split_documents: Vec<String>,
    pub duplicate_paragraph_ids: Vec<(String, usize)>,
    /// Blob entries that matched no speech in the table.
    pub orphaned_annotations: Vec<String>,
}

impl ValidationReport {
    /// True when no violation was found. Missing annotations are not violations.
    pub fn is_clean(&self) -> bool {
        self.index_gaps.is_empty()
            && self.split_documents.is_empty()
            && self.duplicate_paragraph_ids.is_empty()
            && self.orphaned_annotations.is_empty()
    }
}

pub(super) fn validate(corpus: &Corpus) -> ValidationReport {
    let mut report = ValidationReport {
        speeches: corpus.speeches().len(),
        paragraphs: corpus.paragraph_count(),
        orphaned_annotations: corpus.orphaned_annotations().to_vec(),
        ..ValidationReport::default()
    };

    for speech in corpus.speeches() {
        if !speech.has_annotation() {
            report.speeches_without_annotation += 1;
        }

        let indices: Vec<usize> = speech.paragraphs().iter().map(|p| p.index()).collect();
        if indices.iter().enumerate().any(|(expected, &actual)| expected != actual) {
            report.index_gaps.push(IndexGap {
                document_id: speech.id().to_string(),
                indices,
            });
        }

        let rows: Vec<usize> = speech.paragraphs().iter().map(|p| p.row()).collect();
        if rows.windows(2).any(|pair| pair[1] != pair[0] + 1) {
            report.split_documents.push(speech.id().to_string());
        }
    }

    report.duplicate_paragraph_ids = find_duplicate_ids(corpus.paragraphs().map(|p| p.id()));

    for gap in &report.index_gaps {
        tracing::warn!(
            "Paragraph indices of {} are not contiguous: {:?}",
            gap.document_id,
            gap.indices
        );
    }
    for (id, count) in &report.duplicate_paragraph_ids {
        tracing::warn!("Paragraph id {} occurs {} times", id, count);
    }

    report
}
