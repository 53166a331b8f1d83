//! Run summary written next to the processed tables.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::write_atomic;

use super::PipelineError;

/// An identifier seen more than once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateId {
    pub id: String,
    pub count: usize,
}

impl From<(String, usize)> for DuplicateId {
    fn from((id, count): (String, usize)) -> Self {
        Self { id, count }
    }
}

/// Outcome of one preprocessing run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreprocessReport {
    pub created_at: DateTime<Utc>,
    pub engine: String,
    /// BLAKE3 of the raw corpus file.
    pub raw_corpus_blake3: String,
    /// BLAKE3 of the country reference file.
    pub reference_blake3: String,
    pub speeches: usize,
    pub paragraphs: usize,
    pub annotated: usize,
    /// Documents the engine failed on; they have no paragraph rows.
    pub failed_documents: Vec<String>,
    /// Documents with no paragraphs; kept in the speech table only.
    #[serde(default)]
    pub empty_documents: Vec<String>,
    /// Raw country values with no reference match.
    pub unmatched_countries: Vec<String>,
    pub duplicate_document_ids: Vec<DuplicateId>,
    pub duplicate_paragraph_ids: Vec<DuplicateId>,
}

impl PreprocessReport {
    /// Whether any identifier collision was detected.
    pub fn has_duplicates(&self) -> bool {
        !self.duplicate_document_ids.is_empty() || !self.duplicate_paragraph_ids.is_empty()
    }

    /// Write as pretty JSON.
    pub fn write(&self, path: &Path) -> Result<(), PipelineError> {
        let json = serde_json::to_vec_pretty(self)
            .map_err(|e| PipelineError::Manifest(e.to_string()))?;
        write_atomic(path, &json)?;
        Ok(())
    }
}

/// BLAKE3 checksum of a file, hex-encoded.
pub fn file_checksum(path: &Path) -> Result<String, PipelineError> {
    let content = std::fs::read(path).map_err(|source| PipelineError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(hex::encode(blake3::hash(&content).as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_file_checksum_is_stable() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("input.csv");
        std::fs::write(&path, b"country,year\n").unwrap();

        let first = file_checksum(&path).unwrap();
        assert_eq!(first.len(), 64);
        assert_eq!(first, file_checksum(&path).unwrap());
    }

    #[test]
    fn test_report_writes_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("manifest.json");
        let report = PreprocessReport {
            created_at: Utc::now(),
            engine: "regex".to_string(),
            raw_corpus_blake3: String::new(),
            reference_blake3: String::new(),
            speeches: 2,
            paragraphs: 5,
            annotated: 2,
            failed_documents: Vec::new(),
            empty_documents: Vec::new(),
            unmatched_countries: vec!["Atlantis".to_string()],
            duplicate_document_ids: Vec::new(),
            duplicate_paragraph_ids: vec![("abc".to_string(), 2).into()],
        };
        report.write(&path).unwrap();

        let loaded: PreprocessReport =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(loaded.paragraphs, 5);
        assert!(loaded.has_duplicates());
    }
}
