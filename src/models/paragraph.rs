//! Paragraph-level rows: one per segmented paragraph.

use std::path::Path;

use crate::annotation::BagOfWords;
use crate::storage::{StorageError, Table};

use super::{columns, non_empty, parse_int, FieldError, SpeechRecord};

/// Serialize a bag-of-words cell as a JSON object with sorted keys.
pub fn encode_bag_of_words(bag: &BagOfWords) -> String {
    // BTreeMap<String, usize> always serializes.
    serde_json::to_string(bag).unwrap_or_else(|_| "{}".to_string())
}

/// Parse a bag-of-words cell written by [`encode_bag_of_words`].
pub fn parse_bag_of_words(value: &str) -> Result<BagOfWords, FieldError> {
    serde_json::from_str(value).map_err(|_| FieldError::new(columns::BAG_OF_WORDS, value))
}

/// A paragraph with denormalized speech metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParagraphRecord {
    /// Foreign key to the speech.
    pub document_id: String,
    /// 0-based position within the speech.
    pub paragraph_index: usize,
    /// Content hash of the paragraph text.
    pub paragraph_id: String,
    pub text: String,
    pub bag_of_words: BagOfWords,
    pub session: i32,
    pub year: i32,
    pub country: Option<String>,
    pub country_name: Option<String>,
}

impl ParagraphRecord {
    /// Build a paragraph row inheriting the speech's metadata.
    pub fn from_speech(
        speech: &SpeechRecord,
        paragraph_index: usize,
        paragraph_id: String,
        text: String,
        bag_of_words: BagOfWords,
    ) -> Self {
        Self {
            document_id: speech.document_id.clone(),
            paragraph_index,
            paragraph_id,
            text,
            bag_of_words,
            session: speech.session,
            year: speech.year,
            country: speech.country.clone(),
            country_name: speech.country_name.clone(),
        }
    }

    /// Header for the paragraph table, given the extra metadata column names.
    pub fn table_headers(extra: &[String]) -> Vec<String> {
        let mut headers: Vec<String> = [
            columns::DOCUMENT_ID,
            columns::PARAGRAPH_INDEX,
            columns::SESSION,
            columns::YEAR,
            columns::COUNTRY,
            columns::COUNTRY_NAME,
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        headers.extend(extra.iter().cloned());
        headers.extend(
            [columns::TEXT, columns::BAG_OF_WORDS, columns::PARAGRAPH_ID]
                .iter()
                .map(|s| s.to_string()),
        );
        headers
    }

    /// Cells matching [`ParagraphRecord::table_headers`]; `extra` comes from the speech.
    pub fn to_row(&self, extra: &[(String, String)]) -> Vec<String> {
        let mut row = vec![
            self.document_id.clone(),
            self.paragraph_index.to_string(),
            self.session.to_string(),
            self.year.to_string(),
            self.country.clone().unwrap_or_default(),
            self.country_name.clone().unwrap_or_default(),
        ];
        row.extend(extra.iter().map(|(_, v)| v.clone()));
        row.push(self.text.clone());
        row.push(encode_bag_of_words(&self.bag_of_words));
        row.push(self.paragraph_id.clone());
        row
    }
}

/// Resolved column positions for reading paragraph rows.
#[derive(Debug, Clone, Copy)]
pub struct ParagraphColumns {
    document_id: usize,
    paragraph_index: usize,
    paragraph_id: usize,
    text: usize,
    bag_of_words: usize,
    session: usize,
    year: usize,
    country: usize,
    country_name: Option<usize>,
}

impl ParagraphColumns {
    /// Resolve every required column; `country_name` is optional.
    pub fn resolve(path: &Path, table: &Table) -> Result<Self, StorageError> {
        Ok(Self {
            document_id: table.require_column(path, columns::DOCUMENT_ID)?,
            paragraph_index: table.require_column(path, columns::PARAGRAPH_INDEX)?,
            paragraph_id: table.require_column(path, columns::PARAGRAPH_ID)?,
            text: table.require_column(path, columns::TEXT)?,
            bag_of_words: table.require_column(path, columns::BAG_OF_WORDS)?,
            session: table.require_column(path, columns::SESSION)?,
            year: table.require_column(path, columns::YEAR)?,
            country: table.require_column(path, columns::COUNTRY)?,
            country_name: table.column_index(columns::COUNTRY_NAME),
        })
    }

    /// Parse one stored row.
    pub fn parse(&self, row: &[String]) -> Result<ParagraphRecord, FieldError> {
        let paragraph_index = row[self.paragraph_index]
            .trim()
            .parse::<usize>()
            .map_err(|_| FieldError::new(columns::PARAGRAPH_INDEX, &row[self.paragraph_index]))?;

        Ok(ParagraphRecord {
            document_id: row[self.document_id].clone(),
            paragraph_index,
            paragraph_id: row[self.paragraph_id].clone(),
            text: row[self.text].clone(),
            bag_of_words: parse_bag_of_words(&row[self.bag_of_words])?,
            session: parse_int(columns::SESSION, &row[self.session])?,
            year: parse_int(columns::YEAR, &row[self.year])?,
            country: non_empty(&row[self.country]),
            country_name: self.country_name.and_then(|col| non_empty(&row[col])),
        })
    }
}
