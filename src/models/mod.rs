//! Row models for the speech and paragraph tables.

mod paragraph;
mod speech;

use thiserror::Error;

pub use paragraph::{encode_bag_of_words, parse_bag_of_words, ParagraphColumns, ParagraphRecord};
pub use speech::SpeechRecord;

/// Column names shared by the raw, speech and paragraph tables.
pub mod columns {
    pub const DOCUMENT_ID: &str = "document_id";
    pub const PARAGRAPH_INDEX: &str = "paragraph_index";
    pub const PARAGRAPH_ID: &str = "paragraph_id";
    pub const SESSION: &str = "session";
    pub const YEAR: &str = "year";
    pub const COUNTRY: &str = "country";
    pub const COUNTRY_NAME: &str = "country_name";
    pub const TEXT: &str = "text";
    pub const BAG_OF_WORDS: &str = "bag_of_words";
}

/// A stored cell that does not parse as its column's type.
#[derive(Debug, Error)]
#[error("Malformed value {value:?} in column '{column}'")]
pub struct FieldError {
    pub column: String,
    pub value: String,
}

impl FieldError {
    pub fn new(column: &str, value: &str) -> Self {
        Self {
            column: column.to_string(),
            value: value.to_string(),
        }
    }
}

/// Parse an integer cell.
pub(crate) fn parse_int(column: &str, value: &str) -> Result<i32, FieldError> {
    let trimmed = value.trim();
    trimmed
        .parse::<i32>()
        .or_else(|_| {
            // Some exports write integral years as floats ("1970.0").
            trimmed
                .parse::<f64>()
                .ok()
                .filter(|f| f.fract() == 0.0 && f.abs() < i32::MAX as f64)
                .map(|f| f as i32)
                .ok_or(())
        })
        .map_err(|_| FieldError::new(column, value))
}

/// Map an empty cell to `None`.
pub(crate) fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_int() {
        assert_eq!(parse_int("year", "1970").unwrap(), 1970);
        assert_eq!(parse_int("year", " 25 ").unwrap(), 25);
        assert_eq!(parse_int("year", "1970.0").unwrap(), 1970);
        assert!(parse_int("year", "1970.5").is_err());
        assert!(parse_int("year", "").is_err());
    }

    #[test]
    fn test_non_empty() {
        assert_eq!(non_empty(""), None);
        assert_eq!(non_empty("USA"), Some("USA".to_string()));
    }
}
