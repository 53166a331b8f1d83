//! Speech-level rows: one per original document.

use std::cmp::Ordering;

use super::columns;

/// A speech after country resolution and id assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechRecord {
    /// Content hash of the normalized text.
    pub document_id: String,
    pub session: i32,
    pub year: i32,
    /// Resolved country code; `None` when the country was not in the reference table.
    pub country: Option<String>,
    pub country_name: Option<String>,
    /// Normalized speech text.
    pub text: String,
    /// Remaining source columns, in source order.
    pub extra: Vec<(String, String)>,
}

impl SpeechRecord {
    /// Output ordering: year, then country code with unresolved countries last.
    pub fn sort_cmp(&self, other: &Self) -> Ordering {
        self.year
            .cmp(&other.year)
            .then_with(|| match (&self.country, &other.country) {
                (Some(a), Some(b)) => a.cmp(b),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            })
    }

    /// Header for the speech table, given the extra metadata column names.
    pub fn table_headers(extra: &[String]) -> Vec<String> {
        let mut headers: Vec<String> = [
            columns::DOCUMENT_ID,
            columns::SESSION,
            columns::YEAR,
            columns::COUNTRY,
            columns::COUNTRY_NAME,
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        headers.extend(extra.iter().cloned());
        headers.push(columns::TEXT.to_string());
        headers
    }

    /// Cells matching [`SpeechRecord::table_headers`].
    pub fn to_row(&self) -> Vec<String> {
        let mut row = vec![
            self.document_id.clone(),
            self.session.to_string(),
            self.year.to_string(),
            self.country.clone().unwrap_or_default(),
            self.country_name.clone().unwrap_or_default(),
        ];
        row.extend(self.extra.iter().map(|(_, v)| v.clone()));
        row.push(self.text.clone());
        row
    }
}
