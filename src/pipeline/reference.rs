//! Country reference data: code ↔ name resolution for raw speeches.

use std::collections::HashMap;
use std::path::Path;

use crate::storage::read_table;

use super::PipelineError;

/// Entities missing from the ISO reference table: dissolved states and blocs.
pub const COUNTRY_OVERRIDES: &[(&str, &str)] = &[
    ("Democratic Yemen", "YDYE"),
    ("Czechoslovakia", "CSK"),
    ("Yugoslavia", "YUG"),
    ("East Germany", "DDR"),
    ("European Union", "EU"),
    ("South Sudan", "SSD"),
];

/// Reference table column names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceColumns {
    pub name: String,
    pub code: String,
}

impl Default for ReferenceColumns {
    fn default() -> Self {
        Self {
            name: "English short name lower case".to_string(),
            code: "Alpha-3 code".to_string(),
        }
    }
}

/// A resolved country.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Country {
    pub code: String,
    pub name: String,
}

/// Lookup from raw country values (either a code or a name) to countries.
#[derive(Debug, Clone, Default)]
pub struct CountryReference {
    by_code: HashMap<String, Country>,
    by_name: HashMap<String, Country>,
}

impl CountryReference {
    /// Build from `(name, code)` pairs. Earlier entries win on conflicts.
    pub fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut reference = Self::default();
        for (name, code) in pairs {
            reference.insert(name, code);
        }
        reference
    }

    /// Load the reference CSV and extend it with [`COUNTRY_OVERRIDES`].
    pub fn load(path: &Path, columns: &ReferenceColumns) -> Result<Self, PipelineError> {
        let table = read_table(path)?;
        let name_col = table.require_column(path, &columns.name)?;
        let code_col = table.require_column(path, &columns.code)?;

        let mut reference = Self::from_pairs(
            table
                .rows()
                .iter()
                .map(|row| (row[name_col].as_str(), row[code_col].as_str())),
        );
        let before = reference.len();
        reference.extend_overrides();

        tracing::debug!(
            "Loaded {} reference countries ({} overrides added) from {}",
            before,
            reference.len() - before,
            path.display()
        );
        Ok(reference)
    }

    /// Add override entities not already present.
    pub fn extend_overrides(&mut self) {
        for (name, code) in COUNTRY_OVERRIDES {
            self.insert(name, code);
        }
    }

    /// Resolve a raw value, matching either a code or a name, case-insensitively.
    pub fn resolve(&self, raw: &str) -> Option<&Country> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        self.by_code
            .get(&raw.to_uppercase())
            .or_else(|| self.by_name.get(&raw.to_lowercase()))
    }

    pub fn len(&self) -> usize {
        self.by_code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_code.is_empty()
    }

    fn insert(&mut self, name: &str, code: &str) {
        let (name, code) = (name.trim(), code.trim());
        if name.is_empty() || code.is_empty() {
            return;
        }
        let country = Country {
            code: code.to_string(),
            name: name.to_string(),
        };
        self.by_code
            .entry(code.to_uppercase())
            .or_insert_with(|| country.clone());
        self.by_name.entry(name.to_lowercase()).or_insert(country);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{write_table, Table};
    use tempfile::tempdir;

    #[test]
    fn test_resolve_by_code_or_name() {
        let reference = CountryReference::from_pairs([("Albania", "ALB"), ("France", "FRA")]);
        assert_eq!(reference.resolve("alb").map(|c| c.name.as_str()), Some("Albania"));
        assert_eq!(reference.resolve(" FRANCE ").map(|c| c.code.as_str()), Some("FRA"));
        assert!(reference.resolve("Atlantis").is_none());
        assert!(reference.resolve("").is_none());
    }

    #[test]
    fn test_overrides_fill_gaps_only() {
        let mut reference = CountryReference::from_pairs([("South Sudan", "SSD")]);
        reference.extend_overrides();
        assert_eq!(reference.len(), COUNTRY_OVERRIDES.len());
        assert_eq!(reference.resolve("YUG").map(|c| c.name.as_str()), Some("Yugoslavia"));
        assert_eq!(
            reference.resolve("Democratic Yemen").map(|c| c.code.as_str()),
            Some("YDYE")
        );
    }

    #[test]
    fn test_load_from_csv() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("codes.csv");
        let columns = ReferenceColumns::default();
        let mut table = Table::new(vec![
            columns.name.clone(),
            "Alpha-2 code".to_string(),
            columns.code.clone(),
        ]);
        table.push_row(vec!["Albania".into(), "AL".into(), "ALB".into()]);
        write_table(&path, &table).unwrap();

        let reference = CountryReference::load(&path, &columns).unwrap();
        assert_eq!(reference.resolve("ALB").map(|c| c.name.as_str()), Some("Albania"));
        assert!(reference.resolve("CSK").is_some());
    }

    #[test]
    fn test_load_missing_column() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("codes.csv");
        let mut table = Table::new(vec!["name".to_string()]);
        table.push_row(vec!["Albania".into()]);
        write_table(&path, &table).unwrap();

        assert!(CountryReference::load(&path, &ReferenceColumns::default()).is_err());
    }
}
