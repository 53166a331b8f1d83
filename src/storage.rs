//! Storage helpers for tabular corpus files on disk.
//!
//! Tables are plain CSV with a header row. Writes go to a temporary file in
//! the destination directory and are renamed into place, so readers never
//! observe a half-written table.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;

/// Errors reading or writing tables.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error in {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Column '{column}' missing from {}", path.display())]
    MissingColumn { path: PathBuf, column: String },
}

/// An in-memory CSV table: header plus string cells.
///
/// Empty cells stand for nulls.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Append a row. Short rows are padded with empty cells.
    pub fn push_row(&mut self, mut row: Vec<String>) {
        row.resize(self.headers.len(), String::new());
        self.rows.push(row);
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Cell value by row and column name.
    pub fn get(&self, row: usize, column: &str) -> Option<&str> {
        let col = self.column_index(column)?;
        self.rows.get(row).map(|r| r[col].as_str())
    }

    /// Set a column's values, adding it at the end if it does not exist yet.
    ///
    /// Callers must supply one value per row.
    pub fn set_column(&mut self, name: &str, values: Vec<String>) {
        debug_assert_eq!(values.len(), self.rows.len());
        let col = match self.column_index(name) {
            Some(col) => col,
            None => {
                self.headers.push(name.to_string());
                for row in &mut self.rows {
                    row.push(String::new());
                }
                self.headers.len() - 1
            }
        };
        for (row, value) in self.rows.iter_mut().zip(values) {
            row[col] = value;
        }
    }

    /// Resolve a required column, failing with the table's path for context.
    pub fn require_column(&self, path: &Path, name: &str) -> Result<usize, StorageError> {
        self.column_index(name)
            .ok_or_else(|| StorageError::MissingColumn {
                path: path.to_path_buf(),
                column: name.to_string(),
            })
    }
}

/// Read a CSV table from disk.
pub fn read_table(path: &Path) -> Result<Table, StorageError> {
    if !path.exists() {
        return Err(StorageError::NotFound(path.to_path_buf()));
    }
    let csv_err = |source| StorageError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(csv_err)?;

    let headers = reader
        .headers()
        .map_err(csv_err)?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();

    let mut table = Table::new(headers);
    for record in reader.records() {
        let record = record.map_err(csv_err)?;
        table.rows.push(record.iter().map(str::to_string).collect());
    }

    Ok(table)
}

/// Write a CSV table atomically.
pub fn write_table(path: &Path, table: &Table) -> Result<(), StorageError> {
    let csv_err = |source| StorageError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut buf = Vec::new();
    {
        let mut writer = csv::Writer::from_writer(&mut buf);
        writer.write_record(&table.headers).map_err(csv_err)?;
        for row in &table.rows {
            writer.write_record(row).map_err(csv_err)?;
        }
        writer.flush().map_err(|e| StorageError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
    }

    write_atomic(path, &buf)
}

/// Write bytes to `path` via a temporary sibling file and rename.
pub fn write_atomic(path: &Path, content: &[u8]) -> Result<(), StorageError> {
    let io_err = |source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir).map_err(io_err)?;

    let mut tmp = NamedTempFile::new_in(&dir).map_err(io_err)?;
    tmp.write_all(content).map_err(io_err)?;
    tmp.as_file().sync_all().map_err(io_err)?;
    tmp.persist(path).map_err(|e| io_err(e.error))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample() -> Table {
        let mut table = Table::new(vec!["id".to_string(), "text".to_string()]);
        table.push_row(vec!["a".to_string(), "Hello, \"world\"\nsecond line".to_string()]);
        table.push_row(vec!["b".to_string()]);
        table
    }

    #[test]
    fn test_push_row_pads() {
        let table = sample();
        assert_eq!(table.get(1, "text"), Some(""));
    }

    #[test]
    fn test_round_trip_quoted_multiline() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.csv");
        let table = sample();

        write_table(&path, &table).unwrap();
        let loaded = read_table(&path).unwrap();
        assert_eq!(loaded, table);
    }

    #[test]
    fn test_read_missing_file() {
        let dir = tempdir().unwrap();
        let err = read_table(&dir.path().join("nope.csv")).unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[test]
    fn test_set_column_adds_then_replaces() {
        let mut table = sample();
        table.set_column("score", vec!["1".to_string(), "2".to_string()]);
        assert_eq!(table.headers().len(), 3);
        assert_eq!(table.get(1, "score"), Some("2"));

        table.set_column("score", vec!["3".to_string(), "4".to_string()]);
        assert_eq!(table.headers().len(), 3);
        assert_eq!(table.get(0, "score"), Some("3"));
    }

    #[test]
    fn test_write_atomic_creates_parent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("processed").join("blob.bin");
        write_atomic(&path, b"payload").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"payload");
    }

    #[test]
    fn test_require_column() {
        let table = sample();
        let path = Path::new("t.csv");
        assert_eq!(table.require_column(path, "text").unwrap(), 1);
        assert!(matches!(
            table.require_column(path, "year"),
            Err(StorageError::MissingColumn { .. })
        ));
    }
}
