//! One-shot preprocessing: raw speeches in, speech table, paragraph table,
//! annotation blob and run manifest out.

mod preprocess;
mod reference;
mod report;

use std::path::PathBuf;

use thiserror::Error;

use crate::annotation::AnnotationError;
use crate::cache::CacheError;
use crate::storage::StorageError;

pub use preprocess::{PipelinePaths, PreprocessEvent, Preprocessor};
pub use reference::{Country, CountryReference, ReferenceColumns, COUNTRY_OVERRIDES};
pub use report::{file_checksum, DuplicateId, PreprocessReport};

/// Errors that abort a preprocessing run.
///
/// Per-document annotation failures are not errors; they are recorded in the
/// report and the run continues.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Input file not found: {}", path.display())]
    MissingInputFile { path: PathBuf },

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Malformed value {value:?} in column '{column}' at {}:{line}", path.display())]
    MalformedInput {
        path: PathBuf,
        line: usize,
        column: String,
        value: String,
    },

    #[error("Annotation encoding failed: {0}")]
    Annotation(#[from] AnnotationError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("Failed to write manifest: {0}")]
    Manifest(String),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
