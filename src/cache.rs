//! Annotation blob: the shared vocabulary plus every document's encoded annotation.
//!
//! The blob is a single MessagePack container keyed by document id. The
//! preprocessing run writes it once; loaders restore the vocabulary and hand
//! out raw per-document bytes, leaving decoding to whoever needs a document.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::annotation::{AnnotationError, Vocab};
use crate::storage::{write_atomic, StorageError};

/// Current blob layout version.
pub const BLOB_FORMAT_VERSION: u32 = 1;

/// Errors loading or writing the annotation blob.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Failed to read annotation blob {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write annotation blob: {0}")]
    Write(#[from] StorageError),

    #[error("Annotation blob is corrupt: {0}")]
    Decode(String),

    #[error("Failed to encode annotation blob: {0}")]
    Encode(String),

    #[error("Unsupported annotation blob version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("Annotation blob vocabulary is unusable: {0}")]
    Vocab(#[from] AnnotationError),
}

/// On-disk container.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotationBlob {
    pub format_version: u32,
    /// Engine that produced the annotations.
    pub engine: String,
    /// Serialized vocabulary state.
    pub vocab: Vec<u8>,
    /// Document id → encoded annotation.
    pub docs: BTreeMap<String, Vec<u8>>,
}

impl AnnotationBlob {
    /// Start a blob for the given engine and final vocabulary.
    pub fn new(engine: &str, vocab: &Vocab) -> Result<Self, CacheError> {
        Ok(Self {
            format_version: BLOB_FORMAT_VERSION,
            engine: engine.to_string(),
            vocab: vocab.to_bytes()?,
            docs: BTreeMap::new(),
        })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, CacheError> {
        rmp_serde::to_vec_named(self).map_err(|e| CacheError::Encode(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CacheError> {
        let blob: Self =
            rmp_serde::from_slice(bytes).map_err(|e| CacheError::Decode(e.to_string()))?;
        if blob.format_version != BLOB_FORMAT_VERSION {
            return Err(CacheError::UnsupportedVersion {
                found: blob.format_version,
                expected: BLOB_FORMAT_VERSION,
            });
        }
        Ok(blob)
    }

    /// Write atomically to `path`.
    pub fn write(&self, path: &Path) -> Result<(), CacheError> {
        write_atomic(path, &self.to_bytes()?)?;
        Ok(())
    }
}

/// A loaded blob: restored vocabulary plus raw bytes for each document.
#[derive(Debug)]
pub struct LoadedAnnotations {
    engine: String,
    vocab: Vocab,
    docs: HashMap<String, Vec<u8>>,
}

impl LoadedAnnotations {
    pub fn engine(&self) -> &str {
        &self.engine
    }

    pub fn vocab(&self) -> &Vocab {
        &self.vocab
    }

    /// Remove and return a document's bytes. Each entry can be taken once.
    pub fn take(&mut self, document_id: &str) -> Option<Vec<u8>> {
        self.docs.remove(document_id)
    }

    pub fn contains(&self, document_id: &str) -> bool {
        self.docs.contains_key(document_id)
    }

    /// Ids of documents that have not been taken yet, sorted.
    pub fn remaining_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.docs.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Split into the vocabulary and any documents left untaken.
    pub fn into_parts(self) -> (Vocab, HashMap<String, Vec<u8>>) {
        (self.vocab, self.docs)
    }
}

/// Load the annotation blob, restoring its vocabulary.
///
/// A missing file is not an error: annotations are optional and the tables
/// stay usable without them, so this logs a warning and returns `Ok(None)`.
pub fn load_annotations(path: &Path) -> Result<Option<LoadedAnnotations>, CacheError> {
    if !path.exists() {
        tracing::warn!("No serialized annotations found at {}", path.display());
        return Ok(None);
    }

    let bytes = std::fs::read(path).map_err(|source| CacheError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let blob = AnnotationBlob::from_bytes(&bytes)?;
    let vocab = Vocab::from_bytes(&blob.vocab)?;

    tracing::debug!(
        "Loaded {} annotations ({} lexemes, engine {}) from {}",
        blob.docs.len(),
        vocab.len(),
        blob.engine,
        path.display()
    );

    Ok(Some(LoadedAnnotations {
        engine: blob.engine,
        vocab,
        docs: blob.docs.into_iter().collect(),
    }))
}
