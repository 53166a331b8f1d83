//! Types shared across the annotation adapter.

use thiserror::Error;

/// Errors from annotation engines and the annotation codec.
#[derive(Debug, Error)]
pub enum AnnotationError {
    #[error("Annotation engine failed: {0}")]
    Engine(String),

    #[error("Lexeme {0} is not in the vocabulary")]
    UnknownLexeme(u32),

    #[error("Failed to encode annotation: {0}")]
    Encode(String),

    #[error("Failed to decode annotation: {0}")]
    Decode(String),

    #[error("Failed to decode vocabulary: {0}")]
    Vocab(String),
}

/// A document the engine could not annotate.
///
/// Engines may reorder their output, so a failure carries the text it was
/// given; callers recover the document id from it.
#[derive(Debug)]
pub struct EngineFailure {
    pub text: String,
    pub error: AnnotationError,
}
