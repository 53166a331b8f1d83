//! Annotation adapter: tokenization, paragraph segmentation and features.
//!
//! Engines implement the `AnnotationEngine` trait. The pipeline and the
//! corpus loader only see `AnnotatedDocument`, its byte codec, and the
//! `paragraphs()` / `bag_of_words()` extension methods.

mod document;
mod engine;
mod types;
mod vocab;

pub use document::{AnnotatedDocument, AnnotatedSpan, BagOfWords, Token, TokenKind};
pub use engine::{AnnotationEngine, BatchItem, RegexEngine, DEFAULT_STOP_WORDS};
pub use types::{AnnotationError, EngineFailure};
pub use vocab::Vocab;
