//! debates - UN General Debate corpus preprocessing and access.
//!
//! Turns the raw speech table into a speech table, a paragraph table with
//! bags of words, and a single annotation blob, then loads them back as an
//! in-memory corpus with lazily decoded annotations.

pub mod annotation;
pub mod cache;
pub mod cli;
pub mod config;
pub mod corpus;
pub mod models;
pub mod pipeline;
pub mod storage;
pub mod utils;

pub use annotation::{AnnotatedDocument, AnnotationEngine, RegexEngine, Vocab};
pub use corpus::{Corpus, CorpusError, Paragraph, Speech};
pub use pipeline::{PipelineError, PipelinePaths, PreprocessReport, Preprocessor};
