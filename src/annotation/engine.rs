//! Annotation engine trait and the built-in regex tokenizer.

use std::sync::LazyLock;

use regex::Regex;

use super::document::AnnotatedDocument;
use super::types::{AnnotationError, EngineFailure};
use super::vocab::Vocab;

/// Outcome of annotating one document in a batch.
pub type BatchItem = Result<AnnotatedDocument, EngineFailure>;

/// A backend that turns text into annotated documents.
///
/// Engines own the shared vocabulary while annotating and grow it as new
/// tokens appear. Batch output is an unordered stream: callers must identify
/// each document by its own text, never by position.
pub trait AnnotationEngine {
    /// Short backend identifier recorded in the blob and manifest.
    fn engine_id(&self) -> &str;

    /// Vocabulary the engine's documents are encoded against.
    fn vocab(&self) -> &Vocab;

    /// Annotate a single document.
    fn annotate(&mut self, text: &str) -> Result<AnnotatedDocument, AnnotationError>;

    /// Annotate many documents.
    ///
    /// The default runs `annotate` over the inputs in order; engines that
    /// batch or parallelize internally may yield documents in any order.
    fn annotate_batch<'a>(
        &'a mut self,
        texts: &'a [String],
    ) -> Box<dyn Iterator<Item = BatchItem> + 'a> {
        Box::new(texts.iter().map(move |text| {
            self.annotate(text).map_err(|error| EngineFailure {
                text: text.clone(),
                error,
            })
        }))
    }
}

/// Whitespace runs, words (with internal apostrophes or hyphens), or a single
/// other character. Together these alternatives cover every input character.
static TOKEN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\s+|\w+(?:['’\-]\w+)*|[^\w\s]").expect("token pattern is valid")
});

/// English stop words flagged in the vocabulary by default.
pub const DEFAULT_STOP_WORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "also", "am", "an", "and", "any",
    "are", "as", "at", "be", "because", "been", "before", "being", "below", "between", "both",
    "but", "by", "can", "could", "did", "do", "does", "doing", "down", "during", "each", "few",
    "for", "from", "further", "had", "has", "have", "having", "he", "her", "here", "hers",
    "herself", "him", "himself", "his", "how", "i", "if", "in", "into", "is", "it", "its",
    "itself", "just", "may", "me", "more", "most", "must", "my", "myself", "no", "nor", "not",
    "now", "of", "off", "on", "once", "only", "or", "other", "our", "ours", "ourselves", "out",
    "over", "own", "same", "shall", "she", "should", "so", "some", "such", "than", "that", "the",
    "their", "theirs", "them", "themselves", "then", "there", "these", "they", "this", "those",
    "through", "to", "too", "under", "until", "up", "upon", "very", "was", "we", "were", "what",
    "when", "where", "which", "while", "who", "whom", "why", "will", "with", "would", "you",
    "your", "yours", "yourself", "yourselves",
];

/// Regex-based tokenizer with newline paragraph segmentation.
///
/// No external models: tokens are matched with a single Unicode-aware
/// pattern and interned into the engine's vocabulary.
pub struct RegexEngine {
    vocab: Vocab,
}

impl RegexEngine {
    /// Engine flagging [`DEFAULT_STOP_WORDS`].
    pub fn new() -> Self {
        Self::with_stop_words(DEFAULT_STOP_WORDS.iter().copied())
    }

    /// Engine flagging a custom stop-word list (empty disables filtering).
    pub fn with_stop_words<I, S>(stop_words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            vocab: Vocab::with_stop_words(stop_words),
        }
    }

    /// Consume the engine, keeping its vocabulary.
    pub fn into_vocab(self) -> Vocab {
        self.vocab
    }
}

impl Default for RegexEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl AnnotationEngine for RegexEngine {
    fn engine_id(&self) -> &str {
        "regex"
    }

    fn vocab(&self) -> &Vocab {
        &self.vocab
    }

    fn annotate(&mut self, text: &str) -> Result<AnnotatedDocument, AnnotationError> {
        let pieces = TOKEN_PATTERN.find_iter(text).map(|m| m.as_str());
        let doc = AnnotatedDocument::from_pieces(pieces, &mut self.vocab);
        if doc.text() != text {
            return Err(AnnotationError::Engine(format!(
                "tokenizer covered {} of {} bytes",
                doc.text().len(),
                text.len()
            )));
        }
        Ok(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_cover_text() {
        let mut engine = RegexEngine::new();
        let text = "Mr. President, the world's peoples — all 193 of them — await.\n\nThank you.";
        let doc = engine.annotate(text).unwrap();
        assert_eq!(doc.text(), text);
        let joined: String = (0..doc.tokens().len()).map(|i| doc.token_text(i)).collect();
        assert_eq!(joined, text);
    }

    #[test]
    fn test_word_with_apostrophe_is_one_token() {
        let mut engine = RegexEngine::with_stop_words(Vec::<String>::new());
        let doc = engine.annotate("world's end").unwrap();
        assert_eq!(doc.token_text(0), "world's");
        assert_eq!(doc.tokens().len(), 3);
    }

    #[test]
    fn test_paragraphs_from_newlines() {
        let mut engine = RegexEngine::new();
        let doc = engine
            .annotate("We meet again.\nPeace is our goal.\n\nThank you.")
            .unwrap();
        let texts: Vec<&str> = doc.paragraphs().iter().map(|p| p.text(&doc)).collect();
        assert_eq!(texts, vec!["We meet again.", "Peace is our goal.", "Thank you."]);
    }

    #[test]
    fn test_bag_of_words_default_stop_words() {
        let mut engine = RegexEngine::new();
        let doc = engine.annotate("The peace of the world and the Peace of nations").unwrap();
        let bag = doc.bag_of_words(&doc.paragraphs()[0]);
        assert_eq!(bag.get("peace"), Some(&2));
        assert_eq!(bag.get("world"), Some(&1));
        assert!(!bag.contains_key("the"));
        assert!(!bag.contains_key("of"));
    }

    #[test]
    fn test_vocab_shared_across_documents() {
        let mut engine = RegexEngine::new();
        let a = engine.annotate("peace").unwrap();
        let b = engine.annotate("peace and security").unwrap();
        assert_eq!(a.tokens()[0].lex, b.tokens()[0].lex);
    }

    #[test]
    fn test_default_batch_keeps_all_documents() {
        let mut engine = RegexEngine::new();
        let texts = vec!["One.".to_string(), "Two.".to_string()];
        let docs: Vec<_> = engine.annotate_batch(&texts).collect();
        assert_eq!(docs.len(), 2);
        assert!(docs.iter().all(|d| d.is_ok()));
    }
}
