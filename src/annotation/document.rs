//! Annotated documents and the paragraph/bag-of-words extension contract.

use std::collections::BTreeMap;
use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::utils::generate_document_id;

use super::types::AnnotationError;
use super::vocab::Vocab;

/// Mapping from token to occurrence count within a paragraph.
pub type BagOfWords = BTreeMap<String, usize>;

/// A single token: a lexeme id plus its byte range in the document text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub lex: u32,
    pub start: usize,
    pub end: usize,
}

impl Token {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Coarse lexical class of a token's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Space,
    Word,
    Punct,
}

impl TokenKind {
    pub fn of(text: &str) -> Self {
        if text.chars().all(char::is_whitespace) {
            Self::Space
        } else if text.chars().any(char::is_alphanumeric) {
            Self::Word
        } else {
            Self::Punct
        }
    }
}

/// A contiguous run of tokens within a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotatedSpan {
    /// Stable id derived from the span's own text.
    pub id: String,
    /// Token range within the parent document.
    pub tokens: Range<usize>,
    /// Byte range within the parent document text.
    pub chars: Range<usize>,
}

impl AnnotatedSpan {
    /// The span's text, borrowed from its document.
    pub fn text<'d>(&self, doc: &'d AnnotatedDocument) -> &'d str {
        &doc.text[self.chars.clone()]
    }
}

/// Wire format of a single document: lexeme ids in order.
#[derive(Debug, Serialize, Deserialize)]
struct DocumentPayload {
    lexemes: Vec<u32>,
}

/// A tokenized document.
///
/// Every byte of the text is covered by exactly one token, so the text can be
/// rebuilt from the token lexemes alone. Paragraph boundaries and stop-word
/// flags are derived from the tokens and the vocabulary rather than stored.
#[derive(Debug, Clone)]
pub struct AnnotatedDocument {
    text: String,
    tokens: Vec<Token>,
    stop: Vec<bool>,
}

impl AnnotatedDocument {
    /// Build a document from token strings, interning each into the vocabulary.
    ///
    /// The document text is the concatenation of `pieces`.
    pub fn from_pieces<'a, I>(pieces: I, vocab: &mut Vocab) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut text = String::new();
        let mut tokens = Vec::new();
        let mut stop = Vec::new();
        for piece in pieces {
            if piece.is_empty() {
                continue;
            }
            let start = text.len();
            text.push_str(piece);
            tokens.push(Token {
                lex: vocab.intern(piece),
                start,
                end: text.len(),
            });
            stop.push(vocab.is_stop(piece));
        }
        Self { text, tokens, stop }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn token_text(&self, idx: usize) -> &str {
        let token = &self.tokens[idx];
        &self.text[token.start..token.end]
    }

    /// Id of the whole document, derived exactly as the pipeline derives it.
    pub fn id(&self) -> String {
        generate_document_id(&self.text)
    }

    /// Segment the document into paragraph spans.
    ///
    /// A whitespace token containing a newline separates paragraphs. Leading
    /// and trailing whitespace is trimmed from each span and empty spans are
    /// dropped.
    pub fn paragraphs(&self) -> Vec<AnnotatedSpan> {
        let mut spans = Vec::new();
        let mut start = 0;

        for (idx, _) in self.tokens.iter().enumerate() {
            if self.is_paragraph_break(idx) {
                if let Some(span) = self.trimmed_span(start, idx) {
                    spans.push(span);
                }
                start = idx + 1;
            }
        }
        if let Some(span) = self.trimmed_span(start, self.tokens.len()) {
            spans.push(span);
        }

        spans
    }

    /// Count the content words of a span.
    ///
    /// Words are lower-cased; whitespace, punctuation and stop words are skipped.
    pub fn bag_of_words(&self, span: &AnnotatedSpan) -> BagOfWords {
        let mut bag = BagOfWords::new();
        for idx in span.tokens.clone() {
            let text = self.token_text(idx);
            if TokenKind::of(text) != TokenKind::Word || self.stop[idx] {
                continue;
            }
            *bag.entry(text.to_lowercase()).or_insert(0) += 1;
        }
        bag
    }

    /// Encode the document relative to the vocabulary it was built with.
    pub fn to_bytes(&self) -> Result<Vec<u8>, AnnotationError> {
        let payload = DocumentPayload {
            lexemes: self.tokens.iter().map(|t| t.lex).collect(),
        };
        rmp_serde::to_vec_named(&payload).map_err(|e| AnnotationError::Encode(e.to_string()))
    }

    /// Decode a document written by [`AnnotatedDocument::to_bytes`].
    ///
    /// Fails if any lexeme id is missing from `vocab`, which happens when the
    /// vocabulary was not restored from the same blob.
    pub fn from_bytes(bytes: &[u8], vocab: &Vocab) -> Result<Self, AnnotationError> {
        let payload: DocumentPayload =
            rmp_serde::from_slice(bytes).map_err(|e| AnnotationError::Decode(e.to_string()))?;

        let mut text = String::new();
        let mut tokens = Vec::with_capacity(payload.lexemes.len());
        let mut stop = Vec::with_capacity(payload.lexemes.len());
        for lex in payload.lexemes {
            let piece = vocab.get(lex).ok_or(AnnotationError::UnknownLexeme(lex))?;
            let start = text.len();
            text.push_str(piece);
            tokens.push(Token {
                lex,
                start,
                end: text.len(),
            });
            stop.push(vocab.is_stop(piece));
        }

        Ok(Self { text, tokens, stop })
    }

    fn is_paragraph_break(&self, idx: usize) -> bool {
        let text = self.token_text(idx);
        TokenKind::of(text) == TokenKind::Space && text.contains('\n')
    }

    fn trimmed_span(&self, mut start: usize, mut end: usize) -> Option<AnnotatedSpan> {
        while start < end && TokenKind::of(self.token_text(start)) == TokenKind::Space {
            start += 1;
        }
        while end > start && TokenKind::of(self.token_text(end - 1)) == TokenKind::Space {
            end -= 1;
        }
        if start == end {
            return None;
        }

        let chars = self.tokens[start].start..self.tokens[end - 1].end;
        Some(AnnotatedSpan {
            id: generate_document_id(&self.text[chars.clone()]),
            tokens: start..end,
            chars,
        })
    }
}
