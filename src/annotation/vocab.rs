//! Shared vocabulary: the model state every annotation is encoded against.
//!
//! Annotated documents store integer lexeme ids rather than token text, so a
//! document can only be decoded with the vocabulary that was current when it
//! was encoded. The preprocessing run grows one vocabulary across the whole
//! corpus and writes it once into the annotation blob; a loader restores it
//! once and passes it explicitly to every decode.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use super::types::AnnotationError;

/// Serialized form of a vocabulary.
#[derive(Debug, Serialize, Deserialize)]
struct VocabState {
    strings: Vec<String>,
    stop_words: BTreeSet<String>,
}

/// Interned token strings plus lexical flags.
#[derive(Debug, Clone, Default)]
pub struct Vocab {
    strings: Vec<String>,
    lookup: HashMap<String, u32>,
    stop_words: BTreeSet<String>,
}

impl Vocab {
    /// Create an empty vocabulary with no stop words.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty vocabulary flagging the given (lower-case) stop words.
    pub fn with_stop_words<I, S>(stop_words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            stop_words: stop_words
                .into_iter()
                .map(|w| w.into().to_lowercase())
                .collect(),
            ..Self::default()
        }
    }

    /// Intern a string, returning its lexeme id.
    pub fn intern(&mut self, s: &str) -> u32 {
        if let Some(&id) = self.lookup.get(s) {
            return id;
        }
        let id = self.strings.len() as u32;
        self.strings.push(s.to_string());
        self.lookup.insert(s.to_string(), id);
        id
    }

    /// Resolve a lexeme id back to its string.
    pub fn get(&self, id: u32) -> Option<&str> {
        self.strings.get(id as usize).map(String::as_str)
    }

    /// Look up the id of an already-interned string.
    pub fn id_of(&self, s: &str) -> Option<u32> {
        self.lookup.get(s).copied()
    }

    /// Whether a (case-insensitive) word is flagged as a stop word.
    pub fn is_stop(&self, word: &str) -> bool {
        !self.stop_words.is_empty() && self.stop_words.contains(&word.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    /// Serialize the vocabulary for the annotation blob.
    pub fn to_bytes(&self) -> Result<Vec<u8>, AnnotationError> {
        let state = VocabState {
            strings: self.strings.clone(),
            stop_words: self.stop_words.clone(),
        };
        rmp_serde::to_vec_named(&state).map_err(|e| AnnotationError::Encode(e.to_string()))
    }

    /// Restore a vocabulary previously written with [`Vocab::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AnnotationError> {
        let state: VocabState =
            rmp_serde::from_slice(bytes).map_err(|e| AnnotationError::Vocab(e.to_string()))?;

        let mut lookup = HashMap::with_capacity(state.strings.len());
        for (idx, s) in state.strings.iter().enumerate() {
            if lookup.insert(s.clone(), idx as u32).is_some() {
                return Err(AnnotationError::Vocab(format!(
                    "string {:?} appears more than once",
                    s
                )));
            }
        }

        Ok(Self {
            strings: state.strings,
            lookup,
            stop_words: state.stop_words,
        })
    }
}
