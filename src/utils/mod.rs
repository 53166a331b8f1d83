//! Shared utility functions.

mod id;

pub use id::{find_duplicate_ids, generate_document_id, normalize_text, ID_LENGTH};
