//! Question index entries
//!
//! The cheap first pass over the document recovers only question ids, a
//! short verbatim stem, and a coarse page guess. Everything downstream
//! (slicing, content extraction, quality gating) is keyed off this index.

use serde::{Deserialize, Serialize};

/// One indexed question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionIndexEntry {
    /// Printed survey id
    pub id: String,
    /// First words of the stem, verbatim
    #[serde(default)]
    pub short_text: String,
    /// Starting page of the window the id was seen in
    #[serde(default)]
    pub page_guess: usize,
}
