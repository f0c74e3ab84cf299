//! Token records produced by the morphological analyser.

use thiserror::Error;

use crate::database::WordKey;

/// Placeholder MeCab prints for an empty feature.
pub const EMPTY_FEATURE: &str = "*";

/// One analysed token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Text as it appears in the sentence.
    pub surface: String,
    /// Dictionary form, if the analyser supplied one.
    pub base_form: Option<String>,
    /// Part-of-speech fields, most general first.
    pub pos: Vec<String>,
}

impl Token {
    pub fn new(surface: impl Into<String>, pos: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            surface: surface.into(),
            base_form: None,
            pos: pos.into_iter().map(Into::into).collect(),
        }
    }

    pub fn with_base_form(mut self, base_form: impl Into<String>) -> Self {
        let base_form = base_form.into();
        self.base_form = (!base_form.is_empty() && base_form != EMPTY_FEATURE).then_some(base_form);
        self
    }

    /// The base form when present, the surface otherwise.
    pub fn root_form(&self) -> &str {
        self.base_form.as_deref().unwrap_or(&self.surface)
    }

    pub fn pos_field(&self, index: usize) -> Option<&str> {
        self.pos.get(index).map(String::as_str)
    }

    pub fn word_key(&self) -> WordKey {
        WordKey::new(self.root_form(), self.pos.iter().cloned())
    }
}

/// A token line that could not be turned into a [`Token`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("line {line}: not valid {encoding}")]
    Undecodable { line: u64, encoding: &'static str },

    #[error("line {line}: missing tab between surface and features")]
    MissingFeatures { line: u64 },

    #[error("line {line}: expected at least {expected} features, found {found}")]
    TooFewFeatures { line: u64, expected: usize, found: usize },
}

// ============================================================================
// Sentence Boundaries
// ============================================================================

/// Decides whether a token ends a sentence.
pub trait SentenceBoundary {
    fn is_boundary(&self, token: &Token) -> bool;
}

impl<F> SentenceBoundary for F
where
    F: Fn(&Token) -> bool,
{
    fn is_boundary(&self, token: &Token) -> bool {
        self(token)
    }
}

/// Matches sentence-final punctuation by its first two POS fields.
///
/// The IPA dictionary tags `。` and similar full stops as `記号,句点`.
/// Closing quotes after a full stop are not treated as part of the sentence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PunctuationBoundary {
    pub category: String,
    pub subcategory: String,
}

impl Default for PunctuationBoundary {
    fn default() -> Self {
        Self {
            category: "記号".to_string(),
            subcategory: "句点".to_string(),
        }
    }
}

impl SentenceBoundary for PunctuationBoundary {
    fn is_boundary(&self, token: &Token) -> bool {
        token.pos_field(0) == Some(self.category.as_str())
            && token.pos_field(1) == Some(self.subcategory.as_str())
    }
}
