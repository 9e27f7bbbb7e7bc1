// src/core/types.rs
use std::fmt;

/// Pattern-table key that holds fallback replies and never takes part in scoring.
pub const DEFAULT_PATTERN: &str = "default";

/// Cleaned, lowercased input with synonyms folded to their canonical keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedText(String);

impl NormalizedText {
    pub(crate) fn new(text: String) -> Self {
        Self(text)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Length in chars.
    pub fn char_len(&self) -> usize {
        self.0.chars().count()
    }

    /// Whitespace separated tokens longer than one char.
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.0.split_whitespace().filter(|t| t.chars().count() > 1)
    }

    pub fn token_count(&self) -> usize {
        self.tokens().count()
    }
}

impl AsRef<str> for NormalizedText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NormalizedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Best pattern for one resolution call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreResult {
    pub pattern: String,
    pub score: u32,
}

/// Where a reply came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplySource {
    /// Nothing was left after cleanup.
    EmptyInput,
    Canned { pattern: String, score: u32 },
    /// No pattern matched and the generator has not finished loading.
    WarmingUp,
    Generated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub source: ReplySource,
}

impl Reply {
    pub fn new(text: impl Into<String>, source: ReplySource) -> Self {
        Self { text: text.into(), source }
    }
}
