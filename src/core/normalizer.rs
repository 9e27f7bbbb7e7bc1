// File: src/core/normalizer.rs
use crate::core::table::SynonymRule;
use crate::core::types::NormalizedText;
use crate::error::ConfigError;
use once_cell::sync::Lazy;
use regex::{NoExpand, Regex};

/// Everything except word chars, whitespace and question marks.
static DISALLOWED: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s?]").expect("static regex"));

/// Wraps an escaped phrase in `\b` on each side that begins or ends with a
/// word char. A boundary next to punctuation would never match at the end of
/// the input.
pub(crate) fn word_bounded(phrase: &str) -> String {
    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    let mut out = String::new();
    if phrase.chars().next().is_some_and(is_word) {
        out.push_str(r"\b");
    }
    out.push_str(&regex::escape(phrase));
    if phrase.chars().last().is_some_and(is_word) {
        out.push_str(r"\b");
    }
    out
}

struct CompiledRule {
    canonical: String,
    matcher: Regex,
}

/// Cleans raw input and folds synonyms into canonical keys.
pub struct Normalizer {
    rules: Vec<CompiledRule>,
}

impl Normalizer {
    /// Compiles one case-insensitive alternation per rule. Rules keep their
    /// order; rules without any non-empty synonym are dropped.
    pub fn new(rules: &[SynonymRule]) -> Result<Self, ConfigError> {
        let mut compiled = Vec::with_capacity(rules.len());
        for rule in rules {
            let alternation: Vec<String> = rule
                .synonyms
                .iter()
                .filter(|s| !s.is_empty())
                .map(|s| word_bounded(s))
                .collect();
            if alternation.is_empty() {
                continue;
            }
            let matcher = Regex::new(&format!("(?i){}", alternation.join("|")))?;
            compiled.push(CompiledRule {
                canonical: rule.canonical.clone(),
                matcher,
            });
        }
        Ok(Self { rules: compiled })
    }

    /// Strips disallowed chars, lowercases, trims, then applies every synonym
    /// rule in order. Each rule sees the output of the previous one.
    pub fn normalize(&self, text: &str) -> NormalizedText {
        let cleaned = DISALLOWED.replace_all(text, "");
        let mut folded = cleaned.to_lowercase().trim().to_string();
        if folded.is_empty() {
            return NormalizedText::new(folded);
        }

        for rule in &self.rules {
            if rule.matcher.is_match(&folded) {
                folded = rule
                    .matcher
                    .replace_all(&folded, NoExpand(&rule.canonical))
                    .into_owned();
            }
        }
        NormalizedText::new(folded)
    }
}
