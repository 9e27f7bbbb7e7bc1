// File: src/core/table.rs
use crate::core::types::DEFAULT_PATTERN;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

const BUILTIN_TABLE: &str = include_str!("../../data/responses.json");

/// One synonym group. Every surface form folds to `canonical`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynonymRule {
    pub canonical: String,
    pub synonyms: Vec<String>,
}

/// A trigger phrase and the canned replies it may produce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternEntry {
    pub pattern: String,
    pub replies: Vec<String>,
}

/// Static synonym and pattern data.
///
/// Both lists are ordered. Synonym rules are applied one after another, so a
/// later rule can rewrite the output of an earlier one. Pattern order breaks
/// scoring ties in favour of the earlier entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseTable {
    #[serde(default)]
    pub synonyms: Vec<SynonymRule>,
    pub patterns: Vec<PatternEntry>,
}

impl ResponseTable {
    /// The table compiled into the crate.
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::from_json(BUILTIN_TABLE)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let table: ResponseTable = serde_json::from_str(json)?;
        table.validate()?;
        Ok(table)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        match self.patterns.iter().find(|entry| entry.replies.is_empty()) {
            Some(entry) => Err(ConfigError::EmptyReplies(entry.pattern.clone())),
            None => Ok(()),
        }
    }

    /// Entries that take part in scoring, in table order.
    pub fn scored_patterns(&self) -> impl Iterator<Item = &PatternEntry> {
        self.patterns.iter().filter(|e| e.pattern != DEFAULT_PATTERN)
    }

    pub fn replies(&self, pattern: &str) -> Option<&[String]> {
        self.patterns
            .iter()
            .find(|e| e.pattern == pattern)
            .map(|e| e.replies.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_table_loads() {
        let table = ResponseTable::builtin().unwrap();
        assert!(!table.synonyms.is_empty());
        assert!(table.replies("hello").is_some());
        assert!(table.replies(DEFAULT_PATTERN).is_some());
    }

    #[test]
    fn default_entry_is_not_scored() {
        let table = ResponseTable::builtin().unwrap();
        assert!(table.scored_patterns().all(|e| e.pattern != DEFAULT_PATTERN));
    }

    #[test]
    fn rejects_pattern_without_replies() {
        let json = r#"{ "patterns": [ { "pattern": "hello", "replies": [] } ] }"#;
        match ResponseTable::from_json(json) {
            Err(ConfigError::EmptyReplies(p)) => assert_eq!(p, "hello"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn keeps_file_order() {
        let json = r#"{
            "synonyms": [
                { "canonical": "b", "synonyms": ["x"] },
                { "canonical": "a", "synonyms": ["y"] }
            ],
            "patterns": [
                { "pattern": "zeta", "replies": ["z"] },
                { "pattern": "alpha", "replies": ["a"] }
            ]
        }"#;
        let table = ResponseTable::from_json(json).unwrap();
        assert_eq!(table.synonyms[0].canonical, "b");
        assert_eq!(table.patterns[0].pattern, "zeta");
    }
}
