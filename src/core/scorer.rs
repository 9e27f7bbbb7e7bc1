// File: src/core/scorer.rs
use crate::core::context::ContextWindow;
use crate::core::normalizer::word_bounded;
use crate::core::table::PatternEntry;
use crate::core::types::{NormalizedText, ScoreResult};
use crate::error::ConfigError;
use crate::fuzzy::levenshtein;
use regex::Regex;

const EXACT_MATCH: u32 = 10;
const WORD_MATCH: u32 = 5;
const NEAR_MATCH: u32 = 3;
const CONTEXT_MATCH: u32 = 1;
/// Extra weight for short exact hits so slang never falls through to generation.
const SHORT_EXACT_BONUS: u32 = 20;

const NEAR_MATCH_MAX_DISTANCE: usize = 2;
/// Near matches only count for patterns longer than this many chars.
const NEAR_MATCH_MIN_PATTERN_LEN: usize = 3;
const SHORT_INPUT_MAX_LEN: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScorerSettings {
    /// Scoring runs only for inputs with at most this many tokens, unless the
    /// generator is not ready yet.
    pub gate_max_tokens: usize,
    pub selection_threshold: u32,
    /// How many recent context entries are checked for the pattern.
    pub context_lookback: usize,
}

impl Default for ScorerSettings {
    fn default() -> Self {
        Self {
            gate_max_tokens: 5,
            selection_threshold: 5,
            context_lookback: 3,
        }
    }
}

struct CompiledPattern {
    pattern: String,
    char_len: usize,
    word_match: Regex,
}

/// Ranks canned patterns against normalized input and recent context.
pub struct PatternScorer {
    patterns: Vec<CompiledPattern>,
    settings: ScorerSettings,
}

impl PatternScorer {
    /// Patterns keep the order they are given in; that order breaks ties.
    pub fn new<'a>(
        patterns: impl IntoIterator<Item = &'a PatternEntry>,
        settings: ScorerSettings,
    ) -> Result<Self, ConfigError> {
        let mut compiled = Vec::new();
        for entry in patterns {
            let word_match = Regex::new(&format!("(?i){}", word_bounded(&entry.pattern)))?;
            compiled.push(CompiledPattern {
                pattern: entry.pattern.clone(),
                char_len: entry.pattern.chars().count(),
                word_match,
            });
        }
        Ok(Self {
            patterns: compiled,
            settings,
        })
    }

    pub fn settings(&self) -> &ScorerSettings {
        &self.settings
    }

    /// Long inputs skip canned matching once the generator can take them.
    pub fn gate_open(&self, text: &NormalizedText, model_ready: bool) -> bool {
        text.token_count() <= self.settings.gate_max_tokens || !model_ready
    }

    /// Gate, then best match.
    pub fn score(
        &self,
        text: &NormalizedText,
        context: &ContextWindow,
        model_ready: bool,
    ) -> Option<ScoreResult> {
        if !self.gate_open(text, model_ready) {
            return None;
        }
        self.best_match(text, context)
    }

    /// Highest scoring pattern, if it clears the selection threshold. Ties
    /// keep the earliest pattern.
    pub fn best_match(&self, text: &NormalizedText, context: &ContextWindow) -> Option<ScoreResult> {
        let mut best: Option<ScoreResult> = None;
        for compiled in &self.patterns {
            let score = self.score_pattern(compiled, text, context);
            let current = best.as_ref().map_or(0, |b| b.score);
            if score > current {
                best = Some(ScoreResult {
                    pattern: compiled.pattern.clone(),
                    score,
                });
            }
        }
        best.filter(|b| b.score >= self.settings.selection_threshold)
    }

    /// Score of one pattern, or `None` if the scorer does not know it.
    pub fn score_of(&self, pattern: &str, text: &NormalizedText, context: &ContextWindow) -> Option<u32> {
        self.patterns
            .iter()
            .find(|c| c.pattern == pattern)
            .map(|c| self.score_pattern(c, text, context))
    }

    fn score_pattern(&self, compiled: &CompiledPattern, text: &NormalizedText, context: &ContextWindow) -> u32 {
        let input = text.as_str();
        let mut score = 0;

        let exact = input == compiled.pattern;
        if exact {
            score += EXACT_MATCH;
        }
        if compiled.word_match.is_match(input) {
            score += WORD_MATCH;
        }
        if compiled.char_len > NEAR_MATCH_MIN_PATTERN_LEN
            && levenshtein(input, &compiled.pattern) <= NEAR_MATCH_MAX_DISTANCE
        {
            score += NEAR_MATCH;
        }
        if context
            .recent(self.settings.context_lookback)
            .any(|entry| entry.contains(compiled.pattern.as_str()))
        {
            score += CONTEXT_MATCH;
        }
        if exact && text.char_len() <= SHORT_INPUT_MAX_LEN {
            score += SHORT_EXACT_BONUS;
        }
        score
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::normalizer::Normalizer;

    fn entries(patterns: &[&str]) -> Vec<PatternEntry> {
        patterns
            .iter()
            .map(|p| PatternEntry {
                pattern: p.to_string(),
                replies: vec![format!("reply to {p}")],
            })
            .collect()
    }

    fn scorer(patterns: &[&str]) -> PatternScorer {
        PatternScorer::new(&entries(patterns), ScorerSettings::default()).unwrap()
    }

    fn text(raw: &str) -> NormalizedText {
        Normalizer::new(&[]).unwrap().normalize(raw)
    }

    #[test]
    fn exact_long_pattern_scores_at_least_fifteen() {
        let s = scorer(&["good morning"]);
        let empty = ContextWindow::new(5);
        let score = s.score_of("good morning", &text("good morning"), &empty).unwrap();
        assert!(score >= 15, "score was {score}");
    }

    #[test]
    fn short_exact_match_gets_slang_bonus() {
        let s = scorer(&["lol", "hello"]);
        let empty = ContextWindow::new(5);
        assert!(s.score_of("lol", &text("lol"), &empty).unwrap() >= 35);
        assert!(s.score_of("hello", &text("hello"), &empty).unwrap() >= 35);
    }

    #[test]
    fn near_miss_adds_three_for_longer_patterns() {
        let s = scorer(&["hello", "hey"]);
        let empty = ContextWindow::new(5);
        assert_eq!(s.score_of("hello", &text("helo"), &empty), Some(NEAR_MATCH));
        // "hey" is too short for the near-match signal.
        assert_eq!(s.score_of("hey", &text("hay"), &empty), Some(0));
    }

    #[test]
    fn near_miss_alone_is_below_threshold() {
        let s = scorer(&["hello"]);
        assert_eq!(s.best_match(&text("helo"), &ContextWindow::new(5)), None);
    }

    #[test]
    fn word_match_inside_sentence_is_selected() {
        let s = scorer(&["joke", "hello"]);
        let hit = s.best_match(&text("tell me a joke"), &ContextWindow::new(5)).unwrap();
        assert_eq!(hit.pattern, "joke");
        assert_eq!(hit.score, WORD_MATCH);
    }

    #[test]
    fn word_match_respects_boundaries() {
        let s = scorer(&["ok"]);
        assert_eq!(s.best_match(&text("books"), &ContextWindow::new(5)), None);
    }

    #[test]
    fn context_adds_one_from_recent_entries_only() {
        let s = scorer(&["joke"]);
        let mut context = ContextWindow::new(5);
        context.push("tell me a joke");
        for filler in ["one", "two"] {
            context.push(filler);
        }
        assert_eq!(s.score_of("joke", &text("another"), &context), Some(CONTEXT_MATCH));

        context.push("three");
        assert_eq!(s.score_of("joke", &text("another"), &context), Some(0));
    }

    #[test]
    fn exact_match_beats_word_match() {
        let s = scorer(&["how are you", "how are you doing"]);
        let hit = s
            .best_match(&text("how are you doing"), &ContextWindow::new(5))
            .unwrap();
        assert_eq!(hit.pattern, "how are you doing");
    }

    #[test]
    fn ties_keep_first_pattern() {
        let s = scorer(&["coffee", "tea"]);
        let hit = s
            .best_match(&text("coffee or tea"), &ContextWindow::new(5))
            .unwrap();
        assert_eq!(hit.pattern, "coffee");
        assert_eq!(hit.score, WORD_MATCH);
    }

    #[test]
    fn gate_closes_for_long_input_when_model_ready() {
        let s = scorer(&["email"]);
        let long = text("please write an email about the quarterly meeting");
        assert!(long.token_count() > 5);
        assert!(!s.gate_open(&long, true));
        assert_eq!(s.score(&long, &ContextWindow::new(5), true), None);
        assert!(s.score(&long, &ContextWindow::new(5), false).is_some());
    }

    #[test]
    fn patterns_are_literal() {
        let s = scorer(&["what?"]);
        let empty = ContextWindow::new(5);
        assert_eq!(s.best_match(&text("whats"), &empty), None);
        assert_eq!(s.best_match(&text("what?"), &empty).map(|h| h.pattern), Some("what?".to_string()));
    }
}
