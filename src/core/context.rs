// File: src/core/context.rs
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Rolling memory of the most recent user utterances, oldest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextWindow {
    capacity: usize,
    history: VecDeque<String>,
}

impl ContextWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            history: VecDeque::with_capacity(capacity),
        }
    }

    /// Rebuilds a window from persisted entries, keeping only the newest
    /// `capacity` of them.
    pub fn from_entries(capacity: usize, entries: impl IntoIterator<Item = String>) -> Self {
        let mut window = Self::new(capacity);
        for entry in entries {
            window.push(&entry);
        }
        window
    }

    /// Appends an utterance, lowercased, evicting the oldest one when full.
    /// O(1) amortized complexity.
    pub fn push(&mut self, utterance: &str) {
        if self.capacity == 0 {
            return;
        }
        if self.history.len() == self.capacity {
            self.history.pop_front();
        }
        self.history.push_back(utterance.to_lowercase());
    }

    /// The newest `n` entries, oldest first.
    pub fn recent(&self, n: usize) -> impl Iterator<Item = &str> {
        let skip = self.history.len().saturating_sub(n);
        self.history.iter().skip(skip).map(String::as_str)
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.history.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
