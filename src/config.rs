// File: src/config.rs
use crate::core::scorer::ScorerSettings;
use crate::core::table::ResponseTable;
use crate::error::ConfigError;
use crate::generation::GenerationParams;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Engine settings. Every field has a default, so a config file only needs
/// the keys it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub context_capacity: usize,
    pub context_lookback: usize,
    pub gate_max_tokens: usize,
    pub selection_threshold: u32,
    pub stream_delay_ms: u64,
    pub empty_input_reply: String,
    pub warming_up_reply: String,
    pub persona: String,
    pub generation: GenerationParams,
    /// Response table to use instead of the built-in one.
    pub table_path: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            context_capacity: 5,
            context_lookback: 3,
            gate_max_tokens: 5,
            selection_threshold: 5,
            stream_delay_ms: 50,
            empty_input_reply: "I didn't catch that.".to_string(),
            warming_up_reply: "Thinking... (AI is warming up)".to_string(),
            persona: "You are Wani AI, a helpful and smart assistant created by Waqar Ahmad."
                .to_string(),
            generation: GenerationParams::default(),
            table_path: None,
        }
    }
}

impl EngineConfig {
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(serde_json::from_str(&json)?)
    }

    pub fn stream_delay(&self) -> Duration {
        Duration::from_millis(self.stream_delay_ms)
    }

    pub fn scorer_settings(&self) -> ScorerSettings {
        ScorerSettings {
            gate_max_tokens: self.gate_max_tokens,
            selection_threshold: self.selection_threshold,
            context_lookback: self.context_lookback,
        }
    }

    /// The configured table, or the built-in one.
    pub fn response_table(&self) -> Result<ResponseTable, ConfigError> {
        match &self.table_path {
            Some(path) => ResponseTable::from_path(path),
            None => ResponseTable::builtin(),
        }
    }
}
