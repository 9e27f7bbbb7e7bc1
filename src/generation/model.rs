// File: src/generation/model.rs
use crate::error::ModelError;
use crate::generation::prompt::strip_special_tokens;
use serde::{Deserialize, Serialize};
use std::ops::ControlFlow;
use std::thread;
use std::time::Duration;

/// Sampling and prompt settings handed to the model for every request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationParams {
    pub max_new_tokens: usize,
    pub temperature: f32,
    pub do_sample: bool,
    /// Context entries included in the prompt as earlier user turns.
    pub context_turns: usize,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_new_tokens: 150,
            temperature: 0.7,
            do_sample: true,
            context_turns: 3,
        }
    }
}

/// A text generator driven from the background worker thread.
///
/// Implementations are not expected to be reentrant; the worker never calls
/// `generate` while another call is running.
pub trait LanguageModel: Send + 'static {
    fn load(&mut self) -> Result<(), ModelError>;

    /// Runs one generation. `on_step` receives the decoded text after every
    /// decoding step; when it returns `ControlFlow::Break` the implementation
    /// must stop and return [`ModelError::Interrupted`].
    fn generate(
        &mut self,
        prompt: &str,
        params: &GenerationParams,
        on_step: &mut dyn FnMut(&str) -> ControlFlow<()>,
    ) -> Result<String, ModelError>;
}

/// Deterministic stand-in model that "generates" a fixed reply one word per
/// step. Like a real decoder it echoes the prompt, minus special tokens,
/// ahead of the generated words.
#[derive(Debug, Clone)]
pub struct ScriptedModel {
    reply: String,
    step_delay: Duration,
    load_error: Option<String>,
    fail_at_step: Option<(usize, String)>,
    loaded: bool,
}

impl ScriptedModel {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            step_delay: Duration::ZERO,
            load_error: None,
            fail_at_step: None,
            loaded: false,
        }
    }

    pub fn with_step_delay(mut self, delay: Duration) -> Self {
        self.step_delay = delay;
        self
    }

    /// Makes `load` fail with `message`.
    pub fn failing_load(mut self, message: impl Into<String>) -> Self {
        self.load_error = Some(message.into());
        self
    }

    /// Makes generation fail once `step` words have been produced.
    pub fn failing_at_step(mut self, step: usize, message: impl Into<String>) -> Self {
        self.fail_at_step = Some((step, message.into()));
        self
    }
}

impl LanguageModel for ScriptedModel {
    fn load(&mut self) -> Result<(), ModelError> {
        if let Some(message) = &self.load_error {
            return Err(ModelError::Backend(message.clone()));
        }
        self.loaded = true;
        Ok(())
    }

    fn generate(
        &mut self,
        prompt: &str,
        params: &GenerationParams,
        on_step: &mut dyn FnMut(&str) -> ControlFlow<()>,
    ) -> Result<String, ModelError> {
        if !self.loaded {
            return Err(ModelError::NotLoaded);
        }
        let echoed = strip_special_tokens(prompt);
        let words: Vec<&str> = self
            .reply
            .split_whitespace()
            .take(params.max_new_tokens)
            .collect();

        for step in 1..=words.len() {
            if !self.step_delay.is_zero() {
                thread::sleep(self.step_delay);
            }
            if let Some((fail_step, message)) = &self.fail_at_step {
                if step == *fail_step {
                    return Err(ModelError::Backend(message.clone()));
                }
            }
            let decoded = format!("{echoed}{}", words[..step].join(" "));
            if on_step(&decoded).is_break() {
                return Err(ModelError::Interrupted);
            }
        }
        Ok(format!("{echoed}{}", words.join(" ")))
    }
}
