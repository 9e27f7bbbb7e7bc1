// File: src/session.rs
use crate::convert::convert_ip;
use crate::core::engine::ChatEngine;
use crate::core::types::ReplySource;
use crate::error::EngineError;
use crate::generation::StopHandle;
use crate::persistence::{load_or_default, save_or_log, KeyValueStore};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

pub const HISTORY_KEY: &str = "chat_history";
pub const CONTEXT_KEY: &str = "chat_context";

const FAILURE_NOTICE: &str = "Error: Something went wrong.";
const SILENT_REPLY: &str = "I am silent.";
const INVALID_ADDRESS: &str = "That doesn't look like a valid IP or Binary IP string to me.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Chat,
    Convert,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Bot,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub speaker: Speaker,
    pub content: String,
    pub mode: Mode,
    pub timestamp: DateTime<Utc>,
}

/// Where the session shows messages.
pub trait Renderer {
    /// A complete message.
    fn show(&mut self, text: &str, speaker: Speaker);
    /// Partial text of the bot reply being produced.
    fn stream(&mut self, partial: &str);
    /// Final text of the reply that was being streamed.
    fn finish(&mut self, text: &str);
}

/// Outcome of one submitted message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    pub reply: String,
    /// `None` in convert mode and for stopped generations.
    pub source: Option<ReplySource>,
    pub stopped: bool,
}

/// A conversation on top of the engine: keeps history, switches modes and
/// persists state after every exchange.
pub struct ChatSession<S: KeyValueStore> {
    engine: ChatEngine,
    store: S,
    mode: Mode,
    history: Vec<HistoryEntry>,
}

impl<S: KeyValueStore> ChatSession<S> {
    /// Loads history and context from `store`. Unreadable values start empty.
    pub fn open(mut engine: ChatEngine, store: S) -> Self {
        let history: Vec<HistoryEntry> = load_or_default(&store, HISTORY_KEY, Vec::new());
        let context: Vec<String> = load_or_default(&store, CONTEXT_KEY, Vec::new());
        engine.restore_context(context);
        info!(messages = history.len(), "session opened");
        Self {
            engine,
            store,
            mode: Mode::Chat,
            history,
        }
    }

    pub fn engine(&self) -> &ChatEngine {
        &self.engine
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.engine.stop_handle()
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
        save_or_log(&mut self.store, HISTORY_KEY, &self.history);
    }

    /// Replays stored history through `renderer`.
    pub fn replay(&self, renderer: &mut impl Renderer) {
        for entry in &self.history {
            renderer.show(&entry.content, entry.speaker);
        }
    }

    /// Handles one line of user input. Blank input is ignored.
    pub async fn submit<R: Renderer>(&mut self, text: &str, renderer: &mut R) -> Option<Exchange> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        renderer.show(text, Speaker::User);
        self.record(Speaker::User, text);

        let exchange = match self.mode {
            Mode::Chat => self.chat(text, renderer).await?,
            Mode::Convert => {
                let reply = convert_ip(text).unwrap_or_else(|_| INVALID_ADDRESS.to_string());
                renderer.show(&reply, Speaker::Bot);
                Exchange {
                    reply,
                    source: None,
                    stopped: false,
                }
            }
        };
        self.record(Speaker::Bot, &exchange.reply);
        Some(exchange)
    }

    async fn chat<R: Renderer>(&mut self, text: &str, renderer: &mut R) -> Option<Exchange> {
        let result = self.engine.resolve(text, |partial| renderer.stream(partial)).await;
        let mut exchange = match result {
            Ok(reply) => Exchange {
                reply: reply.text,
                source: Some(reply.source),
                stopped: false,
            },
            Err(EngineError::Aborted { partial }) => Exchange {
                reply: partial,
                source: None,
                stopped: true,
            },
            Err(e) => {
                error!(error = %e, "chat failed");
                renderer.show(FAILURE_NOTICE, Speaker::Bot);
                return None;
            }
        };

        if exchange.reply.is_empty() {
            exchange.reply = SILENT_REPLY.to_string();
        }
        renderer.finish(&exchange.reply);
        save_or_log(&mut self.store, CONTEXT_KEY, &self.engine.context().snapshot());
        Some(exchange)
    }

    fn record(&mut self, speaker: Speaker, content: &str) {
        self.history.push(HistoryEntry {
            speaker,
            content: content.to_string(),
            mode: self.mode,
            timestamp: Utc::now(),
        });
        save_or_log(&mut self.store, HISTORY_KEY, &self.history);
    }
}
