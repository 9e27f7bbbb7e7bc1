// src/lib.rs

pub mod config;
pub mod convert;
pub mod core;
pub mod error;
pub mod fuzzy;
pub mod generation;
pub mod persistence;
pub mod session;

pub use crate::config::EngineConfig;
pub use crate::core::engine::ChatEngine;
pub use crate::core::table::ResponseTable;
pub use crate::core::types::{Reply, ReplySource};
pub use crate::error::{ConfigError, EngineError};
pub use crate::generation::{LanguageModel, ScriptedModel, StopHandle};
pub use crate::persistence::{FileStore, KeyValueStore, MemoryStore};
pub use crate::session::{ChatSession, Mode, Renderer, Speaker};
