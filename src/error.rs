// File: src/error.rs
use thiserror::Error;

/// Failures surfaced by the resolution entry point.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The caller asked the generator to stop. `partial` holds the last text
    /// streamed before the stop was observed.
    #[error("generation aborted")]
    Aborted { partial: String },

    #[error("generation failed: {0}")]
    Generation(String),

    #[error("a generation request is already in flight")]
    Busy,

    #[error("background generator is not running")]
    WorkerUnavailable,
}

/// Failures of a single request handled by the generation coordinator.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GenerationError {
    #[error("generation aborted")]
    Aborted { partial: String },

    #[error("generation failed: {0}")]
    Failed(String),

    #[error("a generation request is already in flight")]
    Busy,

    #[error("background generator is not running")]
    WorkerUnavailable,
}

impl From<GenerationError> for EngineError {
    fn from(err: GenerationError) -> Self {
        match err {
            GenerationError::Aborted { partial } => EngineError::Aborted { partial },
            GenerationError::Failed(detail) => EngineError::Generation(detail),
            GenerationError::Busy => EngineError::Busy,
            GenerationError::WorkerUnavailable => EngineError::WorkerUnavailable,
        }
    }
}

/// Errors raised by a [`crate::generation::LanguageModel`] implementation.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model not loaded")]
    NotLoaded,

    /// The step callback asked to stop.
    #[error("generation interrupted")]
    Interrupted,

    #[error("{0}")]
    Backend(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store i/o failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("store file is not valid: {0}")]
    Encoding(#[from] bincode::Error),

    #[error("stored value is not valid json: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("pattern '{0}' has no replies")]
    EmptyReplies(String),

    #[error("could not compile matcher: {0}")]
    Regex(#[from] regex::Error),

    #[error("could not start generator worker: {0}")]
    Worker(#[source] std::io::Error),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IpConvertError {
    #[error("'{0}' is neither a dotted-decimal nor a dotted-binary IPv4 address")]
    Unrecognized(String),
}
