pub mod coordinator;
pub mod model;
pub mod prompt;
pub mod protocol;
pub mod worker;

pub use coordinator::{GenerationCoordinator, RequestState, StopHandle};
pub use model::{GenerationParams, LanguageModel, ScriptedModel};
pub use protocol::{RequestId, WorkerCommand, WorkerEvent};
