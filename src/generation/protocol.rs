// File: src/generation/protocol.rs
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies one generation request across the channel boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Messages from the foreground to the background generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WorkerCommand {
    Load,
    Generate {
        request: RequestId,
        utterance: String,
        context: Vec<String>,
    },
    /// Abandon the request in flight, if any. Observed between decode steps.
    Stop,
}

/// Messages from the background generator to the foreground.
///
/// For any request exactly one of `Complete`, `Aborted` or `Error` is sent,
/// and nothing for that request follows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum WorkerEvent {
    Loading,
    Ready,
    Update {
        request: RequestId,
        token: String,
    },
    Complete {
        request: RequestId,
        output: String,
    },
    Aborted {
        request: RequestId,
    },
    /// `request` is `None` for failures outside a request, such as loading.
    Error {
        request: Option<RequestId>,
        error: String,
    },
}

impl WorkerEvent {
    pub fn request(&self) -> Option<RequestId> {
        match self {
            WorkerEvent::Loading | WorkerEvent::Ready => None,
            WorkerEvent::Update { request, .. }
            | WorkerEvent::Complete { request, .. }
            | WorkerEvent::Aborted { request } => Some(*request),
            WorkerEvent::Error { request, .. } => *request,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WorkerEvent::Complete { .. }
                | WorkerEvent::Aborted { .. }
                | WorkerEvent::Error { request: Some(_), .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn command_wire_shape() {
        let cmd = WorkerCommand::Generate {
            request: RequestId(7),
            utterance: "hi".into(),
            context: vec!["earlier".into()],
        };
        assert_eq!(
            serde_json::to_value(&cmd).unwrap(),
            json!({ "type": "generate", "request": 7, "utterance": "hi", "context": ["earlier"] })
        );
        assert_eq!(serde_json::to_value(WorkerCommand::Stop).unwrap(), json!({ "type": "stop" }));
    }

    #[test]
    fn event_wire_shape() {
        let event: WorkerEvent =
            serde_json::from_value(json!({ "status": "update", "request": 3, "token": "Hel" })).unwrap();
        assert_eq!(
            event,
            WorkerEvent::Update {
                request: RequestId(3),
                token: "Hel".into()
            }
        );
        assert_eq!(serde_json::to_value(WorkerEvent::Ready).unwrap(), json!({ "status": "ready" }));
    }

    #[test]
    fn terminal_events() {
        let id = RequestId(1);
        assert!(WorkerEvent::Complete { request: id, output: String::new() }.is_terminal());
        assert!(WorkerEvent::Aborted { request: id }.is_terminal());
        assert!(WorkerEvent::Error { request: Some(id), error: "x".into() }.is_terminal());
        assert!(!WorkerEvent::Error { request: None, error: "x".into() }.is_terminal());
        assert!(!WorkerEvent::Update { request: id, token: String::new() }.is_terminal());
    }
}
