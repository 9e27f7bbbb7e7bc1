// File: src/generation/coordinator.rs
use crate::error::GenerationError;
use crate::generation::model::{GenerationParams, LanguageModel};
use crate::generation::protocol::{RequestId, WorkerCommand, WorkerEvent};
use crate::generation::worker::spawn_worker;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Lifecycle of the request in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Pending,
    Streaming,
    Completed,
    Aborted,
    Failed,
}

impl RequestState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RequestState::Completed | RequestState::Aborted | RequestState::Failed
        )
    }
}

enum Outcome {
    Completed(String),
    Aborted,
    Failed(String),
}

impl Outcome {
    fn state(&self) -> RequestState {
        match self {
            Outcome::Completed(_) => RequestState::Completed,
            Outcome::Aborted => RequestState::Aborted,
            Outcome::Failed(_) => RequestState::Failed,
        }
    }
}

/// The single request the coordinator is waiting on. Dropped, together with
/// its channels, as soon as it reaches a terminal state.
struct PendingRequest {
    id: RequestId,
    state: RequestState,
    updates: mpsc::UnboundedSender<String>,
    done: oneshot::Sender<Outcome>,
}

type Slot = Arc<Mutex<Option<PendingRequest>>>;

fn lock(slot: &Slot) -> MutexGuard<'_, Option<PendingRequest>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Sends `stop` to the background generator. Cheap to clone and usable while
/// a `generate` call is awaiting.
#[derive(Clone)]
pub struct StopHandle {
    commands: mpsc::UnboundedSender<WorkerCommand>,
    pending: Slot,
}

impl StopHandle {
    /// Returns false if the generator is gone.
    pub fn stop(&self) -> bool {
        self.commands.send(WorkerCommand::Stop).is_ok()
    }

    /// Whether a generation request is in flight right now.
    pub fn is_generating(&self) -> bool {
        lock(&self.pending).is_some()
    }
}

/// Bridges requests to the background generator and exposes each one as a
/// single awaitable call. At most one request is in flight.
pub struct GenerationCoordinator {
    commands: mpsc::UnboundedSender<WorkerCommand>,
    pending: Slot,
    ready: watch::Receiver<bool>,
    next_id: AtomicU64,
    dispatcher: JoinHandle<()>,
}

impl GenerationCoordinator {
    /// Starts a worker thread around `model`, asks it to load, and begins
    /// routing its events. Must be called inside a tokio runtime.
    pub fn spawn<M: LanguageModel>(
        model: M,
        persona: String,
        params: GenerationParams,
    ) -> io::Result<Self> {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        spawn_worker(model, persona, params, command_rx, event_tx)?;
        let coordinator = Self::connect(command_tx, event_rx);
        if coordinator.commands.send(WorkerCommand::Load).is_err() {
            return Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "generator worker exited during start-up",
            ));
        }
        Ok(coordinator)
    }

    /// Attaches to an already running generator through its channels.
    pub fn connect(
        commands: mpsc::UnboundedSender<WorkerCommand>,
        events: mpsc::UnboundedReceiver<WorkerEvent>,
    ) -> Self {
        let pending: Slot = Arc::new(Mutex::new(None));
        let (ready_tx, ready_rx) = watch::channel(false);
        let dispatcher = tokio::spawn(dispatch(events, Arc::clone(&pending), ready_tx));
        Self {
            commands,
            pending,
            ready: ready_rx,
            next_id: AtomicU64::new(1),
            dispatcher,
        }
    }

    pub fn is_ready(&self) -> bool {
        *self.ready.borrow()
    }

    /// Waits for the model to report ready. Returns false if the generator
    /// went away first.
    pub async fn wait_until_ready(&self) -> bool {
        let mut ready = self.ready.clone();
        let loaded = ready.wait_for(|r| *r).await.is_ok();
        loaded
    }

    pub fn is_busy(&self) -> bool {
        lock(&self.pending).is_some()
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            commands: self.commands.clone(),
            pending: Arc::clone(&self.pending),
        }
    }

    /// Runs one request to its end, relaying partial text to `on_chunk` on
    /// the caller's task. Fails with `Busy` if another request is in flight.
    pub async fn generate<F>(
        &self,
        utterance: &str,
        context: Vec<String>,
        mut on_chunk: F,
    ) -> Result<String, GenerationError>
    where
        F: FnMut(&str),
    {
        let id = RequestId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (update_tx, mut update_rx) = mpsc::unbounded_channel();
        let (done_tx, mut done_rx) = oneshot::channel();

        {
            let mut slot = lock(&self.pending);
            if slot.is_some() {
                return Err(GenerationError::Busy);
            }
            *slot = Some(PendingRequest {
                id,
                state: RequestState::Pending,
                updates: update_tx,
                done: done_tx,
            });
        }

        let command = WorkerCommand::Generate {
            request: id,
            utterance: utterance.to_string(),
            context,
        };
        if self.commands.send(command).is_err() {
            lock(&self.pending).take();
            return Err(GenerationError::WorkerUnavailable);
        }
        debug!(request = %id, "generation requested");

        let mut partial = String::new();
        let outcome = loop {
            tokio::select! {
                biased;
                Some(token) = update_rx.recv() => {
                    on_chunk(&token);
                    partial = token;
                }
                outcome = &mut done_rx => break outcome,
            }
        };
        // Updates queued ahead of the terminal event still belong to this request.
        while let Ok(token) = update_rx.try_recv() {
            on_chunk(&token);
            partial = token;
        }

        match outcome {
            Ok(Outcome::Completed(text)) => Ok(text),
            Ok(Outcome::Aborted) => Err(GenerationError::Aborted { partial }),
            Ok(Outcome::Failed(detail)) => Err(GenerationError::Failed(detail)),
            Err(_) => Err(GenerationError::WorkerUnavailable),
        }
    }
}

impl Drop for GenerationCoordinator {
    fn drop(&mut self) {
        self.dispatcher.abort();
    }
}

/// Routes worker events to the pending request. Events for any other
/// request id, or arriving after the request settled, are dropped.
async fn dispatch(
    mut events: mpsc::UnboundedReceiver<WorkerEvent>,
    pending: Slot,
    ready: watch::Sender<bool>,
) {
    while let Some(event) = events.recv().await {
        match event {
            WorkerEvent::Loading => info!("generator loading model"),
            WorkerEvent::Ready => {
                info!("generator ready");
                ready.send_replace(true);
            }
            WorkerEvent::Update { request, token } => {
                let mut slot = lock(&pending);
                match slot.as_mut() {
                    Some(req) if req.id == request => {
                        req.state = RequestState::Streaming;
                        // The caller may have dropped its future; the request
                        // still runs to its terminal event.
                        let _ = req.updates.send(token);
                    }
                    _ => debug!(%request, "ignoring stray update"),
                }
            }
            WorkerEvent::Complete { request, output } => {
                settle(&pending, request, Outcome::Completed(output))
            }
            WorkerEvent::Aborted { request } => settle(&pending, request, Outcome::Aborted),
            WorkerEvent::Error {
                request: Some(request),
                error,
            } => settle(&pending, request, Outcome::Failed(error)),
            WorkerEvent::Error {
                request: None,
                error,
            } => warn!(%error, "generator reported an error"),
        }
    }

    warn!("generator worker disconnected");
    ready.send_replace(false);
    // Dropping the request wakes its caller with WorkerUnavailable.
    lock(&pending).take();
}

fn settle(pending: &Slot, request: RequestId, outcome: Outcome) {
    let mut slot = lock(pending);
    let matches = slot.as_ref().is_some_and(|req| req.id == request);
    if !matches {
        debug!(%request, "ignoring late terminal event");
        return;
    }
    if let Some(req) = slot.take() {
        debug_assert!(!req.state.is_terminal());
        let state = outcome.state();
        debug!(%request, from = ?req.state, to = ?state, "request settled");
        let _ = req.done.send(outcome);
    }
}
