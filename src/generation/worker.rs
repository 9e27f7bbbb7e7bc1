// File: src/generation/worker.rs
use crate::error::ModelError;
use crate::generation::model::{GenerationParams, LanguageModel};
use crate::generation::prompt::ChatPrompt;
use crate::generation::protocol::{RequestId, WorkerCommand, WorkerEvent};
use std::collections::VecDeque;
use std::io;
use std::ops::ControlFlow;
use std::thread::{self, JoinHandle};
use tokio::sync::mpsc::{error::TryRecvError, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, trace, warn};

/// The background generation context. Owns the model and talks to the
/// foreground only through the two channels.
struct Worker<M> {
    model: M,
    loaded: bool,
    persona: String,
    params: GenerationParams,
    commands: UnboundedReceiver<WorkerCommand>,
    events: UnboundedSender<WorkerEvent>,
    /// Commands that arrived while a request was running.
    deferred: VecDeque<WorkerCommand>,
}

/// Starts the worker on its own thread. The thread exits once every command
/// sender is dropped.
pub fn spawn_worker<M: LanguageModel>(
    model: M,
    persona: String,
    params: GenerationParams,
    commands: UnboundedReceiver<WorkerCommand>,
    events: UnboundedSender<WorkerEvent>,
) -> io::Result<JoinHandle<()>> {
    let worker = Worker {
        model,
        loaded: false,
        persona,
        params,
        commands,
        events,
        deferred: VecDeque::new(),
    };
    thread::Builder::new()
        .name("generator".to_string())
        .spawn(move || worker.run())
}

impl<M: LanguageModel> Worker<M> {
    fn run(mut self) {
        debug!("generator worker started");
        loop {
            let command = match self.deferred.pop_front() {
                Some(command) => command,
                None => match self.commands.blocking_recv() {
                    Some(command) => command,
                    None => break,
                },
            };
            self.handle(command);
        }
        debug!("generator worker stopped");
    }

    fn handle(&mut self, command: WorkerCommand) {
        match command {
            WorkerCommand::Load => self.load(),
            WorkerCommand::Generate {
                request,
                utterance,
                context,
            } => self.generate(request, &utterance, &context),
            WorkerCommand::Stop => trace!("stop received with nothing in flight"),
        }
    }

    fn emit(&self, event: WorkerEvent) {
        // The foreground may already be gone; nothing left to tell.
        let _ = self.events.send(event);
    }

    fn load(&mut self) {
        self.emit(WorkerEvent::Loading);
        match self.model.load() {
            Ok(()) => {
                self.loaded = true;
                info!("model loaded");
                self.emit(WorkerEvent::Ready);
            }
            Err(e) => {
                warn!(error = %e, "model failed to load");
                self.emit(WorkerEvent::Error {
                    request: None,
                    error: e.to_string(),
                });
            }
        }
    }

    fn generate(&mut self, request: RequestId, utterance: &str, context: &[String]) {
        if !self.loaded {
            self.emit(WorkerEvent::Error {
                request: Some(request),
                error: ModelError::NotLoaded.to_string(),
            });
            return;
        }

        let Worker {
            model,
            persona,
            params,
            commands,
            events,
            deferred,
            ..
        } = self;
        let prompt = ChatPrompt::new(persona, context, params.context_turns, utterance);
        let rendered = prompt.render();
        let mut stopping = false;

        debug!(%request, "generation started");
        let result = model.generate(&rendered, params, &mut |decoded: &str| {
            loop {
                match commands.try_recv() {
                    Ok(WorkerCommand::Stop) => stopping = true,
                    Ok(other) => deferred.push_back(other),
                    Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
                }
            }
            if stopping {
                return ControlFlow::Break(());
            }
            let _ = events.send(WorkerEvent::Update {
                request,
                token: prompt.clean_partial(decoded),
            });
            ControlFlow::Continue(())
        });

        let terminal = match result {
            Ok(text) => WorkerEvent::Complete {
                request,
                output: prompt.clean_final(&text),
            },
            Err(ModelError::Interrupted) => {
                debug!(%request, "generation aborted");
                WorkerEvent::Aborted { request }
            }
            Err(e) => {
                warn!(%request, error = %e, "generation failed");
                WorkerEvent::Error {
                    request: Some(request),
                    error: e.to_string(),
                }
            }
        };
        let _ = events.send(terminal);
    }
}
