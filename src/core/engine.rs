use crate::config::EngineConfig;
use crate::core::context::ContextWindow;
use crate::core::normalizer::Normalizer;
use crate::core::scorer::PatternScorer;
use crate::core::streamer::stream_reply;
use crate::core::table::ResponseTable;
use crate::core::types::{Reply, ReplySource};
use crate::error::{ConfigError, EngineError, GenerationError};
use crate::generation::{GenerationCoordinator, LanguageModel, StopHandle};
use rand::seq::SliceRandom;
use tracing::{debug, instrument};

// The main chat engine is composed of the text pipeline, the context window
// and the coordinator for the background generator.
pub struct ChatEngine {
    config: EngineConfig,
    table: ResponseTable,
    normalizer: Normalizer,
    scorer: PatternScorer,
    context: ContextWindow,
    coordinator: GenerationCoordinator,
}

impl ChatEngine {
    pub fn new(
        config: EngineConfig,
        table: ResponseTable,
        coordinator: GenerationCoordinator,
    ) -> Result<Self, ConfigError> {
        let normalizer = Normalizer::new(&table.synonyms)?;
        let scorer = PatternScorer::new(table.scored_patterns(), config.scorer_settings())?;
        let context = ContextWindow::new(config.context_capacity);
        Ok(Self {
            config,
            table,
            normalizer,
            scorer,
            context,
            coordinator,
        })
    }

    /// Builds the engine and starts a background generator around `model`.
    /// Must be called inside a tokio runtime.
    pub fn with_model<M: LanguageModel>(
        config: EngineConfig,
        table: ResponseTable,
        model: M,
    ) -> Result<Self, ConfigError> {
        let coordinator = GenerationCoordinator::spawn(
            model,
            config.persona.clone(),
            config.generation.clone(),
        )
        .map_err(ConfigError::Worker)?;
        Self::new(config, table, coordinator)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn context(&self) -> &ContextWindow {
        &self.context
    }

    /// Replaces the context window with persisted entries.
    pub fn restore_context(&mut self, entries: Vec<String>) {
        self.context = ContextWindow::from_entries(self.config.context_capacity, entries);
    }

    pub fn is_ready(&self) -> bool {
        self.coordinator.is_ready()
    }

    pub async fn wait_until_ready(&self) -> bool {
        self.coordinator.wait_until_ready().await
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.coordinator.stop_handle()
    }

    /// Resolves one utterance to a reply, streaming partial text through
    /// `on_chunk`.
    ///
    /// A canned pattern wins when it clears the threshold. Otherwise the
    /// background generator answers, or a warming-up notice is returned if
    /// it has not loaded yet. The utterance enters the context window after
    /// every exchange that produced text, aborted generations included.
    #[instrument(skip_all, fields(chars = utterance.len()))]
    pub async fn resolve<F>(&mut self, utterance: &str, mut on_chunk: F) -> Result<Reply, EngineError>
    where
        F: FnMut(&str),
    {
        let normalized = self.normalizer.normalize(utterance);
        if normalized.is_empty() {
            debug!("nothing left after cleanup");
            self.context.push(utterance);
            return Ok(Reply::new(
                self.config.empty_input_reply.clone(),
                ReplySource::EmptyInput,
            ));
        }

        let ready = self.coordinator.is_ready();
        if let Some(hit) = self.scorer.score(&normalized, &self.context, ready) {
            let chosen = self
                .table
                .replies(&hit.pattern)
                .and_then(|replies| replies.choose(&mut rand::thread_rng()))
                .cloned();
            if let Some(reply) = chosen {
                debug!(pattern = %hit.pattern, score = hit.score, "canned reply");
                let text = stream_reply(&reply, self.config.stream_delay(), &mut on_chunk).await;
                self.context.push(utterance);
                return Ok(Reply::new(
                    text,
                    ReplySource::Canned {
                        pattern: hit.pattern,
                        score: hit.score,
                    },
                ));
            }
        }

        if !ready {
            debug!("generator not ready");
            self.context.push(utterance);
            return Ok(Reply::new(
                self.config.warming_up_reply.clone(),
                ReplySource::WarmingUp,
            ));
        }

        let result = self
            .coordinator
            .generate(utterance, self.context.snapshot(), &mut on_chunk)
            .await;
        match result {
            Ok(text) => {
                self.context.push(utterance);
                Ok(Reply::new(text, ReplySource::Generated))
            }
            Err(GenerationError::Aborted { partial }) => {
                self.context.push(utterance);
                Err(EngineError::Aborted { partial })
            }
            Err(e) => Err(e.into()),
        }
    }
}
