//! The per-session memory agent task. One `MemoryAgentRunner` is shared
//! (via `Clone`, an `Arc`-backed handle) across every session;
//! `RunnerSpawn::spawn` is what
//! `recall-registry::SessionRegistry::ensure_generator_running` calls to
//! start the per-session task under its guarded compare-and-swap.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use recall_registry::{RunnerSpawn, SessionRegistry, SessionState};
use recall_store::Store;
use recall_types::{BusEvent, EntityKind, ObservationFields, PendingEvent, SummaryFields};
use recall_vector::{VectorIndex, VectorMetadata};
use thiserror::Error;
use tokio::task::JoinHandle;

use crate::generator::{Generator, GeneratorConversation, GeneratorError, TokenUsage};
use crate::parser::{parse_observation, parse_summary, ElementScanner, RawElement};
use crate::prompts::{init_prompt, observation_event_xml, summarize_prompt_xml, CONTINUATION_PROMPT};
use recall_bus::EventBus;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Generator(#[from] GeneratorError),
    #[error(transparent)]
    Store(#[from] recall_store::error::StoreError),
}

type RuntimeResult<T> = Result<T, RuntimeError>;

/// Orchestrates one session's conversation with the generator, parses its
/// streamed output, and persists the resulting artifacts. Cheap to clone;
/// every field is itself `Clone` (a pool, an `Arc`, or a handle).
pub struct MemoryAgentRunner<G> {
    store: Store,
    vector: Arc<dyn VectorIndex>,
    bus: EventBus,
    registry: Arc<SessionRegistry>,
    generator: Arc<G>,
}

impl<G> Clone for MemoryAgentRunner<G> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            vector: self.vector.clone(),
            bus: self.bus.clone(),
            registry: self.registry.clone(),
            generator: self.generator.clone(),
        }
    }
}

impl<G: Generator + 'static> MemoryAgentRunner<G> {
    pub fn new(
        store: Store,
        vector: Arc<dyn VectorIndex>,
        bus: EventBus,
        registry: Arc<SessionRegistry>,
        generator: Arc<G>,
    ) -> Self {
        Self {
            store,
            vector,
            bus,
            registry,
            generator,
        }
    }

    async fn run_session(&self, session_db_id: i64, state: Arc<SessionState>) {
        if let Err(err) = self.run_session_inner(session_db_id, &state).await {
            tracing::error!(session_db_id, error = %err, "memory agent task failed");
        }
        self.registry.clear_handle(session_db_id).await;
        self.publish_processing_status(session_db_id).await;
    }

    async fn run_session_inner(&self, session_db_id: i64, state: &SessionState) -> RuntimeResult<()> {
        let agent_session_id = state.agent_session_id.clone();
        let user_prompt = self
            .store
            .get_session_by_agent_id(&agent_session_id)
            .await
            .ok()
            .flatten()
            .and_then(|s| s.user_prompt);

        let mut conversation = self
            .generator
            .start(&init_prompt(&state.project(), user_prompt.as_deref()))
            .await?;

        let mut first_turn = true;

        while let Some(event) = state.next_event().await {
            let project = state.project();
            let turn_text = match &event {
                PendingEvent::Observation(obs) => with_continuation_prefix(observation_event_xml(obs), first_turn),
                PendingEvent::Summarize(req) => with_continuation_prefix(summarize_prompt_xml(req), first_turn),
            };
            first_turn = false;

            let prompt_number = match &event {
                PendingEvent::Observation(obs) => obs.prompt_number,
                PendingEvent::Summarize(req) => req.prompt_number,
            };
            let (elements, usage) = self.execute_turn(conversation.as_mut(), &turn_text).await?;
            let is_summarize = matches!(event, PendingEvent::Summarize(_));
            self.persist_elements(
                session_db_id,
                &agent_session_id,
                &project,
                elements,
                usage,
                is_summarize,
                prompt_number,
            )
            .await?;

            self.publish_processing_status(session_db_id).await;
        }

        Ok(())
    }

    /// Sends one turn and drains its reply, parsing elements incrementally
    /// as their closing tags appear, without persisting yet; persistence
    /// happens once the turn's usage is known, so `discovery_tokens` is
    /// accurate for every element the turn produced (see DESIGN.md).
    async fn execute_turn(
        &self,
        conversation: &mut dyn GeneratorConversation,
        text: &str,
    ) -> RuntimeResult<(Vec<RawElement>, TokenUsage)> {
        conversation.send(text).await?;

        let mut scanner = ElementScanner::new();
        let mut usage = TokenUsage::default();
        let mut elements = Vec::new();

        loop {
            match conversation.next_chunk().await {
                Some(Ok(chunk)) => {
                    if let Some(reported) = chunk.usage {
                        usage = reported;
                    }
                    scanner.push(&chunk.text);
                    elements.extend(scanner.drain());
                }
                Some(Err(err)) => return Err(RuntimeError::Generator(err)),
                None => break,
            }
        }

        Ok((elements, usage))
    }

    /// Persists every parsed element. For a `Summarize` turn, guarantees at
    /// least one `SessionSummary` row even if the generator produced none
    /// or explicitly emitted `<skip_summary/>` (see DESIGN.md).
    async fn persist_elements(
        &self,
        session_db_id: i64,
        agent_session_id: &str,
        project: &str,
        elements: Vec<RawElement>,
        usage: TokenUsage,
        is_summarize: bool,
        prompt_number: Option<i64>,
    ) -> RuntimeResult<()> {
        let mut wrote_summary = false;

        for element in elements {
            match element {
                RawElement::Observation(raw) => {
                    let fields = parse_observation(&raw);
                    self.store_observation(session_db_id, agent_session_id, project, &fields, usage, prompt_number)
                        .await?;
                }
                RawElement::Summary(raw) => {
                    let fields = parse_summary(&raw);
                    self.store_summary(session_db_id, agent_session_id, project, &fields, usage, prompt_number)
                        .await?;
                    wrote_summary = true;
                }
                RawElement::SkipSummary => {
                    // The generator's own choice to skip is overridden: a
                    // summarize request always yields a record, even a
                    // maximally empty one.
                }
            }
        }

        if is_summarize && !wrote_summary {
            self.store_summary(
                session_db_id,
                agent_session_id,
                project,
                &SummaryFields::default(),
                usage,
                prompt_number,
            )
            .await?;
        }

        Ok(())
    }

    async fn store_observation(
        &self,
        session_db_id: i64,
        agent_session_id: &str,
        project: &str,
        fields: &ObservationFields,
        usage: TokenUsage,
        prompt_number: Option<i64>,
    ) -> RuntimeResult<()> {
        let (id, created_at) = self
            .store
            .store_observation(agent_session_id, project, fields, prompt_number, usage.input_tokens)
            .await?;

        self.sync_observation_vector(id, fields, created_at, project).await;
        self.bus
            .publish(BusEvent::ObservationStored { session_db_id, id })
            .await;
        Ok(())
    }

    async fn store_summary(
        &self,
        session_db_id: i64,
        agent_session_id: &str,
        project: &str,
        fields: &SummaryFields,
        usage: TokenUsage,
        prompt_number: Option<i64>,
    ) -> RuntimeResult<()> {
        let (id, created_at) = self
            .store
            .store_summary(agent_session_id, project, fields, prompt_number, usage.input_tokens)
            .await?;

        self.sync_summary_vector(id, fields, created_at, project).await;
        self.bus
            .publish(BusEvent::SummaryStored { session_db_id, id })
            .await;
        Ok(())
    }

    /// Best-effort mirror into the vector index. Failures never propagate;
    /// the Store remains the source of truth.
    async fn sync_observation_vector(
        &self,
        id: i64,
        fields: &ObservationFields,
        created_at: DateTime<Utc>,
        project: &str,
    ) {
        let text = [
            fields.title.as_deref().unwrap_or_default(),
            fields.subtitle.as_deref().unwrap_or_default(),
            fields.narrative.as_deref().unwrap_or_default(),
            &fields.facts.join(". "),
        ]
        .join("\n");

        let metadata = VectorMetadata {
            project: project.to_string(),
            kind: fields.resolved_kind().as_str().to_string(),
            created_at_epoch: created_at.timestamp(),
            concepts: fields.purified_concepts(),
            files: fields
                .files_read
                .iter()
                .chain(fields.files_modified.iter())
                .cloned()
                .collect(),
            prompt_number: None,
        };

        if let Err(err) = self.vector.upsert(EntityKind::Observation, id, &text, metadata).await {
            tracing::warn!(error = %err, observation_id = id, "vector sync failed for observation");
        } else if let Err(err) = self.store.set_vector_watermark("observation", id).await {
            tracing::warn!(error = %err, "failed to update observation vector watermark");
        }
    }

    async fn sync_summary_vector(&self, id: i64, fields: &SummaryFields, created_at: DateTime<Utc>, project: &str) {
        let text = [
            fields.request.as_deref().unwrap_or_default(),
            fields.investigated.as_deref().unwrap_or_default(),
            fields.learned.as_deref().unwrap_or_default(),
            fields.completed.as_deref().unwrap_or_default(),
            fields.next_steps.as_deref().unwrap_or_default(),
            fields.notes.as_deref().unwrap_or_default(),
        ]
        .join("\n");

        let metadata = VectorMetadata {
            project: project.to_string(),
            kind: "summary".to_string(),
            created_at_epoch: created_at.timestamp(),
            concepts: Vec::new(),
            files: Vec::new(),
            prompt_number: None,
        };

        if let Err(err) = self.vector.upsert(EntityKind::Summary, id, &text, metadata).await {
            tracing::warn!(error = %err, summary_id = id, "vector sync failed for summary");
        } else if let Err(err) = self.store.set_vector_watermark("summary", id).await {
            tracing::warn!(error = %err, "failed to update summary vector watermark");
        }
    }

    async fn publish_processing_status(&self, _session_db_id: i64) {
        let total = self.registry.total_active_work().await;
        self.bus
            .publish(BusEvent::ProcessingStatus {
                is_processing: total > 0,
                queue_depth: total,
            })
            .await;
    }
}

fn with_continuation_prefix(text: String, first_turn: bool) -> String {
    if first_turn {
        text
    } else {
        format!("{CONTINUATION_PROMPT}\n\n{text}")
    }
}

#[async_trait]
impl<G: Generator + 'static> RunnerSpawn for MemoryAgentRunner<G> {
    fn spawn(&self, session_db_id: i64, state: Arc<SessionState>) -> JoinHandle<()> {
        let runner = self.clone();
        tokio::spawn(async move { runner.run_session(session_db_id, state).await })
    }
}
