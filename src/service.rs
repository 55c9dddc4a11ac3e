//! Conversation service: one call per user message

use crate::config::NluConfig;
use crate::error::{Error, Result};
use crate::nlu::pipeline::{Analysis, NluPipeline};
use crate::nlu::resolver::{ContextResolution, ContextResolver};
use crate::nlu::router::{QueryRouter, Resolution};
use crate::session::{ContextStore, HistoryEntry, MemoryContextStore, SessionContext, SessionId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Everything produced by one turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnOutcome {
    pub session_id: SessionId,
    pub analysis: Analysis,
    pub slots: ContextResolution,
    pub resolution: Resolution,
    /// Context stored after the turn
    pub context: SessionContext,
}

/// NLU pipeline plus per-session context handling
#[derive(Debug)]
pub struct AdmissionsAssistant {
    pipeline: Arc<NluPipeline>,
    resolver: ContextResolver,
    router: QueryRouter,
    store: Arc<dyn ContextStore>,
    /// One lock per session id, dropped again by `reset_context`
    turn_locks: Mutex<HashMap<SessionId, Arc<Mutex<()>>>>,
}

impl AdmissionsAssistant {
    pub fn new(pipeline: NluPipeline, store: Arc<dyn ContextStore>) -> Self {
        let resolver = ContextResolver::new(pipeline.catalog().clone());
        let router = QueryRouter::new(pipeline.threshold());
        Self {
            pipeline: Arc::new(pipeline),
            resolver,
            router,
            store,
            turn_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Loads the pipeline from `config.data_dir` with an in-memory store
    pub fn load(config: &NluConfig) -> Result<Self> {
        let pipeline = NluPipeline::load(config)?;
        let store = Arc::new(MemoryContextStore::new(config.context_history_limit));
        Ok(Self::new(pipeline, store))
    }

    pub fn pipeline(&self) -> &NluPipeline {
        &self.pipeline
    }

    /// Handles one user message.
    ///
    /// The whole read-modify-write cycle on the session context runs under
    /// a per-session lock. With `use_context` false the stored context is
    /// ignored for resolution but still updated.
    pub async fn handle_message(
        &self,
        session_id: &SessionId,
        message: &str,
        use_context: bool,
    ) -> Result<TurnOutcome> {
        if message.trim().is_empty() {
            return Err(Error::InvalidInput("message must not be empty".to_string()));
        }

        let lock = self.turn_lock(session_id).await;
        let _turn = lock.lock().await;

        let current = if use_context {
            self.store.get(session_id).await?
        } else {
            SessionContext::new()
        };

        let analysis = self.pipeline.analyze(message);
        let slots = self
            .resolver
            .resolve(&analysis.intent, message, &analysis.entities, &current);
        let resolution = self
            .router
            .route(&analysis.intent, analysis.score, message, &slots);

        tracing::info!(
            session = %session_id,
            intent = %analysis.intent,
            score = analysis.score,
            category = %slots.category,
            resolution = resolution.kind(),
            "turn handled"
        );

        let response = serde_json::to_value(&resolution)?;
        self.store
            .append_history(
                session_id,
                HistoryEntry::new(message, analysis.intent.clone(), response),
            )
            .await?;

        let mut context = self.store.get(session_id).await?;
        context.last_intent = Some(analysis.intent.clone());
        context.last_entities = slots.last_entities.clone();
        self.store.set(session_id, context.clone()).await?;

        Ok(TurnOutcome {
            session_id: session_id.clone(),
            analysis,
            slots,
            resolution,
            context,
        })
    }

    pub async fn get_context(&self, session_id: &SessionId) -> Result<SessionContext> {
        Ok(self.store.get(session_id).await?)
    }

    pub async fn set_context(&self, session_id: &SessionId, context: SessionContext) -> Result<()> {
        let lock = self.turn_lock(session_id).await;
        let _turn = lock.lock().await;
        Ok(self.store.set(session_id, context).await?)
    }

    /// Forgets the session; returns whether it had a context
    pub async fn reset_context(&self, session_id: &SessionId) -> Result<bool> {
        let lock = self.turn_lock(session_id).await;
        let _turn = lock.lock().await;
        let existed = self.store.reset(session_id).await?;

        // Only the map and this call hold the lock: nobody is waiting on it,
        // and new callers must go through the map guard held here.
        let mut locks = self.turn_locks.lock().await;
        if Arc::strong_count(&lock) == 2 {
            locks.remove(session_id);
        }
        drop(locks);

        tracing::debug!(session = %session_id, existed, "context reset");
        Ok(existed)
    }

    /// Sessions that currently have a turn lock
    pub async fn tracked_sessions(&self) -> usize {
        self.turn_locks.lock().await.len()
    }

    async fn turn_lock(&self, session_id: &SessionId) -> Arc<Mutex<()>> {
        let mut locks = self.turn_locks.lock().await;
        locks
            .entry(session_id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}
