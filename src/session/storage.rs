use crate::error::SessionError;
use crate::session::types::{HistoryEntry, SessionContext, SessionId};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Per-session conversation state
#[async_trait]
pub trait ContextStore: Send + Sync + std::fmt::Debug {
    /// Context of `id`; an unknown session yields an empty context
    async fn get(&self, id: &SessionId) -> Result<SessionContext, SessionError>;
    async fn set(&self, id: &SessionId, context: SessionContext) -> Result<(), SessionError>;
    /// Returns whether a context existed
    async fn reset(&self, id: &SessionId) -> Result<bool, SessionError>;
    /// Pushes `entry` and trims the history to the store's limit
    async fn append_history(&self, id: &SessionId, entry: HistoryEntry)
        -> Result<(), SessionError>;
}

#[derive(Debug)]
pub struct MemoryContextStore {
    contexts: Arc<RwLock<HashMap<SessionId, SessionContext>>>,
    history_limit: usize,
}

impl MemoryContextStore {
    pub fn new(history_limit: usize) -> Self {
        Self {
            contexts: Arc::new(RwLock::new(HashMap::new())),
            history_limit,
        }
    }

    pub fn history_limit(&self) -> usize {
        self.history_limit
    }

    pub async fn len(&self) -> usize {
        self.contexts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.contexts.read().await.is_empty()
    }
}

impl Default for MemoryContextStore {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_HISTORY_LIMIT)
    }
}

#[async_trait]
impl ContextStore for MemoryContextStore {
    async fn get(&self, id: &SessionId) -> Result<SessionContext, SessionError> {
        let contexts = self.contexts.read().await;
        Ok(contexts.get(id).cloned().unwrap_or_default())
    }

    async fn set(&self, id: &SessionId, mut context: SessionContext) -> Result<(), SessionError> {
        while context.conversation_history.len() > self.history_limit {
            context.conversation_history.pop_front();
        }
        context.touch();
        let mut contexts = self.contexts.write().await;
        contexts.insert(id.clone(), context);
        Ok(())
    }

    async fn reset(&self, id: &SessionId) -> Result<bool, SessionError> {
        let mut contexts = self.contexts.write().await;
        Ok(contexts.remove(id).is_some())
    }

    async fn append_history(
        &self,
        id: &SessionId,
        entry: HistoryEntry,
    ) -> Result<(), SessionError> {
        let mut contexts = self.contexts.write().await;
        contexts
            .entry(id.clone())
            .or_default()
            .push_history(entry, self.history_limit);
        Ok(())
    }
}
