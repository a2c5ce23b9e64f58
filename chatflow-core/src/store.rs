use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::state::{ConversationState, Context};
use crate::ChatflowError;

/// Persistence port: one `(state_id, context)` record per chat id.
#[async_trait::async_trait]
pub trait StateStore: Send + Sync {
    /// Returns [`ConversationState::empty`] when the chat has no record.
    async fn get_state(&self, chat_id: &str) -> Result<ConversationState, ChatflowError>;
    async fn set_state(
        &self,
        chat_id: &str,
        state_id: &str,
        context: &Context,
    ) -> Result<(), ChatflowError>;
    async fn delete_state(&self, chat_id: &str) -> Result<(), ChatflowError>;
}

#[async_trait::async_trait]
impl<T: StateStore + ?Sized> StateStore for Arc<T> {
    async fn get_state(&self, chat_id: &str) -> Result<ConversationState, ChatflowError> {
        (**self).get_state(chat_id).await
    }

    async fn set_state(
        &self,
        chat_id: &str,
        state_id: &str,
        context: &Context,
    ) -> Result<(), ChatflowError> {
        (**self).set_state(chat_id, state_id, context).await
    }

    async fn delete_state(&self, chat_id: &str) -> Result<(), ChatflowError> {
        (**self).delete_state(chat_id).await
    }
}

/// Volatile store; state is lost when the process exits.
#[derive(Debug, Default, Clone)]
pub struct InMemoryStateStore {
    inner: Arc<RwLock<HashMap<String, (String, Context)>>>,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|guard| guard.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait::async_trait]
impl StateStore for InMemoryStateStore {
    async fn get_state(&self, chat_id: &str) -> Result<ConversationState, ChatflowError> {
        let guard = self
            .inner
            .read()
            .map_err(|_| ChatflowError::store("lock"))?;
        Ok(guard
            .get(chat_id)
            .map(|(state_id, context)| ConversationState::new(state_id.clone(), context.clone()))
            .unwrap_or_default())
    }

    async fn set_state(
        &self,
        chat_id: &str,
        state_id: &str,
        context: &Context,
    ) -> Result<(), ChatflowError> {
        let mut guard = self
            .inner
            .write()
            .map_err(|_| ChatflowError::store("lock"))?;
        guard.insert(chat_id.to_string(), (state_id.to_string(), context.clone()));
        Ok(())
    }

    async fn delete_state(&self, chat_id: &str) -> Result<(), ChatflowError> {
        let mut guard = self
            .inner
            .write()
            .map_err(|_| ChatflowError::store("lock"))?;
        guard.remove(chat_id);
        Ok(())
    }
}
