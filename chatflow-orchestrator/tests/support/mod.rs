#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use chatflow_core::{
    ChatflowError, Context, ConversationState, InMemoryStateStore, MessageSender, StateStore,
    Value,
};

#[derive(Default)]
pub struct RecordingSender {
    pub sent: Mutex<Vec<(String, String, Option<Value>)>>,
}

impl RecordingSender {
    pub fn texts(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(_, text, _)| text.clone())
            .collect()
    }
}

#[async_trait::async_trait]
impl MessageSender for RecordingSender {
    async fn send_message(
        &self,
        chat_id: &str,
        text: &str,
        options: Option<&Value>,
    ) -> Result<(), ChatflowError> {
        self.sent
            .lock()
            .unwrap()
            .push((chat_id.to_string(), text.to_string(), options.cloned()));
        Ok(())
    }
}

/// In-memory store that counts port calls.
#[derive(Default)]
pub struct CountingStore {
    pub inner: InMemoryStateStore,
    pub reads: AtomicUsize,
    pub writes: AtomicUsize,
}

impl CountingStore {
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl StateStore for CountingStore {
    async fn get_state(&self, chat_id: &str) -> Result<ConversationState, ChatflowError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.get_state(chat_id).await
    }

    async fn set_state(
        &self,
        chat_id: &str,
        state_id: &str,
        context: &Context,
    ) -> Result<(), ChatflowError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.set_state(chat_id, state_id, context).await
    }

    async fn delete_state(&self, chat_id: &str) -> Result<(), ChatflowError> {
        self.inner.delete_state(chat_id).await
    }
}

pub fn ctx(value: Value) -> Context {
    match value {
        Value::Object(map) => map,
        other => panic!("expected a JSON object, got {other}"),
    }
}
