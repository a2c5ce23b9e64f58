//! Redis [`StateStore`]: one JSON value per chat at `{namespace}:state:{chat_id}`.

mod keys;

use chatflow_core::{ChatflowError, Context, ConversationState, StateRecord, StateStore};
use fred::interfaces::KeysInterface;
use fred::prelude::*;
use fred::types::Expiration;

use crate::keys::{safe_chat_id, state_key};

pub use keys::{safe_chat_id as validate_chat_id, state_key as redis_state_key};

#[derive(Clone)]
pub struct RedisStateStore {
    client: RedisClient,
    namespace: String,
    ttl_seconds: Option<u64>,
}

impl std::fmt::Debug for RedisStateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStateStore")
            .field("namespace", &self.namespace)
            .field("ttl_seconds", &self.ttl_seconds)
            .finish()
    }
}

pub(crate) fn map_redis_error(error: RedisError) -> ChatflowError {
    ChatflowError::store(error.to_string())
}

impl RedisStateStore {
    /// Connect to `url` (e.g. `redis://127.0.0.1:6379/0`).
    pub async fn new(url: &str, namespace: impl Into<String>) -> Result<Self, ChatflowError> {
        let config = RedisConfig::from_url(url).map_err(map_redis_error)?;
        let client = RedisClient::new(config, None, None, None);
        client.init().await.map_err(map_redis_error)?;

        Ok(Self {
            client,
            namespace: namespace.into(),
            ttl_seconds: None,
        })
    }

    /// Expire each chat's record `seconds` after its last write.
    pub fn with_ttl(mut self, seconds: u64) -> Self {
        self.ttl_seconds = Some(seconds);
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn client(&self) -> &RedisClient {
        &self.client
    }

    fn key(&self, chat_id: &str) -> Result<String, ChatflowError> {
        Ok(state_key(&self.namespace, safe_chat_id(chat_id)?))
    }
}

#[async_trait::async_trait]
impl StateStore for RedisStateStore {
    async fn get_state(&self, chat_id: &str) -> Result<ConversationState, ChatflowError> {
        let key = self.key(chat_id)?;
        let payload: Option<String> = self.client.get(&key).await.map_err(map_redis_error)?;

        let Some(payload) = payload else {
            return Ok(ConversationState::empty());
        };

        match serde_json::from_str::<StateRecord>(&payload) {
            Ok(record) => Ok(ConversationState::new(record.state_id, record.context)),
            Err(error) => {
                tracing::warn!(key = %key, error = %error, "ignoring malformed state record");
                Ok(ConversationState::empty())
            }
        }
    }

    async fn set_state(
        &self,
        chat_id: &str,
        state_id: &str,
        context: &Context,
    ) -> Result<(), ChatflowError> {
        let key = self.key(chat_id)?;
        let record = StateRecord {
            state_id: state_id.to_string(),
            context: context.clone(),
        };
        let payload = serde_json::to_string(&record).map_err(|error| {
            ChatflowError::store(format!("failed to serialize state record: {error}"))
        })?;
        let expire = self
            .ttl_seconds
            .map(|seconds| Expiration::EX(i64::try_from(seconds).unwrap_or(i64::MAX)));

        self.client
            .set::<(), _, _>(key, payload, expire, None, false)
            .await
            .map_err(map_redis_error)
    }

    async fn delete_state(&self, chat_id: &str) -> Result<(), ChatflowError> {
        let key = self.key(chat_id)?;
        self.client
            .del::<i64, _>(key)
            .await
            .map(|_| ())
            .map_err(map_redis_error)
    }
}
