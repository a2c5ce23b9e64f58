use std::time::{SystemTime, UNIX_EPOCH};

use chatflow_core::{Context, ConversationState, StateStore};
use chatflow_store_redis::{redis_state_key, RedisStateStore};
use fred::interfaces::KeysInterface;
use serde_json::json;

fn redis_test_url() -> String {
    std::env::var("REDIS_TEST_URL")
        .expect("REDIS_TEST_URL must be set to run Redis integration tests")
}

fn unique_namespace(prefix: &str) -> String {
    let nonce = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time should move forward")
        .as_nanos();
    format!("{prefix}-{nonce}")
}

fn context(value: serde_json::Value) -> Context {
    value.as_object().cloned().expect("object")
}

#[tokio::test]
#[ignore = "requires REDIS_TEST_URL"]
async fn set_then_get_roundtrip() {
    let store = RedisStateStore::new(&redis_test_url(), unique_namespace("chatflow-rt"))
        .await
        .expect("redis store should connect");

    store
        .set_state("whatsapp:+15550001", "confirm", &context(json!({"x": 1, "tags": ["a"]})))
        .await
        .expect("state should save");

    let state = store
        .get_state("whatsapp:+15550001")
        .await
        .expect("state should load");
    assert_eq!(
        state,
        ConversationState::new("confirm", context(json!({"x": 1, "tags": ["a"]})))
    );
}

#[tokio::test]
#[ignore = "requires REDIS_TEST_URL"]
async fn missing_deleted_and_malformed_records_read_as_empty() {
    let namespace = unique_namespace("chatflow-empty");
    let store = RedisStateStore::new(&redis_test_url(), namespace.clone())
        .await
        .expect("redis store should connect");

    assert!(store.get_state("nobody").await.unwrap().is_empty());

    store.set_state("c1", "start", &Context::new()).await.unwrap();
    store.delete_state("c1").await.unwrap();
    assert!(store.get_state("c1").await.unwrap().is_empty());
    store.delete_state("c1").await.expect("deleting twice is fine");

    store
        .client()
        .set::<(), _, _>(redis_state_key(&namespace, "c2"), "{not json", None, None, false)
        .await
        .unwrap();
    assert!(store.get_state("c2").await.unwrap().is_empty());
}

#[tokio::test]
#[ignore = "requires REDIS_TEST_URL"]
async fn ttl_is_applied_on_write() {
    let namespace = unique_namespace("chatflow-ttl");
    let store = RedisStateStore::new(&redis_test_url(), namespace.clone())
        .await
        .expect("redis store should connect")
        .with_ttl(120);

    store.set_state("c1", "start", &Context::new()).await.unwrap();
    let ttl: i64 = store
        .client()
        .ttl(redis_state_key(&namespace, "c1"))
        .await
        .unwrap();
    assert!(ttl > 0 && ttl <= 120, "ttl was {ttl}");
}

#[tokio::test]
#[ignore = "requires REDIS_TEST_URL"]
async fn glob_characters_are_ordinary_chat_id_characters() {
    let store = RedisStateStore::new(&redis_test_url(), unique_namespace("chatflow-glob"))
        .await
        .expect("redis store should connect");
    store
        .set_state("promo*", "offer", &Context::new())
        .await
        .expect("set");
    assert_eq!(
        store.get_state("promo*").await.expect("get").state_id.as_deref(),
        Some("offer")
    );
    assert!(store.get_state("promo1").await.expect("get").is_empty());
    assert!(store.get_state("").await.is_err());
    assert!(store.get_state("a\r\nb").await.is_err());
}
