mod support;

use std::sync::{Arc, Mutex};

use chatflow_core::{
    handler_fn, ChatflowError, Context, ConversationState, MessageSender, StateStore, Transition,
    Value,
};
use chatflow_orchestrator::{ChatOrchestrator, OrchestratorConfig, OrchestratorError};
use serde_json::json;
use support::{ctx, CountingStore, RecordingSender};

fn orchestrator() -> (ChatOrchestrator, Arc<CountingStore>, Arc<RecordingSender>) {
    let store = Arc::new(CountingStore::default());
    let sender = Arc::new(RecordingSender::default());
    let orchestrator = ChatOrchestrator::new(Arc::clone(&store), Arc::clone(&sender));
    (orchestrator, store, sender)
}

/// A `start` handler that records the context it was given.
fn recording_start(seen: Arc<Mutex<Vec<Context>>>) -> impl chatflow_core::StepHandler {
    handler_fn(move |_chat_id, _input, context, _sender| {
        seen.lock().unwrap().push(context);
        Ok(Transition::new("confirm", ctx(json!({"x": 1}))))
    })
}

#[tokio::test]
async fn first_message_runs_initial_handler_on_empty_context() {
    let (mut orchestrator, store, sender) = orchestrator();
    let seen = Arc::new(Mutex::new(Vec::new()));
    orchestrator.register_step("start", recording_start(Arc::clone(&seen)));

    orchestrator.handle_message("c1", "hi").await.unwrap();

    assert_eq!(*seen.lock().unwrap(), vec![Context::new()]);
    assert_eq!(
        store.inner.get_state("c1").await.unwrap(),
        ConversationState::new("confirm", ctx(json!({"x": 1})))
    );
    assert_eq!(store.reads(), 1);
    assert_eq!(store.writes(), 1);
    assert!(sender.texts().is_empty());
}

#[tokio::test]
async fn unknown_state_sends_one_notice_and_restarts_from_initial_state() {
    let (mut orchestrator, store, sender) = orchestrator();
    let seen = Arc::new(Mutex::new(Vec::new()));
    orchestrator.register_step("start", recording_start(Arc::clone(&seen)));
    store
        .inner
        .set_state("c2", "ghost", &ctx(json!({"stale": true})))
        .await
        .unwrap();

    orchestrator.handle_message("c2", "hello").await.unwrap();

    assert_eq!(
        sender.texts(),
        vec!["Unknown state: ghost. Resetting to initial state."]
    );
    assert_eq!(sender.sent.lock().unwrap()[0].0, "c2");
    assert_eq!(*seen.lock().unwrap(), vec![Context::new()]);
    let state = store.inner.get_state("c2").await.unwrap();
    assert_eq!(state.state_id.as_deref(), Some("confirm"));
    assert_eq!(store.reads(), 1);
    assert_eq!(store.writes(), 1);
}

#[tokio::test]
async fn missing_initial_handler_is_a_configuration_error() {
    let (mut orchestrator, store, sender) = orchestrator();
    orchestrator.register_step(
        "other",
        handler_fn(|_, _, context, _| Ok(Transition::new("other", context))),
    );

    let err = orchestrator.handle_message("c1", "hi").await.unwrap_err();
    assert!(matches!(
        err,
        OrchestratorError::InitialStateNotFound { ref initial_state_id }
            if initial_state_id == "start"
    ));
    assert!(err.is_configuration());
    assert_eq!(err.to_string(), "No handler registered for initial state: start");

    store
        .inner
        .set_state("c2", "ghost", &Context::new())
        .await
        .unwrap();
    let err = orchestrator.handle_message("c2", "hi").await.unwrap_err();
    assert!(matches!(err, OrchestratorError::InitialStateNotFound { .. }));

    assert_eq!(store.writes(), 0);
    // The fallback notice goes out before the initial handler lookup fails.
    assert_eq!(sender.texts().len(), 2);
}

#[tokio::test]
async fn configured_initial_state_and_notice_template() {
    let store = Arc::new(CountingStore::default());
    let sender = Arc::new(RecordingSender::default());
    let mut orchestrator = ChatOrchestrator::new(Arc::clone(&store), Arc::clone(&sender))
        .with_config(
            OrchestratorConfig::default()
                .with_initial_state_id("welcome")
                .with_unknown_state_message("{{oops}} '{state_id}' expired"),
        );
    orchestrator.register_step(
        "welcome",
        handler_fn(|_, _, _, _| Ok(Transition::to("menu"))),
    );
    store
        .inner
        .set_state("c1", "legacy", &Context::new())
        .await
        .unwrap();

    orchestrator.handle_message("c1", "hi").await.unwrap();

    assert_eq!(sender.texts(), vec!["{oops} 'legacy' expired"]);
    assert_eq!(
        store.inner.get_state("c1").await.unwrap().state_id.as_deref(),
        Some("menu")
    );
}

#[tokio::test]
async fn handler_failure_leaves_stored_state_untouched() {
    let (mut orchestrator, store, _sender) = orchestrator();
    orchestrator.register_step(
        "ask",
        handler_fn(|_, _, _, _| Err(ChatflowError::handler("payment service down"))),
    );
    store
        .inner
        .set_state("c1", "ask", &ctx(json!({"n": 1})))
        .await
        .unwrap();

    let err = orchestrator.handle_message("c1", "pay").await.unwrap_err();
    assert!(matches!(
        err,
        OrchestratorError::Runtime(ChatflowError::Handler(_))
    ));
    assert!(!err.is_configuration());
    assert_eq!(
        store.inner.get_state("c1").await.unwrap(),
        ConversationState::new("ask", ctx(json!({"n": 1})))
    );
    assert_eq!(store.writes(), 0);
}

#[tokio::test]
async fn handler_sees_input_and_context_and_next_state_is_not_checked() {
    let (mut orchestrator, store, sender) = orchestrator();
    orchestrator.register_step(
        "start",
        handler_fn(|chat_id, input, mut context, _| {
            context.insert("chat".into(), json!(chat_id));
            context.insert("last".into(), input.clone());
            Ok(Transition::new("nowhere", context))
        }),
    );

    orchestrator
        .handle_message("c1", json!({"text": "hi", "media": null}))
        .await
        .unwrap();
    let state = store.inner.get_state("c1").await.unwrap();
    assert_eq!(state.state_id.as_deref(), Some("nowhere"));
    assert_eq!(
        Value::Object(state.context),
        json!({"chat": "c1", "last": {"text": "hi", "media": null}})
    );

    // The unregistered state is only noticed on the next message.
    orchestrator.handle_message("c1", "again").await.unwrap();
    assert_eq!(sender.texts().len(), 1);
    assert!(sender.texts()[0].contains("nowhere"));
}

struct BrokenSender;

#[async_trait::async_trait]
impl MessageSender for BrokenSender {
    async fn send_message(
        &self,
        chat_id: &str,
        _text: &str,
        _options: Option<&Value>,
    ) -> Result<(), ChatflowError> {
        Err(ChatflowError::delivery(chat_id, "connection reset"))
    }
}

#[tokio::test]
async fn delivery_failures_propagate() {
    let store = Arc::new(CountingStore::default());
    let mut orchestrator = ChatOrchestrator::new(Arc::clone(&store), BrokenSender);
    orchestrator.register_step(
        "start",
        handler_fn(|chat_id, _, context, _| Ok(Transition::new(chat_id, context))),
    );
    store
        .inner
        .set_state("c1", "ghost", &Context::new())
        .await
        .unwrap();

    let err = orchestrator.handle_message("c1", "hi").await.unwrap_err();
    assert!(matches!(
        err,
        OrchestratorError::Runtime(ChatflowError::Delivery { .. })
    ));
    assert_eq!(store.writes(), 0);
}
