use std::sync::Arc;

use chatflow::prelude::*;
use chatflow::{ConsoleMessageSender, InMemoryStateStore};
use serde_json::json;

#[tokio::test]
async fn prelude_is_enough_to_run_an_inline_flow() {
    let store = Arc::new(InMemoryStateStore::new());
    let mut orchestrator = ChatOrchestrator::new(Arc::clone(&store), ConsoleMessageSender::new());
    orchestrator
        .register_steps(&StepDeclarations::new().with(
            "start",
            "fn start(chat_id, user_input, context, sender) { context[\"seen\"] = user_input; return (\"start\", context); }",
        ))
        .unwrap();

    orchestrator.handle_message("c1", "hi").await.unwrap();

    let state = store.get_state("c1").await.unwrap();
    assert_eq!(state.state_id.as_deref(), Some("start"));
    assert_eq!(Value::Object(state.context), json!({"seen": "hi"}));
}
