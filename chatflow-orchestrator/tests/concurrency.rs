mod support;

use std::sync::Arc;

use chatflow_core::{
    Context, MessageSender, StateStore, StepHandler, StepResult, Transition, Value,
};
use chatflow_orchestrator::{ChatOrchestrator, OrchestratorConfig};
use serde_json::json;
use support::{CountingStore, RecordingSender};
use tokio::sync::Barrier;

/// Increments `count`; optionally waits on a barrier between read and return.
struct Increment {
    barrier: Option<Arc<Barrier>>,
}

#[async_trait::async_trait]
impl StepHandler for Increment {
    async fn handle(
        &self,
        _chat_id: &str,
        _user_input: &Value,
        mut context: Context,
        _sender: &dyn MessageSender,
    ) -> StepResult {
        let count = context.get("count").and_then(Value::as_i64).unwrap_or(0);
        match &self.barrier {
            Some(barrier) => {
                barrier.wait().await;
            }
            None => tokio::task::yield_now().await,
        }
        context.insert("count".to_string(), json!(count + 1));
        Ok(Transition::new("start", context))
    }
}

fn count_of(context: &Context) -> i64 {
    context.get("count").and_then(Value::as_i64).unwrap_or(0)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn default_policy_lets_concurrent_messages_see_the_same_prior_state() {
    let store = Arc::new(CountingStore::default());
    let mut orchestrator =
        ChatOrchestrator::new(Arc::clone(&store), RecordingSender::default());
    orchestrator.register_step(
        "start",
        Increment {
            barrier: Some(Arc::new(Barrier::new(2))),
        },
    );
    let orchestrator = Arc::new(orchestrator);

    let tasks: Vec<_> = (0..2)
        .map(|_| {
            let orchestrator = Arc::clone(&orchestrator);
            tokio::spawn(async move { orchestrator.handle_message("c1", "+1").await })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    // Both handlers read count 0 before either wrote: one increment is lost.
    let state = store.inner.get_state("c1").await.unwrap();
    assert_eq!(count_of(&state.context), 1);
    assert_eq!(store.writes(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn serialized_policy_applies_every_increment() {
    let store = Arc::new(CountingStore::default());
    let mut orchestrator =
        ChatOrchestrator::new(Arc::clone(&store), RecordingSender::default()).with_config(
            OrchestratorConfig::default().with_serialize_per_chat(true),
        );
    orchestrator.register_step("start", Increment { barrier: None });
    let orchestrator = Arc::new(orchestrator);

    let tasks: Vec<_> = (0..10)
        .map(|i| {
            let orchestrator = Arc::clone(&orchestrator);
            let chat_id = if i % 2 == 0 { "even" } else { "odd" };
            tokio::spawn(async move { orchestrator.handle_message(chat_id, i).await })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    for chat_id in ["even", "odd"] {
        let state = store.inner.get_state(chat_id).await.unwrap();
        assert_eq!(count_of(&state.context), 5, "{chat_id}");
    }
    assert_eq!(store.writes(), 10);
}
