use serde_json::Value;

use crate::sender::MessageSender;
use crate::state::{Context, Transition};
use crate::ChatflowError;

pub type StepResult = Result<Transition, ChatflowError>;

/// Computes the next state of a chat from the current input and context.
///
/// Handlers may send messages through `sender` but keep no mutable state of
/// their own; the registry shares one instance across every chat.
#[async_trait::async_trait]
pub trait StepHandler: Send + Sync {
    async fn handle(
        &self,
        chat_id: &str,
        user_input: &Value,
        context: Context,
        sender: &dyn MessageSender,
    ) -> StepResult;
}

/// A synchronous closure used as a step handler.
pub struct FnStep<F> {
    func: F,
}

#[async_trait::async_trait]
impl<F> StepHandler for FnStep<F>
where
    F: Fn(&str, &Value, Context, &dyn MessageSender) -> StepResult + Send + Sync,
{
    async fn handle(
        &self,
        chat_id: &str,
        user_input: &Value,
        context: Context,
        sender: &dyn MessageSender,
    ) -> StepResult {
        (self.func)(chat_id, user_input, context, sender)
    }
}

pub fn handler_fn<F>(func: F) -> FnStep<F>
where
    F: Fn(&str, &Value, Context, &dyn MessageSender) -> StepResult + Send + Sync,
{
    FnStep { func }
}
