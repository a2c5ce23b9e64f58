//! Per-chat conversation state machines.
//!
//! Each chat has a current state id and a JSON context. An inbound message is
//! routed to the step handler registered for that state; the handler replies
//! through a [`MessageSender`] and returns the next state, which is persisted
//! in a [`StateStore`].
//!
//! Handlers are either Rust functions annotated with `#[step]` (which expands
//! to paths under `chatflow_core`, so keep that crate as a direct dependency)
//! or inline step scripts loaded from a declarations file:
//!
//! ```json
//! {
//!   "start": "my_bot.flows.greet",
//!   "echo": "fn echo(chat_id, user_input, context, sender) { sender.send_message(chat_id, str(user_input)); return (\"echo\", context); }"
//! }
//! ```

pub use chatflow_core as core;
pub use chatflow_orchestrator as orchestrator;
pub use chatflow_script as script;

#[cfg(feature = "redis")]
pub use chatflow_store_redis as redis;
#[cfg(feature = "whatsapp")]
pub use chatflow_whatsapp as whatsapp;

pub use chatflow_core::{
    handler_fn, CatalogError, ChatflowError, ConsoleMessageSender, Context, ConversationState,
    FileStateStore, HandlerCatalog, HandlerRegistry, InMemoryStateStore, MessageSender,
    StateStore, StepHandler, StepResult, Transition, Value,
};
pub use chatflow_macros::step;
pub use chatflow_orchestrator::{
    ChatOrchestrator, LoadError, OrchestratorConfig, OrchestratorError, StepDeclarations,
};
pub use chatflow_script::{compile_step, CompileError, ScriptStep};

pub mod prelude {
    pub use crate::{
        handler_fn, step, ChatOrchestrator, ChatflowError, Context, MessageSender,
        OrchestratorConfig, StateStore, StepDeclarations, StepHandler, StepResult, Transition,
        Value,
    };
}
