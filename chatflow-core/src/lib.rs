pub mod catalog;
mod error;
pub mod file_store;
mod handler;
mod registry;
pub mod sender;
mod state;
pub mod store;

pub use catalog::{CatalogEntry, HandlerCatalog};
pub use error::{CatalogError, ChatflowError};
pub use file_store::{FileStateStore, StateRecord};
pub use handler::{handler_fn, FnStep, StepHandler, StepResult};
pub use registry::HandlerRegistry;
pub use sender::{ConsoleMessageSender, MessageSender};
pub use state::{context_preview, Context, ConversationState, Transition};
pub use store::{InMemoryStateStore, StateStore};

pub use serde_json::Value;

// Used by code generated from `#[step]`.
#[doc(hidden)]
pub use async_trait::async_trait;
#[doc(hidden)]
pub use inventory;
