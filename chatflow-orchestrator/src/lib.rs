//! Dispatch engine: per-chat state machines over pluggable step handlers.
//!
//! A [`ChatOrchestrator`] owns a handler registry, a persistence port and a
//! delivery port. Handlers are registered programmatically or loaded from
//! [`StepDeclarations`], whose references are either `module.function` paths
//! into a [`HandlerCatalog`](chatflow_core::HandlerCatalog) or inline
//! step-script source.

mod config;
mod error;
mod loader;
mod locks;
mod orchestrator;

pub use config::{OrchestratorConfig, DEFAULT_INITIAL_STATE_ID, DEFAULT_UNKNOWN_STATE_MESSAGE};
pub use error::{LoadError, OrchestratorError};
pub use loader::StepDeclarations;
pub use locks::{ChatGuard, ChatLocks};
pub use orchestrator::ChatOrchestrator;
