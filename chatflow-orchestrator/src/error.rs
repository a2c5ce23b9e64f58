use std::path::PathBuf;

use chatflow_core::{CatalogError, ChatflowError};
use chatflow_script::CompileError;
use thiserror::Error;

/// Why a step declaration could not be registered.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read step declarations from {}: {reason}", path.display())]
    Source { path: PathBuf, reason: String },
    #[error("invalid step declarations: {reason}")]
    Declarations { reason: String },
    #[error("step '{state_id}': cannot resolve '{reference}': {reason}")]
    Unresolved {
        state_id: String,
        reference: String,
        #[source]
        reason: CatalogError,
    },
    #[error("step '{state_id}': {source}")]
    Inline {
        state_id: String,
        #[source]
        source: CompileError,
    },
}

impl LoadError {
    /// True when inline source was refused by the denylist validator.
    pub fn is_security(&self) -> bool {
        matches!(
            self,
            LoadError::Inline {
                source: CompileError::Security(_),
                ..
            }
        )
    }

    pub fn state_id(&self) -> Option<&str> {
        match self {
            LoadError::Source { .. } | LoadError::Declarations { .. } => None,
            LoadError::Unresolved { state_id, .. } | LoadError::Inline { state_id, .. } => {
                Some(state_id)
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("No handler registered for initial state: {initial_state_id}")]
    InitialStateNotFound { initial_state_id: String },
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Runtime(#[from] ChatflowError),
}

impl OrchestratorError {
    /// Setup mistakes, as opposed to failures while handling a message.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            OrchestratorError::InitialStateNotFound { .. } | OrchestratorError::Load(_)
        )
    }

    pub fn is_security(&self) -> bool {
        matches!(self, OrchestratorError::Load(err) if err.is_security())
    }
}
