use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChatflowError {
    #[error("State store failed: {0}")]
    Store(String),
    #[error("Message delivery to '{chat_id}' failed: {reason}")]
    Delivery { chat_id: String, reason: String },
    #[error("Step handler failed: {0}")]
    Handler(String),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Serialization/deserialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl ChatflowError {
    pub fn store(message: impl Into<String>) -> Self {
        ChatflowError::Store(message.into())
    }

    pub fn delivery(chat_id: &str, reason: impl Into<String>) -> Self {
        ChatflowError::Delivery {
            chat_id: chat_id.to_string(),
            reason: reason.into(),
        }
    }

    pub fn handler(message: impl Into<String>) -> Self {
        ChatflowError::Handler(message.into())
    }
}

/// Failure to resolve a qualified `module.function` reference.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("reference '{reference}' is not of the form 'module.function_name'")]
    MalformedReference { reference: String },
    #[error("no module named '{module}'")]
    ModuleNotFound { module: String },
    #[error("module '{module}' has no step function '{name}'")]
    FunctionNotFound { module: String, name: String },
}
