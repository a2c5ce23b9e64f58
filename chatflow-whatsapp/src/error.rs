use chatflow_core::ChatflowError;
use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WhatsAppError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("http error: {status}: {body}")]
    Http { status: StatusCode, body: String },
    #[error("invalid message options: {0}")]
    Payload(String),
    #[error("environment variable {0} is not set")]
    MissingEnv(&'static str),
}

impl WhatsAppError {
    pub(crate) fn into_delivery(self, chat_id: &str) -> ChatflowError {
        match self {
            WhatsAppError::MissingEnv(_) => ChatflowError::InvalidConfig(self.to_string()),
            other => ChatflowError::delivery(chat_id, other.to_string()),
        }
    }
}
