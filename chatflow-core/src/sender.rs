use std::sync::Arc;

use serde_json::Value;

use crate::ChatflowError;

/// Delivery port.
///
/// `options` is backend specific; transport failures are returned to the
/// caller as-is, nothing retries.
#[async_trait::async_trait]
pub trait MessageSender: Send + Sync {
    async fn send_message(
        &self,
        chat_id: &str,
        text: &str,
        options: Option<&Value>,
    ) -> Result<(), ChatflowError>;
}

#[async_trait::async_trait]
impl<T: MessageSender + ?Sized> MessageSender for Arc<T> {
    async fn send_message(
        &self,
        chat_id: &str,
        text: &str,
        options: Option<&Value>,
    ) -> Result<(), ChatflowError> {
        (**self).send_message(chat_id, text, options).await
    }
}

/// Prints messages to stdout. Options are printed, never interpreted.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleMessageSender;

impl ConsoleMessageSender {
    pub fn new() -> Self {
        Self
    }

    pub fn render(chat_id: &str, text: &str, options: Option<&Value>) -> String {
        let mut out = format!("[To {chat_id}] {text}");
        if let Some(options) = options.filter(|value| !value.is_null()) {
            out.push_str(&format!("\n  Options: {options}"));
        }
        out
    }
}

#[async_trait::async_trait]
impl MessageSender for ConsoleMessageSender {
    async fn send_message(
        &self,
        chat_id: &str,
        text: &str,
        options: Option<&Value>,
    ) -> Result<(), ChatflowError> {
        println!("{}", Self::render(chat_id, text, options));
        Ok(())
    }
}
