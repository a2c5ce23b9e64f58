use std::time::Duration;

use chatflow_core::{ChatflowError, MessageSender};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;

use crate::config::WhatsAppConfig;
use crate::error::WhatsAppError;
use crate::payload::build_payload;

pub const DEFAULT_API_VERSION: &str = "v19.0";
pub const DEFAULT_BASE_URL: &str = "https://graph.facebook.com";

/// Delivery through the WhatsApp Cloud API `/{phone_number_id}/messages` endpoint.
#[derive(Clone)]
pub struct WhatsAppSender {
    client: Client,
    base_url: String,
    api_version: String,
    phone_number_id: String,
    access_token: SecretString,
}

impl std::fmt::Debug for WhatsAppSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhatsAppSender")
            .field("base_url", &self.base_url)
            .field("api_version", &self.api_version)
            .field("phone_number_id", &self.phone_number_id)
            .finish_non_exhaustive()
    }
}

impl WhatsAppSender {
    pub fn new(phone_number_id: impl Into<String>, access_token: SecretString) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            phone_number_id: phone_number_id.into(),
            access_token,
        }
    }

    pub fn from_config(config: WhatsAppConfig) -> Self {
        Self::new(config.phone_number_id, config.access_token).with_api_version(config.api_version)
    }

    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn endpoint(&self) -> String {
        format!(
            "{}/{}/{}/messages",
            self.base_url.trim_end_matches('/'),
            self.api_version,
            self.phone_number_id
        )
    }

    /// Send a prepared payload and return the API's JSON response.
    pub async fn post(&self, payload: &Value) -> Result<Value, WhatsAppError> {
        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(self.access_token.expose_secret())
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(WhatsAppError::Http { status, body });
        }
        Ok(response.json::<Value>().await?)
    }
}

#[async_trait::async_trait]
impl MessageSender for WhatsAppSender {
    async fn send_message(
        &self,
        chat_id: &str,
        text: &str,
        options: Option<&Value>,
    ) -> Result<(), ChatflowError> {
        let payload =
            build_payload(chat_id, text, options).map_err(|err| err.into_delivery(chat_id))?;
        let response = self
            .post(&payload)
            .await
            .map_err(|err| err.into_delivery(chat_id))?;
        tracing::info!(chat_id, response = %response, "whatsapp message accepted");
        Ok(())
    }
}
