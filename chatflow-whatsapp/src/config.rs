use secrecy::SecretString;

use crate::error::WhatsAppError;
use crate::sender::DEFAULT_API_VERSION;

pub const PHONE_NUMBER_ID_ENV: &str = "WHATSAPP_PHONE_NUMBER_ID";
pub const ACCESS_TOKEN_ENV: &str = "WHATSAPP_ACCESS_TOKEN";
pub const API_VERSION_ENV: &str = "WHATSAPP_API_VERSION";

#[derive(Clone, Debug)]
pub struct WhatsAppConfig {
    pub phone_number_id: String,
    pub access_token: SecretString,
    pub api_version: String,
}

impl WhatsAppConfig {
    pub fn new(phone_number_id: impl Into<String>, access_token: SecretString) -> Self {
        Self {
            phone_number_id: phone_number_id.into(),
            access_token,
            api_version: DEFAULT_API_VERSION.to_string(),
        }
    }

    /// Read the phone number id and token from the environment; the API
    /// version falls back to the default when unset.
    pub fn from_env() -> Result<Self, WhatsAppError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, WhatsAppError> {
        let required = |name: &'static str| {
            lookup(name)
                .filter(|value| !value.is_empty())
                .ok_or(WhatsAppError::MissingEnv(name))
        };
        let phone_number_id = required(PHONE_NUMBER_ID_ENV)?;
        let access_token = SecretString::new(required(ACCESS_TOKEN_ENV)?);
        let api_version = lookup(API_VERSION_ENV)
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_API_VERSION.to_string());
        Ok(Self {
            phone_number_id,
            access_token,
            api_version,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    #[test]
    fn reads_required_and_optional_variables() {
        let env: HashMap<&str, &str> = HashMap::from([
            (PHONE_NUMBER_ID_ENV, "1234"),
            (ACCESS_TOKEN_ENV, "token"),
        ]);
        let config =
            WhatsAppConfig::from_lookup(|name| env.get(name).map(|v| v.to_string())).unwrap();
        assert_eq!(config.phone_number_id, "1234");
        assert_eq!(config.access_token.expose_secret(), "token");
        assert_eq!(config.api_version, DEFAULT_API_VERSION);
    }

    #[test]
    fn missing_token_is_reported_by_name() {
        let err = WhatsAppConfig::from_lookup(|name| {
            (name == PHONE_NUMBER_ID_ENV).then(|| "1234".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, WhatsAppError::MissingEnv(ACCESS_TOKEN_ENV)));
    }
}
