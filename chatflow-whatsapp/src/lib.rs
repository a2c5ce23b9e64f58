//! WhatsApp Cloud API [`MessageSender`](chatflow_core::MessageSender).
//!
//! `options` passed to `send_message` select the message type, e.g.
//! `{"type": "image", "image": {"link": "https://..."}}`; see [`build_payload`].

mod config;
mod error;
mod payload;
mod sender;

pub use config::{WhatsAppConfig, ACCESS_TOKEN_ENV, API_VERSION_ENV, PHONE_NUMBER_ID_ENV};
pub use error::WhatsAppError;
pub use payload::{build_payload, MESSAGE_TYPES};
pub use sender::{WhatsAppSender, DEFAULT_API_VERSION, DEFAULT_BASE_URL};
pub use secrecy::SecretString;
