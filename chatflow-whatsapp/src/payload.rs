use serde_json::{json, Map, Value};

use crate::error::WhatsAppError;

/// Message types the Cloud API accepts; each carries an object under the key
/// of the same name.
pub const MESSAGE_TYPES: &[&str] = &[
    "text",
    "image",
    "audio",
    "video",
    "document",
    "sticker",
    "location",
    "contacts",
    "reaction",
    "template",
    "interactive",
];

/// Build the `/messages` request body.
///
/// Without `options` this is a plain text message with `text` as the body.
/// With `options`, `options.type` selects the message type, the value under
/// that key is copied as-is and `text` is ignored. `options.context`, when
/// present, turns the message into a reply.
pub fn build_payload(
    chat_id: &str,
    text: &str,
    options: Option<&Value>,
) -> Result<Value, WhatsAppError> {
    let mut payload = Map::new();
    payload.insert("messaging_product".into(), json!("whatsapp"));
    payload.insert("recipient_type".into(), json!("individual"));
    payload.insert("to".into(), json!(chat_id));

    let Some(options) = options.filter(|options| !options.is_null()) else {
        if text.is_empty() {
            return Err(WhatsAppError::Payload(
                "text must be provided for the default text message".to_string(),
            ));
        }
        payload.insert("type".into(), json!("text"));
        payload.insert("text".into(), json!({ "body": text }));
        return Ok(Value::Object(payload));
    };

    let Some(options) = options.as_object() else {
        return Err(WhatsAppError::Payload("options must be an object".to_string()));
    };
    if let Some(context) = options.get("context").filter(|context| !context.is_null()) {
        payload.insert("context".into(), context.clone());
    }

    let message_type = options
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| WhatsAppError::Payload("options.type must be a string".to_string()))?;
    if !MESSAGE_TYPES.contains(&message_type) {
        return Err(WhatsAppError::Payload(format!(
            "unsupported WhatsApp message type: {message_type}"
        )));
    }
    let body = options.get(message_type).ok_or_else(|| {
        WhatsAppError::Payload(format!(
            "options.{message_type} is required for type {message_type}"
        ))
    })?;

    payload.insert("type".into(), json!(message_type));
    payload.insert(message_type.into(), body.clone());
    Ok(Value::Object(payload))
}
