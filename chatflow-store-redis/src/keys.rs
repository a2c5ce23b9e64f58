use chatflow_core::ChatflowError;

/// Reject chat ids that cannot form a readable key.
///
/// Keys are only used with `GET`, `SET` and `DEL`, so glob characters are
/// stored verbatim.
pub fn safe_chat_id(chat_id: &str) -> Result<&str, ChatflowError> {
    if chat_id.is_empty() {
        return Err(ChatflowError::store("chat_id must not be empty"));
    }

    if chat_id.contains(['\n', '\r']) {
        return Err(ChatflowError::store(format!(
            "chat_id contains characters invalid in Redis keys: {chat_id:?}"
        )));
    }

    Ok(chat_id)
}

pub fn state_key(namespace: &str, chat_id: &str) -> String {
    format!("{namespace}:state:{chat_id}")
}
