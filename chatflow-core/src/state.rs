use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Accumulated per-chat data threaded between steps. Keys keep insertion order.
pub type Context = Map<String, Value>;

/// What a store holds for one chat.
///
/// A chat with no record is always `state_id == None` with an empty context;
/// stores never report absence any other way.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    pub state_id: Option<String>,
    #[serde(default)]
    pub context: Context,
}

impl ConversationState {
    pub fn new(state_id: impl Into<String>, context: Context) -> Self {
        Self {
            state_id: Some(state_id.into()),
            context,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.state_id.is_none()
    }
}

/// The value a step handler returns: the state that governs the next message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub state_id: String,
    #[serde(default)]
    pub context: Context,
}

impl Transition {
    pub fn new(state_id: impl Into<String>, context: Context) -> Self {
        Self {
            state_id: state_id.into(),
            context,
        }
    }

    /// Move to `state_id` with an empty context.
    pub fn to(state_id: impl Into<String>) -> Self {
        Self::new(state_id, Context::new())
    }
}

impl From<Transition> for ConversationState {
    fn from(transition: Transition) -> Self {
        ConversationState::new(transition.state_id, transition.context)
    }
}

/// Render a context for debug logs, truncated to `max_chars` characters.
pub fn context_preview(context: &Context, max_chars: usize) -> String {
    let rendered = serde_json::to_string(context).unwrap_or_else(|_| "<unserializable>".into());
    match rendered.char_indices().nth(max_chars) {
        Some((cut, _)) => rendered[..cut].to_string(),
        None => rendered,
    }
}
