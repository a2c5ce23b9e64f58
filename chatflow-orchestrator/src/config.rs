use std::sync::OnceLock;

use chatflow_core::ChatflowError;
use regex::{Captures, Regex};
use serde::Deserialize;

pub const DEFAULT_INITIAL_STATE_ID: &str = "start";
pub const DEFAULT_UNKNOWN_STATE_MESSAGE: &str =
    "Unknown state: {state_id}. Resetting to initial state.";

/// Dispatch settings for a [`ChatOrchestrator`](crate::ChatOrchestrator).
///
/// `unknown_state_message` is a template: `{state_id}` is replaced with the
/// unrecognised state id, and `{{` / `}}` produce literal braces.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    pub initial_state_id: String,
    pub unknown_state_message: String,
    /// Serialise dispatch per chat id. Off by default: two concurrent messages
    /// for one chat both read the same prior state and the last write wins.
    pub serialize_per_chat: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            initial_state_id: DEFAULT_INITIAL_STATE_ID.to_string(),
            unknown_state_message: DEFAULT_UNKNOWN_STATE_MESSAGE.to_string(),
            serialize_per_chat: false,
        }
    }
}

impl OrchestratorConfig {
    pub fn with_initial_state_id(mut self, state_id: impl Into<String>) -> Self {
        self.initial_state_id = state_id.into();
        self
    }

    pub fn with_unknown_state_message(mut self, template: impl Into<String>) -> Self {
        self.unknown_state_message = template.into();
        self
    }

    pub fn with_serialize_per_chat(mut self, enabled: bool) -> Self {
        self.serialize_per_chat = enabled;
        self
    }

    pub fn from_json_str(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Render the unknown-state notice for `state_id`.
    pub fn render_unknown_state(&self, state_id: &str) -> Result<String, ChatflowError> {
        let rendered = placeholder_pattern()?
            .replace_all(&self.unknown_state_message, |caps: &Captures| match &caps[0] {
                "{{" => "{".to_string(),
                "}}" => "}".to_string(),
                _ => state_id.to_string(),
            });
        Ok(rendered.into_owned())
    }
}

/// Compiled once per process.
fn placeholder_pattern() -> Result<&'static Regex, ChatflowError> {
    static PATTERN: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"\{\{|\}\}|\{state_id\}"))
        .as_ref()
        .map_err(|e| ChatflowError::InvalidConfig(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_and_partial_json() {
        let config =
            OrchestratorConfig::from_json_str(r#"{"initial_state_id": "welcome"}"#).unwrap();
        assert_eq!(config.initial_state_id, "welcome");
        assert_eq!(config.unknown_state_message, DEFAULT_UNKNOWN_STATE_MESSAGE);
        assert!(!config.serialize_per_chat);
    }

    #[test]
    fn renders_placeholder_and_escaped_braces() {
        let config = OrchestratorConfig::default();
        assert_eq!(
            config.render_unknown_state("ghost").unwrap(),
            "Unknown state: ghost. Resetting to initial state."
        );

        let config = config.with_unknown_state_message("{{{state_id}}} is gone, {other} stays");
        assert_eq!(
            config.render_unknown_state("x").unwrap(),
            "{x} is gone, {other} stays"
        );
    }

    #[test]
    fn placeholder_pattern_is_compiled_once() {
        let first = placeholder_pattern().unwrap();
        let config = OrchestratorConfig::default();
        for id in ["a", "b", "c"] {
            assert!(config.render_unknown_state(id).unwrap().contains(id));
        }
        assert!(std::ptr::eq(first, placeholder_pattern().unwrap()));
    }
}
