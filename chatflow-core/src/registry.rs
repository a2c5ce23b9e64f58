use std::collections::HashMap;
use std::sync::Arc;

use crate::handler::StepHandler;

/// Maps state ids to the handlers that govern them.
///
/// Registration needs `&mut self` and resolution only `&self`, so a registry
/// shared behind an `Arc` cannot change while messages are being dispatched.
#[derive(Default, Clone)]
pub struct HandlerRegistry {
    steps: HashMap<String, Arc<dyn StepHandler>>,
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("state_ids", &self.state_ids())
            .finish()
    }
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last registration wins; the replaced handler, if any, is returned.
    pub fn register(
        &mut self,
        state_id: impl Into<String>,
        handler: Arc<dyn StepHandler>,
    ) -> Option<Arc<dyn StepHandler>> {
        let state_id = state_id.into();
        let previous = self.steps.insert(state_id.clone(), handler);
        if previous.is_some() {
            tracing::debug!(state_id = %state_id, "replaced step handler");
        }
        previous
    }

    pub fn resolve(&self, state_id: &str) -> Option<Arc<dyn StepHandler>> {
        self.steps.get(state_id).cloned()
    }

    pub fn contains(&self, state_id: &str) -> bool {
        self.steps.contains_key(state_id)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Registered state ids, sorted.
    pub fn state_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.steps.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}
