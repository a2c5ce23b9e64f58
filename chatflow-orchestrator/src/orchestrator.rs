use std::path::Path;
use std::sync::Arc;

use chatflow_core::{
    context_preview, Context, HandlerCatalog, HandlerRegistry, MessageSender, StateStore,
    StepHandler, Value,
};
use tracing::Instrument;

use crate::config::OrchestratorConfig;
use crate::error::OrchestratorError;
use crate::loader::{StepDeclarations, StepLoader};
use crate::locks::ChatLocks;

const PREVIEW_CHARS: usize = 200;

/// Routes each inbound message to the step handler of the chat's current state
/// and persists the state that handler returns.
///
/// Registration takes `&mut self` and dispatch takes `&self`, so all loading
/// is finished before the orchestrator can be shared across tasks.
pub struct ChatOrchestrator {
    store: Arc<dyn StateStore>,
    sender: Arc<dyn MessageSender>,
    registry: HandlerRegistry,
    catalog: HandlerCatalog,
    config: OrchestratorConfig,
    locks: ChatLocks,
}

impl ChatOrchestrator {
    /// Qualified references resolve against every `#[step]` in the binary.
    pub fn new<S, M>(store: S, sender: M) -> Self
    where
        S: StateStore + 'static,
        M: MessageSender + 'static,
    {
        Self {
            store: Arc::new(store),
            sender: Arc::new(sender),
            registry: HandlerRegistry::new(),
            catalog: HandlerCatalog::collected(),
            config: OrchestratorConfig::default(),
            locks: ChatLocks::new(),
        }
    }

    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_catalog(mut self, catalog: HandlerCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    pub fn catalog(&self) -> &HandlerCatalog {
        &self.catalog
    }

    pub fn store(&self) -> &Arc<dyn StateStore> {
        &self.store
    }

    pub fn sender(&self) -> &Arc<dyn MessageSender> {
        &self.sender
    }

    /// Register `handler` for `state_id`, replacing any earlier one.
    pub fn register_step<H>(&mut self, state_id: impl Into<String>, handler: H) -> &mut Self
    where
        H: StepHandler + 'static,
    {
        self.registry.register(state_id, Arc::new(handler));
        self
    }

    pub fn register_shared_step(
        &mut self,
        state_id: impl Into<String>,
        handler: Arc<dyn StepHandler>,
    ) -> &mut Self {
        self.registry.register(state_id, handler);
        self
    }

    /// Register every declaration in order.
    ///
    /// Stops at the first failure. Entries before it stay registered; the
    /// failing entry and everything after it are not.
    pub fn register_steps(
        &mut self,
        declarations: &StepDeclarations,
    ) -> Result<(), OrchestratorError> {
        let loader = StepLoader::new(&self.catalog)?;
        for (state_id, reference) in declarations.iter() {
            let handler = loader.load(state_id, reference).map_err(|err| {
                tracing::warn!(state_id, error = %err, "step declaration rejected");
                err
            })?;
            self.registry.register(state_id, handler);
        }
        tracing::debug!(
            declared = declarations.len(),
            registered = self.registry.len(),
            "registered step declarations"
        );
        Ok(())
    }

    /// Read a flat JSON object of `state_id -> reference` and register it.
    pub fn register_steps_from_json(
        &mut self,
        path: impl AsRef<Path>,
    ) -> Result<(), OrchestratorError> {
        let declarations = StepDeclarations::from_json_file(path)?;
        self.register_steps(&declarations)
    }

    #[cfg(feature = "yaml")]
    pub fn register_steps_from_yaml(
        &mut self,
        path: impl AsRef<Path>,
    ) -> Result<(), OrchestratorError> {
        let declarations = StepDeclarations::from_yaml_file(path)?;
        self.register_steps(&declarations)
    }

    /// Handle one inbound message for `chat_id`.
    ///
    /// Exactly one store read; one store write when the handler succeeds and
    /// none when it fails. A stored state with no handler triggers one notice
    /// to the chat and a restart from the initial state with an empty context.
    pub async fn handle_message(
        &self,
        chat_id: &str,
        user_input: impl Into<Value>,
    ) -> Result<(), OrchestratorError> {
        let user_input = user_input.into();
        let span = tracing::debug_span!("handle_message", chat_id);
        async {
            let _guard = if self.config.serialize_per_chat {
                Some(self.locks.lock(chat_id).await)
            } else {
                None
            };
            self.dispatch(chat_id, &user_input).await
        }
        .instrument(span)
        .await
    }

    async fn dispatch(&self, chat_id: &str, user_input: &Value) -> Result<(), OrchestratorError> {
        let stored = self.store.get_state(chat_id).await?;
        let initial = self.config.initial_state_id.as_str();
        let (state_id, context) = match stored.state_id {
            Some(state_id) => (state_id, stored.context),
            None => (initial.to_string(), Context::new()),
        };
        tracing::debug!(
            state_id = %state_id,
            context = %context_preview(&context, PREVIEW_CHARS),
            "loaded state"
        );

        let (state_id, context, handler) = match self.registry.resolve(&state_id) {
            Some(handler) => (state_id, context, handler),
            None => {
                tracing::warn!(
                    state_id = %state_id,
                    initial_state_id = initial,
                    "no handler for state, resetting to initial state"
                );
                let notice = self.config.render_unknown_state(&state_id)?;
                self.sender.send_message(chat_id, &notice, None).await?;
                let handler = self.registry.resolve(initial).ok_or_else(|| {
                    OrchestratorError::InitialStateNotFound {
                        initial_state_id: initial.to_string(),
                    }
                })?;
                (initial.to_string(), Context::new(), handler)
            }
        };

        let next = handler
            .handle(chat_id, user_input, context, self.sender.as_ref())
            .await
            .map_err(|err| {
                tracing::debug!(state_id = %state_id, error = %err, "step handler failed");
                err
            })?;
        tracing::debug!(
            state_id = %next.state_id,
            context = %context_preview(&next.context, PREVIEW_CHARS),
            "next state"
        );

        self.store
            .set_state(chat_id, &next.state_id, &next.context)
            .await?;
        Ok(())
    }
}

impl std::fmt::Debug for ChatOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatOrchestrator")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
