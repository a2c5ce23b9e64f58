use async_trait::async_trait;
use chatflow_core::{ChatflowError, Context, MessageSender, StepHandler, StepResult, Transition};
use serde_json::Value;

use crate::ast::FnDef;
use crate::error::CompileError;
use crate::interp::{init_globals, invoke, Globals};
use crate::parser::parse;
use crate::validator::validate;

/// Number of positional parameters a step function takes.
pub const STEP_ARITY: usize = 4;

/// A step handler compiled from inline source.
#[derive(Debug, Clone)]
pub struct ScriptStep {
    function: FnDef,
    globals: Globals,
}

impl ScriptStep {
    /// Name of the function the source defines.
    pub fn function_name(&self) -> &str {
        &self.function.name
    }

    pub fn params(&self) -> &[String] {
        &self.function.params
    }
}

/// Turn inline source into a step handler.
///
/// Checks run in order: syntax, the denylist, exactly one top-level function,
/// exactly four parameters. Module-level `let` bindings are then evaluated once
/// in a namespace of their own.
pub fn compile_step(source: &str) -> Result<ScriptStep, CompileError> {
    let program = parse(source)?;
    validate(&program)?;

    let mut functions = program.functions();
    let function = match (functions.next(), functions.next()) {
        (Some(function), None) => function.clone(),
        (None, _) => return Err(CompileError::FunctionCount { found: 0 }),
        (Some(_), Some(_)) => {
            return Err(CompileError::FunctionCount {
                found: program.functions().count(),
            })
        }
    };
    if function.params.len() != STEP_ARITY {
        return Err(CompileError::Arity {
            function: function.name,
            found: function.params.len(),
        });
    }

    let globals = init_globals(&program).map_err(CompileError::Init)?;
    tracing::trace!(
        function = %function.name,
        globals = globals.len(),
        "evaluated module bindings"
    );
    Ok(ScriptStep { function, globals })
}

#[async_trait]
impl StepHandler for ScriptStep {
    async fn handle(
        &self,
        chat_id: &str,
        user_input: &Value,
        context: Context,
        sender: &dyn MessageSender,
    ) -> StepResult {
        let completed = invoke(&self.function, &self.globals, chat_id, user_input, context)
            .map_err(|err| ChatflowError::handler(format!("{}: {err}", self.function.name)))?;

        for message in &completed.outbox {
            sender
                .send_message(&message.chat_id, &message.text, message.options.as_ref())
                .await?;
        }
        Ok(Transition::new(completed.state_id, completed.context))
    }
}
