//! A small embedded language for step handlers declared as inline source.
//!
//! ```text
//! fn ask_name(chat_id, user_input, context, sender) {
//!     sender.send_message(chat_id, "What is your name?");
//!     return ("got_name", context);
//! }
//! ```
//!
//! Source is parsed, passed through a denylist [`validate`], and compiled into
//! a [`ScriptStep`] that implements `chatflow_core::StepHandler`.

pub mod ast;
mod error;
mod interp;
mod lexer;
mod parser;
mod step;
mod validator;

pub use error::{CompileError, ParseError, RuntimeError, SecurityError};
pub use parser::parse;
pub use step::{compile_step, ScriptStep, STEP_ARITY};
pub use validator::{is_denied, validate, DENYLIST};
