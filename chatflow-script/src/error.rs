use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("syntax error at line {line}, column {column}: {message}")]
pub struct ParseError {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl ParseError {
    pub(crate) fn new(line: usize, column: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            column,
            message: message.into(),
        }
    }
}

/// A construct the denylist validator refuses.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("security violation at line {line}: {reason}")]
pub struct SecurityError {
    pub line: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("runtime error at line {line}: {message}")]
pub struct RuntimeError {
    pub line: usize,
    pub message: String,
}

impl RuntimeError {
    pub(crate) fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

/// Why inline source could not become a step handler.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CompileError {
    #[error(transparent)]
    Syntax(#[from] ParseError),
    #[error(transparent)]
    Security(#[from] SecurityError),
    #[error("inline code must define exactly one top-level function, found {found}")]
    FunctionCount { found: usize },
    #[error("function '{function}' must take exactly 4 arguments, found {found}")]
    Arity { function: String, found: usize },
    #[error("module initialisation failed: {0}")]
    Init(RuntimeError),
}
