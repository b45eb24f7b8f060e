use crate::ident::{Label, Symbol, Variable};
use std::result;
use thiserror::Error;

/// Internal invariant violations detected while cloning or generating code.
///
/// These are never recovered from: continuing would produce wrong control flow.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("label {0} is not registered with the code generation context")]
    UnregisteredLabel(Label),
    #[error("label {0} is registered more than once")]
    DuplicateLabel(Label),
    #[error("rename context has no entry for variable {0}")]
    MissingVariableRename(Variable),
    #[error("rename context has no entry for label {0}")]
    MissingLabelRename(Label),
    #[error("label {label} targeted in {body} does not start a basic block")]
    UndeclaredLabel { label: Label, body: Symbol },
    #[error("block {label} of {body} transfers control before its last instruction")]
    MisplacedTransfer { label: Label, body: Symbol },
}

/// Failures while evaluating operands against an execution context.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvaluationError {
    #[error("variable {0} is unbound in the current activation")]
    UnboundVariable(Variable),
    #[error("argument {index} requested but only {count} were passed")]
    MissingArgument { index: u32, count: usize },
    #[error("no method {0} is registered with the runtime")]
    UnknownMethod(Symbol),
    #[error("invalid operation: {0}")]
    InvalidOperation(String),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
    #[error("Evaluation error: {0}")]
    Evaluation(#[from] EvaluationError),
    #[error("Generic error: {0}")]
    Generic(String),
}

impl Error {
    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::Configuration(_))
    }

    pub fn is_evaluation(&self) -> bool {
        matches!(self, Error::Evaluation(_))
    }
}

pub type Result<T> = result::Result<T, Error>;

// Convert from eyre::Report to our Error type
impl From<eyre::Report> for Error {
    fn from(err: eyre::Report) -> Self {
        Error::Generic(err.to_string())
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Generic(s)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Generic(e.to_string())
    }
}
