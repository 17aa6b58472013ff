use thiserror::Error;

use super::operator::Operator;

/// Errors raised while evaluating a circuit or executing a rule set.
///
/// None of these are caught inside the engine: the first failure aborts the
/// current evaluation or run and propagates to the caller.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("unknown operator '{name}'")]
    UnknownOperator { name: String },

    #[error("operator {operator} expects {expected} operand(s), got {actual}")]
    OperandArity {
        operator: Operator,
        expected: usize,
        actual: usize,
    },

    #[error("'{reference}' produced a {actual}, expected a boolean")]
    NonBooleanResult {
        reference: String,
        actual: &'static str,
    },

    #[error("unresolved capability '{name}'")]
    UnresolvedCapability { name: String },

    #[error("unresolved route '{name}'")]
    UnresolvedRoute { name: String },

    #[error("circuit nesting exceeded the depth limit of {limit}")]
    DepthExceeded { limit: usize },

    #[error("rule '{rule}' exceeded the iteration limit of {limit}")]
    IterationLimitExceeded { rule: String, limit: usize },

    #[error("capability failed: {message}")]
    Capability { message: String },
}

impl EvalError {
    /// Build a [`EvalError::Capability`] carrying a caller-supplied message.
    /// Intended for use inside capability bodies to report predicate or
    /// action failures.
    pub fn capability(message: impl Into<String>) -> Self {
        EvalError::Capability {
            message: message.into(),
        }
    }
}
