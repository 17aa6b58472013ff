use thiserror::Error;

use crate::codec::{DecodeError, EncodeError};
use crate::parse::ParseError;
use crate::types::EvalError;

/// Unified error type covering evaluation, serialization, parsing, and I/O.
///
/// Returned by convenience methods like
/// [`CircuitNode::from_dsl_file()`](crate::CircuitNode::from_dsl_file);
/// the focused error types remain available on the individual entry points.
#[derive(Debug, Error)]
pub enum SwitchboardError {
    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[cfg(feature = "binary-cache")]
    #[error(transparent)]
    Serialize(#[from] crate::serial::SerializeError),

    #[cfg(feature = "binary-cache")]
    #[error(transparent)]
    Deserialize(#[from] crate::serial::DeserializeError),
}
