mod error;
mod grammar;

pub use error::ParseError;

use crate::types::CircuitNode;

/// Parse a circuit DSL string, e.g. `AND(OR(true, @is_weekend), NOT(false))`.
///
/// # Errors
///
/// Returns [`ParseError`] if the input is not valid circuit syntax.
pub fn parse(input: &str) -> Result<CircuitNode, ParseError> {
    use winnow::Parser;
    grammar::parse_circuit
        .parse(input)
        .map_err(|e| ParseError::new(e.to_string()))
}
