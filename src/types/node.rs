use std::fmt;
use std::ops::Not;

use super::capability::Capability;
use super::operator::{Operator, OperatorRef};

/// A boolean circuit: the `logic` of a proposition or rule.
///
/// Circuits are built in code via [`lit`], [`cap_ref`], [`invoke`] and the
/// combinator methods, parsed from the text DSL with
/// [`CircuitNode::from_dsl`], or decoded from the portable JSON form.
#[derive(Debug, Clone, PartialEq)]
pub enum CircuitNode {
    /// A constant.
    Literal(bool),
    /// A symbolic reference, resolved through the capability lookup at
    /// evaluation time.
    Reference(String),
    /// An already-bound capability.
    Capability(Capability),
    /// An operator applied to sub-circuits. Operands are fully resolved
    /// (concurrently) before the operator is applied.
    Invocation {
        operator: OperatorRef,
        operands: Vec<CircuitNode>,
    },
}

/// A literal node.
#[must_use]
pub fn lit(value: bool) -> CircuitNode {
    CircuitNode::Literal(value)
}

/// A named capability reference node.
#[must_use]
pub fn cap_ref(name: &str) -> CircuitNode {
    CircuitNode::Reference(name.to_owned())
}

/// An operator invocation node.
#[must_use]
pub fn invoke(operator: impl Into<OperatorRef>, operands: Vec<CircuitNode>) -> CircuitNode {
    CircuitNode::Invocation {
        operator: operator.into(),
        operands,
    }
}

impl CircuitNode {
    /// A node wrapping an already-bound capability.
    #[must_use]
    pub fn capability(capability: Capability) -> CircuitNode {
        CircuitNode::Capability(capability)
    }

    #[must_use]
    pub fn and(self, other: CircuitNode) -> CircuitNode {
        invoke(Operator::And, vec![self, other])
    }

    #[must_use]
    pub fn or(self, other: CircuitNode) -> CircuitNode {
        invoke(Operator::Or, vec![self, other])
    }

    /// Parse a circuit from DSL text, e.g.
    /// `AND(OR(true, @is_weekend), NOT(false))`.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`](crate::ParseError) on invalid syntax.
    pub fn from_dsl(input: &str) -> Result<Self, crate::ParseError> {
        crate::parse::parse(input)
    }

    /// Read a file and parse its contents as circuit DSL.
    ///
    /// # Errors
    ///
    /// Returns [`SwitchboardError`](crate::SwitchboardError) on I/O or
    /// parse failure.
    pub fn from_dsl_file(path: impl AsRef<std::path::Path>) -> Result<Self, crate::SwitchboardError> {
        let input = std::fs::read_to_string(path)?;
        Ok(Self::from_dsl(&input)?)
    }

    /// Encode into the portable JSON form.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError`](crate::EncodeError) if the circuit contains
    /// an unnamed bound capability.
    pub fn to_portable(&self) -> Result<serde_json::Value, crate::EncodeError> {
        crate::codec::encode_node(self)
    }

    /// Decode from the portable JSON form.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError`](crate::DecodeError) on malformed input.
    pub fn from_portable(value: &serde_json::Value) -> Result<Self, crate::DecodeError> {
        crate::codec::decode_node(value)
    }
}

impl Not for CircuitNode {
    type Output = CircuitNode;

    fn not(self) -> CircuitNode {
        invoke(Operator::Not, vec![self])
    }
}

impl From<bool> for CircuitNode {
    fn from(value: bool) -> Self {
        CircuitNode::Literal(value)
    }
}

impl fmt::Display for CircuitNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CircuitNode::Literal(b) => write!(f, "{b}"),
            CircuitNode::Reference(name) => write!(f, "@{name}"),
            CircuitNode::Capability(capability) => match capability.name() {
                Some(name) => write!(f, "@{name}"),
                None => f.write_str("<capability>"),
            },
            CircuitNode::Invocation { operator, operands } => {
                write!(f, "{operator}(")?;
                for (i, operand) in operands.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{operand}")?;
                }
                f.write_str(")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lit_builds_literal() {
        assert_eq!(lit(true), CircuitNode::Literal(true));
    }

    #[test]
    fn cap_ref_builds_reference() {
        assert_eq!(cap_ref("ping"), CircuitNode::Reference("ping".to_owned()));
    }

    #[test]
    fn and_chaining() {
        let node = lit(true).and(cap_ref("x"));
        match node {
            CircuitNode::Invocation { operator, operands } => {
                assert_eq!(operator, OperatorRef::Direct(Operator::And));
                assert_eq!(operands.len(), 2);
            }
            other => panic!("expected Invocation, got {other:?}"),
        }
    }

    #[test]
    fn not_operator_wraps() {
        let node = !lit(false);
        assert!(matches!(
            node,
            CircuitNode::Invocation {
                operator: OperatorRef::Direct(Operator::Not),
                ..
            }
        ));
    }

    #[test]
    fn named_invocation() {
        let node = invoke(OperatorRef::Named("XOR".to_owned()), vec![lit(true)]);
        match node {
            CircuitNode::Invocation { operator, .. } => {
                assert_eq!(operator, OperatorRef::Named("XOR".to_owned()));
            }
            other => panic!("expected Invocation, got {other:?}"),
        }
    }

    #[test]
    fn display_renders_dsl_shape() {
        let node = invoke(
            Operator::And,
            vec![lit(true), !cap_ref("is_weekend"), lit(false)],
        );
        assert_eq!(node.to_string(), "AND(true, NOT(@is_weekend), false)");
    }

    #[test]
    fn display_named_capability() {
        let cap = Capability::predicate(|_| true).with_name("ping");
        assert_eq!(CircuitNode::capability(cap).to_string(), "@ping");
    }
}
