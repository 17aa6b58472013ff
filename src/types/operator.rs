use std::collections::HashMap;
use std::fmt;

use super::error::EvalError;
use super::node::CircuitNode;

/// The fixed logical operator algebra.
///
/// AND, OR, NOT, and XOR are primitive; the remaining five are defined
/// compositionally and reduce to the primitives through
/// [`Applied::Continue`] (see [`Operator::apply`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    And,
    Or,
    Not,
    Nand,
    Nor,
    Xor,
    Xnor,
    If,
    Iff,
}

/// The outcome of applying an operator to resolved boolean operands.
///
/// `Done` carries a final result. `Continue` carries a replacement circuit
/// the evaluator must re-enter — this is how the compositional operators
/// unwind to the primitives without growing the call stack unboundedly.
#[derive(Debug, Clone, PartialEq)]
pub enum Applied {
    Done(bool),
    Continue(CircuitNode),
}

impl Operator {
    pub const ALL: [Operator; 9] = [
        Operator::And,
        Operator::Or,
        Operator::Not,
        Operator::Nand,
        Operator::Nor,
        Operator::Xor,
        Operator::Xnor,
        Operator::If,
        Operator::Iff,
    ];

    /// Canonical name, as used by the portable form and the DSL.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Operator::And => "AND",
            Operator::Or => "OR",
            Operator::Not => "NOT",
            Operator::Nand => "NAND",
            Operator::Nor => "NOR",
            Operator::Xor => "XOR",
            Operator::Xnor => "XNOR",
            Operator::If => "IF",
            Operator::Iff => "IFF",
        }
    }

    /// Resolve a canonical operator name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Operator> {
        Operator::ALL.iter().copied().find(|op| op.name() == name)
    }

    /// Apply this operator to fully resolved operand values.
    ///
    /// Operands are never short-circuited: callers resolve every operand
    /// before applying. `AND` of zero operands is vacuously true, `OR` of
    /// zero operands vacuously false, and `XOR` is odd parity.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::OperandArity`] when NOT is given anything but
    /// one operand, or IF/IFF anything but two.
    pub fn apply(self, operands: &[bool]) -> Result<Applied, EvalError> {
        match self {
            Operator::And => Ok(Applied::Done(operands.iter().all(|&b| b))),
            Operator::Or => Ok(Applied::Done(operands.iter().any(|&b| b))),
            Operator::Not => {
                let [value] = operands else {
                    return Err(self.arity_error(1, operands.len()));
                };
                Ok(Applied::Done(!value))
            }
            Operator::Xor => Ok(Applied::Done(
                operands.iter().filter(|&&b| b).count() % 2 == 1,
            )),
            Operator::Nand => Ok(Applied::Continue(negation_of(Operator::And, operands))),
            Operator::Nor => Ok(Applied::Continue(negation_of(Operator::Or, operands))),
            Operator::Xnor => Ok(Applied::Continue(negation_of(Operator::Xor, operands))),
            Operator::If => {
                let [premise, conclusion] = operands else {
                    return Err(self.arity_error(2, operands.len()));
                };
                // IF(a, b) = OR(NOT(a), b)
                Ok(Applied::Continue(CircuitNode::Invocation {
                    operator: OperatorRef::Direct(Operator::Or),
                    operands: vec![
                        CircuitNode::Invocation {
                            operator: OperatorRef::Direct(Operator::Not),
                            operands: vec![CircuitNode::Literal(*premise)],
                        },
                        CircuitNode::Literal(*conclusion),
                    ],
                }))
            }
            Operator::Iff => {
                if operands.len() != 2 {
                    return Err(self.arity_error(2, operands.len()));
                }
                // IFF(a, b) = NOT(XOR(a, b))
                Ok(Applied::Continue(negation_of(Operator::Xor, operands)))
            }
        }
    }

    fn arity_error(self, expected: usize, actual: usize) -> EvalError {
        EvalError::OperandArity {
            operator: self,
            expected,
            actual,
        }
    }
}

/// Build `NOT(inner(operands...))` over literal operands.
fn negation_of(inner: Operator, operands: &[bool]) -> CircuitNode {
    CircuitNode::Invocation {
        operator: OperatorRef::Direct(Operator::Not),
        operands: vec![CircuitNode::Invocation {
            operator: OperatorRef::Direct(inner),
            operands: operands.iter().copied().map(CircuitNode::Literal).collect(),
        }],
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A reference to an operator inside a circuit: either resolved up front or
/// a symbolic name looked up against the registry at evaluation time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperatorRef {
    Direct(Operator),
    Named(String),
}

impl From<Operator> for OperatorRef {
    fn from(op: Operator) -> Self {
        OperatorRef::Direct(op)
    }
}

impl fmt::Display for OperatorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperatorRef::Direct(op) => write!(f, "{op}"),
            OperatorRef::Named(name) => f.write_str(name),
        }
    }
}

/// Immutable name table for operator resolution.
///
/// Passed explicitly into the evaluator; there is no ambient global table.
/// [`OperatorRegistry::standard`] holds the nine canonical entries.
#[derive(Debug, Clone)]
pub struct OperatorRegistry {
    entries: HashMap<&'static str, Operator>,
}

impl OperatorRegistry {
    /// The standard registry: every operator under its canonical name.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            entries: Operator::ALL.iter().map(|&op| (op.name(), op)).collect(),
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Operator> {
        self.entries.get(name).copied()
    }

    /// Resolve an [`OperatorRef`] against this registry.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::UnknownOperator`] for a name not in the table.
    pub fn resolve(&self, reference: &OperatorRef) -> Result<Operator, EvalError> {
        match reference {
            OperatorRef::Direct(op) => Ok(*op),
            OperatorRef::Named(name) => {
                self.get(name).ok_or_else(|| EvalError::UnknownOperator {
                    name: name.clone(),
                })
            }
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for OperatorRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn done(applied: Applied) -> bool {
        match applied {
            Applied::Done(b) => b,
            Applied::Continue(node) => panic!("expected Done, got Continue({node:?})"),
        }
    }

    #[test]
    fn and_vacuously_true() {
        assert!(done(Operator::And.apply(&[]).unwrap()));
    }

    #[test]
    fn or_vacuously_false() {
        assert!(!done(Operator::Or.apply(&[]).unwrap()));
    }

    #[test]
    fn and_requires_all_true() {
        assert!(done(Operator::And.apply(&[true, true, true]).unwrap()));
        assert!(!done(Operator::And.apply(&[true, false, true]).unwrap()));
    }

    #[test]
    fn or_requires_any_true() {
        assert!(done(Operator::Or.apply(&[false, true]).unwrap()));
        assert!(!done(Operator::Or.apply(&[false, false]).unwrap()));
    }

    #[test]
    fn not_negates() {
        assert!(!done(Operator::Not.apply(&[true]).unwrap()));
        assert!(done(Operator::Not.apply(&[false]).unwrap()));
    }

    #[test]
    fn not_rejects_wrong_arity() {
        let err = Operator::Not.apply(&[true, false]).unwrap_err();
        assert!(matches!(
            err,
            EvalError::OperandArity {
                operator: Operator::Not,
                expected: 1,
                actual: 2,
            }
        ));
    }

    #[test]
    fn xor_is_odd_parity() {
        assert!(!done(Operator::Xor.apply(&[]).unwrap()));
        assert!(done(Operator::Xor.apply(&[true]).unwrap()));
        assert!(!done(Operator::Xor.apply(&[true, true]).unwrap()));
        assert!(done(Operator::Xor.apply(&[true, true, true]).unwrap()));
    }

    #[test]
    fn nand_continues_with_negated_and() {
        let applied = Operator::Nand.apply(&[true, false]).unwrap();
        match applied {
            Applied::Continue(CircuitNode::Invocation { operator, operands }) => {
                assert_eq!(operator, OperatorRef::Direct(Operator::Not));
                assert_eq!(operands.len(), 1);
            }
            other => panic!("expected Continue(NOT(..)), got {other:?}"),
        }
    }

    #[test]
    fn if_rejects_wrong_arity() {
        let err = Operator::If.apply(&[true]).unwrap_err();
        assert!(matches!(
            err,
            EvalError::OperandArity {
                operator: Operator::If,
                expected: 2,
                actual: 1,
            }
        ));
    }

    #[test]
    fn iff_rejects_wrong_arity() {
        assert!(Operator::Iff.apply(&[true, false, true]).is_err());
    }

    #[test]
    fn canonical_names_round_trip() {
        for op in Operator::ALL {
            assert_eq!(Operator::from_name(op.name()), Some(op));
        }
        assert_eq!(Operator::from_name("XAND"), None);
    }

    #[test]
    fn standard_registry_resolves_all() {
        let registry = OperatorRegistry::standard();
        assert_eq!(registry.len(), 9);
        for op in Operator::ALL {
            let reference = OperatorRef::Named(op.name().to_owned());
            assert_eq!(registry.resolve(&reference).unwrap(), op);
        }
    }

    #[test]
    fn unknown_name_is_an_error() {
        let registry = OperatorRegistry::standard();
        let reference = OperatorRef::Named("IMPLIES".to_owned());
        let err = registry.resolve(&reference).unwrap_err();
        assert!(matches!(err, EvalError::UnknownOperator { name } if name == "IMPLIES"));
    }

    #[test]
    fn direct_ref_bypasses_table() {
        let registry = OperatorRegistry::standard();
        let reference = OperatorRef::Direct(Operator::Xor);
        assert_eq!(registry.resolve(&reference).unwrap(), Operator::Xor);
    }
}
