mod codec;
mod engine;
mod error;
mod evaluate;
mod parse;
#[cfg(feature = "binary-cache")]
mod serial;
mod types;

pub use codec::{
    decode_node, decode_rule_set, encode_node, encode_rule_set, DecodeError, EncodeError,
};
pub use engine::{run_rule_set, RuleEngine, DEFAULT_ITERATION_LIMIT};
pub use error::SwitchboardError;
pub use evaluate::{evaluate_proposition, Evaluator, DEFAULT_MAX_DEPTH};
pub use parse::ParseError;
pub use types::{
    cap_ref, invoke, lit, Applied, Capability, CapabilityLookup, CircuitNode, Context, EvalError,
    Operator, OperatorRef, OperatorRegistry, ResultsShape, Route, RouteSpec, Rule, RuleBuilder,
    RuleSet, RuleSetBuilder, RuleSetEntry, RuleType, RunOutcome, RunResults,
};

#[cfg(feature = "binary-cache")]
pub use serial::{DeserializeError, SerializeError};
