mod capability;
mod context;
mod error;
mod node;
mod operator;
mod outcome;
mod rule;

pub use capability::{Capability, CapabilityLookup, Route, RouteSpec};
pub use context::Context;
pub use error::EvalError;
pub use node::{cap_ref, invoke, lit, CircuitNode};
pub use operator::{Applied, Operator, OperatorRef, OperatorRegistry};
pub use outcome::{ResultsShape, RunOutcome, RunResults};
pub use rule::{Rule, RuleBuilder, RuleSet, RuleSetBuilder, RuleSetEntry, RuleType};

pub(crate) use capability::value_type_name;
