use std::collections::BTreeMap;

use serde_json::Value;

use super::context::Context;

/// How a run stores its per-rule results.
///
/// `Ordered` is a plain array in rule-set order. `Keyed` is a map keyed by
/// rule name, with unnamed entries stored under their stringified
/// positional index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultsShape {
    Ordered,
    Keyed,
}

/// Per-rule results of one run, in the shape chosen before execution.
#[derive(Debug, Clone, PartialEq)]
pub enum RunResults {
    Ordered(Vec<Value>),
    Keyed(BTreeMap<String, Value>),
}

impl RunResults {
    pub(crate) fn with_shape(shape: ResultsShape) -> Self {
        match shape {
            ResultsShape::Ordered => RunResults::Ordered(Vec::new()),
            ResultsShape::Keyed => RunResults::Keyed(BTreeMap::new()),
        }
    }

    pub(crate) fn record(&mut self, index: usize, name: Option<&str>, value: Value) {
        match self {
            RunResults::Ordered(values) => values.push(value),
            RunResults::Keyed(entries) => {
                let key = name.map_or_else(|| index.to_string(), str::to_owned);
                entries.insert(key, value);
            }
        }
    }

    #[must_use]
    pub fn shape(&self) -> ResultsShape {
        match self {
            RunResults::Ordered(_) => ResultsShape::Ordered,
            RunResults::Keyed(_) => ResultsShape::Keyed,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            RunResults::Ordered(values) => values.len(),
            RunResults::Keyed(entries) => entries.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The complete outcome of one rule-set run: every rule's recorded value,
/// the last recorded value, and the (mutated) shared context.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub results: RunResults,
    /// The value of the last entry in iteration order, regardless of shape.
    pub result: Value,
    pub context: Context,
}
