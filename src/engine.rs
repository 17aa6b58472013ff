use serde_json::Value;
use tracing::{debug, trace};

use crate::evaluate::{Evaluator, DEFAULT_MAX_DEPTH};
use crate::types::{
    CapabilityLookup, Context, EvalError, OperatorRegistry, ResultsShape, Route, RouteSpec, Rule,
    RuleSet, RuleSetEntry, RuleType, RunOutcome, RunResults,
};

/// Default bound on WHILE-rule iterations.
pub const DEFAULT_ITERATION_LIMIT: usize = 10_000;

/// Executes a [`RuleSet`] to completion (or first error) over one shared
/// context.
///
/// Rules run strictly in order: WHILE conditions and later rules depend on
/// context mutations made by earlier routes, so there is no parallelism
/// between rules. All per-rule `context` and `lookup` fragments are merged
/// before the first rule executes.
#[derive(Debug, Clone)]
pub struct RuleEngine {
    registry: OperatorRegistry,
    max_depth: usize,
    iteration_limit: usize,
}

impl RuleEngine {
    #[must_use]
    pub fn new() -> Self {
        Self {
            registry: OperatorRegistry::standard(),
            max_depth: DEFAULT_MAX_DEPTH,
            iteration_limit: DEFAULT_ITERATION_LIMIT,
        }
    }

    /// Replace the operator registry.
    #[must_use]
    pub fn with_registry(mut self, registry: OperatorRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Replace the circuit nesting bound.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Replace the WHILE iteration bound. A loop whose condition never
    /// turns false fails with
    /// [`IterationLimitExceeded`](EvalError::IterationLimitExceeded)
    /// instead of spinning forever.
    #[must_use]
    pub fn with_iteration_limit(mut self, iteration_limit: usize) -> Self {
        self.iteration_limit = iteration_limit;
        self
    }

    /// Run a rule set, choosing the result shape by inspection: keyed if
    /// any rule carries a name, ordered otherwise.
    ///
    /// # Errors
    ///
    /// Propagates the first [`EvalError`] from any rule; no partial results
    /// are returned.
    pub async fn run(
        &self,
        rules: &RuleSet,
        ctx: Context,
        lookup: &CapabilityLookup,
    ) -> Result<RunOutcome, EvalError> {
        let shape = if rules.has_named_rule() {
            ResultsShape::Keyed
        } else {
            ResultsShape::Ordered
        };
        self.run_with_shape(rules, ctx, lookup, shape).await
    }

    /// Run a rule set with an explicitly chosen result shape.
    ///
    /// # Errors
    ///
    /// See [`RuleEngine::run`].
    pub async fn run_with_shape(
        &self,
        rules: &RuleSet,
        ctx: Context,
        lookup: &CapabilityLookup,
        shape: ResultsShape,
    ) -> Result<RunOutcome, EvalError> {
        // Fragments are global for the whole run: merge every rule's
        // context/lookup before executing anything.
        let mut merged = lookup.clone();
        for entry in rules.entries() {
            if let RuleSetEntry::Rule(rule) = entry {
                if let Some(fragment) = &rule.context {
                    ctx.merge(fragment);
                }
                if let Some(fragment) = &rule.lookup {
                    merged.merge(fragment);
                }
            }
        }

        let mut results = RunResults::with_shape(shape);
        let mut last = Value::Null;

        for (index, entry) in rules.entries().iter().enumerate() {
            let value = match entry {
                RuleSetEntry::Rule(rule) => self.execute_rule(rule, index, &ctx, &merged).await?,
                RuleSetEntry::Circuit(node) => {
                    // Shorthand entry: IF semantics with passthrough routes.
                    let outcome = self.evaluator(&merged).evaluate(node, &ctx).await?;
                    Value::Bool(outcome)
                }
            };
            results.record(index, entry.name(), value.clone());
            last = value;
        }

        Ok(RunOutcome {
            results,
            result: last,
            context: ctx,
        })
    }

    async fn execute_rule(
        &self,
        rule: &Rule,
        index: usize,
        ctx: &Context,
        lookup: &CapabilityLookup,
    ) -> Result<Value, EvalError> {
        let label = rule.name.clone().unwrap_or_else(|| index.to_string());
        debug!(rule = %label, kind = %rule.kind, "executing rule");

        match rule.kind {
            RuleType::If | RuleType::Proposition => {
                let outcome = self.evaluator(lookup).evaluate(&rule.logic, ctx).await?;
                let route = branch_route(&rule.route, outcome)?;
                // The route runs for its side effects only; the rule's
                // recorded value is the condition itself.
                route.resolve(lookup)?.invoke(ctx.clone()).await?;
                Ok(Value::Bool(outcome))
            }
            RuleType::While => {
                let RouteSpec::Each(route) = &rule.route else {
                    return Err(EvalError::UnresolvedRoute {
                        name: "iteration".to_owned(),
                    });
                };

                let mut collected = Vec::new();
                while self.evaluator(lookup).evaluate(&rule.logic, ctx).await? {
                    if collected.len() >= self.iteration_limit {
                        return Err(EvalError::IterationLimitExceeded {
                            rule: label,
                            limit: self.iteration_limit,
                        });
                    }
                    let value = route.resolve(lookup)?.invoke(ctx.clone()).await?;
                    collected.push(if value.is_null() {
                        Value::Bool(true)
                    } else {
                        value
                    });
                    trace!(rule = %label, iterations = collected.len(), "iteration complete");
                }
                Ok(Value::Array(collected))
            }
        }
    }

    fn evaluator<'a>(&'a self, lookup: &'a CapabilityLookup) -> Evaluator<'a> {
        Evaluator::new(&self.registry, lookup).with_max_depth(self.max_depth)
    }
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn branch_route(spec: &RouteSpec, outcome: bool) -> Result<&Route, EvalError> {
    match spec {
        RouteSpec::Branch { on_true, .. } if outcome => Ok(on_true),
        RouteSpec::Branch { on_false, .. } => Ok(on_false),
        RouteSpec::Each(_) => Err(EvalError::UnresolvedRoute {
            name: outcome.to_string(),
        }),
    }
}

/// Run a rule set with the default engine (standard registry, default
/// limits, inferred result shape).
///
/// # Errors
///
/// See [`RuleEngine::run`].
pub async fn run_rule_set(
    rules: &RuleSet,
    ctx: Context,
    lookup: &CapabilityLookup,
) -> Result<RunOutcome, EvalError> {
    RuleEngine::new().run(rules, ctx, lookup).await
}
