use futures::future::{try_join_all, BoxFuture};
use futures::FutureExt;
use serde_json::Value;
use tracing::trace;

use crate::types::value_type_name;
use crate::types::{
    Applied, Capability, CapabilityLookup, CircuitNode, Context, EvalError, OperatorRegistry,
};

/// Default bound on circuit nesting, counting trampoline re-entries.
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// Reduces a [`CircuitNode`] to a boolean against a shared context.
///
/// Operands of an invocation are resolved concurrently and completely —
/// operators are not short-circuiting — and the first operand failure
/// aborts the whole invocation without waiting for its siblings. An
/// operator application that yields a replacement circuit
/// ([`Applied::Continue`]) is re-entered until it yields a final boolean,
/// with total nesting bounded by the depth limit.
pub struct Evaluator<'a> {
    registry: &'a OperatorRegistry,
    lookup: &'a CapabilityLookup,
    max_depth: usize,
}

impl<'a> Evaluator<'a> {
    #[must_use]
    pub fn new(registry: &'a OperatorRegistry, lookup: &'a CapabilityLookup) -> Self {
        Self {
            registry,
            lookup,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Replace the nesting bound.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Evaluate a circuit to its boolean value.
    ///
    /// # Errors
    ///
    /// Propagates the first [`EvalError`] raised by operator resolution,
    /// capability resolution or invocation, or the depth guard. Nothing is
    /// caught or retried.
    pub async fn evaluate(&self, node: &CircuitNode, ctx: &Context) -> Result<bool, EvalError> {
        self.eval_node(node, ctx, 0).await
    }

    fn eval_node<'f>(
        &'f self,
        node: &'f CircuitNode,
        ctx: &'f Context,
        depth: usize,
    ) -> BoxFuture<'f, Result<bool, EvalError>> {
        async move {
            if depth > self.max_depth {
                return Err(EvalError::DepthExceeded {
                    limit: self.max_depth,
                });
            }
            match node {
                CircuitNode::Literal(value) => Ok(*value),
                CircuitNode::Reference(name) => {
                    let capability = self.lookup.resolve(name)?;
                    self.invoke_boolean(&capability, ctx).await
                }
                CircuitNode::Capability(capability) => {
                    self.invoke_boolean(capability, ctx).await
                }
                CircuitNode::Invocation { operator, operands } => {
                    trace!(operator = %operator, operands = operands.len(), "resolving operands");
                    let resolved = try_join_all(
                        operands
                            .iter()
                            .map(|operand| self.eval_node(operand, ctx, depth + 1)),
                    )
                    .await?;

                    let op = self.registry.resolve(operator)?;
                    match op.apply(&resolved)? {
                        Applied::Done(result) => Ok(result),
                        Applied::Continue(next) => {
                            // Compositional operators unwind through here.
                            self.eval_node(&next, ctx, depth + 1).await
                        }
                    }
                }
            }
        }
        .boxed()
    }

    async fn invoke_boolean(
        &self,
        capability: &Capability,
        ctx: &Context,
    ) -> Result<bool, EvalError> {
        let value = capability.invoke(ctx.clone()).await?;
        match value {
            Value::Bool(result) => Ok(result),
            other => Err(EvalError::NonBooleanResult {
                reference: capability.name().unwrap_or("<anonymous>").to_owned(),
                actual: value_type_name(&other),
            }),
        }
    }
}

/// Evaluate a proposition with the standard operator registry and default
/// depth limit.
///
/// # Errors
///
/// See [`Evaluator::evaluate`].
pub async fn evaluate_proposition(
    node: &CircuitNode,
    ctx: &Context,
    lookup: &CapabilityLookup,
) -> Result<bool, EvalError> {
    let registry = OperatorRegistry::standard();
    Evaluator::new(&registry, lookup).evaluate(node, ctx).await
}
