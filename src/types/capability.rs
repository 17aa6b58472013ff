use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::{self, BoxFuture};
use futures::FutureExt;
use serde_json::Value;

use super::context::Context;
use super::error::EvalError;

type CapabilityFn = dyn Fn(Context) -> BoxFuture<'static, Result<Value, EvalError>> + Send + Sync;

/// An externally supplied predicate or action, invoked with the shared
/// [`Context`].
///
/// Capabilities are the suspension points of the engine: they may perform
/// I/O, and within one invocation's operand fan-out they run concurrently.
/// A capability used as a circuit operand must produce a boolean; one used
/// as a route may return any JSON value.
///
/// The optional name is the capability's stable identity in the portable
/// form — only named capabilities can be encoded. Binding a capability into
/// a [`CapabilityLookup`] names it after its key if it has no name yet.
#[derive(Clone)]
pub struct Capability {
    name: Option<Arc<str>>,
    func: Arc<CapabilityFn>,
}

impl Capability {
    /// Wrap an async function.
    pub fn new<F, Fut>(func: F) -> Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, EvalError>> + Send + 'static,
    {
        Self {
            name: None,
            func: Arc::new(move |ctx| func(ctx).boxed()),
        }
    }

    /// Wrap an async function under a stable name.
    pub fn named<F, Fut>(name: &str, func: F) -> Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, EvalError>> + Send + 'static,
    {
        Self::new(func).with_name(name)
    }

    /// Wrap a synchronous boolean predicate.
    pub fn predicate<F>(func: F) -> Self
    where
        F: Fn(&Context) -> bool + Send + Sync + 'static,
    {
        Self {
            name: None,
            func: Arc::new(move |ctx| future::ready(Ok(Value::Bool(func(&ctx)))).boxed()),
        }
    }

    /// Wrap a synchronous action returning an arbitrary JSON value.
    pub fn action<F>(func: F) -> Self
    where
        F: Fn(&Context) -> Value + Send + Sync + 'static,
    {
        Self {
            name: None,
            func: Arc::new(move |ctx| future::ready(Ok(func(&ctx))).boxed()),
        }
    }

    /// Attach or replace the stable name.
    #[must_use]
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(Arc::from(name));
        self
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Invoke with a context handle. The returned future settles when the
    /// underlying predicate/action completes.
    pub fn invoke(&self, ctx: Context) -> BoxFuture<'static, Result<Value, EvalError>> {
        (self.func)(ctx)
    }
}

impl fmt::Debug for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "Capability({name:?})"),
            None => f.write_str("Capability(<anonymous>)"),
        }
    }
}

impl PartialEq for Capability {
    fn eq(&self, other: &Self) -> bool {
        match (&self.name, &other.name) {
            (Some(a), Some(b)) => a == b,
            _ => Arc::ptr_eq(&self.func, &other.func),
        }
    }
}

/// JSON type name for error messages.
pub(crate) fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Name → capability table.
///
/// One merged lookup serves a whole rule-set run: the caller-supplied base
/// table plus every rule's `lookup` fragment, merged in rule-set order
/// before any rule executes (later entries override earlier ones).
#[derive(Debug, Clone, Default)]
pub struct CapabilityLookup {
    entries: HashMap<String, Capability>,
}

impl CapabilityLookup {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a capability under a name, builder-style. An anonymous
    /// capability takes the binding name as its stable name.
    #[must_use]
    pub fn bind(mut self, name: &str, capability: Capability) -> Self {
        self.insert(name, capability);
        self
    }

    /// Insert or overwrite a binding.
    pub fn insert(&mut self, name: &str, capability: Capability) {
        let capability = if capability.name().is_some() {
            capability
        } else {
            capability.with_name(name)
        };
        self.entries.insert(name.to_owned(), capability);
    }

    /// Merge another lookup into this one; `other`'s entries override.
    pub fn merge(&mut self, other: &CapabilityLookup) {
        for (name, capability) in &other.entries {
            self.entries.insert(name.clone(), capability.clone());
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Capability> {
        self.entries.get(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Resolve a named reference.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::UnresolvedCapability`] when the name is absent.
    pub fn resolve(&self, name: &str) -> Result<Capability, EvalError> {
        self.entries
            .get(name)
            .cloned()
            .ok_or_else(|| EvalError::UnresolvedCapability {
                name: name.to_owned(),
            })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
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

/// A rule's action: either bound directly or a name resolved through the
/// merged lookup at call time.
#[derive(Debug, Clone, PartialEq)]
pub enum Route {
    Bound(Capability),
    Named(String),
}

impl Route {
    #[must_use]
    pub fn named(name: &str) -> Self {
        Route::Named(name.to_owned())
    }

    /// Resolve to a callable capability.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::UnresolvedRoute`] for a name absent from the
    /// lookup.
    pub(crate) fn resolve(&self, lookup: &CapabilityLookup) -> Result<Capability, EvalError> {
        match self {
            Route::Bound(capability) => Ok(capability.clone()),
            Route::Named(name) => {
                lookup
                    .get(name)
                    .cloned()
                    .ok_or_else(|| EvalError::UnresolvedRoute { name: name.clone() })
            }
        }
    }

    pub(crate) fn stable_name(&self) -> Option<&str> {
        match self {
            Route::Bound(capability) => capability.name(),
            Route::Named(name) => Some(name),
        }
    }
}

impl From<Capability> for Route {
    fn from(capability: Capability) -> Self {
        Route::Bound(capability)
    }
}

impl From<&str> for Route {
    fn from(name: &str) -> Self {
        Route::named(name)
    }
}

/// Routing for one rule: a true/false branch pair for IF-type rules, a
/// single per-iteration route for WHILE rules.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteSpec {
    Branch { on_true: Route, on_false: Route },
    Each(Route),
}

impl RouteSpec {
    #[must_use]
    pub fn branch(on_true: impl Into<Route>, on_false: impl Into<Route>) -> Self {
        RouteSpec::Branch {
            on_true: on_true.into(),
            on_false: on_false.into(),
        }
    }

    #[must_use]
    pub fn each(route: impl Into<Route>) -> Self {
        RouteSpec::Each(route.into())
    }

    /// The trivial branch pair used for bare circuit entries: both sides
    /// just hand the boolean back.
    #[must_use]
    pub(crate) fn passthrough() -> Self {
        RouteSpec::Branch {
            on_true: Route::Bound(Capability::action(|_| Value::Bool(true))),
            on_false: Route::Bound(Capability::action(|_| Value::Bool(false))),
        }
    }
}
