use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{Map, Value};

/// Shared execution context threaded through one full rule-set run.
///
/// A `Context` is a cheaply cloneable handle to a single JSON object map;
/// every clone observes every mutation. Capabilities and routes receive a
/// handle and may read and write freely — writes made by one rule are
/// visible to all later rules and loop iterations.
///
/// Mutation is synchronized with a mutex, so concurrent access is memory
/// safe, but there is no ordering discipline beyond that: sibling operands
/// of one invocation are resolved concurrently, and a capability that
/// writes the context from inside such a fan-out races its siblings.
/// Treat the context as read-mostly during operand resolution and confine
/// writes to routes and top-level rule steps.
#[derive(Clone, Default)]
pub struct Context {
    inner: Arc<Mutex<Map<String, Value>>>,
}

impl Context {
    /// Create an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context from an existing JSON object map.
    #[must_use]
    pub fn from_object(map: Map<String, Value>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(map)),
        }
    }

    /// Set a key, builder-style.
    #[must_use]
    pub fn with(self, key: &str, value: impl Into<Value>) -> Self {
        self.insert(key, value.into());
        self
    }

    /// Insert or overwrite a key.
    pub fn insert(&self, key: &str, value: Value) {
        self.inner.lock().insert(key.to_owned(), value);
    }

    /// Look up a key, returning a clone of its value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        self.inner.lock().get(key).cloned()
    }

    /// Merge a fragment into the context. Fragment entries overwrite
    /// existing keys.
    pub fn merge(&self, fragment: &Map<String, Value>) {
        let mut guard = self.inner.lock();
        for (key, value) in fragment {
            guard.insert(key.clone(), value.clone());
        }
    }

    /// Copy the current state into a detached map, e.g. for serializing a
    /// response. Later mutations of the context do not affect the copy.
    #[must_use]
    pub fn snapshot(&self) -> Map<String, Value> {
        self.inner.lock().clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Context").field(&self.snapshot()).finish()
    }
}

impl From<Map<String, Value>> for Context {
    fn from(map: Map<String, Value>) -> Self {
        Self::from_object(map)
    }
}
