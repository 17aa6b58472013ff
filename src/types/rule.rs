use std::fmt;

use serde_json::{Map, Value};

use super::capability::{Capability, CapabilityLookup, Route, RouteSpec};
use super::node::CircuitNode;

/// Execution mode of a rule. `Proposition` is the default and behaves
/// exactly like `If`; the distinction only survives in the portable form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RuleType {
    If,
    While,
    #[default]
    Proposition,
}

impl RuleType {
    /// Canonical name, as used by the portable form.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            RuleType::If => "IF",
            RuleType::While => "WHILE",
            RuleType::Proposition => "PROPOSITION",
        }
    }

    /// Resolve a canonical rule-type name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<RuleType> {
        match name {
            "IF" => Some(RuleType::If),
            "WHILE" => Some(RuleType::While),
            "PROPOSITION" => Some(RuleType::Proposition),
            _ => None,
        }
    }
}

impl fmt::Display for RuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One unit of a rule set: a circuit (`logic`) paired with routing behavior
/// and an execution mode, plus optional context/lookup fragments that are
/// merged into the run before any rule executes.
#[derive(Debug, Clone)]
pub struct Rule {
    pub name: Option<String>,
    pub kind: RuleType,
    pub logic: CircuitNode,
    pub route: RouteSpec,
    /// Context fragment, merged into the shared context pre-run.
    pub context: Option<Map<String, Value>>,
    /// Lookup fragment, merged into the run-wide lookup pre-run. Fragments
    /// are global for the whole run, not scoped to this rule.
    pub lookup: Option<CapabilityLookup>,
}

/// An element of a rule set: a full rule, or a bare circuit shorthand that
/// executes as an IF rule whose routes just hand the boolean back.
#[derive(Debug, Clone)]
pub enum RuleSetEntry {
    Rule(Rule),
    Circuit(CircuitNode),
}

impl RuleSetEntry {
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            RuleSetEntry::Rule(rule) => rule.name.as_deref(),
            RuleSetEntry::Circuit(_) => None,
        }
    }
}

/// An ordered rule set, executed sequentially over one shared context.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    pub(crate) entries: Vec<RuleSetEntry>,
}

impl RuleSet {
    #[must_use]
    pub fn builder() -> RuleSetBuilder {
        RuleSetBuilder::new()
    }

    #[must_use]
    pub fn entries(&self) -> &[RuleSetEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether any rule in the set carries a name. Decides the default
    /// result shape of a run (see
    /// [`RuleEngine::run`](crate::RuleEngine::run)).
    #[must_use]
    pub fn has_named_rule(&self) -> bool {
        self.entries.iter().any(|e| e.name().is_some())
    }

    /// Encode into the portable JSON form.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError`](crate::EncodeError) if any capability or
    /// route in the set lacks a stable name.
    pub fn to_portable(&self) -> Result<Value, crate::EncodeError> {
        crate::codec::encode_rule_set(self)
    }

    /// Decode from the portable JSON form, resolving declared capability
    /// names against `host`.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError`](crate::DecodeError) on malformed input or a
    /// declared capability missing from `host`.
    pub fn from_portable(value: &Value, host: &CapabilityLookup) -> Result<Self, crate::DecodeError> {
        crate::codec::decode_rule_set(value, host)
    }
}

#[cfg(feature = "binary-cache")]
impl RuleSet {
    /// Serialize this rule set's portable document into the binary
    /// envelope.
    ///
    /// The optional `source_text` is hashed (BLAKE3) and embedded in the
    /// payload metadata. Callers can use this to detect when the original
    /// source has changed and the cache should be rebuilt.
    ///
    /// # Errors
    ///
    /// Returns [`SerializeError`](crate::SerializeError) if encoding fails.
    pub fn to_bytes(
        &self,
        source_text: Option<&str>,
    ) -> Result<Vec<u8>, crate::serial::SerializeError> {
        crate::serial::encode(self, source_text)
    }

    /// Deserialize a rule set from a byte slice previously produced by
    /// [`to_bytes`](Self::to_bytes), rebinding capabilities against `host`.
    ///
    /// # Errors
    ///
    /// Returns [`DeserializeError`](crate::DeserializeError) on
    /// format, integrity, or validation failure.
    pub fn from_bytes(
        bytes: &[u8],
        host: &CapabilityLookup,
    ) -> Result<Self, crate::serial::DeserializeError> {
        crate::serial::decode(bytes, host)
    }

    /// Serialize this rule set and write it to a file.
    ///
    /// # Errors
    ///
    /// Returns [`SerializeError`](crate::SerializeError) on
    /// encoding or I/O failure.
    pub fn to_binary_file(
        &self,
        path: impl AsRef<std::path::Path>,
        source_text: Option<&str>,
    ) -> Result<(), crate::serial::SerializeError> {
        let bytes = self.to_bytes(source_text)?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    /// Read a file and deserialize the rule set it contains.
    ///
    /// # Errors
    ///
    /// Returns [`DeserializeError`](crate::DeserializeError) on
    /// I/O, format, integrity, or validation failure.
    pub fn from_binary_file(
        path: impl AsRef<std::path::Path>,
        host: &CapabilityLookup,
    ) -> Result<Self, crate::serial::DeserializeError> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes, host)
    }
}

impl fmt::Display for RuleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let named = self.entries.iter().filter(|e| e.name().is_some()).count();
        write!(f, "RuleSet({} entries, {named} named)", self.entries.len())
    }
}

/// Builder for a [`RuleSet`].
///
/// # Example
///
/// ```
/// use switchboard::{cap_ref, lit, RuleSetBuilder};
///
/// let rules = RuleSetBuilder::new()
///     .circuit(lit(true).and(cap_ref("is_open")))
///     .rule(|r| {
///         r.name("greet")
///             .when(cap_ref("is_open"))
///             .branch("say_hello", "say_closed")
///     })
///     .build();
/// assert_eq!(rules.len(), 2);
/// ```
#[derive(Debug, Default)]
pub struct RuleSetBuilder {
    entries: Vec<RuleSetEntry>,
}

impl RuleSetBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a bare circuit entry (proposition shorthand).
    #[must_use]
    pub fn circuit(mut self, node: CircuitNode) -> Self {
        self.entries.push(RuleSetEntry::Circuit(node));
        self
    }

    /// Append a rule defined through the closure.
    #[must_use]
    pub fn rule(mut self, f: impl FnOnce(RuleBuilder) -> RuleBuilder) -> Self {
        let builder = f(RuleBuilder::default());
        self.entries.push(RuleSetEntry::Rule(builder.finish()));
        self
    }

    #[must_use]
    pub fn build(self) -> RuleSet {
        RuleSet {
            entries: self.entries,
        }
    }
}

/// Intermediate builder passed to the rule definition closure.
///
/// A rule with no `when` condition is vacuously true; a rule with no
/// routing falls back to the passthrough branch pair (the boolean is handed
/// back, nothing else runs).
#[derive(Debug, Default)]
pub struct RuleBuilder {
    name: Option<String>,
    kind: Option<RuleType>,
    logic: Option<CircuitNode>,
    route: Option<RouteSpec>,
    context: Map<String, Value>,
    lookup: CapabilityLookup,
}

impl RuleBuilder {
    #[must_use]
    pub fn name(mut self, name: &str) -> Self {
        self.name = Some(name.to_owned());
        self
    }

    /// Set the condition circuit.
    #[must_use]
    pub fn when(mut self, logic: CircuitNode) -> Self {
        self.logic = Some(logic);
        self
    }

    /// Branch routes for an IF/PROPOSITION rule.
    #[must_use]
    pub fn branch(mut self, on_true: impl Into<Route>, on_false: impl Into<Route>) -> Self {
        self.route = Some(RouteSpec::branch(on_true, on_false));
        self
    }

    /// Per-iteration route; marks the rule as WHILE.
    #[must_use]
    pub fn repeat(mut self, route: impl Into<Route>) -> Self {
        self.kind = Some(RuleType::While);
        self.route = Some(RouteSpec::each(route));
        self
    }

    /// Override the execution mode explicitly.
    #[must_use]
    pub fn kind(mut self, kind: RuleType) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Add a context fragment entry.
    #[must_use]
    pub fn context(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.context.insert(key.to_owned(), value.into());
        self
    }

    /// Add a lookup fragment binding.
    #[must_use]
    pub fn bind(mut self, name: &str, capability: Capability) -> Self {
        self.lookup.insert(name, capability);
        self
    }

    fn finish(self) -> Rule {
        Rule {
            name: self.name,
            kind: self.kind.unwrap_or_default(),
            logic: self.logic.unwrap_or(CircuitNode::Literal(true)),
            route: self.route.unwrap_or_else(RouteSpec::passthrough),
            context: (!self.context.is_empty()).then_some(self.context),
            lookup: (!self.lookup.is_empty()).then_some(self.lookup),
        }
    }
}
