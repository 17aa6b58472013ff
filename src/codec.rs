//! Portable serialization of circuits and rule sets.
//!
//! The portable form is plain JSON, language-neutral and free of executable
//! text:
//!
//! ```text
//! NodeValue    := boolean | { "$ref": name } | [ OperatorName, NodeValue... ]
//! OperatorName := "AND"|"OR"|"NOT"|"NAND"|"NOR"|"XOR"|"XNOR"|"IF"|"IFF"
//! RuleSpec     := { "name"?, "type"?, "logic": NodeValue,
//!                   "route": { "true": name, "false": name } | name,
//!                   "context"?: object, "lookup"?: [name...] }
//! RuleSetSpec  := [ RuleSpec | NodeValue... ]
//! ```
//!
//! Operator references encode to their canonical names. Capabilities and
//! routes encode to their stable names — an unnamed capability cannot be
//! encoded. A rule's `lookup` fragment travels as the list of capability
//! names the rule requires; [`decode_rule_set`] resolves those names
//! against a host-supplied [`CapabilityLookup`] and rebinds them, so the
//! document itself never carries behavior, only references to it.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::types::value_type_name;
use crate::types::{
    CapabilityLookup, CircuitNode, Operator, OperatorRef, Route, RouteSpec, Rule, RuleSet,
    RuleSetEntry, RuleType,
};

const REF_KEY: &str = "$ref";

/// Errors that can occur when encoding to the portable form.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("cannot encode an unnamed capability; bind it under a name first")]
    UnnamedCapability,

    #[error("cannot encode an unnamed route; use a named route or a named capability")]
    UnnamedRoute,

    #[error("unknown operator '{name}'")]
    UnknownOperator { name: String },

    #[error("failed to encode rule: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors that can occur when decoding the portable form.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("unknown operator '{name}'")]
    UnknownOperator { name: String },

    #[error("unknown rule type '{found}'")]
    UnknownRuleType { found: String },

    #[error("capability '{name}' is not bound in the host lookup")]
    UnknownCapability { name: String },

    #[error("malformed node: {0}")]
    MalformedNode(String),

    #[error("malformed rule: {0}")]
    MalformedRule(String),

    #[error("malformed rule set: {0}")]
    MalformedRuleSet(String),
}

/// Serialized rule shape. `logic` and `route` stay dynamic because their
/// grammar is positional, not struct-like.
#[derive(Debug, Serialize, Deserialize)]
struct PortableRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    kind: Option<String>,
    logic: Value,
    route: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    context: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    lookup: Option<Vec<String>>,
}

// ---------------------------------------------------------------------------
// Nodes
// ---------------------------------------------------------------------------

/// Encode a circuit into the portable form.
///
/// # Errors
///
/// Returns [`EncodeError::UnnamedCapability`] for a bound capability with
/// no stable name, or [`EncodeError::UnknownOperator`] for a symbolic
/// operator reference outside the algebra.
pub fn encode_node(node: &CircuitNode) -> Result<Value, EncodeError> {
    match node {
        CircuitNode::Literal(value) => Ok(Value::Bool(*value)),
        CircuitNode::Reference(name) => Ok(json!({ REF_KEY: name })),
        CircuitNode::Capability(capability) => match capability.name() {
            Some(name) => Ok(json!({ REF_KEY: name })),
            None => Err(EncodeError::UnnamedCapability),
        },
        CircuitNode::Invocation { operator, operands } => {
            let name = canonical_operator_name(operator)?;
            let mut items = Vec::with_capacity(operands.len() + 1);
            items.push(Value::String(name.to_owned()));
            for operand in operands {
                items.push(encode_node(operand)?);
            }
            Ok(Value::Array(items))
        }
    }
}

/// Decode a circuit from the portable form.
///
/// References decode to [`CircuitNode::Reference`]; they bind to
/// capabilities at evaluation time through the merged lookup.
///
/// # Errors
///
/// Returns [`DecodeError`] for unknown operator names or structurally
/// invalid nodes.
pub fn decode_node(value: &Value) -> Result<CircuitNode, DecodeError> {
    match value {
        Value::Bool(b) => Ok(CircuitNode::Literal(*b)),
        Value::Object(map) => decode_reference(map),
        Value::Array(items) => {
            let Some((first, rest)) = items.split_first() else {
                return Err(DecodeError::MalformedNode(
                    "empty operator list".to_owned(),
                ));
            };
            let Value::String(name) = first else {
                return Err(DecodeError::MalformedNode(format!(
                    "operator name must be a string, got a {}",
                    value_type_name(first)
                )));
            };
            let operator = Operator::from_name(name)
                .ok_or_else(|| DecodeError::UnknownOperator { name: name.clone() })?;
            let operands = rest
                .iter()
                .map(decode_node)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(CircuitNode::Invocation {
                operator: OperatorRef::Direct(operator),
                operands,
            })
        }
        other => Err(DecodeError::MalformedNode(format!(
            "expected a boolean, a $ref object, or an operator list, got a {}",
            value_type_name(other)
        ))),
    }
}

fn decode_reference(map: &Map<String, Value>) -> Result<CircuitNode, DecodeError> {
    match map.get(REF_KEY) {
        Some(Value::String(name)) if map.len() == 1 => Ok(CircuitNode::Reference(name.clone())),
        _ => Err(DecodeError::MalformedNode(
            "object node must be exactly { \"$ref\": <name> }".to_owned(),
        )),
    }
}

fn canonical_operator_name(reference: &OperatorRef) -> Result<&'static str, EncodeError> {
    match reference {
        OperatorRef::Direct(op) => Ok(op.name()),
        OperatorRef::Named(name) => Operator::from_name(name)
            .map(Operator::name)
            .ok_or_else(|| EncodeError::UnknownOperator { name: name.clone() }),
    }
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

/// Encode a rule set into the portable form.
///
/// # Errors
///
/// Returns [`EncodeError`] if any capability or route in the set lacks a
/// stable name.
pub fn encode_rule_set(rules: &RuleSet) -> Result<Value, EncodeError> {
    let mut items = Vec::with_capacity(rules.len());
    for entry in rules.entries() {
        items.push(match entry {
            RuleSetEntry::Circuit(node) => encode_node(node)?,
            RuleSetEntry::Rule(rule) => encode_rule(rule)?,
        });
    }
    Ok(Value::Array(items))
}

fn encode_rule(rule: &Rule) -> Result<Value, EncodeError> {
    let route = match &rule.route {
        RouteSpec::Branch { on_true, on_false } => json!({
            "true": route_name(on_true)?,
            "false": route_name(on_false)?,
        }),
        RouteSpec::Each(route) => Value::String(route_name(route)?.to_owned()),
    };

    // Sorted for deterministic output.
    let lookup = rule.lookup.as_ref().map(|fragment| {
        let mut names: Vec<String> = fragment.names().map(str::to_owned).collect();
        names.sort();
        names
    });

    let portable = PortableRule {
        name: rule.name.clone(),
        kind: (rule.kind != RuleType::Proposition).then(|| rule.kind.name().to_owned()),
        logic: encode_node(&rule.logic)?,
        route,
        context: rule.context.clone(),
        lookup,
    };
    Ok(serde_json::to_value(portable)?)
}

fn route_name(route: &Route) -> Result<&str, EncodeError> {
    route.stable_name().ok_or(EncodeError::UnnamedRoute)
}

/// Decode a rule set from the portable form, resolving declared capability
/// names against the host lookup.
///
/// # Errors
///
/// Returns [`DecodeError`] on structural problems, unknown operator or rule
/// type names, or a declared capability absent from `host`.
pub fn decode_rule_set(value: &Value, host: &CapabilityLookup) -> Result<RuleSet, DecodeError> {
    let Value::Array(items) = value else {
        return Err(DecodeError::MalformedRuleSet(format!(
            "expected an array of rules, got a {}",
            value_type_name(value)
        )));
    };

    let mut entries = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Value::Object(map) if map.contains_key("logic") => {
                entries.push(RuleSetEntry::Rule(decode_rule(item, host)?));
            }
            other => entries.push(RuleSetEntry::Circuit(decode_node(other)?)),
        }
    }
    Ok(RuleSet { entries })
}

fn decode_rule(value: &Value, host: &CapabilityLookup) -> Result<Rule, DecodeError> {
    let portable: PortableRule = serde_json::from_value(value.clone())
        .map_err(|e| DecodeError::MalformedRule(e.to_string()))?;

    let kind = match portable.kind.as_deref() {
        None => RuleType::Proposition,
        Some(name) => RuleType::from_name(name).ok_or_else(|| DecodeError::UnknownRuleType {
            found: name.to_owned(),
        })?,
    };

    let lookup = match portable.lookup {
        None => None,
        Some(names) => {
            let mut fragment = CapabilityLookup::new();
            for name in &names {
                let capability = host
                    .get(name)
                    .cloned()
                    .ok_or_else(|| DecodeError::UnknownCapability { name: name.clone() })?;
                fragment.insert(name, capability);
            }
            Some(fragment)
        }
    };

    Ok(Rule {
        name: portable.name,
        kind,
        logic: decode_node(&portable.logic)?,
        route: decode_route(&portable.route, kind)?,
        context: portable.context,
        lookup,
    })
}

fn decode_route(value: &Value, kind: RuleType) -> Result<RouteSpec, DecodeError> {
    match (kind, value) {
        (RuleType::While, Value::String(name)) => Ok(RouteSpec::each(name.as_str())),
        (RuleType::While, other) => Err(DecodeError::MalformedRule(format!(
            "WHILE route must be a capability name, got a {}",
            value_type_name(other)
        ))),
        (_, Value::Object(map)) => {
            if map.len() != 2 {
                return Err(DecodeError::MalformedRule(
                    "branch route must have exactly \"true\" and \"false\" entries".to_owned(),
                ));
            }
            Ok(RouteSpec::branch(
                branch_name(map, "true")?,
                branch_name(map, "false")?,
            ))
        }
        (_, other) => Err(DecodeError::MalformedRule(format!(
            "IF route must be a {{\"true\", \"false\"}} object, got a {}",
            value_type_name(other)
        ))),
    }
}

fn branch_name<'a>(map: &'a Map<String, Value>, key: &str) -> Result<&'a str, DecodeError> {
    match map.get(key) {
        Some(Value::String(name)) => Ok(name),
        _ => Err(DecodeError::MalformedRule(format!(
            "branch route missing string entry for \"{key}\""
        ))),
    }
}
