//! Rule builders and descriptors.
//!
//! A [`Rule`] is a composable constraint on one field of a JSON object:
//! a type kind, a required flag, an optional default, documentation
//! strings, and an ordered list of kind-specific checks.
//!
//! # Building
//!
//! Builders are move-style: every method consumes and returns the rule, and
//! the result is used as a value in a [`RuleSet`].
//!
//! ```
//! use patchbay_rules::{Rule, ruleset};
//!
//! let rules = ruleset! {
//!     "timeout" => Rule::number().integer().min(0.0).default(1000.0)
//!         .description("Interval timeout in milliseconds"),
//!     "label"   => Rule::string().required().max_length(64),
//! };
//! assert_eq!(rules.len(), 2);
//! ```
//!
//! # Exporting
//!
//! [`Rule::export`] produces a [`RuleDescriptor`]: plain serializable data
//! with no behavior, safe to persist or send to documentation tooling.
//! Exporting is stable — two exports of the same rule are equal.

use crate::kinds;
use patchbay_fault::{Fault, FaultRegistry};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

/// An ordered set of named rules, one per validated field.
pub type RuleSet = BTreeMap<String, Rule>;

/// Builds a [`RuleSet`] literal.
///
/// ```
/// use patchbay_rules::{Rule, ruleset};
///
/// let rules = ruleset! {
///     "enabled" => Rule::boolean().default(true),
/// };
/// assert!(rules.contains_key("enabled"));
/// ```
#[macro_export]
macro_rules! ruleset {
    ( $( $key:expr => $rule:expr ),* $(,)? ) => {{
        let mut set = $crate::RuleSet::new();
        $( set.insert(String::from($key), $rule); )*
        set
    }};
}

/// The type kind a rule validates against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    /// Any JSON value.
    Any,
    /// JSON boolean.
    Boolean,
    /// JSON number.
    Number,
    /// JSON string.
    String,
    /// JSON object, optionally with per-field rules.
    Object,
    /// JSON array, optionally with a per-element rule.
    Array,
    /// Callable value. JSON data can never satisfy this kind; it exists so
    /// descriptors can document callable fields of in-process structures.
    Function,
}

impl RuleKind {
    /// Descriptor tag for this kind.
    #[must_use]
    pub fn tag(self) -> &'static str {
        match self {
            Self::Any => "any",
            Self::Boolean => "boolean",
            Self::Number => "number",
            Self::String => "string",
            Self::Object => "object",
            Self::Array => "array",
            Self::Function => "function",
        }
    }
}

/// One kind-specific check, applied in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub enum Check {
    /// Number must have no fractional part.
    Integer,
    /// Number must not exceed the limit.
    Max(f64),
    /// Number must not fall below the limit.
    Min(f64),
    /// String length must stay strictly below the limit.
    MaxLength(usize),
    /// String length must stay strictly above the limit.
    MinLength(usize),
    /// Object fields validated against a nested rule set.
    Fields(RuleSet),
    /// Every array element validated against one rule.
    Content(Box<Rule>),
}

impl Check {
    fn export(&self) -> CheckDescriptor {
        match self {
            Self::Integer => CheckDescriptor::new("integer", Value::Null),
            Self::Max(limit) => CheckDescriptor::new("max", json!(limit)),
            Self::Min(limit) => CheckDescriptor::new("min", json!(limit)),
            Self::MaxLength(limit) => CheckDescriptor::new("max_length", json!(limit)),
            Self::MinLength(limit) => CheckDescriptor::new("min_length", json!(limit)),
            Self::Fields(rules) => {
                let exported: BTreeMap<&String, RuleDescriptor> =
                    rules.iter().map(|(key, rule)| (key, rule.export())).collect();
                CheckDescriptor::new("fields", json!(exported))
            }
            Self::Content(rule) => CheckDescriptor::new("content", json!(rule.export())),
        }
    }
}

/// Exported form of one check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckDescriptor {
    /// Check name.
    pub name: String,
    /// Check arguments, shape depending on the check.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub args: Value,
}

impl CheckDescriptor {
    fn new(name: &str, args: Value) -> Self {
        Self {
            name: name.to_string(),
            args,
        }
    }
}

/// Exported, behavior-free form of a [`Rule`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleDescriptor {
    /// Type kind tag.
    pub kind: String,
    /// Whether the field must be present.
    pub required: bool,
    /// Default filled in when the field is absent.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub default: Value,
    /// Example of a valid value.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub example: Value,
    /// Field description.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Failure message template.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
    /// Exported checks, in declaration order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub checks: Vec<CheckDescriptor>,
}

/// A composable constraint on one field.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    kind: RuleKind,
    required: bool,
    default: Option<Value>,
    example: Option<Value>,
    description: String,
    message: String,
    checks: Vec<Check>,
}

impl Rule {
    fn with_kind(kind: RuleKind) -> Self {
        Self {
            kind,
            required: false,
            default: None,
            example: None,
            description: String::new(),
            message: String::new(),
            checks: Vec::new(),
        }
    }

    /// Rule accepting any value.
    #[must_use]
    pub fn any() -> Self {
        Self::with_kind(RuleKind::Any)
    }

    /// Rule requiring a boolean.
    #[must_use]
    pub fn boolean() -> Self {
        Self::with_kind(RuleKind::Boolean)
    }

    /// Rule requiring a number.
    #[must_use]
    pub fn number() -> Self {
        Self::with_kind(RuleKind::Number)
    }

    /// Rule requiring a string.
    #[must_use]
    pub fn string() -> Self {
        Self::with_kind(RuleKind::String)
    }

    /// Rule requiring an object.
    #[must_use]
    pub fn object() -> Self {
        Self::with_kind(RuleKind::Object)
    }

    /// Rule requiring an array.
    #[must_use]
    pub fn array() -> Self {
        Self::with_kind(RuleKind::Array)
    }

    /// Rule requiring a callable value.
    ///
    /// See [`RuleKind::Function`] for the caveat on JSON data.
    #[must_use]
    pub fn function() -> Self {
        Self::with_kind(RuleKind::Function)
    }

    /// Marks the field as mandatory.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Sets the default filled in when the field is absent.
    #[must_use]
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Documents an example of a valid value.
    #[must_use]
    pub fn example(mut self, value: impl Into<Value>) -> Self {
        self.example = Some(value.into());
        self
    }

    /// Documents the field.
    #[must_use]
    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = text.into();
        self
    }

    /// Sets the failure message template.
    ///
    /// `{value}`, `{default}`, `{example}` and `{description}` are
    /// substituted when a problem is reported for this rule.
    #[must_use]
    pub fn message(mut self, template: impl Into<String>) -> Self {
        self.message = template.into();
        self
    }

    /// Number check: no fractional part.
    #[must_use]
    pub fn integer(mut self) -> Self {
        self.checks.push(Check::Integer);
        self
    }

    /// Number check: maximum value, inclusive.
    #[must_use]
    pub fn max(mut self, limit: f64) -> Self {
        self.checks.push(Check::Max(limit));
        self
    }

    /// Number check: minimum value, inclusive.
    #[must_use]
    pub fn min(mut self, limit: f64) -> Self {
        self.checks.push(Check::Min(limit));
        self
    }

    /// String check: length must stay strictly below the limit.
    #[must_use]
    pub fn max_length(mut self, limit: usize) -> Self {
        self.checks.push(Check::MaxLength(limit));
        self
    }

    /// String check: length must stay strictly above the limit.
    #[must_use]
    pub fn min_length(mut self, limit: usize) -> Self {
        self.checks.push(Check::MinLength(limit));
        self
    }

    /// Object check: validate the named fields of the nested object.
    #[must_use]
    pub fn fields(mut self, rules: RuleSet) -> Self {
        self.checks.push(Check::Fields(rules));
        self
    }

    /// Array check: validate every element against one rule.
    #[must_use]
    pub fn content(mut self, rule: Rule) -> Self {
        self.checks.push(Check::Content(Box::new(rule)));
        self
    }

    /// Type kind of this rule.
    #[must_use]
    pub fn kind(&self) -> RuleKind {
        self.kind
    }

    /// Whether the field is mandatory.
    #[must_use]
    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Failure message template, if configured.
    #[must_use]
    pub fn message_template(&self) -> &str {
        &self.message
    }

    /// Exports the rule as plain data.
    #[must_use]
    pub fn export(&self) -> RuleDescriptor {
        RuleDescriptor {
            kind: self.kind.tag().to_string(),
            required: self.required,
            default: self.default.clone().unwrap_or(Value::Null),
            example: self.example.clone().unwrap_or(Value::Null),
            description: self.description.clone(),
            message: self.message.clone(),
            checks: self.checks.iter().map(Check::export).collect(),
        }
    }

    /// Validates `data[key]` against this rule.
    ///
    /// Fills in the configured default when the field is absent; that is the
    /// only mutation. An absent field passes unless the rule is required.
    ///
    /// # Errors
    ///
    /// Returns the first failing check's fault. Aggregation across fields
    /// is the validator's job, not the rule's.
    pub fn validate(
        &self,
        registry: &FaultRegistry,
        data: &mut Map<String, Value>,
        key: &str,
    ) -> Result<(), Fault> {
        if let Some(default) = &self.default {
            if !data.contains_key(key) {
                data.insert(key.to_string(), default.clone());
            }
        }
        if !data.contains_key(key) {
            if self.required {
                return Err(registry.make(kinds::VALIDATOR_VALUE_REQUIRED, json!({ "key": key })));
            }
            return Ok(());
        }

        match self.kind {
            RuleKind::Any => Ok(()),
            RuleKind::Boolean => self.check_boolean(registry, data, key),
            RuleKind::Number => self.check_number(registry, data, key),
            RuleKind::String => self.check_string(registry, data, key),
            RuleKind::Object => self.check_object(registry, data, key),
            RuleKind::Array => self.check_array(registry, data, key),
            RuleKind::Function => {
                Err(registry.make(kinds::VALIDATOR_NOT_FUNCTION, json!({ "key": key })))
            }
        }
    }

    fn check_boolean(
        &self,
        registry: &FaultRegistry,
        data: &Map<String, Value>,
        key: &str,
    ) -> Result<(), Fault> {
        match data.get(key) {
            Some(Value::Bool(_)) => Ok(()),
            _ => Err(registry.make(kinds::VALIDATOR_NOT_BOOLEAN, json!({ "key": key }))),
        }
    }

    fn check_number(
        &self,
        registry: &FaultRegistry,
        data: &Map<String, Value>,
        key: &str,
    ) -> Result<(), Fault> {
        let value = match data.get(key).and_then(Value::as_f64) {
            Some(value) => value,
            None => {
                return Err(registry.make(kinds::VALIDATOR_NOT_NUMBER, json!({ "key": key })));
            }
        };
        for check in &self.checks {
            match check {
                Check::Integer if value.fract() != 0.0 => {
                    return Err(registry.make(kinds::VALIDATOR_NOT_INTEGER, json!({ "key": key })));
                }
                Check::Max(limit) if value > *limit => {
                    return Err(
                        registry.make(kinds::VALIDATOR_NUMBER_MAX, json!({ "limit": limit }))
                    );
                }
                Check::Min(limit) if value < *limit => {
                    return Err(
                        registry.make(kinds::VALIDATOR_NUMBER_MIN, json!({ "limit": limit }))
                    );
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn check_string(
        &self,
        registry: &FaultRegistry,
        data: &Map<String, Value>,
        key: &str,
    ) -> Result<(), Fault> {
        let value = match data.get(key).and_then(Value::as_str) {
            Some(value) => value,
            None => {
                return Err(registry.make(kinds::VALIDATOR_NOT_STRING, json!({ "key": key })));
            }
        };
        for check in &self.checks {
            match check {
                Check::MaxLength(limit) if value.chars().count() >= *limit => {
                    return Err(registry.make(
                        kinds::VALIDATOR_STRING_MAX_LENGTH,
                        json!({ "limit": limit, "key": key }),
                    ));
                }
                Check::MinLength(limit) if value.chars().count() <= *limit => {
                    return Err(registry.make(
                        kinds::VALIDATOR_STRING_MIN_LENGTH,
                        json!({ "limit": limit, "key": key }),
                    ));
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn check_object(
        &self,
        registry: &FaultRegistry,
        data: &mut Map<String, Value>,
        key: &str,
    ) -> Result<(), Fault> {
        if !data.get(key).is_some_and(Value::is_object) {
            return Err(registry.make(kinds::VALIDATOR_NOT_OBJECT, json!({ "key": key })));
        }
        for check in &self.checks {
            if let Check::Fields(rules) = check {
                let nested = data
                    .get_mut(key)
                    .and_then(Value::as_object_mut)
                    .expect("checked is_object above");
                if let Err(fault) = crate::Validator::check(registry, rules, nested) {
                    return Err(registry
                        .make(kinds::VALIDATOR_OBJECT_FIELDS, json!({ "key": key }))
                        .add(fault));
                }
            }
        }
        Ok(())
    }

    fn check_array(
        &self,
        registry: &FaultRegistry,
        data: &mut Map<String, Value>,
        key: &str,
    ) -> Result<(), Fault> {
        if !data.get(key).is_some_and(Value::is_array) {
            return Err(registry.make(kinds::VALIDATOR_NOT_ARRAY, json!({ "key": key })));
        }
        for check in &self.checks {
            if let Check::Content(rule) = check {
                let elements = data
                    .get_mut(key)
                    .and_then(Value::as_array_mut)
                    .expect("checked is_array above");
                for index in 0..elements.len() {
                    // Each element is validated through a one-field scratch
                    // object so content rules share the field machinery
                    // (defaults included).
                    let mut scratch = Map::new();
                    scratch.insert("value".to_string(), elements[index].take());
                    let outcome = rule.validate(registry, &mut scratch, "value");
                    if let Some(value) = scratch.remove("value") {
                        elements[index] = value;
                    }
                    if let Err(fault) = outcome {
                        return Err(registry
                            .make(kinds::VALIDATOR_ARRAY_CONTENT, json!({ "index": index }))
                            .add(fault));
                    }
                }
            }
        }
        Ok(())
    }
}
