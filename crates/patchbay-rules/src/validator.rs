//! The aggregate validator.
//!
//! [`Validator::validate`] checks a JSON object against a [`RuleSet`]. It
//! never fails fast: every declared field is checked, every failure becomes
//! a [`Problem`], and all problems are reported in one
//! [`VALIDATOR_NOT_PASSED`](crate::kinds::VALIDATOR_NOT_PASSED) fault — so a
//! caller can present every configuration mistake at once instead of one
//! per run.
//!
//! ```
//! use patchbay_fault::FaultRegistry;
//! use patchbay_rules::{ruleset, Rule, Validator};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! let registry = Arc::new(FaultRegistry::new());
//! let validator = Validator::new(Arc::clone(&registry)).unwrap();
//!
//! let rules = ruleset! {
//!     "interval" => Rule::number().integer().min(1.0).required(),
//!     "label"    => Rule::string().default("unnamed"),
//! };
//!
//! let mut options = json!({ "interval": 250 });
//! let map = options.as_object_mut().unwrap();
//! validator.validate(&rules, map).unwrap();
//! // Defaults are the only mutation.
//! assert_eq!(map["label"], "unnamed");
//! ```

use crate::rule::{RuleDescriptor, RuleSet};
use crate::{kinds, Rule};
use patchbay_fault::{Fault, FaultRegistry};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;

/// One field's validation failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Problem {
    /// Short identifier of the failing check's fault kind.
    pub short: String,
    /// Stable code of the failing check's fault kind.
    pub code: String,
    /// Key of the offending field.
    pub field: String,
    /// Failure message; the rule's template applied when one is set.
    pub message: String,
    /// The offending rule, exported.
    pub rule: RuleDescriptor,
    /// Fields attached by the failing check (limits, indexes).
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub args: Map<String, Value>,
}

/// Validates JSON objects against rule sets, aggregating failures.
#[derive(Debug, Clone)]
pub struct Validator {
    registry: Arc<FaultRegistry>,
}

impl Validator {
    /// Creates a validator and registers its fault kinds.
    ///
    /// # Errors
    ///
    /// Fails only when the registry already holds a differing kind under a
    /// validator identity.
    pub fn new(registry: Arc<FaultRegistry>) -> Result<Self, Fault> {
        kinds::register_kinds(&registry)?;
        Ok(Self { registry })
    }

    /// Registry handle this validator mints faults from.
    #[must_use]
    pub fn registry(&self) -> &Arc<FaultRegistry> {
        &self.registry
    }

    /// Validates every declared field of `data`.
    ///
    /// Fills configured defaults into `data`; otherwise leaves it
    /// untouched.
    ///
    /// # Errors
    ///
    /// Returns one `VALIDATOR_NOT_PASSED` fault carrying the full problem
    /// list when any field fails.
    pub fn validate(&self, rules: &RuleSet, data: &mut Map<String, Value>) -> Result<(), Fault> {
        Self::check(&self.registry, rules, data)
    }

    /// Registry-explicit form of [`Validator::validate`].
    ///
    /// Used by nested-object recursion, where the rule only holds a
    /// borrowed registry.
    pub fn check(
        registry: &FaultRegistry,
        rules: &RuleSet,
        data: &mut Map<String, Value>,
    ) -> Result<(), Fault> {
        let mut problems = Vec::new();
        for (key, rule) in rules {
            if let Err(fault) = rule.validate(registry, data, key) {
                problems.push(Self::problem(fault, key, rule, data.get(key)));
            }
        }
        if problems.is_empty() {
            return Ok(());
        }
        Err(registry.make(kinds::VALIDATOR_NOT_PASSED, json!({ "problems": problems })))
    }

    /// Builds a [`Problem`] from one field's fault.
    fn problem(fault: Fault, key: &str, rule: &Rule, value: Option<&Value>) -> Problem {
        let message = if rule.message_template().is_empty() {
            fault.message.clone()
        } else {
            Self::render_message(rule, value)
        };
        Problem {
            short: fault.short,
            code: fault.code,
            field: key.to_string(),
            message,
            rule: rule.export(),
            args: fault.fields,
        }
    }

    /// Applies a rule's message template.
    ///
    /// Substitutes `{value}`, `{example}`, `{default}` and `{description}`.
    fn render_message(rule: &Rule, value: Option<&Value>) -> String {
        let descriptor = rule.export();
        rule.message_template()
            .replace("{value}", &Self::inspect(value))
            .replace("{example}", &Self::inspect(Some(&descriptor.example)))
            .replace("{default}", &Self::inspect(Some(&descriptor.default)))
            .replace("{description}", &descriptor.description)
    }

    /// Renders a value for message interpolation.
    fn inspect(value: Option<&Value>) -> String {
        match value {
            None | Some(Value::Null) => "null".to_string(),
            Some(Value::String(text)) => text.clone(),
            Some(other) => {
                serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string())
            }
        }
    }
}
