//! Action spec builders and descriptors.
//!
//! An action is an externally invokable unit capability. Its requirement
//! rules are enforced on every invocation; its return rules are
//! documentation only.
//!
//! ```
//! use patchbay_rules::{ruleset, Rule};
//! use patchbay_unit::ActionSpec;
//!
//! let spec = ActionSpec::global()
//!     .requirements(ruleset! {
//!         "id" => Rule::string().required().description("Target ID"),
//!     })
//!     .description("Ping one target");
//! assert_eq!(spec.export().kind, "global");
//! ```

use patchbay_rules::{RuleDescriptor, RuleSet};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Ordered set of declared actions, keyed by name.
pub type ActionSet = BTreeMap<String, ActionSpec>;

/// Declaration of one action.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionSpec {
    kind: String,
    requirements: RuleSet,
    returns: RuleSet,
    description: String,
}

impl ActionSpec {
    /// The one action kind: invokable from outside the container.
    #[must_use]
    pub fn global() -> Self {
        Self {
            kind: "global".to_string(),
            requirements: RuleSet::new(),
            returns: RuleSet::new(),
            description: String::new(),
        }
    }

    /// Rules the invocation payload must satisfy.
    ///
    /// Validated on every call; an invocation payload is always an object.
    #[must_use]
    pub fn requirements(mut self, rules: RuleSet) -> Self {
        self.requirements = rules;
        self
    }

    /// Documents the shape of the returned data.
    ///
    /// Not enforced; surfaces in the exported descriptor.
    #[must_use]
    pub fn returns(mut self, rules: RuleSet) -> Self {
        self.returns = rules;
        self
    }

    /// Documents the action.
    #[must_use]
    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = text.into();
        self
    }

    /// Live requirement rules, used for per-invocation validation.
    #[must_use]
    pub fn requirement_rules(&self) -> &RuleSet {
        &self.requirements
    }

    /// Exports the spec as plain data.
    #[must_use]
    pub fn export(&self) -> ActionDescriptor {
        let export_set = |set: &RuleSet| -> BTreeMap<String, RuleDescriptor> {
            set.iter()
                .map(|(key, rule)| (key.clone(), rule.export()))
                .collect()
        };
        ActionDescriptor {
            kind: self.kind.clone(),
            requirements: export_set(&self.requirements),
            returns: export_set(&self.returns),
            description: self.description.clone(),
        }
    }
}

/// Exported, behavior-free form of an [`ActionSpec`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionDescriptor {
    /// Action kind.
    pub kind: String,
    /// Exported requirement rules.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub requirements: BTreeMap<String, RuleDescriptor>,
    /// Exported return rules.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub returns: BTreeMap<String, RuleDescriptor>,
    /// Action description.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use patchbay_rules::{ruleset, Rule};

    #[test]
    fn export_is_stable() {
        let spec = ActionSpec::global()
            .requirements(ruleset! { "x" => Rule::number().required() })
            .returns(ruleset! { "ok" => Rule::boolean() })
            .description("Do the thing");
        assert_eq!(spec.export(), spec.export());
    }

    #[test]
    fn export_carries_both_rule_sets() {
        let spec = ActionSpec::global()
            .requirements(ruleset! { "x" => Rule::number() })
            .returns(ruleset! { "ok" => Rule::boolean() });
        let descriptor = spec.export();
        assert_eq!(descriptor.requirements["x"].kind, "number");
        assert_eq!(descriptor.returns["ok"].kind, "boolean");
    }

    #[test]
    fn descriptor_serializes_round_trip() {
        let descriptor = ActionSpec::global()
            .requirements(ruleset! { "x" => Rule::number() })
            .export();
        let json = serde_json::to_string(&descriptor).unwrap();
        let back: ActionDescriptor = serde_json::from_str(&json).unwrap();
        assert_eq!(descriptor, back);
    }
}
