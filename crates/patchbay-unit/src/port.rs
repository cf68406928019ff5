//! Port spec builders and descriptors.
//!
//! A [`PortSpec`] declares one connection point on a unit: its type tag,
//! whether connecting it is mandatory, whether it is a dynamic template,
//! and optional documentation schemas for the data crossing it.
//!
//! # Type tags
//!
//! The tag is a free-form string; two ports can only be connected when
//! their tags are identical. [`PortSpec::standard`] and
//! [`PortSpec::returning`] cover the two conventional signal styles,
//! [`PortSpec::typed`] declares data-typed ports:
//!
//! ```
//! use patchbay_unit::PortSpec;
//!
//! let out = PortSpec::typed("number").description("Measured value");
//! assert_eq!(out.export().tag, "number");
//! ```
//!
//! # Dynamic ports
//!
//! A dynamic spec is a template: the declared name must contain `%d`, and
//! the container expands it into `count` concrete ports (`cmd%d` with count
//! 3 becomes `cmd1`, `cmd2`, `cmd3`) before any connection resolves.

use patchbay_rules::{Rule, RuleDescriptor};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Ordered set of declared ports, keyed by (possibly dynamic) name.
pub type PortSet = BTreeMap<String, PortSpec>;

/// Direction of a port, from the owning unit's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortDirection {
    /// Data flows into the unit; delivery invokes the unit's handler.
    Input,
    /// Data flows out of the unit, fanning out over its connections.
    Output,
}

impl std::fmt::Display for PortDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Input => write!(f, "input"),
            Self::Output => write!(f, "output"),
        }
    }
}

/// Declaration of one port.
#[derive(Debug, Clone, PartialEq)]
pub struct PortSpec {
    tag: String,
    description: String,
    required: bool,
    dynamic: bool,
    count: u32,
    requirement: Option<Rule>,
    returns: Option<Rule>,
}

impl PortSpec {
    /// Port carrying the given type tag.
    #[must_use]
    pub fn typed(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            description: String::new(),
            required: false,
            dynamic: false,
            count: 0,
            requirement: None,
            returns: None,
        }
    }

    /// Conventional fire-and-forget signal port.
    #[must_use]
    pub fn standard() -> Self {
        Self::typed("standard")
    }

    /// Conventional value-returning port: pushing through its single
    /// connection yields the downstream handler's result.
    #[must_use]
    pub fn returning() -> Self {
        Self::typed("return")
    }

    /// Marks the port as requiring a connection.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Turns the spec into a dynamic template expanded into `count`
    /// concrete ports. The declared name must contain `%d`.
    #[must_use]
    pub fn dynamic(mut self, count: u32) -> Self {
        self.dynamic = true;
        self.count = count;
        self
    }

    /// Documents the port.
    #[must_use]
    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = text.into();
        self
    }

    /// Documents the shape of data pushed through the port.
    ///
    /// Not enforced; surfaces in the exported descriptor for tooling.
    #[must_use]
    pub fn requirement(mut self, rule: Rule) -> Self {
        self.requirement = Some(rule);
        self
    }

    /// Documents the shape of data returned through the port.
    ///
    /// Not enforced; surfaces in the exported descriptor for tooling.
    #[must_use]
    pub fn returns(mut self, rule: Rule) -> Self {
        self.returns = Some(rule);
        self
    }

    /// Exports the spec as plain data.
    #[must_use]
    pub fn export(&self) -> PortDescriptor {
        PortDescriptor {
            tag: self.tag.clone(),
            description: self.description.clone(),
            required: self.required,
            dynamic: self.dynamic,
            count: self.count,
            requirement: self.requirement.as_ref().map(Rule::export),
            returns: self.returns.as_ref().map(Rule::export),
        }
    }
}

/// Exported, behavior-free form of a [`PortSpec`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortDescriptor {
    /// Type tag; connections require exact equality.
    pub tag: String,
    /// Port description.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Whether connecting this port is mandatory.
    pub required: bool,
    /// Whether this is a dynamic template.
    pub dynamic: bool,
    /// Expansion count for dynamic templates.
    pub count: u32,
    /// Documented shape of pushed data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requirement: Option<RuleDescriptor>,
    /// Documented shape of returned data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub returns: Option<RuleDescriptor>,
}

impl PortDescriptor {
    /// Returns a concrete (non-dynamic) copy of this descriptor.
    ///
    /// Used when a dynamic template is expanded: each concrete port keeps
    /// the template's tag and flags but is no longer dynamic.
    #[must_use]
    pub fn concrete(&self) -> Self {
        let mut descriptor = self.clone();
        descriptor.dynamic = false;
        descriptor.count = 0;
        descriptor
    }
}
