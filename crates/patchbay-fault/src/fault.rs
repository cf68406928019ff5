//! The `Fault` value — one structured, chainable, wire-shaped error.
//!
//! Every failure in Patchbay is a [`Fault`]: a registered kind (group,
//! stable code, short identifier, description) plus the fields attached at
//! the failure site and an ordered chain of underlying causes.
//!
//! # Shape
//!
//! | Field | Purpose |
//! |-------|---------|
//! | `group` | Originating subsystem (`Container`, `Validator`, ...) |
//! | `code` | Stable random identifier, never reused |
//! | `short` | Readable UPPER_SNAKE identifier |
//! | `message` | Human description of the kind |
//! | `fields` | Structured data attached at the failure site |
//! | `attached` | Which field keys were supplied (for introspection) |
//! | `origin` | `file:line` of the call that created the fault |
//! | `causes` | Ordered chain of wrapped lower-level failures |
//!
//! # Wrap-and-chain
//!
//! Orchestration boundaries catch a low-level fault and wrap it into a
//! context-specific kind, keeping the original as a cause:
//!
//! ```ignore
//! registry.make(CONTAINER_UNIT_INIT, json!({ "unit": id })).add(cause)
//! ```
//!
//! A top-level caller sees one outermost fault and can walk [`Fault::causes`]
//! for diagnosis.
//!
//! # Foreign faults
//!
//! `Fault` is plain serde data. [`Fault::is_code`] and [`Fault::is_short`]
//! work on any deserialized value with the same shape, not only on faults
//! created by an in-process registry.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// One entry in a fault's cause chain.
///
/// Causes are either full [`Fault`] values (structured, walkable) or plain
/// text captured from a foreign error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Cause {
    /// A structured fault.
    Fault(Fault),
    /// A foreign error, kept as its rendered text.
    Text(String),
}

impl From<Fault> for Cause {
    fn from(fault: Fault) -> Self {
        Self::Fault(fault)
    }
}

impl From<String> for Cause {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for Cause {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl Cause {
    /// Returns the structured fault, if this cause carries one.
    #[must_use]
    pub fn as_fault(&self) -> Option<&Fault> {
        match self {
            Self::Fault(fault) => Some(fault),
            Self::Text(_) => None,
        }
    }
}

/// A structured, coded failure.
///
/// Create faults through [`FaultRegistry::make`](crate::FaultRegistry::make);
/// the registry fills in the kind data and stamps the call-site origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
#[error("[{short}] {message}")]
pub struct Fault {
    /// Subsystem grouping name.
    pub group: String,
    /// Stable random code, unique per kind.
    pub code: String,
    /// Readable UPPER_SNAKE identifier, unique per kind.
    pub short: String,
    /// Kind description.
    pub message: String,
    /// Structured fields attached at the failure site.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub fields: Map<String, Value>,
    /// Field keys supplied at construction, in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attached: Vec<String>,
    /// `file:line` of the creating call site.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    /// Ordered chain of wrapped causes, outermost first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub causes: Vec<Cause>,
}

impl Fault {
    /// Appends a cause to the chain.
    ///
    /// Consumes and returns the fault so wrap sites chain in one expression:
    ///
    /// ```
    /// # use patchbay_fault::{Fault, FaultRegistry, KindDef};
    /// # let registry = FaultRegistry::new();
    /// # registry.register(KindDef::new("Demo", "aaaaaaaaaaaa", "DEMO_OUTER", "outer")).unwrap();
    /// # let inner = registry.make("DEMO_OUTER", serde_json::json!({}));
    /// let outer = registry
    ///     .make("DEMO_OUTER", serde_json::json!({}))
    ///     .add(inner);
    /// assert_eq!(outer.causes.len(), 1);
    /// ```
    #[must_use]
    pub fn add(mut self, cause: impl Into<Cause>) -> Self {
        self.causes.push(cause.into());
        self
    }

    /// Appends a cause in place.
    pub fn push_cause(&mut self, cause: impl Into<Cause>) {
        self.causes.push(cause.into());
    }

    /// Overrides the captured origin.
    ///
    /// Used when a fault is constructed lazily, away from the interesting
    /// call site.
    #[must_use]
    pub fn set_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// Returns `true` if this fault carries the given stable code.
    #[must_use]
    pub fn is_code(&self, code: &str) -> bool {
        self.code == code
    }

    /// Returns `true` if this fault carries the given short identifier.
    #[must_use]
    pub fn is_short(&self, short: &str) -> bool {
        self.short == short
    }

    /// Reads an attached field.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Walks the cause chain to the innermost structured fault.
    ///
    /// Returns `self` when the chain is empty or only carries text causes.
    #[must_use]
    pub fn root_cause(&self) -> &Fault {
        let mut current = self;
        loop {
            match current.causes.iter().find_map(Cause::as_fault) {
                Some(inner) => current = inner,
                None => return current,
            }
        }
    }
}
