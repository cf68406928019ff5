//! Fault kind registry.
//!
//! Every fault kind must be registered before it can be made. Registration
//! is centralized so the full kind catalog — which subsystem owns which
//! code — can be listed at runtime.
//!
//! # Identity
//!
//! A kind is identified twice:
//!
//! - **code**: a stable random string, safe to match on across versions
//! - **short**: a readable UPPER_SNAKE identifier with a subsystem prefix
//!
//! Both must be unique. Re-registering a kind that is byte-identical to an
//! existing entry is accepted and does nothing, so independent subsystems
//! may register their catalogs without coordinating call order.
//!
//! # No singleton
//!
//! The registry is an ordinary value. Construct one at process start and
//! hand an `Arc<FaultRegistry>` to every subsystem that creates faults.
//!
//! ```
//! use patchbay_fault::{FaultRegistry, KindDef};
//! use serde_json::json;
//!
//! let registry = FaultRegistry::new();
//! registry
//!     .register(KindDef::new(
//!         "Demo",
//!         "k3P0qLmXw9Ya",
//!         "DEMO_NOT_READY",
//!         "Demo subsystem is not ready",
//!     ))
//!     .unwrap();
//!
//! let fault = registry.make("DEMO_NOT_READY", json!({ "stage": "boot" }));
//! assert!(fault.is_short("DEMO_NOT_READY"));
//! assert_eq!(fault.attached, vec!["stage".to_string()]);
//! ```

use crate::fault::Fault;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Kinds owned by the registry itself.
pub mod kinds {
    /// A differing kind was registered under an existing code or short.
    pub const REGISTRY_KIND_EXISTS: &str = "REGISTRY_KIND_EXISTS";
    /// `make` was called with an unregistered short identifier.
    pub const REGISTRY_KIND_NOT_FOUND: &str = "REGISTRY_KIND_NOT_FOUND";
    /// A foreign error converted into a fault.
    pub const REGISTRY_CONVERTED: &str = "REGISTRY_CONVERTED";
}

/// Definition of one fault kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KindDef {
    /// Subsystem grouping name.
    pub group: String,
    /// Stable random code.
    pub code: String,
    /// Readable UPPER_SNAKE identifier.
    pub short: String,
    /// Kind description, used as the fault message.
    pub description: String,
    /// Schema of the fields commonly attached to this kind.
    ///
    /// Documentation only — attachments are not validated against it.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub fields: Value,
}

impl KindDef {
    /// Creates a kind definition with no field schema.
    #[must_use]
    pub fn new(
        group: impl Into<String>,
        code: impl Into<String>,
        short: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            code: code.into(),
            short: short.into(),
            description: description.into(),
            fields: Value::Null,
        }
    }

    /// Attaches a field schema describing the kind's attachments.
    #[must_use]
    pub fn fields(mut self, schema: Value) -> Self {
        self.fields = schema;
        self
    }
}

/// Process-wide fault kind registry.
///
/// Interior locking keeps registration callable from any subsystem holding
/// a shared handle; after startup the table is effectively read-only.
#[derive(Debug, Default)]
pub struct FaultRegistry {
    entries: RwLock<Vec<KindDef>>,
}

impl FaultRegistry {
    /// Creates a registry pre-loaded with its own kinds.
    #[must_use]
    pub fn new() -> Self {
        let registry = Self {
            entries: RwLock::new(Vec::new()),
        };
        {
            let mut entries = registry.entries.write();
            entries.push(KindDef::new(
                "Registry",
                "NcZIb9QvQRcq",
                kinds::REGISTRY_KIND_EXISTS,
                "A different fault kind is already registered under this identity",
            ));
            entries.push(KindDef::new(
                "Registry",
                "uLYv4mE1Yo50",
                kinds::REGISTRY_KIND_NOT_FOUND,
                "No fault kind registered under this identifier",
            ));
            entries.push(KindDef::new(
                "Registry",
                "RIl3BUrxWOzP",
                kinds::REGISTRY_CONVERTED,
                "Converted foreign error",
            ));
        }
        registry
    }

    /// Registers a fault kind.
    ///
    /// Re-registering a byte-identical definition is a no-op. A definition
    /// that collides on `code` or `short` but differs anywhere is rejected.
    ///
    /// # Errors
    ///
    /// Returns a [`kinds::REGISTRY_KIND_EXISTS`] fault on a differing
    /// collision, with the colliding `code` and `short` attached.
    pub fn register(&self, def: KindDef) -> Result<(), Fault> {
        let mut entries = self.entries.write();
        let existing = entries
            .iter()
            .find(|entry| entry.code == def.code || entry.short == def.short);
        match existing {
            Some(entry) if *entry == def => Ok(()),
            Some(_) => {
                let collision = serde_json::json!({
                    "code": def.code,
                    "short": def.short,
                });
                drop(entries);
                Err(self.make(kinds::REGISTRY_KIND_EXISTS, collision))
            }
            None => {
                entries.push(def);
                Ok(())
            }
        }
    }

    /// Creates a fault of a registered kind.
    ///
    /// `fields` must be a JSON object; its keys become the fault's attached
    /// fields, recorded in order for later introspection. Any other value
    /// attaches nothing.
    ///
    /// The caller's `file:line` is stamped as the fault origin, so reports
    /// point at the failure site rather than this factory.
    ///
    /// An unregistered `short` yields a [`kinds::REGISTRY_KIND_NOT_FOUND`]
    /// fault carrying the requested identifier, keeping failure paths
    /// infallible.
    #[track_caller]
    #[must_use]
    pub fn make(&self, short: &str, fields: Value) -> Fault {
        let location = std::panic::Location::caller();
        let origin = format!("{}:{}", location.file(), location.line());

        let entry = self.lookup(short);
        let Some(entry) = entry else {
            let mut missing = Map::new();
            missing.insert("requested".to_string(), Value::String(short.to_string()));
            return self.build(kinds::REGISTRY_KIND_NOT_FOUND, missing, origin);
        };

        let fields = match fields {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        let attached = fields.keys().cloned().collect();
        Fault {
            group: entry.group,
            code: entry.code,
            short: entry.short,
            message: entry.description,
            fields,
            attached,
            origin: Some(origin),
            causes: Vec::new(),
        }
    }

    /// Converts a foreign error into a fault.
    ///
    /// The error's rendered text becomes the first cause of a
    /// [`kinds::REGISTRY_CONVERTED`] fault. A [`Fault`] passed through an
    /// error trait object is not detected; call sites that may hold faults
    /// should chain them directly.
    #[track_caller]
    #[must_use]
    pub fn convert(&self, error: &dyn std::error::Error) -> Fault {
        self.make(kinds::REGISTRY_CONVERTED, Value::Null)
            .add(error.to_string())
    }

    /// Lists every registered kind, in registration order.
    #[must_use]
    pub fn catalog(&self) -> Vec<KindDef> {
        self.entries.read().clone()
    }

    /// Looks up a kind by short identifier or code.
    fn lookup(&self, key: &str) -> Option<KindDef> {
        self.entries
            .read()
            .iter()
            .find(|entry| entry.short == key || entry.code == key)
            .cloned()
    }

    /// Builds a fault for a registry-owned kind without re-entering `make`.
    fn build(&self, short: &str, fields: Map<String, Value>, origin: String) -> Fault {
        let entry = self
            .lookup(short)
            .unwrap_or_else(|| KindDef::new("Registry", "", short, "unregistered registry kind"));
        let attached = fields.keys().cloned().collect();
        Fault {
            group: entry.group,
            code: entry.code,
            short: entry.short,
            message: entry.description,
            fields,
            attached,
            origin: Some(origin),
            causes: Vec::new(),
        }
    }
}
