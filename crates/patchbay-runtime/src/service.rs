//! Service descriptions and the override overlay.
//!
//! A [`ServiceDescription`] is the declarative input to a container: the
//! ordered unit list and the container-level connection strings. It is
//! immutable during a run, with one exception — an optional override file
//! applied at the start of `init`, used to adapt a shared description to a
//! particular installation without editing it.
//!
//! # Override semantics
//!
//! The override file mirrors the description's unit list. Per matching
//! unit id it shallow-merges `options` (key by key) and, when present,
//! replaces the unit's `connections` wholesale. Entries without an `id`
//! and an object-shaped `options` are skipped; ids that match nothing are
//! ignored; a missing file is a no-op.

use crate::kinds;
use patchbay_fault::{Fault, FaultRegistry};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::path::Path;

/// Static configuration of one unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitDescriptor {
    /// Unit id, unique within the service.
    pub id: String,
    /// Type string resolved by the unit-type resolver, e.g.
    /// `"vendor.Clock"`.
    #[serde(rename = "type")]
    pub type_name: String,
    /// Options merged into the unit before validation.
    #[serde(default)]
    pub options: Map<String, Value>,
    /// Unit-inline connection strings, resolved before container-level
    /// ones.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connections: Option<Vec<String>>,
}

impl UnitDescriptor {
    /// Descriptor with empty options and no connections.
    #[must_use]
    pub fn new(id: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            type_name: type_name.into(),
            options: Map::new(),
            connections: None,
        }
    }

    /// Sets one option.
    #[must_use]
    pub fn option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Sets the inline connection list.
    #[must_use]
    pub fn connections(mut self, connections: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.connections = Some(connections.into_iter().map(Into::into).collect());
        self
    }
}

/// Declarative input to a container.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceDescription {
    /// Units, in initialization order.
    #[serde(default)]
    pub units: Vec<UnitDescriptor>,
    /// Container-level connection strings, resolved after every unit's
    /// inline list.
    #[serde(default)]
    pub connections: Vec<String>,
}

impl ServiceDescription {
    /// Empty description.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a unit.
    #[must_use]
    pub fn unit(mut self, descriptor: UnitDescriptor) -> Self {
        self.units.push(descriptor);
        self
    }

    /// Appends a container-level connection string.
    #[must_use]
    pub fn connection(mut self, connection: impl Into<String>) -> Self {
        self.connections.push(connection.into());
        self
    }

    /// Loads a description from a JSON file.
    ///
    /// # Errors
    ///
    /// [`kinds::RESOLVER_IMPORT_FAILED`] with the path attached and the
    /// read or parse error chained.
    pub fn from_path(registry: &FaultRegistry, path: impl AsRef<Path>) -> Result<Self, Fault> {
        let path = path.as_ref();
        let import_fault = |detail: String| {
            registry
                .make(
                    kinds::RESOLVER_IMPORT_FAILED,
                    json!({ "path": path.display().to_string() }),
                )
                .add(detail)
        };
        let content = std::fs::read_to_string(path).map_err(|err| import_fault(err.to_string()))?;
        serde_json::from_str(&content).map_err(|err| import_fault(err.to_string()))
    }
}

/// Override overlay mirroring a service description's unit list.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceOverlay {
    /// Per-unit override entries.
    #[serde(default)]
    pub units: Vec<OverlayEntry>,
}

/// One unit's override entry.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OverlayEntry {
    /// Target unit id.
    #[serde(default)]
    pub id: Option<String>,
    /// Options shallow-merged over the declared ones.
    #[serde(default)]
    pub options: Option<Map<String, Value>>,
    /// Replacement connection list.
    #[serde(default)]
    pub connections: Option<Vec<String>>,
}

impl ServiceOverlay {
    /// Loads an overlay from a JSON file.
    ///
    /// # Errors
    ///
    /// [`kinds::RESOLVER_IMPORT_FAILED`] with the path attached and the
    /// read or parse error chained.
    pub fn from_path(registry: &FaultRegistry, path: impl AsRef<Path>) -> Result<Self, Fault> {
        let path = path.as_ref();
        let import_fault = |detail: String| {
            registry
                .make(
                    kinds::RESOLVER_IMPORT_FAILED,
                    json!({ "path": path.display().to_string() }),
                )
                .add(detail)
        };
        let content = std::fs::read_to_string(path).map_err(|err| import_fault(err.to_string()))?;
        serde_json::from_str(&content).map_err(|err| import_fault(err.to_string()))
    }

    /// Applies the overlay to a description.
    ///
    /// Entries lacking an id or object-shaped options are skipped, as are
    /// ids matching no declared unit.
    pub fn apply(&self, service: &mut ServiceDescription) {
        for entry in &self.units {
            let (Some(id), Some(options)) = (&entry.id, &entry.options) else {
                continue;
            };
            for declared in service.units.iter_mut().filter(|unit| unit.id == *id) {
                for (key, value) in options {
                    declared.options.insert(key.clone(), value.clone());
                }
                if let Some(connections) = &entry.connections {
                    declared.connections = Some(connections.clone());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn base_service() -> ServiceDescription {
        ServiceDescription::new()
            .unit(
                UnitDescriptor::new("clock", "test.Clock")
                    .option("interval", 1000)
                    .connections(["clock.tick -> sink.value"]),
            )
            .unit(UnitDescriptor::new("sink", "test.Sink"))
    }

    #[test]
    fn description_round_trips_through_json() {
        let service = base_service();
        let json = serde_json::to_string(&service).unwrap();
        let back: ServiceDescription = serde_json::from_str(&json).unwrap();
        assert_eq!(service, back);
    }

    #[test]
    fn type_field_uses_wire_name() {
        let json = serde_json::to_string(&UnitDescriptor::new("a", "test.A")).unwrap();
        assert!(json.contains("\"type\":\"test.A\""));
    }

    #[test]
    fn overlay_merges_options_shallowly() {
        let mut service = base_service();
        let overlay: ServiceOverlay = serde_json::from_value(serde_json::json!({
            "units": [
                { "id": "clock", "options": { "interval": 50, "label": "fast" } }
            ]
        }))
        .unwrap();

        overlay.apply(&mut service);

        let clock = &service.units[0];
        assert_eq!(clock.options["interval"], 50);
        assert_eq!(clock.options["label"], "fast");
        // Untouched unit keeps its (empty) options.
        assert!(service.units[1].options.is_empty());
    }

    #[test]
    fn overlay_replaces_connections_wholesale() {
        let mut service = base_service();
        let overlay: ServiceOverlay = serde_json::from_value(serde_json::json!({
            "units": [
                {
                    "id": "clock",
                    "options": {},
                    "connections": ["clock.tick -> other.value"]
                }
            ]
        }))
        .unwrap();

        overlay.apply(&mut service);
        assert_eq!(
            service.units[0].connections.as_deref(),
            Some(&["clock.tick -> other.value".to_string()][..])
        );
    }

    #[test]
    fn overlay_without_connections_keeps_declared_ones() {
        let mut service = base_service();
        let overlay: ServiceOverlay = serde_json::from_value(serde_json::json!({
            "units": [ { "id": "clock", "options": { "interval": 5 } } ]
        }))
        .unwrap();

        overlay.apply(&mut service);
        assert_eq!(
            service.units[0].connections.as_deref(),
            Some(&["clock.tick -> sink.value".to_string()][..])
        );
    }

    #[test]
    fn overlay_entries_without_id_or_options_are_skipped() {
        let mut service = base_service();
        let overlay: ServiceOverlay = serde_json::from_value(serde_json::json!({
            "units": [
                { "options": { "interval": 5 } },
                { "id": "clock" },
                { "id": "nobody", "options": { "x": 1 } }
            ]
        }))
        .unwrap();

        overlay.apply(&mut service);
        assert_eq!(service.units[0].options["interval"], 1000);
    }

    #[test]
    fn from_path_loads_description() {
        let registry = FaultRegistry::new();
        crate::register_kinds(&registry).unwrap();

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "units": [{{ "id": "a", "type": "test.A" }}], "connections": [] }}"#
        )
        .unwrap();

        let service = ServiceDescription::from_path(&registry, file.path()).unwrap();
        assert_eq!(service.units.len(), 1);
        assert_eq!(service.units[0].type_name, "test.A");
    }

    #[test]
    fn from_path_wraps_parse_errors() {
        let registry = FaultRegistry::new();
        crate::register_kinds(&registry).unwrap();

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        let fault = ServiceDescription::from_path(&registry, file.path()).unwrap_err();
        assert!(fault.is_short(kinds::RESOLVER_IMPORT_FAILED));
        assert!(!fault.causes.is_empty());
    }

    #[test]
    fn from_path_missing_file_faults() {
        let registry = FaultRegistry::new();
        crate::register_kinds(&registry).unwrap();

        let fault =
            ServiceDescription::from_path(&registry, "/definitely/not/here.json").unwrap_err();
        assert!(fault.is_short(kinds::RESOLVER_IMPORT_FAILED));
    }
}
