//! Introspectable container structure.
//!
//! While a container initializes it records, per unit, everything an
//! external tool needs to render or document the service: exported
//! actions and metrics, the full port list, and the resolved connections
//! per port. The structure is plain serializable data — read it, ship it,
//! snapshot it; the container itself never consumes it.

use patchbay_unit::{ActionDescriptor, MetricDescriptor, PortDescriptor, PortDirection};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// One resolved end of a connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortLink {
    /// Peer unit id.
    pub unit: String,
    /// Peer port name.
    pub port: String,
}

/// One concrete port, with its direction and exported declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructurePort {
    /// Port name.
    pub port: String,
    /// Port direction.
    pub direction: PortDirection,
    /// Exported declaration the port was built from.
    #[serde(flatten)]
    pub descriptor: PortDescriptor,
}

/// Everything recorded about one unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitStructure {
    /// Unit id.
    pub id: String,
    /// Declared type string.
    #[serde(rename = "type")]
    pub type_name: String,
    /// Exported actions by name.
    pub actions: BTreeMap<String, ActionDescriptor>,
    /// Input ports and the connections resolved onto them.
    pub inputs: BTreeMap<String, Vec<PortLink>>,
    /// Output ports and the connections resolved onto them.
    pub outputs: BTreeMap<String, Vec<PortLink>>,
    /// Every concrete port, in registration order.
    pub ports: Vec<StructurePort>,
    /// Exported metrics by path.
    pub metrics: BTreeMap<String, MetricDescriptor>,
    /// Display settings.
    pub settings: Value,
}

impl UnitStructure {
    /// Empty entry for a freshly initialized unit.
    #[must_use]
    pub fn new(id: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            type_name: type_name.into(),
            actions: BTreeMap::new(),
            inputs: BTreeMap::new(),
            outputs: BTreeMap::new(),
            ports: Vec::new(),
            metrics: BTreeMap::new(),
            settings: Value::Null,
        }
    }
}

/// Whole-service structure, keyed by unit id.
pub type ServiceStructure = BTreeMap<String, UnitStructure>;

#[cfg(test)]
mod tests {
    use super::*;
    use patchbay_unit::PortSpec;

    #[test]
    fn serializes_with_wire_names() {
        let mut entry = UnitStructure::new("clock", "test.Clock");
        entry.outputs.insert(
            "tick".to_string(),
            vec![PortLink {
                unit: "sink".to_string(),
                port: "value".to_string(),
            }],
        );
        entry.ports.push(StructurePort {
            port: "tick".to_string(),
            direction: PortDirection::Output,
            descriptor: PortSpec::typed("number").export(),
        });

        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["type"], "test.Clock");
        assert_eq!(json["outputs"]["tick"][0]["unit"], "sink");
        // Flattened descriptor fields sit beside the port name.
        assert_eq!(json["ports"][0]["tag"], "number");
        assert_eq!(json["ports"][0]["direction"], "output");
    }

    #[test]
    fn round_trips_through_json() {
        let mut entry = UnitStructure::new("clock", "test.Clock");
        entry.settings = serde_json::json!({ "channels": ["terminal"] });
        let json = serde_json::to_string(&entry).unwrap();
        let back: UnitStructure = serde_json::from_str(&json).unwrap();
        assert_eq!(entry, back);
    }
}
