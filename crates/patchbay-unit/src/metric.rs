//! Metric spec builders and descriptors.
//!
//! Units declare their time-series metrics up front; the container
//! registers each declaration and announces it on the message bus so a
//! metric-storage collaborator can provision series before any value is
//! written. Value writes themselves ride the bus too
//! (see [`UnitEmitter::metric`](crate::UnitEmitter::metric)).
//!
//! ```
//! use patchbay_unit::MetricSpec;
//!
//! let spec = MetricSpec::in_seconds()
//!     .retentions("1s:6h, 1m:1w")
//!     .description("Loop latency");
//! assert_eq!(spec.export().retentions, "1s:6h, 1m:1w");
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Ordered set of declared metrics, keyed by dotted path.
pub type MetricSet = BTreeMap<String, MetricSpec>;

/// Minimum time unit of a metric series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricInterval {
    /// Second resolution.
    Seconds,
    /// Millisecond resolution.
    Millis,
    /// Microsecond resolution.
    Micros,
}

/// Storage type of a series column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreKind {
    /// 32-bit float.
    Float,
    /// 64-bit float.
    Double,
    /// Unsigned 32-bit integer.
    Uint32,
    /// Unsigned 64-bit integer.
    Uint64,
}

/// How a written value folds into the current bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricWrite {
    /// Keep the last written value.
    Last,
    /// Keep the first written value.
    First,
    /// Keep the maximum.
    Max,
    /// Keep the minimum.
    Min,
    /// Average all writes.
    Avg,
    /// Sum all writes.
    Sum,
}

/// Declaration of one metric series.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSpec {
    interval: MetricInterval,
    retentions: String,
    value_store: StoreKind,
    time_store: StoreKind,
    description: String,
    additional: Value,
}

impl MetricSpec {
    fn with_interval(interval: MetricInterval) -> Self {
        Self {
            interval,
            retentions: "5s:10m, 1m:2h, 15m:1d, 1h:1w, 6h:1mon, 1d:1y".to_string(),
            value_store: StoreKind::Float,
            time_store: StoreKind::Uint64,
            description: String::new(),
            additional: Value::Null,
        }
    }

    /// Metric with second resolution.
    #[must_use]
    pub fn in_seconds() -> Self {
        Self::with_interval(MetricInterval::Seconds)
    }

    /// Metric with millisecond resolution.
    #[must_use]
    pub fn in_millis() -> Self {
        Self::with_interval(MetricInterval::Millis)
    }

    /// Metric with microsecond resolution.
    #[must_use]
    pub fn in_micros() -> Self {
        Self::with_interval(MetricInterval::Micros)
    }

    /// Graphite-style precision/retention list, e.g. `"5s:10m, 1m:2h"`.
    #[must_use]
    pub fn retentions(mut self, retentions: impl Into<String>) -> Self {
        self.retentions = retentions.into();
        self
    }

    /// Storage type of the value column.
    #[must_use]
    pub fn value_store(mut self, kind: StoreKind) -> Self {
        self.value_store = kind;
        self
    }

    /// Storage type of the time column.
    #[must_use]
    pub fn time_store(mut self, kind: StoreKind) -> Self {
        self.time_store = kind;
        self
    }

    /// Documents the metric.
    #[must_use]
    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = text.into();
        self
    }

    /// Attaches free-form collaborator data to the declaration.
    #[must_use]
    pub fn additional(mut self, data: Value) -> Self {
        self.additional = data;
        self
    }

    /// Exports the spec as plain data.
    #[must_use]
    pub fn export(&self) -> MetricDescriptor {
        MetricDescriptor {
            interval: self.interval,
            retentions: self.retentions.clone(),
            value_store: self.value_store,
            time_store: self.time_store,
            description: self.description.clone(),
            additional: self.additional.clone(),
        }
    }
}

/// Exported, behavior-free form of a [`MetricSpec`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricDescriptor {
    /// Minimum time unit.
    pub interval: MetricInterval,
    /// Graphite-style precision/retention list.
    pub retentions: String,
    /// Value column storage type.
    pub value_store: StoreKind,
    /// Time column storage type.
    pub time_store: StoreKind,
    /// Metric description.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Free-form collaborator data.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub additional: Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_match_convention() {
        let descriptor = MetricSpec::in_seconds().export();
        assert_eq!(descriptor.interval, MetricInterval::Seconds);
        assert_eq!(descriptor.value_store, StoreKind::Float);
        assert_eq!(descriptor.time_store, StoreKind::Uint64);
        assert!(descriptor.retentions.starts_with("5s:10m"));
    }

    #[test]
    fn export_is_stable() {
        let spec = MetricSpec::in_millis()
            .retentions("1s:6h")
            .value_store(StoreKind::Double)
            .additional(json!({ "unit": "ms" }));
        assert_eq!(spec.export(), spec.export());
    }

    #[test]
    fn descriptor_serializes_round_trip() {
        let descriptor = MetricSpec::in_micros().description("fine-grained").export();
        let json = serde_json::to_string(&descriptor).unwrap();
        let back: MetricDescriptor = serde_json::from_str(&json).unwrap();
        assert_eq!(descriptor, back);
    }

    #[test]
    fn write_modifier_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&MetricWrite::Avg).unwrap(), "\"avg\"");
    }
}
