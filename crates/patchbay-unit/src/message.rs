//! Unit-originated messages and the emitter handle.
//!
//! Lifecycle phases are a closed enum dispatched by the container; the
//! genuinely dynamic traffic a unit originates — log lines, alerts, metric
//! writes, storage snapshots — rides this open broadcast bus instead.
//! External collaborators (persistence, metric storage, consoles)
//! subscribe to the container's sender and filter by [`MessageChannel`].
//!
//! Sending with no subscriber is a silent no-op, so units never care
//! whether anyone is listening.

use crate::metric::MetricWrite;
use patchbay_fault::Fault;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::broadcast;

/// Channel a unit message belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageChannel {
    /// Operator-facing terminal line.
    Terminal,
    /// User-facing notification.
    Notify,
    /// Domain event.
    Event,
    /// Alert condition.
    Alert,
    /// Unit-reported error.
    Error,
    /// Shares snapshot for display collaborators.
    Render,
    /// Storage snapshot for persistence collaborators.
    Save,
    /// Metric value write.
    Metric,
    /// Metric series registration (announced during container init).
    MetricRegister,
    /// The unit cannot continue and asks to be terminated.
    Terminate,
}

/// One message originated by a unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitMessage {
    /// Originating unit ID.
    pub unit: String,
    /// Message channel.
    pub channel: MessageChannel,
    /// Primary payload; shape depends on the channel.
    pub data: Value,
    /// Supplementary payload (trace info, metric write, snapshot body).
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub trace: Value,
}

/// Per-unit sending handle onto the message bus.
///
/// Cloning is cheap; [`UnitEmitter::for_unit`] rebinds the originating ID
/// when the container seeds each unit from one shared sender.
#[derive(Debug, Clone)]
pub struct UnitEmitter {
    unit: String,
    sender: broadcast::Sender<UnitMessage>,
}

impl UnitEmitter {
    /// Creates an emitter bound to a unit ID.
    #[must_use]
    pub fn new(unit: impl Into<String>, sender: broadcast::Sender<UnitMessage>) -> Self {
        Self {
            unit: unit.into(),
            sender,
        }
    }

    /// Emitter for the same bus, bound to another unit ID.
    #[must_use]
    pub fn for_unit(&self, unit: impl Into<String>) -> Self {
        Self::new(unit, self.sender.clone())
    }

    /// Originating unit ID.
    #[must_use]
    pub fn unit(&self) -> &str {
        &self.unit
    }

    /// Subscribes to the underlying bus.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<UnitMessage> {
        self.sender.subscribe()
    }

    /// Sends one message; a bus without subscribers swallows it.
    pub fn send(&self, channel: MessageChannel, data: Value, trace: Value) {
        let _ = self.sender.send(UnitMessage {
            unit: self.unit.clone(),
            channel,
            data,
            trace,
        });
    }

    /// Terminal line.
    pub fn terminal(&self, data: impl Into<Value>, trace: Value) {
        self.send(MessageChannel::Terminal, data.into(), trace);
    }

    /// Notification.
    pub fn notify(&self, data: impl Into<Value>, trace: Value) {
        self.send(MessageChannel::Notify, data.into(), trace);
    }

    /// Domain event.
    pub fn event(&self, data: impl Into<Value>, trace: Value) {
        self.send(MessageChannel::Event, data.into(), trace);
    }

    /// Alert condition.
    pub fn alert(&self, data: impl Into<Value>, trace: Value) {
        self.send(MessageChannel::Alert, data.into(), trace);
    }

    /// Unit-reported error; a structured fault travels whole.
    pub fn error(&self, data: impl Into<Value>, fault: &Fault) {
        let trace = serde_json::to_value(fault).unwrap_or_else(|_| json!(fault.to_string()));
        self.send(MessageChannel::Error, data.into(), trace);
    }

    /// Metric value write against a registered path.
    pub fn metric(&self, path: impl Into<String>, value: f64, modify: MetricWrite) {
        self.send(
            MessageChannel::Metric,
            Value::String(path.into()),
            json!({ "value": value, "modify": modify }),
        );
    }

    /// Asks the outside world to terminate the unit after a fatal fault.
    pub fn terminate(&self, fault: &Fault, context: impl Into<Value>) {
        let trace = serde_json::to_value(fault).unwrap_or_else(|_| json!(fault.to_string()));
        self.send(MessageChannel::Terminate, context.into(), trace);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use patchbay_fault::FaultRegistry;

    fn emitter() -> (UnitEmitter, broadcast::Receiver<UnitMessage>) {
        let (sender, receiver) = broadcast::channel(16);
        (UnitEmitter::new("clock", sender), receiver)
    }

    #[test]
    fn send_reaches_subscriber() {
        let (emitter, mut receiver) = emitter();
        emitter.terminal("tick", Value::Null);

        let message = receiver.try_recv().unwrap();
        assert_eq!(message.unit, "clock");
        assert_eq!(message.channel, MessageChannel::Terminal);
        assert_eq!(message.data, json!("tick"));
    }

    #[test]
    fn send_without_subscriber_is_silent() {
        let (sender, receiver) = broadcast::channel(16);
        drop(receiver);
        let emitter = UnitEmitter::new("clock", sender);
        emitter.notify("nobody home", Value::Null);
    }

    #[test]
    fn metric_write_shape() {
        let (emitter, mut receiver) = emitter();
        emitter.metric("loop.latency", 12.5, MetricWrite::Avg);

        let message = receiver.try_recv().unwrap();
        assert_eq!(message.channel, MessageChannel::Metric);
        assert_eq!(message.data, json!("loop.latency"));
        assert_eq!(message.trace, json!({ "value": 12.5, "modify": "avg" }));
    }

    #[test]
    fn error_carries_structured_fault() {
        let (emitter, mut receiver) = emitter();
        let fault = FaultRegistry::new().make("REGISTRY_KIND_NOT_FOUND", json!({}));
        emitter.error("boom", &fault);

        let message = receiver.try_recv().unwrap();
        assert_eq!(message.channel, MessageChannel::Error);
        assert_eq!(message.trace["short"], "REGISTRY_KIND_NOT_FOUND");
    }

    #[test]
    fn for_unit_rebinds_id() {
        let (emitter, mut receiver) = emitter();
        emitter.for_unit("gauge").event("rebound", Value::Null);

        let message = receiver.try_recv().unwrap();
        assert_eq!(message.unit, "gauge");
    }
}
