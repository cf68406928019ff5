//! The `Unit` trait and its composed core.
//!
//! A unit is one instantiated, configured, wired component in the
//! container's graph. Unit authors implement [`Unit`] on a struct that
//! embeds a [`UnitCore`] — the core carries everything the runtime manages
//! (identity, options, ports, payloads, the emitter), the trait carries
//! everything the author declares and handles.
//!
//! # Lifecycle hooks, in call order
//!
//! | Hook | Phase | Purpose |
//! |------|-------|---------|
//! | `prepare_options` | init | massage raw options before validation |
//! | `option_rules` | init | declare the option schema |
//! | `pre_process` | init | set up state before ports exist |
//! | `actions` / `metrics` / `inputs` / `outputs` | init | declarations |
//! | `process` | startup | synchronous start work |
//! | `process_promise` | startup | awaited start work |
//! | `on_input` | wired | handle data arriving on an input port |
//! | `on_action` | any | handle an invoked action |
//! | `before_terminate` | teardown | last-chance cleanup |
//!
//! # Dispatch
//!
//! Declared input ports and actions are resolved into the container's
//! routing table during init. The container asks [`Unit::handles_input`] /
//! [`Unit::handles_action`] for every declared name and fails startup on
//! the spot if a unit declares something it does not handle; after that,
//! delivery is a plain name match in `on_input` / `on_action`.
//!
//! # Example
//!
//! ```
//! use async_trait::async_trait;
//! use patchbay_fault::Fault;
//! use patchbay_unit::{PortSet, PortSpec, Unit, UnitCore};
//! use serde_json::Value;
//!
//! struct Sink {
//!     core: UnitCore,
//!     seen: Vec<Value>,
//! }
//!
//! #[async_trait]
//! impl Unit for Sink {
//!     fn core(&self) -> &UnitCore { &self.core }
//!     fn core_mut(&mut self) -> &mut UnitCore { &mut self.core }
//!
//!     fn inputs(&self) -> PortSet {
//!         let mut ports = PortSet::new();
//!         ports.insert("value".into(), PortSpec::typed("number"));
//!         ports
//!     }
//!
//!     fn handles_input(&self, port: &str) -> bool {
//!         port == "value"
//!     }
//!
//!     fn on_input(&mut self, port: &str, data: Value) -> Result<Value, Fault> {
//!         match port {
//!             "value" => {
//!                 self.seen.push(data);
//!                 Ok(Value::Null)
//!             }
//!             other => Err(self.core.unhandled_input(other)),
//!         }
//!     }
//! }
//! ```

use crate::action::ActionSet;
use crate::kinds;
use crate::link::Port;
use crate::message::{MessageChannel, UnitEmitter};
use crate::metric::{MetricSet, MetricWrite};
use crate::port::{PortDirection, PortSet};
use async_trait::async_trait;
use patchbay_fault::{Fault, FaultRegistry};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Everything a unit needs at construction time.
///
/// Built by the container, consumed by [`UnitCore::new`].
#[derive(Debug, Clone)]
pub struct UnitSeed {
    /// Unit ID, unique within the container.
    pub id: String,
    /// Declared type string the resolver matched.
    pub type_name: String,
    /// Shared fault registry.
    pub registry: Arc<FaultRegistry>,
    /// Message bus handle, already bound to the unit ID.
    pub emitter: UnitEmitter,
}

/// Runtime-managed state embedded in every unit.
pub struct UnitCore {
    id: String,
    type_name: String,
    options: Map<String, Value>,
    /// Instance data the unit persists at moments of its choosing.
    pub storage: Value,
    /// Fast-changing display data, snapshotted by [`UnitCore::render`].
    pub shares: Value,
    inputs: BTreeMap<String, Port>,
    outputs: BTreeMap<String, Port>,
    emitter: UnitEmitter,
    registry: Arc<FaultRegistry>,
}

impl UnitCore {
    /// Builds a core from its seed.
    #[must_use]
    pub fn new(seed: UnitSeed) -> Self {
        Self {
            id: seed.id,
            type_name: seed.type_name,
            options: Map::new(),
            storage: Value::Null,
            shares: Value::Null,
            inputs: BTreeMap::new(),
            outputs: BTreeMap::new(),
            emitter: seed.emitter,
            registry: seed.registry,
        }
    }

    /// Unit ID.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Declared type string.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Validated options.
    #[must_use]
    pub fn options(&self) -> &Map<String, Value> {
        &self.options
    }

    /// Mutable options; the container merges and validates through this.
    pub fn options_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.options
    }

    /// One option by key.
    #[must_use]
    pub fn option(&self, key: &str) -> Option<&Value> {
        self.options.get(key)
    }

    /// Shared fault registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<FaultRegistry> {
        &self.registry
    }

    /// Message bus handle bound to this unit.
    #[must_use]
    pub fn emitter(&self) -> &UnitEmitter {
        &self.emitter
    }

    /// Mints a fault, stamped with this call site.
    #[track_caller]
    #[must_use]
    pub fn fault(&self, short: &str, fields: Value) -> Fault {
        self.registry.make(short, fields)
    }

    /// Registers a live port; the container calls this during init.
    pub fn register_port(&mut self, port: Port) {
        let table = match port.direction() {
            PortDirection::Input => &mut self.inputs,
            PortDirection::Output => &mut self.outputs,
        };
        table.insert(port.name().to_string(), port);
    }

    /// Looks up a live input port.
    #[must_use]
    pub fn input(&self, name: &str) -> Option<&Port> {
        self.inputs.get(name)
    }

    /// Looks up a live output port.
    #[must_use]
    pub fn output(&self, name: &str) -> Option<&Port> {
        self.outputs.get(name)
    }

    /// All live input ports.
    #[must_use]
    pub fn input_ports(&self) -> &BTreeMap<String, Port> {
        &self.inputs
    }

    /// All live output ports.
    #[must_use]
    pub fn output_ports(&self) -> &BTreeMap<String, Port> {
        &self.outputs
    }

    /// Pushes data through a named output port.
    ///
    /// # Errors
    ///
    /// [`kinds::UNIT_PORT_NOT_FOUND`] when no such output exists;
    /// otherwise whatever the downstream delivery returns.
    pub fn push_output(&self, name: &str, data: Value) -> Result<Value, Fault> {
        match self.outputs.get(name) {
            Some(port) => port.push(data),
            None => Err(self.registry.make(
                kinds::UNIT_PORT_NOT_FOUND,
                json!({ "unit": self.id, "port": name }),
            )),
        }
    }

    /// Fault for an input the unit does not handle.
    #[track_caller]
    #[must_use]
    pub fn unhandled_input(&self, port: &str) -> Fault {
        self.registry
            .make(kinds::UNIT_INPUT_UNHANDLED, json!({ "port": port }))
    }

    /// Fault for an action the unit does not handle.
    #[track_caller]
    #[must_use]
    pub fn unhandled_action(&self, action: &str) -> Fault {
        self.registry
            .make(kinds::UNIT_ACTION_UNHANDLED, json!({ "action": action }))
    }

    /// Snapshots `shares` onto the message bus for display collaborators.
    pub fn render(&self) {
        self.emitter
            .send(MessageChannel::Render, self.shares.clone(), Value::Null);
    }

    /// Snapshots `storage` onto the message bus for persistence
    /// collaborators.
    pub fn save(&self) {
        self.emitter
            .send(MessageChannel::Save, self.storage.clone(), Value::Null);
    }

    /// Writes a metric value against a registered path.
    pub fn metric(&self, path: impl Into<String>, value: f64, modify: MetricWrite) {
        self.emitter.metric(path, value, modify);
    }
}

impl std::fmt::Debug for UnitCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnitCore")
            .field("id", &self.id)
            .field("type_name", &self.type_name)
            .field("inputs", &self.inputs.keys())
            .field("outputs", &self.outputs.keys())
            .finish()
    }
}

/// Default settings payload: the message channels a display collaborator
/// may subscribe to for this unit.
#[must_use]
pub fn default_settings() -> Value {
    json!({
        "channels": ["terminal", "notify", "event", "action", "alert", "error", "render"]
    })
}

/// One live component in the container graph.
///
/// All hooks have working defaults; a minimal unit implements only the two
/// core accessors. Units must be `Send` — the container serializes all
/// access, but may be driven from a multi-threaded runtime.
#[async_trait]
pub trait Unit: Send {
    /// Runtime-managed core.
    fn core(&self) -> &UnitCore;

    /// Mutable runtime-managed core.
    fn core_mut(&mut self) -> &mut UnitCore;

    /// Short unit description; may use markdown.
    fn description(&self) -> String {
        String::new()
    }

    /// Massages raw options before validation.
    ///
    /// Runs after the container merges descriptor options into the core,
    /// before [`Unit::option_rules`] are enforced.
    ///
    /// # Errors
    ///
    /// A fault here aborts the unit's init; the container wraps it with
    /// the prepare-options kind and chains it.
    fn prepare_options(&mut self) -> Result<(), Fault> {
        Ok(())
    }

    /// Declares the option schema enforced at init.
    fn option_rules(&self) -> patchbay_rules::RuleSet {
        patchbay_rules::RuleSet::new()
    }

    /// Declares the unit's invokable actions.
    fn actions(&self) -> ActionSet {
        ActionSet::new()
    }

    /// Declares the unit's metric series.
    fn metrics(&self) -> MetricSet {
        MetricSet::new()
    }

    /// Display settings surfaced in the container structure.
    fn settings(&self) -> Value {
        default_settings()
    }

    /// Declares input ports.
    fn inputs(&self) -> PortSet {
        PortSet::new()
    }

    /// Declares output ports.
    fn outputs(&self) -> PortSet {
        PortSet::new()
    }

    /// Whether the unit handles a concrete input port name.
    ///
    /// Checked once per expanded port during init; declaring a port
    /// without handling it fails startup.
    fn handles_input(&self, _port: &str) -> bool {
        false
    }

    /// Whether the unit handles a declared action name.
    fn handles_action(&self, _action: &str) -> bool {
        false
    }

    /// Runs after option validation, before ports are created.
    ///
    /// The place to derive state that port declarations depend on
    /// (dynamic port counts and the like).
    fn pre_process(&mut self) {}

    /// Handles data arriving on an input port.
    ///
    /// # Errors
    ///
    /// Returns a fault to the pushing side; startup aborts if this happens
    /// during `process`.
    fn on_input(&mut self, port: &str, _data: Value) -> Result<Value, Fault> {
        Err(self.core().unhandled_input(port))
    }

    /// Handles an invoked action. The payload has already passed the
    /// action's requirement rules, defaults filled in.
    ///
    /// # Errors
    ///
    /// Returns a fault to the invoking caller; the running container is
    /// unaffected.
    async fn on_action(&mut self, action: &str, _payload: Value) -> Result<Value, Fault> {
        Err(self.core().unhandled_action(action))
    }

    /// Synchronous start work. Ports are wired; connections are live.
    ///
    /// # Errors
    ///
    /// A fault aborts startup for all remaining units.
    fn process(&mut self) -> Result<(), Fault> {
        Ok(())
    }

    /// Awaited start work, run after every unit's `process`.
    ///
    /// Awaited one unit at a time, in declaration order.
    ///
    /// # Errors
    ///
    /// A fault aborts startup for all remaining units.
    async fn process_promise(&mut self) -> Result<(), Fault> {
        Ok(())
    }

    /// Last-chance cleanup before the service winds down.
    ///
    /// Best effort; depending on how the process exits it may not run.
    fn before_terminate(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PortSpec;
    use tokio::sync::broadcast;

    fn seed(id: &str) -> UnitSeed {
        let (sender, _) = broadcast::channel(16);
        let registry = Arc::new(FaultRegistry::new());
        crate::register_kinds(&registry).unwrap();
        UnitSeed {
            id: id.to_string(),
            type_name: "test.Minimal".to_string(),
            registry,
            emitter: UnitEmitter::new(id, sender),
        }
    }

    struct Minimal {
        core: UnitCore,
    }

    #[async_trait]
    impl Unit for Minimal {
        fn core(&self) -> &UnitCore {
            &self.core
        }
        fn core_mut(&mut self) -> &mut UnitCore {
            &mut self.core
        }
    }

    #[test]
    fn defaults_are_empty_and_safe() {
        let unit = Minimal {
            core: UnitCore::new(seed("minimal")),
        };
        assert!(unit.inputs().is_empty());
        assert!(unit.outputs().is_empty());
        assert!(unit.actions().is_empty());
        assert!(unit.metrics().is_empty());
        assert!(!unit.handles_input("anything"));
        assert!(!unit.handles_action("anything"));
        assert_eq!(unit.settings()["channels"][0], "terminal");
    }

    #[test]
    fn default_on_input_reports_unhandled() {
        let mut unit = Minimal {
            core: UnitCore::new(seed("minimal")),
        };
        let fault = unit.on_input("value", Value::Null).unwrap_err();
        assert!(fault.is_short(kinds::UNIT_INPUT_UNHANDLED));
    }

    #[tokio::test]
    async fn default_on_action_reports_unhandled() {
        let mut unit = Minimal {
            core: UnitCore::new(seed("minimal")),
        };
        let fault = unit.on_action("ping", Value::Null).await.unwrap_err();
        assert!(fault.is_short(kinds::UNIT_ACTION_UNHANDLED));
    }

    #[tokio::test]
    async fn default_lifecycle_hooks_pass() {
        let mut unit = Minimal {
            core: UnitCore::new(seed("minimal")),
        };
        unit.prepare_options().unwrap();
        unit.pre_process();
        unit.process().unwrap();
        unit.process_promise().await.unwrap();
        unit.before_terminate();
    }

    #[test]
    fn push_output_without_port_faults() {
        let core = UnitCore::new(seed("gauge"));
        let fault = core.push_output("missing", json!(1)).unwrap_err();
        assert!(fault.is_short(kinds::UNIT_PORT_NOT_FOUND));
        assert_eq!(fault.field("unit"), Some(&json!("gauge")));
    }

    #[test]
    fn registered_port_is_reachable() {
        let mut core = UnitCore::new(seed("gauge"));
        core.register_port(Port::new("value", PortDirection::Output, "number", false));

        assert!(core.output("value").is_some());
        assert!(core.input("value").is_none());
        assert_eq!(core.push_output("value", json!(1)).unwrap(), Value::Null);
    }

    #[test]
    fn render_and_save_snapshot_payloads() {
        let mut core = UnitCore::new(seed("gauge"));
        let mut receiver = core.emitter().subscribe();
        core.shares = json!({ "reading": 7 });
        core.storage = json!({ "calibration": 1.25 });

        core.render();
        core.save();

        let first = receiver.try_recv().unwrap();
        assert_eq!(first.channel, MessageChannel::Render);
        assert_eq!(first.data, json!({ "reading": 7 }));
        let second = receiver.try_recv().unwrap();
        assert_eq!(second.channel, MessageChannel::Save);
        assert_eq!(second.data, json!({ "calibration": 1.25 }));
    }
}
