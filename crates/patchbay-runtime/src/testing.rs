//! Fixture units and helpers for tests and examples.
//!
//! These are real, fully wired units — small enough to read in one sitting,
//! covering every declaration surface: options with rules, static and
//! dynamic ports, actions, metrics, and the message bus.
//!
//! [`fixture_resolver`] registers the whole set:
//!
//! | Type string | Unit | Exercises |
//! |-------------|------|-----------|
//! | `test.Source` | [`SourceUnit`] | output port, option default, action, metric |
//! | `test.Sink` | [`SinkUnit`] | input handler, bus events |
//! | `test.Relay` | [`RelayUnit`] | input → output pass-through |
//! | `test.Collector` | [`CollectorUnit`] | dynamic input expansion |
//! | `test.Ping` | [`PingUnit`] | validated action payloads |
//! | `test.Faulty` | [`FaultyUnit`] | failures in each lifecycle hook |

use crate::resolver::StaticResolver;
use async_trait::async_trait;
use patchbay_fault::{Fault, FaultRegistry, KindDef};
use patchbay_rules::{ruleset, Rule, RuleSet};
use patchbay_unit::{
    ActionSet, ActionSpec, MessageChannel, MetricSet, MetricSpec, PortSet, PortSpec, Unit,
    UnitCore, UnitSeed,
};
use serde_json::{json, Value};
use std::sync::Arc;

/// Fault kind minted by [`FaultyUnit`].
pub const TEST_BOOM: &str = "TEST_BOOM";

/// Resolver pre-loaded with every fixture unit.
#[must_use]
pub fn fixture_resolver(registry: Arc<FaultRegistry>) -> StaticResolver {
    StaticResolver::new(registry)
        .with("test.Source", |seed| Box::new(SourceUnit::new(seed)))
        .with("test.Sink", |seed| Box::new(SinkUnit::new(seed)))
        .with("test.Relay", |seed| Box::new(RelayUnit::new(seed)))
        .with("test.Collector", |seed| Box::new(CollectorUnit::new(seed)))
        .with("test.Ping", |seed| Box::new(PingUnit::new(seed)))
        .with("test.Faulty", |seed| Box::new(FaultyUnit::new(seed)))
}

/// Emits a configurable number on its `value` output.
///
/// `process` pushes once; the `emit` action pushes on demand.
pub struct SourceUnit {
    core: UnitCore,
}

impl SourceUnit {
    /// Builds the unit from its seed.
    #[must_use]
    pub fn new(seed: UnitSeed) -> Self {
        Self {
            core: UnitCore::new(seed),
        }
    }

    fn current(&self) -> Value {
        self.core.option("value").cloned().unwrap_or(json!(0))
    }
}

#[async_trait]
impl Unit for SourceUnit {
    fn core(&self) -> &UnitCore {
        &self.core
    }
    fn core_mut(&mut self) -> &mut UnitCore {
        &mut self.core
    }

    fn option_rules(&self) -> RuleSet {
        ruleset! {
            "value" => Rule::number().default(42.0)
                .description("Number pushed on startup and on 'emit'"),
        }
    }

    fn outputs(&self) -> PortSet {
        let mut ports = PortSet::new();
        ports.insert(
            "value".to_string(),
            PortSpec::typed("number").description("Emitted value"),
        );
        ports.insert(
            "pulse".to_string(),
            PortSpec::standard().description("Fires once per push"),
        );
        ports
    }

    fn actions(&self) -> ActionSet {
        let mut actions = ActionSet::new();
        actions.insert(
            "emit".to_string(),
            ActionSpec::global()
                .requirements(ruleset! {
                    "value" => Rule::number().description("Value to push; defaults to the option"),
                })
                .description("Push a value through the output port"),
        );
        actions
    }

    fn handles_action(&self, action: &str) -> bool {
        action == "emit"
    }

    fn metrics(&self) -> MetricSet {
        let mut metrics = MetricSet::new();
        metrics.insert(
            "emitted".to_string(),
            MetricSpec::in_seconds().description("Values pushed"),
        );
        metrics
    }

    fn process(&mut self) -> Result<(), Fault> {
        let value = self.current();
        self.core.push_output("value", value)?;
        Ok(())
    }

    async fn on_action(&mut self, action: &str, payload: Value) -> Result<Value, Fault> {
        match action {
            "emit" => {
                let value = payload
                    .get("value")
                    .cloned()
                    .unwrap_or_else(|| self.current());
                self.core.push_output("value", value)
            }
            other => Err(self.core.unhandled_action(other)),
        }
    }
}

/// Collects everything arriving on its `value` input.
///
/// Each delivery is appended to `shares` and announced on the message bus
/// as an `Event` with data `"received"`.
pub struct SinkUnit {
    core: UnitCore,
}

impl SinkUnit {
    /// Builds the unit from its seed.
    #[must_use]
    pub fn new(seed: UnitSeed) -> Self {
        let mut core = UnitCore::new(seed);
        core.shares = json!([]);
        Self { core }
    }
}

#[async_trait]
impl Unit for SinkUnit {
    fn core(&self) -> &UnitCore {
        &self.core
    }
    fn core_mut(&mut self) -> &mut UnitCore {
        &mut self.core
    }

    fn inputs(&self) -> PortSet {
        let mut ports = PortSet::new();
        ports.insert(
            "value".to_string(),
            PortSpec::typed("number").description("Collected value"),
        );
        ports
    }

    fn handles_input(&self, port: &str) -> bool {
        port == "value"
    }

    fn on_input(&mut self, port: &str, data: Value) -> Result<Value, Fault> {
        match port {
            "value" => {
                if let Some(list) = self.core.shares.as_array_mut() {
                    list.push(data.clone());
                }
                self.core
                    .emitter()
                    .send(MessageChannel::Event, json!("received"), data);
                Ok(Value::Null)
            }
            other => Err(self.core.unhandled_input(other)),
        }
    }
}

/// Passes its `value` input straight through to its `value` output.
pub struct RelayUnit {
    core: UnitCore,
}

impl RelayUnit {
    /// Builds the unit from its seed.
    #[must_use]
    pub fn new(seed: UnitSeed) -> Self {
        Self {
            core: UnitCore::new(seed),
        }
    }
}

#[async_trait]
impl Unit for RelayUnit {
    fn core(&self) -> &UnitCore {
        &self.core
    }
    fn core_mut(&mut self) -> &mut UnitCore {
        &mut self.core
    }

    fn inputs(&self) -> PortSet {
        let mut ports = PortSet::new();
        ports.insert("value".to_string(), PortSpec::typed("number"));
        ports
    }

    fn outputs(&self) -> PortSet {
        let mut ports = PortSet::new();
        ports.insert("value".to_string(), PortSpec::typed("number"));
        ports
    }

    fn handles_input(&self, port: &str) -> bool {
        port == "value"
    }

    fn on_input(&mut self, port: &str, data: Value) -> Result<Value, Fault> {
        match port {
            "value" => self.core.push_output("value", data),
            other => Err(self.core.unhandled_input(other)),
        }
    }
}

/// Declares `slot%d` dynamic inputs, count set by the `slots` option.
///
/// Deliveries land in `shares` under the concrete port name.
pub struct CollectorUnit {
    core: UnitCore,
}

impl CollectorUnit {
    /// Builds the unit from its seed.
    #[must_use]
    pub fn new(seed: UnitSeed) -> Self {
        let mut core = UnitCore::new(seed);
        core.shares = json!({});
        Self { core }
    }

    fn slots(&self) -> u32 {
        self.core
            .option("slots")
            .and_then(Value::as_u64)
            .unwrap_or(0) as u32
    }
}

#[async_trait]
impl Unit for CollectorUnit {
    fn core(&self) -> &UnitCore {
        &self.core
    }
    fn core_mut(&mut self) -> &mut UnitCore {
        &mut self.core
    }

    fn option_rules(&self) -> RuleSet {
        ruleset! {
            "slots" => Rule::number().integer().min(1.0).default(3.0)
                .description("How many slot inputs to expand"),
        }
    }

    fn inputs(&self) -> PortSet {
        let mut ports = PortSet::new();
        ports.insert(
            "slot%d".to_string(),
            PortSpec::typed("number").dynamic(self.slots()),
        );
        ports
    }

    fn handles_input(&self, port: &str) -> bool {
        port.strip_prefix("slot")
            .is_some_and(|rest| rest.parse::<u32>().is_ok())
    }

    fn on_input(&mut self, port: &str, data: Value) -> Result<Value, Fault> {
        if !self.handles_input(port) {
            return Err(self.core.unhandled_input(port));
        }
        if let Some(map) = self.core.shares.as_object_mut() {
            map.insert(port.to_string(), data);
        }
        Ok(Value::Null)
    }
}

/// Answers the `ping` action with a `pong`.
///
/// The action requires `{ x: number }`; the payload reaches the handler
/// only after validation.
pub struct PingUnit {
    core: UnitCore,
}

impl PingUnit {
    /// Builds the unit from its seed.
    #[must_use]
    pub fn new(seed: UnitSeed) -> Self {
        Self {
            core: UnitCore::new(seed),
        }
    }
}

#[async_trait]
impl Unit for PingUnit {
    fn core(&self) -> &UnitCore {
        &self.core
    }
    fn core_mut(&mut self) -> &mut UnitCore {
        &mut self.core
    }

    fn actions(&self) -> ActionSet {
        let mut actions = ActionSet::new();
        actions.insert(
            "ping".to_string(),
            ActionSpec::global()
                .requirements(ruleset! {
                    "x" => Rule::number().required().description("Echoed number"),
                })
                .returns(ruleset! {
                    "pong" => Rule::number().description("The same number back"),
                })
                .description("Round-trip check"),
        );
        actions
    }

    fn handles_action(&self, action: &str) -> bool {
        action == "ping"
    }

    async fn on_action(&mut self, action: &str, payload: Value) -> Result<Value, Fault> {
        match action {
            "ping" => Ok(json!({ "pong": payload["x"] })),
            other => Err(self.core.unhandled_action(other)),
        }
    }
}

/// Fails in a chosen lifecycle hook.
///
/// The `fail_in` option picks the hook: `"prepare"`, `"process"`,
/// `"promise"` or `"none"`.
pub struct FaultyUnit {
    core: UnitCore,
}

impl FaultyUnit {
    /// Builds the unit from its seed and registers its fault kind.
    #[must_use]
    pub fn new(seed: UnitSeed) -> Self {
        // Identical re-registration is idempotent, so every instance may
        // register the kind.
        let _ = seed.registry.register(KindDef::new(
            "Test",
            "tQ8xWf3vKz6B",
            TEST_BOOM,
            "Fixture unit failed on purpose",
        ));
        Self {
            core: UnitCore::new(seed),
        }
    }

    fn fails_in(&self, hook: &str) -> bool {
        self.core.option("fail_in").and_then(Value::as_str) == Some(hook)
    }

    fn boom(&self, hook: &str) -> Fault {
        self.core.fault(TEST_BOOM, json!({ "hook": hook }))
    }
}

#[async_trait]
impl Unit for FaultyUnit {
    fn core(&self) -> &UnitCore {
        &self.core
    }
    fn core_mut(&mut self) -> &mut UnitCore {
        &mut self.core
    }

    fn option_rules(&self) -> RuleSet {
        ruleset! {
            "fail_in" => Rule::string().default("none")
                .description("Lifecycle hook to fail in"),
        }
    }

    fn prepare_options(&mut self) -> Result<(), Fault> {
        if self.fails_in("prepare") {
            return Err(self.boom("prepare"));
        }
        Ok(())
    }

    fn process(&mut self) -> Result<(), Fault> {
        if self.fails_in("process") {
            return Err(self.boom("process"));
        }
        Ok(())
    }

    async fn process_promise(&mut self) -> Result<(), Fault> {
        if self.fails_in("promise") {
            return Err(self.boom("promise"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use patchbay_unit::UnitEmitter;
    use tokio::sync::broadcast;

    fn seed(id: &str, type_name: &str) -> UnitSeed {
        let registry = Arc::new(FaultRegistry::new());
        crate::register_kinds(&registry).unwrap();
        patchbay_unit::register_kinds(&registry).unwrap();
        let (sender, _) = broadcast::channel(16);
        UnitSeed {
            id: id.to_string(),
            type_name: type_name.to_string(),
            registry,
            emitter: UnitEmitter::new(id, sender),
        }
    }

    #[test]
    fn fixture_resolver_knows_every_type() {
        let registry = Arc::new(FaultRegistry::new());
        crate::register_kinds(&registry).unwrap();
        let resolver = fixture_resolver(Arc::clone(&registry));
        let mut types = resolver.types();
        types.sort_unstable();
        assert_eq!(
            types,
            [
                "test.Collector",
                "test.Faulty",
                "test.Ping",
                "test.Relay",
                "test.Sink",
                "test.Source"
            ]
        );
    }

    #[test]
    fn collector_handler_matches_expanded_names_only() {
        let unit = CollectorUnit::new(seed("collector", "test.Collector"));
        assert!(unit.handles_input("slot1"));
        assert!(unit.handles_input("slot12"));
        assert!(!unit.handles_input("slot"));
        assert!(!unit.handles_input("slotx"));
        assert!(!unit.handles_input("value"));
    }

    #[tokio::test]
    async fn faulty_unit_fails_only_where_told() {
        let mut unit = FaultyUnit::new(seed("faulty", "test.Faulty"));
        unit.core_mut()
            .options_mut()
            .insert("fail_in".to_string(), json!("promise"));

        unit.prepare_options().unwrap();
        unit.process().unwrap();
        let fault = unit.process_promise().await.unwrap_err();
        assert!(fault.is_short(TEST_BOOM));
        assert_eq!(fault.field("hook"), Some(&json!("promise")));
    }

    #[tokio::test]
    async fn ping_unit_answers() {
        let mut unit = PingUnit::new(seed("ping", "test.Ping"));
        let answer = unit.on_action("ping", json!({ "x": 5 })).await.unwrap();
        assert_eq!(answer, json!({ "pong": 5 }));
    }

    #[test]
    fn sink_collects_into_shares() {
        let mut unit = SinkUnit::new(seed("sink", "test.Sink"));
        unit.on_input("value", json!(1)).unwrap();
        unit.on_input("value", json!(2)).unwrap();
        assert_eq!(unit.core().shares, json!([1, 2]));
    }
}
