//! End-to-end container behavior over the fixture units.

use patchbay_fault::{Fault, FaultRegistry};
use patchbay_rules::Problem;
use patchbay_runtime::{
    kinds, testing, Container, LifecycleEvent, ServiceDescription, UnitDescriptor,
};
use patchbay_unit::MessageChannel;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

fn build(service: ServiceDescription) -> Container {
    let registry = Arc::new(FaultRegistry::new());
    patchbay_runtime::register_kinds(&registry).unwrap();
    let resolver = Arc::new(testing::fixture_resolver(Arc::clone(&registry)));
    Container::new("itest", service, resolver, registry).unwrap()
}

fn pipeline() -> ServiceDescription {
    ServiceDescription::new()
        .unit(UnitDescriptor::new("source", "test.Source"))
        .unit(UnitDescriptor::new("sink", "test.Sink"))
        .connection("source.value -> sink.value")
}

fn cause_shorts(fault: &Fault) -> Vec<String> {
    let mut shorts = Vec::new();
    let mut current = fault;
    loop {
        shorts.push(current.short.clone());
        match current.causes.iter().find_map(|cause| cause.as_fault()) {
            Some(inner) => current = inner,
            None => return shorts,
        }
    }
}

async fn shares_of(container: &Container, unit: &str) -> Value {
    let cell = container.unit(unit).unwrap();
    let guard = cell.lock().await;
    guard.core().shares.clone()
}

#[tokio::test]
async fn wired_pipeline_delivers_on_startup() {
    let mut container = build(pipeline());
    container.run().await.unwrap();

    // Source pushed its default option once during process().
    assert_eq!(shares_of(&container, "sink").await, json!([42.0]));

    let cell = container.unit("source").unwrap();
    let guard = cell.lock().await;
    let port = guard.core().output("value").unwrap();
    assert!(port.is_connected());
}

#[tokio::test]
async fn pushing_through_the_graph_reaches_the_handler() {
    let mut container = build(pipeline());
    container.run().await.unwrap();

    let mut messages = container.subscribe_messages();
    container
        .unit_action("source", "emit", json!({ "value": 7 }))
        .await
        .unwrap();

    assert_eq!(shares_of(&container, "sink").await, json!([42.0, 7]));
    // The sink announced the delivery on the open bus.
    let event = messages.recv().await.unwrap();
    assert_eq!(event.unit, "sink");
    assert_eq!(event.channel, MessageChannel::Event);
    assert_eq!(event.trace, json!(7));
}

#[tokio::test]
async fn relay_chain_is_one_synchronous_call() {
    let service = ServiceDescription::new()
        .unit(UnitDescriptor::new("source", "test.Source").option("value", 5))
        .unit(UnitDescriptor::new("relay", "test.Relay"))
        .unit(UnitDescriptor::new("sink", "test.Sink"))
        .connection("source.value -> relay.value")
        .connection("relay.value -> sink.value");
    let mut container = build(service);
    container.run().await.unwrap();

    assert_eq!(shares_of(&container, "sink").await, json!([5]));
}

#[tokio::test]
async fn incompatible_ports_never_link() {
    let service = ServiceDescription::new()
        .unit(UnitDescriptor::new("source", "test.Source"))
        .unit(UnitDescriptor::new("sink", "test.Sink"))
        .connection("source.pulse -> sink.value");
    let mut container = build(service);

    let fault = container.init().unwrap_err();
    assert_eq!(
        cause_shorts(&fault),
        [
            kinds::CONTAINER_CONNECTION_INIT,
            kinds::CONTAINER_INCOMPATIBLE_PORTS
        ]
    );

    let cell = container.unit("sink").unwrap();
    let guard = cell.lock().await;
    assert!(!guard.core().input("value").unwrap().is_connected());
}

#[tokio::test]
async fn dynamic_ports_expand_to_exact_count() {
    let service = ServiceDescription::new()
        .unit(UnitDescriptor::new("collector", "test.Collector").option("slots", 3));
    let mut container = build(service);
    container.init().unwrap();

    let entry = &container.structure()["collector"];
    let mut inputs: Vec<&str> = entry.inputs.keys().map(String::as_str).collect();
    inputs.sort_unstable();
    assert_eq!(inputs, ["slot1", "slot2", "slot3"]);

    let cell = container.unit("collector").unwrap();
    let guard = cell.lock().await;
    for name in ["slot1", "slot2", "slot3"] {
        let port = guard.core().input(name).unwrap();
        assert!(!port.is_connected(), "{name} should start unconnected");
    }
    assert!(guard.core().input("slot%d").is_none());
    assert!(guard.core().input("slot4").is_none());
}

#[tokio::test]
async fn connecting_to_an_expanded_port_works() {
    let service = ServiceDescription::new()
        .unit(UnitDescriptor::new("source", "test.Source").option("value", 9))
        .unit(UnitDescriptor::new("collector", "test.Collector").option("slots", 2))
        .connection("source.value -> collector.slot2");
    let mut container = build(service);
    container.run().await.unwrap();

    assert_eq!(
        shares_of(&container, "collector").await,
        json!({ "slot2": 9 })
    );
}

#[tokio::test]
async fn duplicate_unit_id_fails_and_keeps_the_first() {
    let service = ServiceDescription::new()
        .unit(UnitDescriptor::new("dup", "test.Source"))
        .unit(UnitDescriptor::new("dup", "test.Sink"));
    let mut container = build(service);

    let fault = container.init().unwrap_err();
    assert_eq!(
        cause_shorts(&fault),
        [kinds::CONTAINER_UNIT_INIT, kinds::CONTAINER_UNIT_DUPLICATE]
    );

    assert_eq!(container.unit_ids(), ["dup"]);
    let cell = container.unit("dup").unwrap();
    let guard = cell.lock().await;
    assert_eq!(guard.core().type_name(), "test.Source");
}

#[tokio::test]
async fn malformed_unit_id_fails_before_any_port_exists() {
    let service =
        ServiceDescription::new().unit(UnitDescriptor::new("bad id!", "test.Source"));
    let mut container = build(service);

    let fault = container.init().unwrap_err();
    assert_eq!(
        cause_shorts(&fault),
        [kinds::CONTAINER_UNIT_INIT, kinds::CONTAINER_BAD_UNIT_ID]
    );
    assert!(container.structure().is_empty());
    assert!(container.unit_ids().is_empty());
}

#[tokio::test]
async fn unknown_type_fails_with_resolver_fault() {
    let service = ServiceDescription::new().unit(UnitDescriptor::new("ghost", "test.Missing"));
    let mut container = build(service);

    let fault = container.init().unwrap_err();
    assert_eq!(
        cause_shorts(&fault),
        [kinds::CONTAINER_UNIT_INIT, kinds::RESOLVER_TYPE_NOT_FOUND]
    );
}

#[tokio::test]
async fn run_process_is_idempotent() {
    let mut container = build(pipeline());
    container.init().unwrap();
    container.run_process().await.unwrap();
    container.run_process().await.unwrap();

    // A second run would have pushed a second value.
    assert_eq!(shares_of(&container, "sink").await, json!([42.0]));
}

#[tokio::test]
async fn init_is_idempotent() {
    let mut container = build(pipeline());
    container.init().unwrap();
    container.init().unwrap();

    let cell = container.unit("source").unwrap();
    let guard = cell.lock().await;
    assert_eq!(guard.core().output("value").unwrap().connection_count(), 1);
}

#[tokio::test]
async fn action_payload_is_validated_with_one_problem() {
    let service = ServiceDescription::new().unit(UnitDescriptor::new("ping", "test.Ping"));
    let mut container = build(service);
    container.run().await.unwrap();

    let fault = container
        .unit_action("ping", "ping", json!({ "x": "s" }))
        .await
        .unwrap_err();
    assert!(fault.is_short(patchbay_rules::kinds::VALIDATOR_NOT_PASSED));

    let problems: Vec<Problem> =
        serde_json::from_value(fault.field("problems").cloned().unwrap()).unwrap();
    assert_eq!(problems.len(), 1);
    assert_eq!(problems[0].field, "x");
}

#[tokio::test]
async fn action_round_trip_with_valid_payload() {
    let service = ServiceDescription::new().unit(UnitDescriptor::new("ping", "test.Ping"));
    let mut container = build(service);
    container.run().await.unwrap();

    let answer = container
        .unit_action("ping", "ping", json!({ "x": 3 }))
        .await
        .unwrap();
    assert_eq!(answer, json!({ "pong": 3 }));
}

#[tokio::test]
async fn action_lookup_faults() {
    let mut container = build(pipeline());
    container.run().await.unwrap();

    let fault = container
        .unit_action("nobody", "ping", json!({}))
        .await
        .unwrap_err();
    assert!(fault.is_short(kinds::CONTAINER_UNIT_NOT_FOUND));

    let fault = container
        .unit_action("source", "vanish", json!({}))
        .await
        .unwrap_err();
    assert!(fault.is_short(kinds::CONTAINER_ACTION_NOT_FOUND));
}

#[tokio::test]
async fn connection_syntax_fails_before_resolution() {
    let service = ServiceDescription::new()
        .unit(UnitDescriptor::new("a", "test.Source"))
        .unit(UnitDescriptor::new("b", "test.Sink"))
        .connection("a -> b.c.d.e");
    let mut container = build(service);

    let fault = container.init().unwrap_err();
    assert_eq!(
        cause_shorts(&fault),
        [
            kinds::CONTAINER_CONNECTION_INIT,
            kinds::CONTAINER_CONNECTION_SYNTAX
        ]
    );
}

#[tokio::test]
async fn connection_to_unknown_unit_or_port_faults() {
    let service = ServiceDescription::new()
        .unit(UnitDescriptor::new("source", "test.Source"))
        .unit(UnitDescriptor::new("sink", "test.Sink"))
        .connection("ghost.value -> sink.value");
    let mut container = build(service);
    let fault = container.init().unwrap_err();
    assert!(cause_shorts(&fault).contains(&kinds::CONTAINER_CONNECTION_UNIT_NOT_FOUND.to_string()));

    let service = ServiceDescription::new()
        .unit(UnitDescriptor::new("source", "test.Source"))
        .unit(UnitDescriptor::new("sink", "test.Sink"))
        .connection("source.ghost -> sink.value");
    let mut container = build(service);
    let fault = container.init().unwrap_err();
    assert!(cause_shorts(&fault).contains(&kinds::CONTAINER_CONNECTION_PORT_NOT_FOUND.to_string()));
}

#[tokio::test]
async fn process_failure_aborts_remaining_units() {
    let service = ServiceDescription::new()
        .unit(UnitDescriptor::new("faulty", "test.Faulty").option("fail_in", "process"))
        .unit(UnitDescriptor::new("source", "test.Source"))
        .unit(UnitDescriptor::new("sink", "test.Sink"))
        .connection("source.value -> sink.value");
    let mut container = build(service);
    container.init().unwrap();

    let fault = container.run_process().await.unwrap_err();
    assert_eq!(
        cause_shorts(&fault),
        [kinds::CONTAINER_PROCESS_EXCEPTION, testing::TEST_BOOM]
    );
    assert_eq!(fault.field("unit"), Some(&json!("faulty")));

    // Source never ran, so the sink saw nothing.
    assert_eq!(shares_of(&container, "sink").await, json!([]));
}

#[tokio::test]
async fn process_promise_failure_wraps_its_own_kind() {
    let service = ServiceDescription::new()
        .unit(UnitDescriptor::new("faulty", "test.Faulty").option("fail_in", "promise"));
    let mut container = build(service);
    container.init().unwrap();

    let fault = container.run_process().await.unwrap_err();
    assert_eq!(
        cause_shorts(&fault),
        [
            kinds::CONTAINER_PROCESS_PROMISE_EXCEPTION,
            testing::TEST_BOOM
        ]
    );
}

#[tokio::test]
async fn prepare_options_failure_chains_through_unit_init() {
    let service = ServiceDescription::new()
        .unit(UnitDescriptor::new("faulty", "test.Faulty").option("fail_in", "prepare"));
    let mut container = build(service);

    let fault = container.init().unwrap_err();
    assert_eq!(
        cause_shorts(&fault),
        [
            kinds::CONTAINER_UNIT_INIT,
            kinds::CONTAINER_PREPARE_OPTIONS,
            testing::TEST_BOOM
        ]
    );
}

#[tokio::test]
async fn option_validation_aggregate_passes_through_unit_init() {
    let service = ServiceDescription::new()
        .unit(UnitDescriptor::new("collector", "test.Collector").option("slots", "many"));
    let mut container = build(service);

    let fault = container.init().unwrap_err();
    assert_eq!(
        cause_shorts(&fault),
        [
            kinds::CONTAINER_UNIT_INIT,
            patchbay_rules::kinds::VALIDATOR_NOT_PASSED
        ]
    );
}

#[tokio::test]
async fn lifecycle_events_fire_in_order() {
    let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&seen);

    let mut container = build(pipeline());
    container.observe(move |event: &LifecycleEvent| {
        log.lock().unwrap().push(event.name().to_string());
    });
    container.run().await.unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(
        seen.as_slice(),
        [
            "configure",
            "before_init",
            "init",
            "unit_init",
            "unit_init",
            "after_init",
            "before_connections",
            "connections",
            "connection",
            "after_connections",
            "before_process",
            "process",
            "process",
            "after_process",
            "before_process_promise",
            "process_promise",
            "process_promise",
            "after_process_promise",
            "before_loaded",
            "loaded"
        ]
    );
}

#[tokio::test]
async fn metric_registration_is_announced_on_the_bus() {
    let mut container = build(pipeline());
    let mut messages = container.subscribe_messages();
    container.init().unwrap();

    let message = messages.recv().await.unwrap();
    assert_eq!(message.unit, "source");
    assert_eq!(message.channel, MessageChannel::MetricRegister);
    assert_eq!(message.data, json!("emitted"));
    assert_eq!(message.trace["interval"], "seconds");
}

#[tokio::test]
async fn structure_records_the_whole_graph() {
    let service = pipeline().unit(UnitDescriptor::new("ping", "test.Ping"));
    let mut container = build(service);
    container.run().await.unwrap();

    let structure = container.structure();

    let source = &structure["source"];
    assert_eq!(source.type_name, "test.Source");
    assert_eq!(source.outputs["value"].len(), 1);
    assert_eq!(source.outputs["value"][0].unit, "sink");
    assert_eq!(source.outputs["value"][0].port, "value");
    assert!(source.metrics.contains_key("emitted"));
    assert_eq!(source.settings["channels"][0], "terminal");
    assert!(source.actions.contains_key("emit"));

    let sink = &structure["sink"];
    assert_eq!(sink.inputs["value"][0].unit, "source");
    assert_eq!(sink.ports.len(), 1);

    let ping = &structure["ping"];
    let action = &ping.actions["ping"];
    assert_eq!(action.kind, "global");
    assert_eq!(action.requirements["x"].kind, "number");
    assert!(action.requirements["x"].required);

    // The structure is plain data: it serializes as-is.
    let rendered = serde_json::to_string(structure).unwrap();
    assert!(rendered.contains("\"type\":\"test.Ping\""));
}

#[tokio::test]
async fn override_file_merges_options_before_init() {
    use std::io::Write;

    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{ "units": [ {{ "id": "source", "options": {{ "value": 7 }} }} ] }}"#
    )
    .unwrap();

    let registry = Arc::new(FaultRegistry::new());
    patchbay_runtime::register_kinds(&registry).unwrap();
    let resolver = Arc::new(testing::fixture_resolver(Arc::clone(&registry)));
    let mut container = Container::new("itest", pipeline(), resolver, registry)
        .unwrap()
        .with_override_file(file.path());

    container.run().await.unwrap();
    assert_eq!(shares_of(&container, "sink").await, json!([7]));
}

#[tokio::test]
async fn missing_override_file_is_ignored() {
    let registry = Arc::new(FaultRegistry::new());
    patchbay_runtime::register_kinds(&registry).unwrap();
    let resolver = Arc::new(testing::fixture_resolver(Arc::clone(&registry)));
    let mut container = Container::new("itest", pipeline(), resolver, registry)
        .unwrap()
        .with_override_file("/definitely/not/here.json");

    container.run().await.unwrap();
    assert!(container.is_loaded());
}

#[tokio::test]
async fn broken_override_file_wraps_as_overlay_fault() {
    use std::io::Write;

    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "not json at all").unwrap();

    let registry = Arc::new(FaultRegistry::new());
    patchbay_runtime::register_kinds(&registry).unwrap();
    let resolver = Arc::new(testing::fixture_resolver(Arc::clone(&registry)));
    let mut container = Container::new("itest", pipeline(), resolver, registry)
        .unwrap()
        .with_override_file(file.path());

    let fault = container.init().unwrap_err();
    assert_eq!(
        cause_shorts(&fault),
        [
            kinds::CONTAINER_CONFIG_OVERLAY,
            kinds::RESOLVER_IMPORT_FAILED
        ]
    );
}

#[tokio::test]
async fn failed_init_is_not_retried() {
    let service = ServiceDescription::new().unit(UnitDescriptor::new("ghost", "test.Missing"));
    let mut container = build(service);

    assert!(container.init().is_err());
    // The idempotency flag is set before work begins; re-invocation is a
    // no-op, not a retry.
    container.init().unwrap();
    assert!(container.unit_ids().is_empty());
}
