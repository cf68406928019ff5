//! The container: graph building and lifecycle orchestration.
//!
//! A [`Container`] consumes a [`ServiceDescription`] and a
//! [`UnitResolver`], and produces a live graph of instantiated, validated,
//! wired units, driven through a deterministic two-phase startup.
//!
//! # Phases
//!
//! ```text
//! Created ── init() ──► Configuring ► Initializing ► ConnectingPorts ► Inited
//!                 │
//!        run_process() ──► Processing ► ProcessPromising ► Loaded
//! ```
//!
//! `init` and `run_process` are idempotent: a repeat call is a no-op, not
//! a retry. Units initialize, `process`, and `process_promise` strictly in
//! declaration order; `process_promise` calls are awaited one at a time.
//!
//! # Failure policy
//!
//! Any failure during `init` or `run_process` is fatal to startup — there
//! is no partial container and no rollback. Failures inside
//! [`Container::unit_action`] are local to that call.
//!
//! Every orchestration boundary wraps the underlying fault into a
//! context-specific kind and chains the original, so the top-level caller
//! sees one fault and can walk the chain down to the first cause.
//!
//! # Threading
//!
//! The container is one logical thread of control: unit access is
//! serialized through per-unit locks, and delivery that cycles back into
//! a unit already mid-call fails with `UNIT_DELIVERY_BUSY` rather than
//! deadlocking.

use crate::kinds;
use crate::lifecycle::{LifecycleEvent, LifecycleObserver};
use crate::resolver::UnitResolver;
use crate::service::{ServiceDescription, ServiceOverlay, UnitDescriptor};
use crate::structure::{PortLink, ServiceStructure, StructurePort, UnitStructure};
use patchbay_fault::{Fault, FaultRegistry};
use patchbay_rules::Validator;
use patchbay_unit::{
    ActionSet, Connection, InputHandler, MessageChannel, MetricSet, Port, PortDescriptor,
    PortDirection, Unit, UnitEmitter, UnitMessage, UnitSeed,
};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use tracing::debug;

/// Shared handle to one live unit.
pub type UnitCell = Arc<Mutex<Box<dyn Unit>>>;

/// The graph-building and lifecycle orchestration engine.
pub struct Container {
    id: String,
    service: ServiceDescription,
    override_path: Option<PathBuf>,
    resolver: Arc<dyn UnitResolver>,
    registry: Arc<FaultRegistry>,
    validator: Validator,
    bus: broadcast::Sender<UnitMessage>,
    units: Vec<(String, UnitCell)>,
    actions: HashMap<String, ActionSet>,
    metrics: HashMap<String, MetricSet>,
    structure: ServiceStructure,
    observers: Vec<Box<dyn LifecycleObserver>>,
    inited: bool,
    processed: bool,
}

impl Container {
    /// Creates a container over a description and a resolver.
    ///
    /// Registers the validator, unit and container fault catalogs against
    /// the given registry.
    ///
    /// # Errors
    ///
    /// Fails only when the registry already holds differing kinds under
    /// one of those identities.
    pub fn new(
        id: impl Into<String>,
        service: ServiceDescription,
        resolver: Arc<dyn UnitResolver>,
        registry: Arc<FaultRegistry>,
    ) -> Result<Self, Fault> {
        kinds::register_kinds(&registry)?;
        patchbay_unit::register_kinds(&registry)?;
        let validator = Validator::new(Arc::clone(&registry))?;
        let (bus, _) = broadcast::channel(256);
        Ok(Self {
            id: id.into(),
            service,
            override_path: None,
            resolver,
            registry,
            validator,
            bus,
            units: Vec::new(),
            actions: HashMap::new(),
            metrics: HashMap::new(),
            structure: ServiceStructure::new(),
            observers: Vec::new(),
            inited: false,
            processed: false,
        })
    }

    /// Sets the optional override configuration file.
    ///
    /// Applied at the start of `init`; a missing file is a no-op.
    #[must_use]
    pub fn with_override_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.override_path = Some(path.into());
        self
    }

    /// Registers a lifecycle observer.
    ///
    /// Observers registered before `init` see every event.
    pub fn observe(&mut self, observer: impl LifecycleObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Subscribes to unit-originated messages.
    #[must_use]
    pub fn subscribe_messages(&self) -> broadcast::Receiver<UnitMessage> {
        self.bus.subscribe()
    }

    /// Container id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Whether `init` has run.
    #[must_use]
    pub fn is_inited(&self) -> bool {
        self.inited
    }

    /// Whether `run_process` has run.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.processed
    }

    /// Ids of the live units, in declaration order.
    #[must_use]
    pub fn unit_ids(&self) -> Vec<&str> {
        self.units.iter().map(|(id, _)| id.as_str()).collect()
    }

    /// Shared fault registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<FaultRegistry> {
        &self.registry
    }

    /// Introspectable structure recorded during `init`.
    #[must_use]
    pub fn structure(&self) -> &ServiceStructure {
        &self.structure
    }

    /// Runs the whole startup: `init` then `run_process`.
    ///
    /// # Errors
    ///
    /// Propagates the first fault of either phase.
    pub async fn run(&mut self) -> Result<(), Fault> {
        self.init()?;
        self.run_process().await
    }

    /// Builds the graph: applies the override file, initializes every
    /// unit, resolves every connection.
    ///
    /// Idempotent; a repeat call is a no-op.
    ///
    /// # Errors
    ///
    /// The first failure aborts the phase. Unit failures are wrapped as
    /// [`kinds::CONTAINER_UNIT_INIT`] with the descriptor attached,
    /// connection failures as [`kinds::CONTAINER_CONNECTION_INIT`] with
    /// the string attached; option-validation aggregates pass through
    /// unwrapped inside the unit wrap.
    pub fn init(&mut self) -> Result<(), Fault> {
        if self.inited {
            return Ok(());
        }
        self.inited = true;

        self.emit(LifecycleEvent::Configure);
        if let Err(fault) = self.apply_override() {
            return Err(self
                .registry
                .make(kinds::CONTAINER_CONFIG_OVERLAY, json!({}))
                .add(fault));
        }

        self.emit(LifecycleEvent::BeforeInit);
        self.emit(LifecycleEvent::Init);
        let descriptors = self.service.units.clone();
        for descriptor in &descriptors {
            self.emit(LifecycleEvent::UnitInit {
                unit: descriptor.id.clone(),
            });
            if let Err(fault) = self.init_unit(descriptor) {
                let attached = serde_json::to_value(descriptor).unwrap_or(Value::Null);
                return Err(self
                    .registry
                    .make(kinds::CONTAINER_UNIT_INIT, json!({ "unit": attached }))
                    .add(fault));
            }
        }
        self.emit(LifecycleEvent::AfterInit);

        self.emit(LifecycleEvent::BeforeConnections);
        self.emit(LifecycleEvent::Connections);
        for descriptor in &descriptors {
            let Some(connections) = &descriptor.connections else {
                continue;
            };
            for connection in connections {
                self.init_connection(connection)?;
            }
        }
        let container_level = self.service.connections.clone();
        for connection in &container_level {
            self.init_connection(connection)?;
        }
        self.emit(LifecycleEvent::AfterConnections);
        Ok(())
    }

    /// Drives startup: every unit's `process`, then every unit's awaited
    /// `process_promise`, strictly in declaration order, no overlap.
    ///
    /// Idempotent; a repeat call is a no-op.
    ///
    /// # Errors
    ///
    /// A unit fault aborts the remaining units of that phase, wrapped as
    /// [`kinds::CONTAINER_PROCESS_EXCEPTION`] or
    /// [`kinds::CONTAINER_PROCESS_PROMISE_EXCEPTION`].
    pub async fn run_process(&mut self) -> Result<(), Fault> {
        if self.processed {
            return Ok(());
        }
        self.processed = true;

        let units = self.units.clone();

        self.emit(LifecycleEvent::BeforeProcess);
        for (id, cell) in &units {
            self.emit(LifecycleEvent::Process { unit: id.clone() });
            let mut guard = cell.lock().await;
            if let Err(fault) = guard.process() {
                return Err(self
                    .registry
                    .make(kinds::CONTAINER_PROCESS_EXCEPTION, json!({ "unit": id }))
                    .add(fault));
            }
        }
        self.emit(LifecycleEvent::AfterProcess);

        self.emit(LifecycleEvent::BeforeProcessPromise);
        for (id, cell) in &units {
            self.emit(LifecycleEvent::ProcessPromise { unit: id.clone() });
            let mut guard = cell.lock().await;
            if let Err(fault) = guard.process_promise().await {
                return Err(self
                    .registry
                    .make(
                        kinds::CONTAINER_PROCESS_PROMISE_EXCEPTION,
                        json!({ "unit": id }),
                    )
                    .add(fault));
            }
        }
        self.emit(LifecycleEvent::AfterProcessPromise);

        self.emit(LifecycleEvent::BeforeLoaded);
        self.emit(LifecycleEvent::Loaded);
        Ok(())
    }

    /// Invokes a registered action on a unit.
    ///
    /// The payload is validated against the action's requirement rules
    /// (defaults filled in) before the handler runs.
    ///
    /// # Errors
    ///
    /// [`kinds::CONTAINER_UNIT_NOT_FOUND`] /
    /// [`kinds::CONTAINER_ACTION_NOT_FOUND`] on lookup, the validator's
    /// aggregate fault on a bad payload, or whatever the handler returns.
    /// Failures here never affect the running container.
    pub async fn unit_action(
        &self,
        unit: &str,
        action: &str,
        payload: Value,
    ) -> Result<Value, Fault> {
        let specs = self.actions.get(unit).ok_or_else(|| {
            self.registry
                .make(kinds::CONTAINER_UNIT_NOT_FOUND, json!({ "unit": unit }))
        })?;
        let spec = specs.get(action).ok_or_else(|| {
            self.registry.make(
                kinds::CONTAINER_ACTION_NOT_FOUND,
                json!({ "unit": unit, "action": action }),
            )
        })?;

        let mut data = match payload {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        self.validator.validate(spec.requirement_rules(), &mut data)?;

        let cell = self.cell(unit).ok_or_else(|| {
            self.registry
                .make(kinds::CONTAINER_UNIT_NOT_FOUND, json!({ "unit": unit }))
        })?;
        let mut guard = cell.lock().await;
        guard.on_action(action, Value::Object(data)).await
    }

    /// Shared handle to one live unit, if initialized.
    #[must_use]
    pub fn unit(&self, id: &str) -> Option<UnitCell> {
        self.cell(id).cloned()
    }

    /// Looks up a live unit cell by id.
    fn cell(&self, id: &str) -> Option<&UnitCell> {
        self.units
            .iter()
            .find(|(unit_id, _)| unit_id == id)
            .map(|(_, cell)| cell)
    }

    /// Dispatches one lifecycle event to every observer.
    fn emit(&mut self, event: LifecycleEvent) {
        debug!(container = %self.id, event = %event, "lifecycle");
        for observer in &mut self.observers {
            observer.on_event(&event);
        }
    }

    /// Applies the override file, when configured and present.
    fn apply_override(&mut self) -> Result<(), Fault> {
        let Some(path) = &self.override_path else {
            return Ok(());
        };
        if !path.exists() {
            return Ok(());
        }
        let overlay = ServiceOverlay::from_path(&self.registry, path)?;
        overlay.apply(&mut self.service);
        debug!(container = %self.id, path = %path.display(), "applied override file");
        Ok(())
    }

    /// Initializes one unit: resolve, instantiate, configure, validate,
    /// register actions/metrics/ports.
    fn init_unit(&mut self, descriptor: &UnitDescriptor) -> Result<(), Fault> {
        let registry = Arc::clone(&self.registry);

        let factory = self.resolver.resolve(&descriptor.type_name)?;

        if !is_unit_id(&descriptor.id) {
            return Err(registry.make(
                kinds::CONTAINER_BAD_UNIT_ID,
                json!({ "unit": descriptor.id }),
            ));
        }
        if self.cell(&descriptor.id).is_some() {
            return Err(registry.make(
                kinds::CONTAINER_UNIT_DUPLICATE,
                json!({ "unit": descriptor.id }),
            ));
        }

        debug!(container = %self.id, unit = %descriptor.id, unit_type = %descriptor.type_name, "initializing unit");
        let emitter = UnitEmitter::new(&descriptor.id, self.bus.clone());
        let mut unit = factory(UnitSeed {
            id: descriptor.id.clone(),
            type_name: descriptor.type_name.clone(),
            registry: Arc::clone(&registry),
            emitter: emitter.clone(),
        });

        for (key, value) in &descriptor.options {
            unit.core_mut().options_mut().insert(key.clone(), value.clone());
        }

        if let Err(fault) = unit.prepare_options() {
            return Err(registry
                .make(
                    kinds::CONTAINER_PREPARE_OPTIONS,
                    json!({ "message": fault.to_string() }),
                )
                .add(fault));
        }

        // Aggregate validation faults pass through unwrapped.
        let rules = unit.option_rules();
        self.validator
            .validate(&rules, unit.core_mut().options_mut())?;

        let mut entry = UnitStructure::new(&descriptor.id, &descriptor.type_name);

        unit.pre_process();

        let actions = unit.actions();
        for (name, spec) in &actions {
            if !unit.handles_action(name) {
                return Err(registry.make(
                    kinds::CONTAINER_ACTION_HANDLER_NOT_FOUND,
                    json!({ "unit": descriptor.id, "action": name }),
                ));
            }
            entry.actions.insert(name.clone(), spec.export());
        }

        entry.settings = unit.settings();

        let metrics = unit.metrics();
        for (path, spec) in &metrics {
            let exported = spec.export();
            emitter.send(
                MessageChannel::MetricRegister,
                Value::String(path.clone()),
                serde_json::to_value(&exported).unwrap_or(Value::Null),
            );
            entry.metrics.insert(path.clone(), exported);
        }

        let mut pending_inputs: Vec<Port> = Vec::new();
        for (declared, spec) in unit.inputs() {
            let template = spec.export();
            for (name, port_desc) in expand_ports(&registry, &declared, &template)? {
                check_port_name(&registry, &name)?;
                if !unit.handles_input(&name) {
                    return Err(registry.make(
                        kinds::CONTAINER_INPUT_HANDLER_NOT_FOUND,
                        json!({ "unit": descriptor.id, "port": name }),
                    ));
                }
                let port = Port::new(
                    name.clone(),
                    PortDirection::Input,
                    port_desc.tag.clone(),
                    port_desc.required,
                );
                unit.core_mut().register_port(port.clone());
                entry.inputs.insert(name.clone(), Vec::new());
                entry.ports.push(StructurePort {
                    port: name,
                    direction: PortDirection::Input,
                    descriptor: port_desc,
                });
                pending_inputs.push(port);
            }
        }

        for (declared, spec) in unit.outputs() {
            let template = spec.export();
            for (name, port_desc) in expand_ports(&registry, &declared, &template)? {
                check_port_name(&registry, &name)?;
                let port = Port::new(
                    name.clone(),
                    PortDirection::Output,
                    port_desc.tag.clone(),
                    port_desc.required,
                );
                unit.core_mut().register_port(port);
                entry.outputs.insert(name.clone(), Vec::new());
                entry.ports.push(StructurePort {
                    port: name,
                    direction: PortDirection::Output,
                    descriptor: port_desc,
                });
            }
        }

        let cell: UnitCell = Arc::new(Mutex::new(unit));
        for port in pending_inputs {
            let name = port.name().to_string();
            port.bind_handler(input_handler(
                Arc::clone(&cell),
                Arc::clone(&registry),
                descriptor.id.clone(),
                name,
            ));
        }

        self.structure.insert(descriptor.id.clone(), entry);
        self.actions.insert(descriptor.id.clone(), actions);
        self.metrics.insert(descriptor.id.clone(), metrics);
        self.units.push((descriptor.id.clone(), cell));
        Ok(())
    }

    /// Resolves one connection string into a live link.
    fn init_connection(&mut self, connection: &str) -> Result<(), Fault> {
        self.emit(LifecycleEvent::Connection {
            connection: connection.to_string(),
        });
        debug!(container = %self.id, connection = %connection, "resolving connection");
        if let Err(fault) = self.link_connection(connection) {
            return Err(self
                .registry
                .make(
                    kinds::CONTAINER_CONNECTION_INIT,
                    json!({ "connection": connection }),
                )
                .add(fault));
        }
        Ok(())
    }

    fn link_connection(&mut self, connection: &str) -> Result<(), Fault> {
        let parsed = parse_connection(&self.registry, connection)?;

        let output_port = self.port_of(
            connection,
            &parsed.output_unit,
            &parsed.output_port,
            PortDirection::Output,
        )?;
        let input_port = self.port_of(
            connection,
            &parsed.input_unit,
            &parsed.input_port,
            PortDirection::Input,
        )?;

        if output_port.tag() != input_port.tag() {
            return Err(self.registry.make(
                kinds::CONTAINER_INCOMPATIBLE_PORTS,
                json!({ "connection": connection }),
            ));
        }

        if let Some(entry) = self.structure.get_mut(&parsed.output_unit) {
            entry
                .outputs
                .entry(parsed.output_port.clone())
                .or_default()
                .push(PortLink {
                    unit: parsed.input_unit.clone(),
                    port: parsed.input_port.clone(),
                });
        }
        if let Some(entry) = self.structure.get_mut(&parsed.input_unit) {
            entry
                .inputs
                .entry(parsed.input_port.clone())
                .or_default()
                .push(PortLink {
                    unit: parsed.output_unit.clone(),
                    port: parsed.output_port.clone(),
                });
        }

        let _ = Connection::link(&output_port, &input_port);
        Ok(())
    }

    /// Finds one side's live port.
    fn port_of(
        &self,
        connection: &str,
        unit: &str,
        port: &str,
        direction: PortDirection,
    ) -> Result<Port, Fault> {
        let cell = self.cell(unit).ok_or_else(|| {
            self.registry.make(
                kinds::CONTAINER_CONNECTION_UNIT_NOT_FOUND,
                json!({ "connection": connection, "unit": unit }),
            )
        })?;
        let guard = cell.try_lock().map_err(|_| {
            self.registry.make(
                patchbay_unit::kinds::UNIT_DELIVERY_BUSY,
                json!({ "unit": unit, "port": port }),
            )
        })?;
        let found = match direction {
            PortDirection::Output => guard.core().output(port).cloned(),
            PortDirection::Input => guard.core().input(port).cloned(),
        };
        found.ok_or_else(|| {
            self.registry.make(
                kinds::CONTAINER_CONNECTION_PORT_NOT_FOUND,
                json!({ "connection": connection, "port": port }),
            )
        })
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("id", &self.id)
            .field("units", &self.unit_ids())
            .field("inited", &self.inited)
            .field("loaded", &self.processed)
            .finish()
    }
}

/// Builds the delivery handler bound to one input port.
fn input_handler(
    cell: UnitCell,
    registry: Arc<FaultRegistry>,
    unit: String,
    port: String,
) -> InputHandler {
    Arc::new(move |data| match cell.try_lock() {
        Ok(mut guard) => guard.on_input(&port, data),
        Err(_) => Err(registry.make(
            patchbay_unit::kinds::UNIT_DELIVERY_BUSY,
            json!({ "unit": unit, "port": port }),
        )),
    })
}

/// Unit ids: letters, digits, `_`, `-`, `:`, `*`.
fn is_unit_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | ':' | '*'))
}

/// Port names: letters, digits, `.`.
fn check_port_name(registry: &FaultRegistry, name: &str) -> Result<(), Fault> {
    let valid =
        !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '.');
    if valid {
        Ok(())
    } else {
        Err(registry.make(kinds::CONTAINER_BAD_PORT_NAME, json!({ "port": name })))
    }
}

/// Expands a declared port into its concrete ports.
///
/// Non-dynamic specs map to themselves. A dynamic spec's name must carry
/// the `%d` placeholder; the first occurrence is replaced by 1..=count.
fn expand_ports(
    registry: &FaultRegistry,
    name: &str,
    descriptor: &PortDescriptor,
) -> Result<Vec<(String, PortDescriptor)>, Fault> {
    if !descriptor.dynamic {
        return Ok(vec![(name.to_string(), descriptor.clone())]);
    }
    if !name.contains("%d") {
        return Err(registry.make(
            kinds::CONTAINER_BAD_DYNAMIC_PORT_NAME,
            json!({ "port": name }),
        ));
    }
    Ok((1..=descriptor.count)
        .map(|index| {
            (
                name.replacen("%d", &index.to_string(), 1),
                descriptor.concrete(),
            )
        })
        .collect())
}

/// Parsed two-sided connection string.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ParsedConnection {
    output_unit: String,
    output_port: String,
    input_unit: String,
    input_port: String,
}

/// Parses `Unit[.seg[.seg]] -> Unit[.seg[.seg]]`.
///
/// Exactly one `->`; each side 2–3 dot-separated segments. The first
/// segment is the unit id, the rest joined back form the port name.
fn parse_connection(registry: &FaultRegistry, connection: &str) -> Result<ParsedConnection, Fault> {
    let syntax = |error: &str| {
        registry.make(
            kinds::CONTAINER_CONNECTION_SYNTAX,
            json!({ "connection": connection, "error": error }),
        )
    };

    let sides: Vec<&str> = connection.split("->").collect();
    if sides.len() != 2 {
        return Err(syntax("expected exactly one '->' between the two sides"));
    }

    let output: Vec<&str> = sides[0].split('.').collect();
    let input: Vec<&str> = sides[1].split('.').collect();
    if output.len() > 3 || input.len() > 3 {
        return Err(syntax("more than 3 dot-separated segments on a side"));
    }
    if output.len() < 2 || input.len() < 2 {
        return Err(syntax("fewer than 2 dot-separated segments on a side"));
    }

    Ok(ParsedConnection {
        output_unit: output[0].trim().to_string(),
        output_port: output[1..].join(".").trim().to_string(),
        input_unit: input[0].trim().to_string(),
        input_port: input[1..].join(".").trim().to_string(),
    })
}
