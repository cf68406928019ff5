//! Live ports and connections.
//!
//! A [`Port`] is the runtime side of a declared [`PortSpec`]: a shared
//! handle the owning unit pushes into and connections deliver through. A
//! [`Connection`] joins one output port to one input port.
//!
//! # Delivery
//!
//! `push` is a direct, synchronous call chain — no queueing, no buffering;
//! ordering and backpressure are whatever the call stack provides:
//!
//! 1. Transient listeners, if any, receive the formatted data once and are
//!    cleared.
//! 2. An input port delivers to its bound handler.
//! 3. An output port with no connections is a no-op.
//! 4. With exactly one connection the downstream handler's return value is
//!    passed back; with several, connections deliver in declaration order.
//!
//! The port lock is never held across a handler call, so a handler may
//! push into further ports freely.

use crate::port::PortDirection;
use parking_lot::Mutex;
use patchbay_fault::Fault;
use serde_json::Value;
use std::sync::Arc;

/// Bound delivery target of an input port.
pub type InputHandler = Arc<dyn Fn(Value) -> Result<Value, Fault> + Send + Sync>;

/// One-shot introspection listener.
///
/// Receives the pretty-formatted data of the next push, then is dropped.
pub type PortListener = Box<dyn FnOnce(String) + Send>;

#[derive(Default)]
struct PortState {
    connected: bool,
    connections: Vec<Connection>,
    listeners: Vec<PortListener>,
    handler: Option<InputHandler>,
}

/// A live, typed, directional port. Cloning yields another handle to the
/// same port.
#[derive(Clone)]
pub struct Port {
    name: Arc<str>,
    direction: PortDirection,
    tag: Arc<str>,
    required: bool,
    state: Arc<Mutex<PortState>>,
}

impl std::fmt::Debug for Port {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Port")
            .field("name", &self.name)
            .field("direction", &self.direction)
            .field("tag", &self.tag)
            .field("required", &self.required)
            .field("connected", &self.is_connected())
            .finish()
    }
}

impl Port {
    /// Creates an unconnected port.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        direction: PortDirection,
        tag: impl Into<String>,
        required: bool,
    ) -> Self {
        Self {
            name: name.into().into(),
            direction,
            tag: tag.into().into(),
            required,
            state: Arc::new(Mutex::new(PortState::default())),
        }
    }

    /// Port name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Port direction.
    #[must_use]
    pub fn direction(&self) -> PortDirection {
        self.direction
    }

    /// Type tag; connections require exact equality.
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Whether connecting this port is mandatory.
    #[must_use]
    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Whether at least one connection is attached.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state.lock().connected
    }

    /// Number of attached connections.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.state.lock().connections.len()
    }

    /// Binds the delivery handler of an input port.
    ///
    /// Rebinding replaces the previous handler.
    pub fn bind_handler(&self, handler: InputHandler) {
        self.state.lock().handler = Some(handler);
    }

    /// Installs a transient listener.
    ///
    /// The listener fires once, on the next push, with the pretty-formatted
    /// data; the whole listener set is cleared after delivery.
    pub fn listen(&self, listener: PortListener) {
        self.state.lock().listeners.push(listener);
    }

    fn attach(&self, connection: Connection) {
        let mut state = self.state.lock();
        state.connected = true;
        state.connections.push(connection);
    }

    /// Pushes data through the port.
    ///
    /// # Errors
    ///
    /// Propagates the downstream handler's fault. Fan-out stops at the
    /// first failing connection.
    pub fn push(&self, data: Value) -> Result<Value, Fault> {
        let (listeners, handler, targets) = {
            let mut state = self.state.lock();
            let listeners = std::mem::take(&mut state.listeners);
            let handler = state.handler.clone();
            let targets = if state.connected {
                state.connections.clone()
            } else {
                Vec::new()
            };
            (listeners, handler, targets)
        };

        if !listeners.is_empty() {
            let rendered = pretty(&data);
            for listener in listeners {
                listener(rendered.clone());
            }
        }

        if let Some(handler) = handler {
            return handler(data);
        }
        match targets.len() {
            0 => Ok(Value::Null),
            1 => targets[0].push(data),
            _ => {
                for connection in &targets {
                    connection.push(data.clone())?;
                }
                Ok(Value::Null)
            }
        }
    }
}

/// A live link from one output port to one input port.
///
/// Created once both ports exist and type-match; immutable thereafter.
#[derive(Debug, Clone)]
pub struct Connection {
    output: Port,
    input: Port,
}

impl Connection {
    /// Links two ports, registering the connection with both.
    #[must_use]
    pub fn link(output: &Port, input: &Port) -> Self {
        let connection = Self {
            output: output.clone(),
            input: input.clone(),
        };
        output.attach(connection.clone());
        input.attach(connection.clone());
        connection
    }

    /// Upstream (output) side.
    #[must_use]
    pub fn output(&self) -> &Port {
        &self.output
    }

    /// Downstream (input) side.
    #[must_use]
    pub fn input(&self) -> &Port {
        &self.input
    }

    /// Delivers data to the downstream input port.
    ///
    /// # Errors
    ///
    /// Propagates the downstream handler's fault.
    pub fn push(&self, data: Value) -> Result<Value, Fault> {
        self.input.push(data)
    }
}

/// Formats a value for listener delivery.
fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
