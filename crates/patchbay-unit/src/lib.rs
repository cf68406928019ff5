//! Unit SDK for Patchbay.
//!
//! This crate is what unit authors depend on: the [`Unit`] trait, the
//! [`UnitCore`] every unit embeds, the spec builders for ports, actions
//! and metrics, the live [`Port`]/[`Connection`] pair the container wires,
//! and the [`UnitEmitter`] message bus handle.
//!
//! # Crate Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │  patchbay-runtime : Container, lifecycle, wiring     │
//! ├──────────────────────────────────────────────────────┤
//! │  patchbay-unit    : Unit SDK               ◄── HERE  │
//! ├──────────────────────────────────────────────────────┤
//! │  patchbay-rules   : Rule, Validator                  │
//! │  patchbay-fault   : Fault, FaultRegistry             │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! # Declarations vs. live objects
//!
//! | Declared (by the unit) | Live (built by the container) |
//! |------------------------|-------------------------------|
//! | [`PortSpec`] in [`Unit::inputs`]/[`Unit::outputs`] | [`Port`] in the unit's core |
//! | [`ActionSpec`] in [`Unit::actions`] | routing-table entry |
//! | [`MetricSpec`] in [`Unit::metrics`] | `MetricRegister` bus message |
//!
//! Spec builders export plain descriptors ([`PortDescriptor`],
//! [`ActionDescriptor`], [`MetricDescriptor`]) that the container collects
//! into its introspectable structure.

pub mod kinds;

mod action;
mod link;
mod message;
mod metric;
mod port;
mod unit;

pub use action::{ActionDescriptor, ActionSet, ActionSpec};
pub use kinds::register_kinds;
pub use link::{Connection, InputHandler, Port, PortListener};
pub use message::{MessageChannel, UnitEmitter, UnitMessage};
pub use metric::{MetricDescriptor, MetricInterval, MetricSet, MetricSpec, MetricWrite, StoreKind};
pub use port::{PortDescriptor, PortDirection, PortSet, PortSpec};
pub use unit::{default_settings, Unit, UnitCore, UnitSeed};
