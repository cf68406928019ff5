//! The Patchbay container runtime.
//!
//! Given a declarative [`ServiceDescription`] — named units, their options,
//! and the typed-port connections between them — a [`Container`] resolves
//! each unit type through a [`UnitResolver`], validates options against the
//! unit's declared rules, expands dynamic ports, wires connection strings
//! into live links, and drives every unit through the ordered two-phase
//! startup, announcing each phase as a typed [`LifecycleEvent`].
//!
//! # Crate Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │  patchbay-runtime : Container          ◄── HERE      │
//! ├──────────────────────────────────────────────────────┤
//! │  patchbay-unit    : Unit trait, ports, actions       │
//! ├──────────────────────────────────────────────────────┤
//! │  patchbay-rules   : Rule, Validator                  │
//! │  patchbay-fault   : Fault, FaultRegistry             │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use patchbay_fault::FaultRegistry;
//! use patchbay_runtime::{testing, Container, ServiceDescription, UnitDescriptor};
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let registry = Arc::new(FaultRegistry::new());
//! patchbay_runtime::register_kinds(&registry).unwrap();
//!
//! let service = ServiceDescription::new()
//!     .unit(UnitDescriptor::new("source", "test.Source").option("value", 42))
//!     .unit(UnitDescriptor::new("sink", "test.Sink"))
//!     .connection("source.value -> sink.value");
//!
//! let resolver = Arc::new(testing::fixture_resolver(Arc::clone(&registry)));
//! let mut container =
//!     Container::new("demo", service, resolver, registry).unwrap();
//! container.run().await.unwrap();
//! assert!(container.is_loaded());
//! # }
//! ```
//!
//! # External collaborators
//!
//! | Interface | Direction | Type |
//! |-----------|-----------|------|
//! | Unit-type resolver | consumed | [`UnitResolver`] |
//! | Lifecycle events | exposed | [`Container::observe`] |
//! | Unit messages | exposed | [`Container::subscribe_messages`] |
//! | Override file | consumed | [`Container::with_override_file`] |
//! | Structure | exposed | [`Container::structure`] |

pub mod kinds;
pub mod testing;

mod container;
mod lifecycle;
mod resolver;
mod service;
mod structure;

pub use container::{Container, UnitCell};
pub use kinds::register_kinds;
pub use lifecycle::{LifecycleEvent, LifecycleObserver};
pub use resolver::{StaticResolver, UnitCtor, UnitFactory, UnitResolver};
pub use service::{OverlayEntry, ServiceDescription, ServiceOverlay, UnitDescriptor};
pub use structure::{PortLink, ServiceStructure, StructurePort, UnitStructure};
