//! Unit-type resolution.
//!
//! The container does not know how unit types come to exist — directory
//! scanning, static linking, anything constructible. It consumes a
//! [`UnitResolver`]: given a type string, hand back a one-shot factory or
//! fail with [`RESOLVER_TYPE_NOT_FOUND`](crate::kinds::RESOLVER_TYPE_NOT_FOUND).
//!
//! [`StaticResolver`] is the in-memory implementation: a map from type
//! string to constructor, suitable for statically linked services and for
//! tests.
//!
//! ```
//! use patchbay_fault::FaultRegistry;
//! use patchbay_runtime::{StaticResolver, UnitResolver};
//! use patchbay_unit::{Unit, UnitCore, UnitSeed};
//! use std::sync::Arc;
//!
//! struct Noop { core: UnitCore }
//!
//! #[async_trait::async_trait]
//! impl Unit for Noop {
//!     fn core(&self) -> &UnitCore { &self.core }
//!     fn core_mut(&mut self) -> &mut UnitCore { &mut self.core }
//! }
//!
//! let registry = Arc::new(FaultRegistry::new());
//! patchbay_runtime::register_kinds(&registry).unwrap();
//!
//! let resolver = StaticResolver::new(Arc::clone(&registry))
//!     .with("test.Noop", |seed| Box::new(Noop { core: UnitCore::new(seed) }));
//! assert!(resolver.resolve("test.Noop").is_ok());
//! assert!(resolver.resolve("test.Missing").is_err());
//! ```

use crate::kinds;
use patchbay_fault::{Fault, FaultRegistry};
use patchbay_unit::{Unit, UnitSeed};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;

/// One-shot unit constructor returned by a resolver.
pub type UnitFactory = Box<dyn FnOnce(UnitSeed) -> Box<dyn Unit> + Send>;

/// Shared unit constructor held by [`StaticResolver`].
pub type UnitCtor = Arc<dyn Fn(UnitSeed) -> Box<dyn Unit> + Send + Sync>;

/// Resolves type strings into constructible unit factories.
pub trait UnitResolver: Send + Sync {
    /// Resolves one type string.
    ///
    /// # Errors
    ///
    /// [`kinds::RESOLVER_TYPE_NOT_FOUND`] when no such type exists.
    fn resolve(&self, type_name: &str) -> Result<UnitFactory, Fault>;
}

/// In-memory resolver over registered constructors.
#[derive(Clone)]
pub struct StaticResolver {
    registry: Arc<FaultRegistry>,
    ctors: HashMap<String, UnitCtor>,
}

impl StaticResolver {
    /// Empty resolver.
    #[must_use]
    pub fn new(registry: Arc<FaultRegistry>) -> Self {
        Self {
            registry,
            ctors: HashMap::new(),
        }
    }

    /// Registers a constructor under a type string.
    ///
    /// A later registration under the same string replaces the earlier
    /// one.
    #[must_use]
    pub fn with(
        mut self,
        type_name: impl Into<String>,
        ctor: impl Fn(UnitSeed) -> Box<dyn Unit> + Send + Sync + 'static,
    ) -> Self {
        self.ctors.insert(type_name.into(), Arc::new(ctor));
        self
    }

    /// Registered type strings, unordered.
    #[must_use]
    pub fn types(&self) -> Vec<&str> {
        self.ctors.keys().map(String::as_str).collect()
    }
}

impl std::fmt::Debug for StaticResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticResolver")
            .field("types", &self.types())
            .finish()
    }
}

impl UnitResolver for StaticResolver {
    fn resolve(&self, type_name: &str) -> Result<UnitFactory, Fault> {
        match self.ctors.get(type_name) {
            Some(ctor) => {
                let ctor = Arc::clone(ctor);
                Ok(Box::new(move |seed| ctor(seed)))
            }
            None => Err(self.registry.make(
                kinds::RESOLVER_TYPE_NOT_FOUND,
                json!({ "type": type_name }),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::SinkUnit;
    use patchbay_unit::UnitEmitter;
    use tokio::sync::broadcast;

    fn registry() -> Arc<FaultRegistry> {
        let registry = Arc::new(FaultRegistry::new());
        crate::register_kinds(&registry).unwrap();
        patchbay_unit::register_kinds(&registry).unwrap();
        registry
    }

    fn seed(registry: &Arc<FaultRegistry>) -> UnitSeed {
        let (sender, _) = broadcast::channel(16);
        UnitSeed {
            id: "sink".to_string(),
            type_name: "test.Sink".to_string(),
            registry: Arc::clone(registry),
            emitter: UnitEmitter::new("sink", sender),
        }
    }

    #[test]
    fn resolve_constructs_a_unit() {
        let registry = registry();
        let resolver = StaticResolver::new(Arc::clone(&registry))
            .with("test.Sink", |seed| Box::new(SinkUnit::new(seed)));

        let factory = resolver.resolve("test.Sink").unwrap();
        let unit = factory(seed(&registry));
        assert_eq!(unit.core().id(), "sink");
    }

    #[test]
    fn unknown_type_faults() {
        let registry = registry();
        let resolver = StaticResolver::new(Arc::clone(&registry));

        let fault = match resolver.resolve("test.Missing") {
            Ok(_) => panic!("expected resolve to fault"),
            Err(fault) => fault,
        };
        assert!(fault.is_short(kinds::RESOLVER_TYPE_NOT_FOUND));
        assert_eq!(fault.field("type"), Some(&serde_json::json!("test.Missing")));
    }

    #[test]
    fn later_registration_replaces_earlier() {
        let registry = registry();
        let resolver = StaticResolver::new(Arc::clone(&registry))
            .with("test.Sink", |seed| Box::new(SinkUnit::new(seed)))
            .with("test.Sink", |seed| {
                Box::new(SinkUnit::new(UnitSeed {
                    type_name: "test.SinkV2".to_string(),
                    ..seed
                }))
            });

        let factory = resolver.resolve("test.Sink").unwrap();
        let unit = factory(seed(&registry));
        assert_eq!(unit.core().type_name(), "test.SinkV2");
    }
}
