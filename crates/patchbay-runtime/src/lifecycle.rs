//! Lifecycle events and observers.
//!
//! The container's startup is a closed sequence of phases; each phase is
//! announced as a typed [`LifecycleEvent`] to every registered
//! [`LifecycleObserver`], synchronously and in order. Collaborators that
//! snapshot structure, persist storage or collect metrics key off these.
//!
//! Unit-originated traffic (log lines, alerts, metric writes) is open-ended
//! and rides the unit message bus instead — see
//! [`patchbay_unit::UnitMessage`].
//!
//! # Event order
//!
//! ```text
//! Configure
//! BeforeInit → Init → UnitInit* → AfterInit
//! BeforeConnections → Connections → Connection* → AfterConnections
//! BeforeProcess → Process* → AfterProcess
//! BeforeProcessPromise → ProcessPromise* → AfterProcessPromise
//! BeforeLoaded → Loaded
//! ```
//!
//! Starred events repeat per unit or per connection.

use serde::{Deserialize, Serialize};

/// One container lifecycle phase, with its typed payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LifecycleEvent {
    /// Configuration is about to be read and overlaid.
    Configure,
    /// Unit initialization is about to start.
    BeforeInit,
    /// Unit initialization started.
    Init,
    /// One unit is about to initialize.
    UnitInit {
        /// Unit id.
        unit: String,
    },
    /// All units initialized.
    AfterInit,
    /// Connection resolution is about to start.
    BeforeConnections,
    /// Connection resolution started.
    Connections,
    /// One connection string is about to resolve.
    Connection {
        /// The connection string.
        connection: String,
    },
    /// All connections resolved.
    AfterConnections,
    /// Synchronous startup is about to begin.
    BeforeProcess,
    /// One unit's `process` is about to run.
    Process {
        /// Unit id.
        unit: String,
    },
    /// Synchronous startup finished.
    AfterProcess,
    /// Awaited startup is about to begin.
    BeforeProcessPromise,
    /// One unit's `process_promise` is about to be awaited.
    ProcessPromise {
        /// Unit id.
        unit: String,
    },
    /// Awaited startup finished.
    AfterProcessPromise,
    /// The container is about to report itself loaded.
    BeforeLoaded,
    /// Startup is complete.
    Loaded,
}

impl LifecycleEvent {
    /// Phase name, without payload.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Configure => "configure",
            Self::BeforeInit => "before_init",
            Self::Init => "init",
            Self::UnitInit { .. } => "unit_init",
            Self::AfterInit => "after_init",
            Self::BeforeConnections => "before_connections",
            Self::Connections => "connections",
            Self::Connection { .. } => "connection",
            Self::AfterConnections => "after_connections",
            Self::BeforeProcess => "before_process",
            Self::Process { .. } => "process",
            Self::AfterProcess => "after_process",
            Self::BeforeProcessPromise => "before_process_promise",
            Self::ProcessPromise { .. } => "process_promise",
            Self::AfterProcessPromise => "after_process_promise",
            Self::BeforeLoaded => "before_loaded",
            Self::Loaded => "loaded",
        }
    }
}

impl std::fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Receives lifecycle events, synchronously, in emission order.
pub trait LifecycleObserver: Send {
    /// Called once per emitted event.
    fn on_event(&mut self, event: &LifecycleEvent);
}

impl<F> LifecycleObserver for F
where
    F: FnMut(&LifecycleEvent) + Send,
{
    fn on_event(&mut self, event: &LifecycleEvent) {
        self(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_strips_payload() {
        assert_eq!(LifecycleEvent::Configure.name(), "configure");
        assert_eq!(
            LifecycleEvent::UnitInit {
                unit: "clock".into()
            }
            .name(),
            "unit_init"
        );
    }

    #[test]
    fn serializes_tagged() {
        let event = LifecycleEvent::Process {
            unit: "clock".into(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "process");
        assert_eq!(json["unit"], "clock");
    }

    #[test]
    fn closures_are_observers() {
        let mut seen = Vec::new();
        {
            let mut observer = |event: &LifecycleEvent| seen.push(event.name());
            observer.on_event(&LifecycleEvent::Loaded);
        }
        assert_eq!(seen, ["loaded"]);
    }

    #[test]
    fn display_matches_name() {
        assert_eq!(LifecycleEvent::Loaded.to_string(), "loaded");
    }
}
