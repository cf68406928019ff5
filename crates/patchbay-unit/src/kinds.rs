//! Unit-layer fault kinds.

use patchbay_fault::{Fault, FaultRegistry, KindDef};
use patchbay_rules::{describe_fields, Rule};

/// A unit addressed one of its own ports by an unknown name.
pub const UNIT_PORT_NOT_FOUND: &str = "UNIT_PORT_NOT_FOUND";
/// Port delivery re-entered a unit that is already mid-call.
pub const UNIT_DELIVERY_BUSY: &str = "UNIT_DELIVERY_BUSY";
/// Data arrived on an input the unit does not handle.
pub const UNIT_INPUT_UNHANDLED: &str = "UNIT_INPUT_UNHANDLED";
/// An action was dispatched that the unit does not handle.
pub const UNIT_ACTION_UNHANDLED: &str = "UNIT_ACTION_UNHANDLED";

/// Registers the unit-layer kind catalog.
///
/// # Errors
///
/// Fails only when the registry already holds a differing kind under one of
/// these identities.
pub fn register_kinds(registry: &FaultRegistry) -> Result<(), Fault> {
    let defs = [
        KindDef::new(
            "Unit",
            "QlcUh744VzAG",
            UNIT_PORT_NOT_FOUND,
            "Port on unit not found",
        )
        .fields(describe_fields([
            ("unit", Rule::string().description("Unit ID")),
            ("port", Rule::string().description("Port name")),
        ])),
        KindDef::new(
            "Unit",
            "hT2wYdR8sNfj",
            UNIT_DELIVERY_BUSY,
            "Port delivery re-entered a busy unit",
        )
        .fields(describe_fields([
            ("unit", Rule::string().description("Unit ID")),
            ("port", Rule::string().description("Port name")),
        ])),
        KindDef::new(
            "Unit",
            "c4VgKm1zPuXe",
            UNIT_INPUT_UNHANDLED,
            "Unit does not handle this input port",
        )
        .fields(describe_fields([(
            "port",
            Rule::string().description("Port name"),
        )])),
        KindDef::new(
            "Unit",
            "w9LsQb6tJrYd",
            UNIT_ACTION_UNHANDLED,
            "Unit does not handle this action",
        )
        .fields(describe_fields([(
            "action",
            Rule::string().description("Action name"),
        )])),
    ];

    for def in defs {
        registry.register(def)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use patchbay_fault::assert_short_ids;

    #[test]
    fn catalog_follows_convention() {
        assert_short_ids(
            [
                UNIT_PORT_NOT_FOUND,
                UNIT_DELIVERY_BUSY,
                UNIT_INPUT_UNHANDLED,
                UNIT_ACTION_UNHANDLED,
            ],
            "UNIT_",
        );
    }

    #[test]
    fn registration_is_idempotent() {
        let registry = FaultRegistry::new();
        register_kinds(&registry).unwrap();
        register_kinds(&registry).unwrap();
    }
}
