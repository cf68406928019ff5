//! Container and resolver fault kinds.
//!
//! Orchestration failures use the `CONTAINER_` prefix; unit-type and file
//! resolution failures use `RESOLVER_`. Codes are stable; external
//! collaborators may match on them across versions.

use patchbay_fault::{Fault, FaultRegistry, KindDef};
use patchbay_rules::{describe_fields, Rule};

/// A unit failed to initialize; the descriptor is attached, the underlying
/// fault chained.
pub const CONTAINER_UNIT_INIT: &str = "CONTAINER_UNIT_INIT";
/// A connection failed to resolve; the connection string is attached.
pub const CONTAINER_CONNECTION_INIT: &str = "CONTAINER_CONNECTION_INIT";
/// Unit id is empty or uses characters outside the allowed set.
pub const CONTAINER_BAD_UNIT_ID: &str = "CONTAINER_BAD_UNIT_ID";
/// A unit id appeared twice in the service description.
pub const CONTAINER_UNIT_DUPLICATE: &str = "CONTAINER_UNIT_DUPLICATE";
/// A unit's option-preparation hook failed.
pub const CONTAINER_PREPARE_OPTIONS: &str = "CONTAINER_PREPARE_OPTIONS";
/// No unit under the given id.
pub const CONTAINER_UNIT_NOT_FOUND: &str = "CONTAINER_UNIT_NOT_FOUND";
/// The unit has no such action registered.
pub const CONTAINER_ACTION_NOT_FOUND: &str = "CONTAINER_ACTION_NOT_FOUND";
/// A declared action has no handler on the unit.
pub const CONTAINER_ACTION_HANDLER_NOT_FOUND: &str = "CONTAINER_ACTION_HANDLER_NOT_FOUND";
/// A unit's `process` hook failed during startup.
pub const CONTAINER_PROCESS_EXCEPTION: &str = "CONTAINER_PROCESS_EXCEPTION";
/// A unit's `process_promise` hook failed during startup.
pub const CONTAINER_PROCESS_PROMISE_EXCEPTION: &str = "CONTAINER_PROCESS_PROMISE_EXCEPTION";
/// A dynamic port's declared name is missing the `%d` placeholder.
pub const CONTAINER_BAD_DYNAMIC_PORT_NAME: &str = "CONTAINER_BAD_DYNAMIC_PORT_NAME";
/// Port name uses characters outside the allowed set.
pub const CONTAINER_BAD_PORT_NAME: &str = "CONTAINER_BAD_PORT_NAME";
/// A declared input port has no handler on the unit.
pub const CONTAINER_INPUT_HANDLER_NOT_FOUND: &str = "CONTAINER_INPUT_HANDLER_NOT_FOUND";
/// Connection string does not match the grammar.
pub const CONTAINER_CONNECTION_SYNTAX: &str = "CONTAINER_CONNECTION_SYNTAX";
/// A connection references an unknown unit.
pub const CONTAINER_CONNECTION_UNIT_NOT_FOUND: &str = "CONTAINER_CONNECTION_UNIT_NOT_FOUND";
/// A connection references an unknown port.
pub const CONTAINER_CONNECTION_PORT_NOT_FOUND: &str = "CONTAINER_CONNECTION_PORT_NOT_FOUND";
/// The two ports of a connection carry different type tags.
pub const CONTAINER_INCOMPATIBLE_PORTS: &str = "CONTAINER_INCOMPATIBLE_PORTS";
/// The override configuration file could not be applied.
pub const CONTAINER_CONFIG_OVERLAY: &str = "CONTAINER_CONFIG_OVERLAY";

/// No constructible unit type under the given type string.
pub const RESOLVER_TYPE_NOT_FOUND: &str = "RESOLVER_TYPE_NOT_FOUND";
/// A description or overlay file could not be read or parsed.
pub const RESOLVER_IMPORT_FAILED: &str = "RESOLVER_IMPORT_FAILED";

/// Registers the container and resolver kind catalogs.
///
/// # Errors
///
/// Fails only when the registry already holds a differing kind under one of
/// these identities.
pub fn register_kinds(registry: &FaultRegistry) -> Result<(), Fault> {
    let unit_field = || describe_fields([("unit", Rule::string().description("Unit ID"))]);
    let port_field = || describe_fields([("port", Rule::string().description("Port name"))]);
    let conn_field = || {
        describe_fields([(
            "connection",
            Rule::string().description("Connection string"),
        )])
    };

    let defs = [
        KindDef::new(
            "Container",
            "FBDRkSAWnlcc",
            CONTAINER_UNIT_INIT,
            "Unit initialization error",
        )
        .fields(describe_fields([(
            "unit",
            Rule::object().description("Unit descriptor"),
        )])),
        KindDef::new(
            "Container",
            "96UX24PTyFU7",
            CONTAINER_CONNECTION_INIT,
            "Connection initialization error",
        )
        .fields(conn_field()),
        KindDef::new(
            "Container",
            "0HVa3cO1E2vB",
            CONTAINER_BAD_UNIT_ID,
            "Incorrect unit id",
        )
        .fields(unit_field()),
        KindDef::new(
            "Container",
            "uF62e07wloS9",
            CONTAINER_UNIT_DUPLICATE,
            "Unit id is duplicated",
        )
        .fields(unit_field()),
        KindDef::new(
            "Container",
            "2RZznI3JDNUW",
            CONTAINER_PREPARE_OPTIONS,
            "An error occurred while preparing options",
        )
        .fields(describe_fields([(
            "message",
            Rule::string().description("Rendered underlying error"),
        )])),
        KindDef::new(
            "Container",
            "XOXLMVCN9OBI",
            CONTAINER_UNIT_NOT_FOUND,
            "Unit in container not found",
        )
        .fields(unit_field()),
        KindDef::new(
            "Container",
            "NDW2oD7mFxqB",
            CONTAINER_ACTION_NOT_FOUND,
            "Action on unit not found",
        )
        .fields(describe_fields([
            ("unit", Rule::string().description("Unit ID")),
            ("action", Rule::string().description("Action name")),
        ])),
        KindDef::new(
            "Container",
            "570RD59JEYVN",
            CONTAINER_ACTION_HANDLER_NOT_FOUND,
            "Unit action handler not found",
        )
        .fields(describe_fields([
            ("unit", Rule::string().description("Unit ID")),
            ("action", Rule::string().description("Action name")),
        ])),
        KindDef::new(
            "Container",
            "RJV0KT2DFZBZ",
            CONTAINER_PROCESS_EXCEPTION,
            "During process execution the unit raised a fault",
        )
        .fields(unit_field()),
        KindDef::new(
            "Container",
            "K65XWSYOBVFG",
            CONTAINER_PROCESS_PROMISE_EXCEPTION,
            "During process-promise execution the unit raised a fault",
        )
        .fields(unit_field()),
        KindDef::new(
            "Container",
            "jkIpU1p4z5uz",
            CONTAINER_BAD_DYNAMIC_PORT_NAME,
            "Incorrect dynamic port name",
        )
        .fields(port_field()),
        KindDef::new(
            "Container",
            "e8m8dUVVOEU7",
            CONTAINER_BAD_PORT_NAME,
            "Incorrect port name",
        )
        .fields(port_field()),
        KindDef::new(
            "Container",
            "qPevPU6SRJ18",
            CONTAINER_INPUT_HANDLER_NOT_FOUND,
            "Port input handler not found",
        )
        .fields(describe_fields([
            ("unit", Rule::string().description("Unit ID")),
            ("port", Rule::string().description("Port name")),
        ])),
        KindDef::new(
            "Container",
            "Kp74OuVGNU0u",
            CONTAINER_CONNECTION_SYNTAX,
            "Incorrect connection format",
        )
        .fields(describe_fields([
            ("connection", Rule::string().description("Connection string")),
            ("error", Rule::string().description("Grammar problem")),
        ])),
        KindDef::new(
            "Container",
            "eMrJEISxvali",
            CONTAINER_CONNECTION_UNIT_NOT_FOUND,
            "Connection unit not found",
        )
        .fields(describe_fields([
            ("connection", Rule::string().description("Connection string")),
            ("unit", Rule::string().description("Unit ID")),
        ])),
        KindDef::new(
            "Container",
            "CwFj1G47H45E",
            CONTAINER_CONNECTION_PORT_NOT_FOUND,
            "Connection port not found",
        )
        .fields(describe_fields([
            ("connection", Rule::string().description("Connection string")),
            ("port", Rule::string().description("Port name")),
        ])),
        KindDef::new(
            "Container",
            "XR1K10R0OOUC",
            CONTAINER_INCOMPATIBLE_PORTS,
            "Incompatible ports",
        )
        .fields(conn_field()),
        KindDef::new(
            "Container",
            "e090R0MLyb7y",
            CONTAINER_CONFIG_OVERLAY,
            "Problem with extending the service configuration",
        ),
        KindDef::new(
            "Resolver",
            "dY5mKw2xQn8T",
            RESOLVER_TYPE_NOT_FOUND,
            "Unit type not found",
        )
        .fields(describe_fields([(
            "type",
            Rule::string().description("Requested type string"),
        )])),
        KindDef::new(
            "Resolver",
            "aW7pZr4cVb1M",
            RESOLVER_IMPORT_FAILED,
            "Failed to read or parse a description file",
        )
        .fields(describe_fields([(
            "path",
            Rule::string().description("File path"),
        )])),
    ];

    for def in defs {
        registry.register(def)?;
    }
    Ok(())
}
