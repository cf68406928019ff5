//! Validator fault kinds.
//!
//! All validation failures use the `VALIDATOR_` prefix. The catalog is
//! registered idempotently, so any number of validators may share one
//! registry.

use crate::{Rule, RuleSet};
use patchbay_fault::{Fault, FaultRegistry, KindDef};
use serde_json::{json, Value};

/// Validation finished with at least one problem.
pub const VALIDATOR_NOT_PASSED: &str = "VALIDATOR_NOT_PASSED";
/// A required field is absent.
pub const VALIDATOR_VALUE_REQUIRED: &str = "VALIDATOR_VALUE_REQUIRED";
/// Value is not a number.
pub const VALIDATOR_NOT_NUMBER: &str = "VALIDATOR_NOT_NUMBER";
/// Number has a fractional part.
pub const VALIDATOR_NOT_INTEGER: &str = "VALIDATOR_NOT_INTEGER";
/// Number exceeds the configured maximum.
pub const VALIDATOR_NUMBER_MAX: &str = "VALIDATOR_NUMBER_MAX";
/// Number falls below the configured minimum.
pub const VALIDATOR_NUMBER_MIN: &str = "VALIDATOR_NUMBER_MIN";
/// Value is not a string.
pub const VALIDATOR_NOT_STRING: &str = "VALIDATOR_NOT_STRING";
/// String length reached the configured maximum.
pub const VALIDATOR_STRING_MAX_LENGTH: &str = "VALIDATOR_STRING_MAX_LENGTH";
/// String length stayed at or below the configured minimum.
pub const VALIDATOR_STRING_MIN_LENGTH: &str = "VALIDATOR_STRING_MIN_LENGTH";
/// Value is not a boolean.
pub const VALIDATOR_NOT_BOOLEAN: &str = "VALIDATOR_NOT_BOOLEAN";
/// Value is not an object.
pub const VALIDATOR_NOT_OBJECT: &str = "VALIDATOR_NOT_OBJECT";
/// A field inside a nested object failed validation.
pub const VALIDATOR_OBJECT_FIELDS: &str = "VALIDATOR_OBJECT_FIELDS";
/// Value is not an array.
pub const VALIDATOR_NOT_ARRAY: &str = "VALIDATOR_NOT_ARRAY";
/// An array element failed its content rule.
pub const VALIDATOR_ARRAY_CONTENT: &str = "VALIDATOR_ARRAY_CONTENT";
/// Value is not a callable.
pub const VALIDATOR_NOT_FUNCTION: &str = "VALIDATOR_NOT_FUNCTION";

/// Exports a field schema for [`KindDef::fields`] from named rules.
#[must_use]
pub fn describe_fields(pairs: impl IntoIterator<Item = (&'static str, Rule)>) -> Value {
    let mut set = RuleSet::new();
    for (key, rule) in pairs {
        set.insert(key.to_string(), rule);
    }
    let exported: serde_json::Map<String, Value> = set
        .iter()
        .map(|(key, rule)| (key.clone(), json!(rule.export())))
        .collect();
    Value::Object(exported)
}

/// Registers the validator kind catalog.
///
/// # Errors
///
/// Fails only when another subsystem already registered a differing kind
/// under one of these identities.
pub fn register_kinds(registry: &FaultRegistry) -> Result<(), Fault> {
    let key_field = || describe_fields([("key", Rule::string().description("Validated field key"))]);
    let limit_field =
        || describe_fields([("limit", Rule::number().description("Configured limit"))]);

    let defs = [
        KindDef::new(
            "Validator",
            "X1UP4P2HRHWd",
            VALIDATOR_NOT_PASSED,
            "Validation error - data not pass",
        )
        .fields(describe_fields([(
            "problems",
            Rule::array().description("Collected validation problems"),
        )])),
        KindDef::new(
            "Validator",
            "Jwg5Mr1NqaSj",
            VALIDATOR_VALUE_REQUIRED,
            "A value is required",
        )
        .fields(key_field()),
        KindDef::new(
            "Validator",
            "pn7B9po1UGRp",
            VALIDATOR_NOT_NUMBER,
            "Value must be a number",
        )
        .fields(key_field()),
        KindDef::new(
            "Validator",
            "fiUqanqqFlnt",
            VALIDATOR_NOT_INTEGER,
            "Value must be an integer",
        )
        .fields(key_field()),
        KindDef::new(
            "Validator",
            "ZFSMAes0qdzC",
            VALIDATOR_NUMBER_MAX,
            "Number out of upper limit",
        )
        .fields(limit_field()),
        KindDef::new(
            "Validator",
            "B3zqsPub40HH",
            VALIDATOR_NUMBER_MIN,
            "Number out of lower limit",
        )
        .fields(limit_field()),
        KindDef::new(
            "Validator",
            "klmjxHyQrWuH",
            VALIDATOR_NOT_STRING,
            "Value must be a string",
        )
        .fields(key_field()),
        KindDef::new(
            "Validator",
            "BL5lxR4BinkA",
            VALIDATOR_STRING_MAX_LENGTH,
            "The maximum string length is limited",
        )
        .fields(limit_field()),
        KindDef::new(
            "Validator",
            "KsijTdsbd2YN",
            VALIDATOR_STRING_MIN_LENGTH,
            "The minimum string length is limited",
        )
        .fields(limit_field()),
        KindDef::new(
            "Validator",
            "Fr7BvAlZyZPm",
            VALIDATOR_NOT_BOOLEAN,
            "Value must be a boolean",
        )
        .fields(key_field()),
        KindDef::new(
            "Validator",
            "zOPzOab9oLum",
            VALIDATOR_NOT_OBJECT,
            "Value must be an object",
        )
        .fields(key_field()),
        KindDef::new(
            "Validator",
            "p7qSfRGixV0M",
            VALIDATOR_OBJECT_FIELDS,
            "Error of validation of fields inside the object",
        )
        .fields(key_field()),
        KindDef::new(
            "Validator",
            "3U9s3ZsTH6FA",
            VALIDATOR_NOT_ARRAY,
            "Value must be an array",
        )
        .fields(key_field()),
        KindDef::new(
            "Validator",
            "Eg9cIXlxi1yP",
            VALIDATOR_ARRAY_CONTENT,
            "Validation error inside the array data",
        )
        .fields(describe_fields([(
            "index",
            Rule::number().integer().description("Failing element index"),
        )])),
        KindDef::new(
            "Validator",
            "P2K7PE7C3JRU",
            VALIDATOR_NOT_FUNCTION,
            "Value must be a function",
        )
        .fields(key_field()),
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
                VALIDATOR_NOT_PASSED,
                VALIDATOR_VALUE_REQUIRED,
                VALIDATOR_NOT_NUMBER,
                VALIDATOR_NOT_INTEGER,
                VALIDATOR_NUMBER_MAX,
                VALIDATOR_NUMBER_MIN,
                VALIDATOR_NOT_STRING,
                VALIDATOR_STRING_MAX_LENGTH,
                VALIDATOR_STRING_MIN_LENGTH,
                VALIDATOR_NOT_BOOLEAN,
                VALIDATOR_NOT_OBJECT,
                VALIDATOR_OBJECT_FIELDS,
                VALIDATOR_NOT_ARRAY,
                VALIDATOR_ARRAY_CONTENT,
                VALIDATOR_NOT_FUNCTION,
            ],
            "VALIDATOR_",
        );
    }

    #[test]
    fn registration_is_idempotent() {
        let registry = FaultRegistry::new();
        register_kinds(&registry).unwrap();
        register_kinds(&registry).unwrap();
    }

    #[test]
    fn describe_fields_exports_descriptors() {
        let schema = describe_fields([("key", Rule::string())]);
        assert_eq!(schema["key"]["kind"], "string");
    }
}
