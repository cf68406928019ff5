//! Fault taxonomy for the Patchbay runtime.
//!
//! This crate is the error layer every other Patchbay crate builds on:
//!
//! - [`Fault`] — one structured, serializable failure value with attached
//!   fields and an ordered cause chain
//! - [`FaultRegistry`] — the catalog of registered fault kinds and the
//!   factory that mints faults from it
//! - [`KindDef`] — the definition of one kind: subsystem group, stable
//!   random code, readable short identifier, description, field schema
//!
//! # Design
//!
//! There is no global registry. One [`FaultRegistry`] is created at process
//! start and passed (as `Arc<FaultRegistry>`) to every subsystem; each
//! subsystem registers its kind catalog idempotently on construction, so
//! wiring order never matters.
//!
//! Short identifiers follow the workspace convention — UPPER_SNAKE_CASE
//! with a subsystem prefix:
//!
//! | Prefix | Owner |
//! |--------|-------|
//! | `REGISTRY_` | this crate |
//! | `VALIDATOR_` | `patchbay-rules` |
//! | `PORT_` | `patchbay-unit` |
//! | `CONTAINER_`, `RESOLVER_` | `patchbay-runtime` |

mod fault;
mod registry;

pub use fault::{Cause, Fault};
pub use registry::{kinds, FaultRegistry, KindDef};

/// Asserts that a short identifier follows the workspace convention.
///
/// # Checks
///
/// 1. Not empty
/// 2. Starts with the expected subsystem prefix
/// 3. UPPER_SNAKE_CASE throughout
///
/// # Panics
///
/// Panics with a descriptive message when a check fails. Intended for kind
/// catalog tests.
pub fn assert_short_id(short: &str, expected_prefix: &str) {
    assert!(!short.is_empty(), "short identifier must not be empty");
    assert!(
        short.starts_with(expected_prefix),
        "short identifier '{short}' must start with prefix '{expected_prefix}'"
    );
    assert!(
        is_upper_snake_case(short),
        "short identifier '{short}' must be UPPER_SNAKE_CASE"
    );
}

/// Asserts a whole kind catalog at once.
pub fn assert_short_ids<'a>(shorts: impl IntoIterator<Item = &'a str>, expected_prefix: &str) {
    for short in shorts {
        assert_short_id(short, expected_prefix);
    }
}

fn is_upper_snake_case(s: &str) -> bool {
    if s.is_empty() || s.starts_with('_') || s.ends_with('_') || s.contains("__") {
        return false;
    }
    s.chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_owned_shorts_follow_convention() {
        assert_short_ids(
            [
                kinds::REGISTRY_KIND_EXISTS,
                kinds::REGISTRY_KIND_NOT_FOUND,
                kinds::REGISTRY_CONVERTED,
            ],
            "REGISTRY_",
        );
    }

    #[test]
    fn upper_snake_case_rules() {
        assert!(is_upper_snake_case("CONTAINER_UNIT_INIT"));
        assert!(is_upper_snake_case("A_1"));
        assert!(!is_upper_snake_case(""));
        assert!(!is_upper_snake_case("lower_case"));
        assert!(!is_upper_snake_case("_LEADING"));
        assert!(!is_upper_snake_case("TRAILING_"));
        assert!(!is_upper_snake_case("DOUBLE__GAP"));
    }
}
