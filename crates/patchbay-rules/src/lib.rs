//! Validation engine for Patchbay.
//!
//! A small family of typed, fluent rule builders producing serializable
//! descriptors, and a validator that checks a JSON object's fields against
//! them, aggregating every failure into one fault.
//!
//! # Crate Architecture
//!
//! This crate sits in the base layer next to `patchbay-fault`:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │  patchbay-runtime : Container, lifecycle, wiring     │
//! ├──────────────────────────────────────────────────────┤
//! │  patchbay-unit    : Unit trait, ports, actions       │
//! ├──────────────────────────────────────────────────────┤
//! │  patchbay-rules   : Rule, Validator        ◄── HERE  │
//! │  patchbay-fault   : Fault, FaultRegistry             │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! # Where rules appear
//!
//! | Site | Enforced |
//! |------|----------|
//! | Unit option rules | Yes, at container init |
//! | Action requirement rules | Yes, on every invocation |
//! | Action return rules | No, documentation only |
//! | Port requirement rules | No, documentation only |
//! | Fault kind field schemas | No, documentation only |
//!
//! # Example
//!
//! ```
//! use patchbay_fault::FaultRegistry;
//! use patchbay_rules::{kinds, ruleset, Rule, Validator};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! let validator = Validator::new(Arc::new(FaultRegistry::new())).unwrap();
//! let rules = ruleset! {
//!     "inputs" => Rule::number().integer().min(1.0).required()
//!         .description("Dynamic input count"),
//! };
//!
//! let mut bad = json!({ "inputs": "three" });
//! let fault = validator
//!     .validate(&rules, bad.as_object_mut().unwrap())
//!     .unwrap_err();
//! assert!(fault.is_short(kinds::VALIDATOR_NOT_PASSED));
//! ```

pub mod kinds;
mod rule;
mod validator;

pub use kinds::{describe_fields, register_kinds};
pub use rule::{Check, CheckDescriptor, Rule, RuleDescriptor, RuleKind, RuleSet};
pub use validator::{Problem, Validator};
