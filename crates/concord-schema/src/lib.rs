//! # concord-schema
//!
//! JSON Schema registry for Concord.
//!
//! Record types are defined in `concord-core` with `#[derive(JsonSchema)]`.
//! This crate collects their schemas under stable names, validates incoming
//! JSON against them (the CLI checks `concord sync` input here before the
//! typed validation in `ProcessEntity::validate`), and exports them for
//! `concord schema <name>`.

pub mod error;
pub mod registry;

pub use error::SchemaError;
pub use registry::SchemaRegistry;
