//! # concord-core
//!
//! Core types, ID generation, and error types for Concord.
//!
//! This crate provides the foundational types shared across all Concord crates:
//! - The process entity (typed, validated) and its stored record form
//! - Status enums with state machine transitions
//! - Audit-facing data records: transactions, saga steps, gaps, fix actions
//! - ID prefix constants and generation
//! - Content hashing used by gap detection
//! - Cross-cutting error types
//! - Structured outcome types returned to callers

pub mod entities;
pub mod enums;
pub mod errors;
pub mod hash;
pub mod ids;
pub mod reconcile;
pub mod responses;
pub mod transaction;
