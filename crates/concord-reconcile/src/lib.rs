//! # concord-reconcile
//!
//! Finds and repairs divergence between the source of truth and the
//! derived stores.
//!
//! - [`GapDetector`] compares each derived store with the source and
//!   classifies every difference as a [`Gap`](concord_core::reconcile::Gap)
//! - [`select_strategy`] maps a gap to a fix strategy
//! - [`AutoFixEngine`] executes fix actions as saga transactions, with
//!   confirmation gating, dry runs, retries, and backup restoration
//! - [`Migrator`] imports a legacy export through the regular write path

pub mod detector;
pub mod engine;
pub mod error;
pub mod merge;
pub mod migrate;
pub mod strategy;

pub use detector::{GapDetector, classify};
pub use engine::{AutoFixEngine, EngineOptions};
pub use error::ReconcileError;
pub use merge::merge_records;
pub use migrate::Migrator;
pub use strategy::{describe, select_strategy};
