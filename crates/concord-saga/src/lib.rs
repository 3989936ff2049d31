//! # concord-saga
//!
//! Application-level transactions across backends without cross-store
//! atomicity.
//!
//! A write becomes a [`SagaTransaction`]: ordered steps, each bound to a
//! [`StepAction`] that knows how to apply and undo it. The
//! [`SagaCoordinator`] runs the steps under a per-entity lock
//! ([`EntityLocks`]), compensates in reverse on failure or timeout, and
//! publishes every state change to the [`TransactionRegistry`].
//! [`ProcessWriter`] builds the standard structured → graph → vector
//! transaction for process writes.

pub mod action;
pub mod coordinator;
pub mod error;
pub mod locks;
pub mod registry;
pub mod writer;

pub use action::{AdapterAction, StepAction};
pub use coordinator::{CoordinatorOptions, SagaCoordinator, SagaTransaction};
pub use error::SagaError;
pub use locks::{EntityLockGuard, EntityLocks};
pub use registry::TransactionRegistry;
pub use writer::ProcessWriter;
