//! # concord-store
//!
//! Backend adapter contract and the stores behind it.
//!
//! Every backend Concord writes to implements [`BackendAdapter`]: single
//! record create/update/delete plus side-effect-free reads. The saga
//! coordinator drives writes through it; the gap detector only reads.
//!
//! Implementations:
//! - [`MemoryStore`]: in-process map, for tests and demos
//! - [`FaultyStore`]: wraps any adapter and injects failures and latency
//! - [`LibsqlStore`]: local libSQL database file
//! - [`JsonlSource`]: read-only legacy export
//!
//! Uses the `libsql` crate (C `SQLite` fork, v0.9.29) for the local store.

pub mod adapter;
pub mod error;
pub mod faulty;
pub mod health;
pub mod helpers;
pub mod legacy;
pub mod libsql_store;
pub mod memory;
pub mod retry;

pub use adapter::{BackendAdapter, RecordFilter, RecordReader, SharedAdapter};
pub use error::StoreError;
pub use faulty::{AdapterCall, FaultyStore};
pub use health::HealthProbe;
pub use legacy::JsonlSource;
pub use libsql_store::LibsqlStore;
pub use memory::MemoryStore;
pub use retry::RetryPolicy;
