//! The process entity in its two shapes.
//!
//! `ProcessEntity` is the typed, validated form callers write. `ProcessRecord`
//! is the stored form every backend adapter reads and writes: the payload as
//! a JSON object, so that partially migrated or structurally divergent copies
//! in derived stores remain readable for gap detection.

mod process;
mod record;

pub use process::{ProcessConnection, ProcessElement, ProcessEntity, ProcessPayload};
pub use record::{ProcessRecord, RecordRef};
