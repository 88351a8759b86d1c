//! Document store implementations
//!
//! Currently only the in-memory store ships with the crate; it optionally
//! snapshots its contents to a JSON file.

mod in_memory;

pub use in_memory::{BackendStats, FaultKind, FaultPoint, InMemory};
