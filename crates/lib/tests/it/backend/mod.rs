//! Document store tests
//!
//! Session semantics of the in-memory store, fault injection, and JSON
//! snapshots.

mod in_memory_operations;
mod save_load;
