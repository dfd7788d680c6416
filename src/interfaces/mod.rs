//! Abstract interfaces for tributary collaborators.
//!
//! These traits define the contracts for:
//! - Event storage (fetch and optimistic-concurrency commit)

pub mod event_store;

pub use event_store::{EventStore, Result, StorageError};
