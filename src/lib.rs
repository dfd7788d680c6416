//! Tributary - event-sourcing client for a remote event runtime.
//!
//! Aggregates are replayed from the runtime's event store, commands are
//! handled in a transaction scope committed under optimistic concurrency,
//! and event handlers and filters serve the runtime over reverse-call
//! streams.

pub mod clients;
pub mod commands;
pub mod config;
pub mod domain;
pub mod events;
pub mod interfaces;
pub mod processing;
pub mod proto;
pub mod proto_ext;
pub mod reverse_call;
pub mod storage;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_utils;
