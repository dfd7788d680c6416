//! Event store implementations.

pub mod grpc;
pub mod memory;

pub use grpc::GrpcEventStore;
pub use memory::InMemoryEventStore;
