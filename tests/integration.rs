//! Integration tests for tributary.

#[path = "integration/bank.rs"]
mod bank;

#[path = "integration/aggregate_lifecycle_test.rs"]
mod aggregate_lifecycle_test;

#[path = "integration/concurrent_commit_test.rs"]
mod concurrent_commit_test;

#[path = "integration/filter_partitioning_test.rs"]
mod filter_partitioning_test;
