// Test code is allowed to panic on failure
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]

//! Unit tests for the Cluster API autoscaler provider
//!
//! These run against an in-memory API server and cover:
//! - API group version discovery
//! - Replica reads and writes through the scale subresource
//! - Autoscaler deployment and its identity
//! - Teardown of the cluster-scoped grant and the test namespace
//! - Resource generators
//! - Control-plane cordoning
//! - Deployment readiness waits

#[path = "../common/mod.rs"]
mod common;

mod discovery;
