//! Scaling providers driven by the autoscaler conformance suite
//!
//! A provider owns everything backend-specific: where the node groups live,
//! how their size is read and changed, and how the autoscaler under test is
//! deployed next to them.

pub mod capi;

use async_trait::async_trait;

use crate::error::Result;
use crate::framework::Framework;

pub use capi::{AUTOSCALER_NAMESPACE_PREFIX, CapiProvider};

/// Hooks and operations the conformance suite calls on a backend
#[async_trait]
pub trait AutoscalingProvider: Send + Sync {
    /// Connect to the backend and create per-test state
    async fn before_each(&mut self, framework: &Framework) -> Result<()>;

    /// Tear down per-test state created by `before_each`
    async fn after_each(&mut self, framework: &Framework) -> Result<()>;

    /// Set the node group's size to `size`
    async fn resize_group(&self, group: &str, size: i32) -> Result<()>;

    /// Current size of the node group
    async fn group_size(&self, group: &str) -> Result<i32>;

    /// Deploy the autoscaler under test and wait for it to become available
    async fn enable_autoscaler(&mut self, group: &str, min_size: i32, max_size: i32)
    -> Result<()>;

    /// Remove what `enable_autoscaler` created outside the test namespace
    async fn disable_autoscaler(&mut self, group: &str) -> Result<()>;
}
