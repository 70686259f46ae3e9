//! Stores for the published short result.
//!
//! The orchestrator publishes the whole `ShortResult` after every mutation;
//! a store only has to keep the latest write for its channel.

pub mod error;
pub mod file;
pub mod memory;

use async_trait::async_trait;

use vshort_models::ShortResult;

pub use error::{StoreError, StoreResult};
pub use file::FileResultStore;
pub use memory::MemoryResultStore;

/// Destination for published results (last write wins).
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Replace the channel's current result.
    async fn publish(&self, result: &ShortResult) -> StoreResult<()>;

    /// Most recently published result, if any.
    async fn latest(&self) -> StoreResult<Option<ShortResult>>;
}
