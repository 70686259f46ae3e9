//! In-memory result store.

use async_trait::async_trait;
use tokio::sync::RwLock;

use vshort_models::ShortResult;

use crate::error::StoreResult;
use crate::ResultStore;

/// Keeps every published result in memory.
///
/// `latest` returns the last write; `history` returns all of them in order.
#[derive(Debug, Default)]
pub struct MemoryResultStore {
    published: RwLock<Vec<ShortResult>>,
}

impl MemoryResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every published result, oldest first.
    pub async fn history(&self) -> Vec<ShortResult> {
        self.published.read().await.clone()
    }

    /// Discard all published results.
    pub async fn clear(&self) {
        self.published.write().await.clear();
    }
}

#[async_trait]
impl ResultStore for MemoryResultStore {
    async fn publish(&self, result: &ShortResult) -> StoreResult<()> {
        self.published.write().await.push(result.clone());
        Ok(())
    }

    async fn latest(&self) -> StoreResult<Option<ShortResult>> {
        Ok(self.published.read().await.last().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vshort_models::ShortStatus;

    #[tokio::test]
    async fn test_latest_is_last_write() {
        let store = MemoryResultStore::new();
        assert!(store.latest().await.unwrap().is_none());

        let mut result = ShortResult::processing("dQw4w9WgXcQ", "fetching transcript");
        store.publish(&result).await.unwrap();
        result.fail("transcript unavailable");
        store.publish(&result).await.unwrap();

        let latest = store.latest().await.unwrap().unwrap();
        assert_eq!(latest.status, ShortStatus::Error);
        assert_eq!(store.history().await.len(), 2);

        store.clear().await;
        assert!(store.latest().await.unwrap().is_none());
    }
}
