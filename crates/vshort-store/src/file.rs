//! JSON file result store.
//!
//! Each channel is one file, `{dir}/{channel}.json`. Writes go to a temporary
//! file that is renamed over the target, so readers never see a partial
//! document.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use vshort_models::ShortResult;

use crate::error::{StoreError, StoreResult};
use crate::ResultStore;

/// Channel used when none is given.
pub const DEFAULT_CHANNEL: &str = "latest";

/// Persists the latest result of one channel as a JSON file.
#[derive(Debug, Clone)]
pub struct FileResultStore {
    dir: PathBuf,
    channel: String,
}

impl FileResultStore {
    /// Store for the default channel under `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            channel: DEFAULT_CHANNEL.to_string(),
        }
    }

    /// Use another channel.
    ///
    /// Channel names become file names, so only ASCII letters, digits, `-`
    /// and `_` are accepted.
    pub fn with_channel(mut self, channel: impl Into<String>) -> StoreResult<Self> {
        let channel = channel.into();
        let valid = !channel.is_empty()
            && channel
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(StoreError::invalid_channel(channel));
        }
        self.channel = channel;
        Ok(self)
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Path of the channel file.
    pub fn path(&self) -> PathBuf {
        self.dir.join(format!("{}.json", self.channel))
    }

    fn temp_path(&self) -> PathBuf {
        self.dir.join(format!(".{}.json.tmp", self.channel))
    }
}

async fn write_atomic(target: &Path, temp: &Path, bytes: &[u8]) -> StoreResult<()> {
    tokio::fs::write(temp, bytes).await?;
    tokio::fs::rename(temp, target).await.map_err(|e| {
        StoreError::write_failed(format!("rename to {}: {}", target.display(), e))
    })
}

#[async_trait]
impl ResultStore for FileResultStore {
    async fn publish(&self, result: &ShortResult) -> StoreResult<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let bytes = serde_json::to_vec_pretty(result)?;
        let path = self.path();
        write_atomic(&path, &self.temp_path(), &bytes).await?;
        debug!(path = %path.display(), status = %result.status, "Published short result");
        Ok(())
    }

    async fn latest(&self) -> StoreResult<Option<ShortResult>> {
        match tokio::fs::read(self.path()).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vshort_models::{JobId, ShortStatus};

    #[tokio::test]
    async fn test_publish_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileResultStore::new(dir.path().join("results"));
        assert!(store.latest().await.unwrap().is_none());

        let mut result = ShortResult::processing("dQw4w9WgXcQ", "extracting segment");
        result.complete("https://cdn.example/a.mp4", Some(JobId::from("job-1")));
        store.publish(&result).await.unwrap();

        let latest = store.latest().await.unwrap().unwrap();
        assert_eq!(latest.status, ShortStatus::Completed);
        assert_eq!(latest.short_url.as_deref(), Some("https://cdn.example/a.mp4"));
        assert_eq!(latest.timestamp, result.timestamp);
        assert!(!store.temp_path().exists());
    }

    #[tokio::test]
    async fn test_new_publish_supersedes_previous() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileResultStore::new(dir.path()).with_channel("tab-42").unwrap();

        let first = ShortResult::processing("dQw4w9WgXcQ", "first");
        let mut second = ShortResult::processing("aaaaaaaaaaa", "second");
        second.fail("nope");
        store.publish(&first).await.unwrap();
        store.publish(&second).await.unwrap();

        let latest = store.latest().await.unwrap().unwrap();
        assert_eq!(latest.video_id.as_deref(), Some("aaaaaaaaaaa"));
        assert!(store.path().ends_with("tab-42.json"));
    }

    #[test]
    fn test_rejects_path_like_channel() {
        assert!(FileResultStore::new("/tmp").with_channel("../etc").is_err());
        assert!(FileResultStore::new("/tmp").with_channel("").is_err());
    }
}
