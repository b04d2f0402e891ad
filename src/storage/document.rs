use crate::error::AppResult;
use crate::storage::writer::write_pretty;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// Outcome of a read-modify-write closure passed to [`JsonDocument::update`].
#[derive(Debug)]
pub enum Update<R> {
    /// The document changed and must be written back.
    Write(R),
    /// The document is unchanged; skip the write.
    Skip(R),
}

/// A store persisted as one pretty-printed JSON file.
///
/// Every update loads the whole document, mutates it in memory and replaces the file.
/// Updates are serialized through a per-document mutex, so concurrent requests in this
/// process never lose each other's writes.
pub struct JsonDocument<T> {
    path: PathBuf,
    lock: Mutex<()>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonDocument<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
            _marker: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the document without creating it. Missing or unparseable files yield `None`.
    pub async fn read(&self) -> Option<T> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to read document");
                return None;
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(doc) => Some(doc),
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "document is not valid JSON, treating as empty"
                );
                None
            }
        }
    }

    /// Read the document, replacing a missing or unparseable file with an empty one.
    pub async fn load_or_init(&self) -> AppResult<T> {
        let _guard = self.lock.lock().await;
        self.load_or_init_locked().await
    }

    /// Run a read-modify-write cycle under the document lock.
    pub async fn update<R, F>(&self, mutate: F) -> AppResult<R>
    where
        F: FnOnce(&mut T) -> Update<R>,
    {
        let _guard = self.lock.lock().await;
        let mut doc = self.load_or_init_locked().await?;

        match mutate(&mut doc) {
            Update::Write(result) => {
                write_pretty(&self.path, &doc).await?;
                Ok(result)
            }
            Update::Skip(result) => Ok(result),
        }
    }

    async fn load_or_init_locked(&self) -> AppResult<T> {
        if let Some(doc) = self.read().await {
            return Ok(doc);
        }
        let doc = T::default();
        write_pretty(&self.path, &doc).await?;
        tracing::info!(path = %self.path.display(), "initialized empty document");
        Ok(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
    struct Counter {
        hits: u64,
    }

    #[tokio::test]
    async fn test_read_missing_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let doc: JsonDocument<Counter> = JsonDocument::new(dir.path().join("counter.json"));
        assert!(doc.read().await.is_none());
        assert!(!doc.path().exists(), "read must not create the file");
    }

    #[tokio::test]
    async fn test_load_or_init_creates_empty_document() {
        let dir = tempfile::tempdir().unwrap();
        let doc: JsonDocument<Counter> = JsonDocument::new(dir.path().join("counter.json"));
        assert_eq!(doc.load_or_init().await.unwrap(), Counter { hits: 0 });
        assert!(doc.path().exists());
    }

    #[tokio::test]
    async fn test_corrupt_document_replaced_with_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("counter.json");
        std::fs::write(&path, "{ not json").unwrap();

        let doc: JsonDocument<Counter> = JsonDocument::new(&path);
        assert!(doc.read().await.is_none());
        assert_eq!(doc.load_or_init().await.unwrap(), Counter::default());

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(serde_json::from_str::<Counter>(&text).is_ok());
    }

    #[tokio::test]
    async fn test_update_skip_does_not_write() {
        let dir = tempfile::tempdir().unwrap();
        let doc: JsonDocument<Counter> = JsonDocument::new(dir.path().join("counter.json"));

        doc.update(|c| {
            c.hits += 1;
            Update::Write(())
        })
        .await
        .unwrap();
        doc.update(|c| {
            c.hits += 100;
            Update::Skip(())
        })
        .await
        .unwrap();

        assert_eq!(doc.read().await.unwrap().hits, 1);
    }

    #[tokio::test]
    async fn test_concurrent_updates_are_not_lost() {
        let dir = tempfile::tempdir().unwrap();
        let doc: std::sync::Arc<JsonDocument<Counter>> =
            std::sync::Arc::new(JsonDocument::new(dir.path().join("counter.json")));

        let mut handles = Vec::new();
        for _ in 0..20 {
            let doc = doc.clone();
            handles.push(tokio::spawn(async move {
                doc.update(|c| {
                    c.hits += 1;
                    Update::Write(())
                })
                .await
                .unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        assert_eq!(doc.read().await.unwrap().hits, 20);
    }
}
