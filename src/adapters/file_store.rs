use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::Arc,
};

use arc_swap::ArcSwap;
use async_trait::async_trait;
use bytes::Bytes;
use eyre::{Result, WrapErr};
use tokio::sync::mpsc;

use crate::{
    adapters::memory_store::{DEFAULT_PAGE_SIZE, page_keys},
    ports::kv_store::{KeyPage, KvResult, KvStore},
    utils::watch_file,
};

type Entries = BTreeMap<String, Bytes>;

/// `KvStore` backed by a JSON file.
///
/// The file holds one object mapping keys to values. String values are kept
/// as raw text (the legacy encoding); any other JSON value is kept as its JSON
/// text, so objects decode as structured records:
///
/// ```json
/// {
///   "example.com/foo": "github.com/acme/foo",
///   "example.com/tools": { "source": "hg.example.org/tools", "vcs": "hg" }
/// }
/// ```
///
/// With watching enabled the file is re-read whenever it changes. A reload
/// that fails to parse keeps serving the previous contents.
pub struct FileKvStore {
    path: PathBuf,
    entries: Arc<ArcSwap<Entries>>,
    _watcher: Option<notify::RecommendedWatcher>,
}

impl FileKvStore {
    /// Load the file once, without watching for changes.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = load_entries(&path)?;
        tracing::info!(
            "Loaded {} records from {}",
            entries.len(),
            path.display()
        );

        Ok(Self {
            path,
            entries: Arc::new(ArcSwap::from_pointee(entries)),
            _watcher: None,
        })
    }

    /// Load the file and reload it on every change. Must be called from
    /// within a tokio runtime.
    pub fn open_watched(path: impl Into<PathBuf>) -> Result<Self> {
        let mut store = Self::open(path)?;

        let (tx, mut rx) = mpsc::channel(1);
        let watcher = watch_file(&store.path, tx)?;

        let entries = store.entries.clone();
        let path = store.path.clone();
        tokio::spawn(async move {
            // Ends once the store, and with it the watcher, is dropped
            while rx.recv().await.is_some() {
                match reload_entries(&path).await {
                    Ok(fresh) => {
                        tracing::info!(
                            "Reloaded {} records from {}",
                            fresh.len(),
                            path.display()
                        );
                        entries.store(Arc::new(fresh));
                    }
                    Err(e) => {
                        tracing::error!(
                            "Failed to reload records from {}: {:#}. Keeping previous records.",
                            path.display(),
                            e
                        );
                    }
                }
            }
            tracing::debug!("Record file watcher for {} stopped", path.display());
        });

        store._watcher = Some(watcher);
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.entries.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl KvStore for FileKvStore {
    async fn get(&self, key: &str) -> KvResult<Option<Bytes>> {
        Ok(self.entries.load().get(key).cloned())
    }

    async fn list(&self, cursor: Option<&str>) -> KvResult<KeyPage> {
        Ok(page_keys(&self.entries.load(), cursor, DEFAULT_PAGE_SIZE))
    }
}

fn load_entries(path: &Path) -> Result<Entries> {
    let raw = std::fs::read(path)
        .wrap_err_with(|| format!("Failed to read record file {}", path.display()))?;
    parse_entries(&raw).wrap_err_with(|| format!("Invalid record file {}", path.display()))
}

async fn reload_entries(path: &Path) -> Result<Entries> {
    let raw = tokio::fs::read(path)
        .await
        .wrap_err_with(|| format!("Failed to read record file {}", path.display()))?;
    parse_entries(&raw).wrap_err_with(|| format!("Invalid record file {}", path.display()))
}

fn parse_entries(raw: &[u8]) -> Result<Entries> {
    let document: serde_json::Map<String, serde_json::Value> =
        serde_json::from_slice(raw).wrap_err("Record file must be a JSON object")?;

    document
        .into_iter()
        .map(|(key, value)| -> Result<(String, Bytes)> {
            let bytes = match value {
                serde_json::Value::String(text) => Bytes::from(text),
                other => Bytes::from(serde_json::to_vec(&other)?),
            };
            Ok((key, bytes))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tempfile::tempdir;

    use super::*;
    use crate::core::metadata::StoredValue;

    const RECORDS: &str = r#"{
  "example.com/foo": "github.com/acme/foo",
  "example.com/tools": { "source": "hg.example.org/tools", "vcs": "hg", "defaultBranch": "default" }
}"#;

    #[tokio::test]
    async fn test_open_and_get() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("records.json");
        std::fs::write(&path, RECORDS)?;

        let store = FileKvStore::open(&path)?;
        assert_eq!(store.len(), 2);

        let foo = store.get("example.com/foo").await?.unwrap();
        assert_eq!(foo, Bytes::from_static(b"github.com/acme/foo"));

        let tools = store.get("example.com/tools").await?;
        let metadata = StoredValue::decode(tools.as_deref())
            .into_metadata()
            .unwrap();
        assert_eq!(metadata.vcs, "hg");
        assert_eq!(metadata.default_branch, "default");

        assert!(store.get("example.com/missing").await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_list_returns_sorted_keys() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("records.json");
        std::fs::write(&path, RECORDS)?;

        let page = FileKvStore::open(&path)?.list(None).await?;
        assert_eq!(page.keys, vec!["example.com/foo", "example.com/tools"]);
        assert!(page.list_complete);
        Ok(())
    }

    #[test]
    fn test_open_rejects_non_object() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("records.json");
        std::fs::write(&path, r#"["example.com/foo"]"#).unwrap();

        assert!(FileKvStore::open(&path).is_err());
        assert!(FileKvStore::open(dir.path().join("missing.json")).is_err());
    }

    #[tokio::test]
    async fn test_watched_store_reloads() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("records.json");
        std::fs::write(&path, RECORDS)?;

        let store = FileKvStore::open_watched(&path)?;
        assert!(store.get("example.com/new").await?.is_none());

        tokio::time::sleep(Duration::from_millis(100)).await;
        std::fs::write(&path, r#"{ "example.com/new": "github.com/acme/new" }"#)?;

        let mut reloaded = false;
        for _ in 0..40 {
            if store.get("example.com/new").await?.is_some() {
                reloaded = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        assert!(reloaded, "store did not pick up the rewritten file");
        assert!(store.get("example.com/foo").await?.is_none());
        Ok(())
    }
}
