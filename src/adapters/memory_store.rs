use std::{
    collections::BTreeMap,
    ops::Bound,
    sync::{Arc, RwLock},
};

use async_trait::async_trait;
use bytes::Bytes;

use crate::{
    config::models::InlineRecord,
    ports::kv_store::{KeyPage, KvResult, KvStore, KvStoreError},
};

pub(crate) const DEFAULT_PAGE_SIZE: usize = 1000;

/// In-memory implementation of `KvStore`.
///
/// Backs the `memory` store kind (records inlined in the configuration) and
/// the tests. Keys are kept sorted so listings page deterministically; the
/// cursor is the last key of the previous page.
#[derive(Debug, Clone)]
pub struct MemoryKvStore {
    entries: Arc<RwLock<BTreeMap<String, Bytes>>>,
    page_size: usize,
}

impl MemoryKvStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(BTreeMap::new())),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Create a store holding the given raw values.
    pub fn from_records<I, K, V>(records: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Bytes>,
    {
        let entries = records
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            entries: Arc::new(RwLock::new(entries)),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Create a store from records declared in the configuration file.
    pub fn from_inline(records: &[InlineRecord]) -> Self {
        Self::from_records(
            records
                .iter()
                .map(|record| (record.key.clone(), record.value.to_bytes())),
        )
    }

    /// Limit the number of keys returned per `list` page.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Insert or replace a raw value.
    pub fn insert(&self, key: impl Into<String>, value: impl Into<Bytes>) -> KvResult<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| KvStoreError::Unavailable("memory store lock poisoned".to_string()))?;
        entries.insert(key.into(), value.into());
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryKvStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn get(&self, key: &str) -> KvResult<Option<Bytes>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| KvStoreError::Unavailable("memory store lock poisoned".to_string()))?;
        Ok(entries.get(key).cloned())
    }

    async fn list(&self, cursor: Option<&str>) -> KvResult<KeyPage> {
        let entries = self
            .entries
            .read()
            .map_err(|_| KvStoreError::Unavailable("memory store lock poisoned".to_string()))?;

        Ok(page_keys(&entries, cursor, self.page_size))
    }
}

/// One listing page over a sorted map; the cursor is the last key returned.
pub(crate) fn page_keys(
    entries: &BTreeMap<String, Bytes>,
    cursor: Option<&str>,
    page_size: usize,
) -> KeyPage {
    let lower = match cursor {
        Some(c) => Bound::Excluded(c),
        None => Bound::Unbounded,
    };

    // One extra key tells us whether another page follows
    let mut keys: Vec<String> = entries
        .range::<str, _>((lower, Bound::Unbounded))
        .take(page_size + 1)
        .map(|(k, _)| k.clone())
        .collect();

    let list_complete = keys.len() <= page_size;
    keys.truncate(page_size);
    let cursor = if list_complete {
        None
    } else {
        keys.last().cloned()
    };

    KeyPage {
        keys,
        cursor,
        list_complete,
    }
}
