//! Administrative key enumeration. Not used on the serving path.
use crate::ports::kv_store::{KvResult, KvStore};

/// Collect every key in the store by following `list` cursors until the
/// store reports the listing complete.
pub async fn fetch_all_keys(store: &dyn KvStore) -> KvResult<Vec<String>> {
    let mut page = store.list(None).await?;
    let mut keys = std::mem::take(&mut page.keys);

    while !page.list_complete {
        let Some(cursor) = page.cursor.take() else {
            tracing::warn!("Store reported an incomplete listing without a cursor");
            break;
        };
        page = store.list(Some(&cursor)).await?;
        keys.append(&mut page.keys);
    }

    tracing::debug!("Fetched {} keys from store", keys.len());
    Ok(keys)
}
