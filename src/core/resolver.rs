//! Request-to-key resolution.
//!
//! Resolution uses two-tier segment fallback: the key `host/first` is tried
//! first and `host/first/second` only when that misses. The shorter key always
//! wins, which lets a package live at a subpath of what looks like a user or
//! organisation key. No two-segment package can sit under a one-segment key
//! that also exists.
use crate::{
    core::metadata::{Resolution, StoredValue},
    ports::kv_store::{KvResult, KvStore},
};

/// Candidate keys for `hostname` + `path`, in lookup order.
///
/// Empty when the path has no usable first segment. The second candidate is
/// only present when the path has a non-empty second segment.
pub fn candidate_keys(hostname: &str, path: &str) -> Vec<String> {
    // `path` starts with '/', so element 0 is the empty string before it
    let mut segments = path.split('/').skip(1);

    let first = match segments.next() {
        Some(first) if !first.is_empty() => first,
        _ => return Vec::new(),
    };

    let mut keys = vec![format!("{hostname}/{first}")];
    if let Some(second) = segments.next().filter(|s| !s.is_empty()) {
        keys.push(format!("{hostname}/{first}/{second}"));
    }
    keys
}

/// Resolve `hostname` + `path` against the store.
///
/// Returns `Ok(None)` when no candidate key holds a usable value and `Err`
/// only when the store itself fails. Lookups stop at the first hit.
pub async fn resolve(
    store: &dyn KvStore,
    hostname: &str,
    path: &str,
) -> KvResult<Option<Resolution>> {
    for key in candidate_keys(hostname, path) {
        let raw = store.get(&key).await.inspect_err(|_| {
            crate::metrics::increment_store_lookup("error");
        })?;

        match StoredValue::decode(raw.as_deref()).into_metadata() {
            Some(metadata) => {
                crate::metrics::increment_store_lookup("hit");
                tracing::debug!(key = %key, ?metadata, "Resolved package");
                return Ok(Some(Resolution { key, metadata }));
            }
            None => {
                crate::metrics::increment_store_lookup("miss");
                tracing::debug!(key = %key, "No package under key");
            }
        }
    }

    Ok(None)
}
