use async_trait::async_trait;
use bytes::Bytes;
use hyper::StatusCode;
use thiserror::Error;

/// Error type for key-value store operations.
///
/// A key that simply does not exist is *not* an error; `get` reports it as
/// `Ok(None)`. These variants cover the store being unreachable or misbehaving.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum KvStoreError {
    /// The store could not be reached
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// The store answered with an unexpected status
    #[error("Store returned error status: {status}, key: {key}")]
    Backend {
        /// The key (or listing cursor) that was requested
        key: String,
        /// The status code returned by the store
        status: StatusCode,
    },

    /// A listing response could not be decoded
    #[error("Malformed store response: {0}")]
    MalformedResponse(String),
}

/// Result type alias for store operations
pub type KvResult<T> = Result<T, KvStoreError>;

/// One page of a key listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyPage {
    /// Keys on this page, in store order
    pub keys: Vec<String>,
    /// Cursor to pass to the next `list` call, if any
    pub cursor: Option<String>,
    /// True when no further pages exist
    pub list_complete: bool,
}

/// KvStore defines the port (interface) for the package metadata store.
///
/// Values are returned as raw bytes; deciding between the structured and the
/// legacy plain-text encoding is the resolver's job, not the store's.
#[async_trait]
pub trait KvStore: Send + Sync + 'static {
    /// Fetch the raw value stored under `key`.
    ///
    /// # Returns
    /// `Ok(Some(bytes))` on a hit, `Ok(None)` when the key is absent, and an
    /// error when the store itself failed.
    async fn get(&self, key: &str) -> KvResult<Option<Bytes>>;

    /// List one page of keys starting after `cursor` (`None` for the first page).
    async fn list(&self, cursor: Option<&str>) -> KvResult<KeyPage>;
}
