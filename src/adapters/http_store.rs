use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use eyre::{Result, WrapErr};
use hyper::StatusCode;
use reqwest::Client;
use serde::Deserialize;

use crate::ports::kv_store::{KeyPage, KvResult, KvStore, KvStoreError};

/// `KvStore` speaking the Workers KV REST layout.
///
/// * `GET {base}/values/{key}` returns the raw value, 404 when absent
/// * `GET {base}/keys?limit=N&cursor=C` returns a page of key names
///
/// Keys are percent-encoded into a single path segment. No retries are
/// attempted; a failed request surfaces as a [`KvStoreError`].
pub struct HttpKvStore {
    base_url: String,
    client: Client,
    api_token: Option<String>,
    page_size: u32,
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    result: Vec<ListedKey>,
    #[serde(default)]
    result_info: Option<ListResultInfo>,
}

#[derive(Debug, Deserialize)]
struct ListedKey {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ListResultInfo {
    #[serde(default)]
    cursor: Option<String>,
}

impl HttpKvStore {
    pub fn new(
        base_url: &str,
        api_token: Option<String>,
        timeout: Duration,
        page_size: u32,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("vanity/", env!("CARGO_PKG_VERSION")))
            .build()
            .wrap_err("Failed to build HTTP client for key-value store")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            api_token,
            page_size,
        })
    }

    fn value_url(&self, key: &str) -> String {
        format!("{}/values/{}", self.base_url, urlencoding::encode(key))
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait]
impl KvStore for HttpKvStore {
    async fn get(&self, key: &str) -> KvResult<Option<Bytes>> {
        let response = self
            .authorized(self.client.get(self.value_url(key)))
            .send()
            .await
            .map_err(|e| KvStoreError::Unavailable(e.to_string()))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let body = response
                    .bytes()
                    .await
                    .map_err(|e| KvStoreError::Unavailable(e.to_string()))?;
                Ok(Some(body))
            }
            status => Err(KvStoreError::Backend {
                key: key.to_string(),
                status,
            }),
        }
    }

    async fn list(&self, cursor: Option<&str>) -> KvResult<KeyPage> {
        let mut query = vec![("limit", self.page_size.to_string())];
        if let Some(cursor) = cursor {
            query.push(("cursor", cursor.to_string()));
        }

        let response = self
            .authorized(self.client.get(format!("{}/keys", self.base_url)))
            .query(&query)
            .send()
            .await
            .map_err(|e| KvStoreError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(KvStoreError::Backend {
                key: format!("keys (cursor: {})", cursor.unwrap_or("-")),
                status,
            });
        }

        let listing: ListResponse = response
            .json()
            .await
            .map_err(|e| KvStoreError::MalformedResponse(e.to_string()))?;

        let next_cursor = listing
            .result_info
            .and_then(|info| info.cursor)
            .filter(|c| !c.is_empty());

        Ok(KeyPage {
            keys: listing.result.into_iter().map(|k| k.name).collect(),
            list_complete: next_cursor.is_none(),
            cursor: next_cursor,
        })
    }
}
