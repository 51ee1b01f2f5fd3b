//! Request handling for vanity import lookups.
//!
//! [`handle_request`] is the whole serving path as a plain async function: it
//! takes a request descriptor, a store and a renderer and returns a response
//! value, so it can be exercised without an HTTP server. [`VanityService`]
//! bundles the store and renderer built from configuration.
use std::sync::Arc;

use hyper::StatusCode;

use crate::{
    config::ServerConfig,
    core::{renderer::Renderer, resolver},
    ports::kv_store::KvStore,
};

pub const NOT_FOUND_BODY: &str = "404 NOT FOUND";
pub const INTERNAL_ERROR_BODY: &str = "500 INTERNAL SERVER ERROR";

pub const CONTENT_TYPE_HTML: &str = "text/html";
pub const CONTENT_TYPE_TEXT: &str = "text/plain";

/// The parts of an incoming request that take part in resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VanityRequest {
    /// Lowercased host name without port
    pub hostname: String,
    /// URL path, starting with '/'
    pub path: String,
}

impl VanityRequest {
    pub fn new(hostname: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            path: path.into(),
        }
    }
}

/// Transport-independent response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VanityResponse {
    pub status: StatusCode,
    pub content_type: &'static str,
    pub body: String,
}

impl VanityResponse {
    pub fn html(body: String) -> Self {
        Self {
            status: StatusCode::OK,
            content_type: CONTENT_TYPE_HTML,
            body,
        }
    }

    pub fn not_found() -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            content_type: CONTENT_TYPE_TEXT,
            body: NOT_FOUND_BODY.to_string(),
        }
    }

    pub fn internal_error() -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            content_type: CONTENT_TYPE_TEXT,
            body: INTERNAL_ERROR_BODY.to_string(),
        }
    }
}

/// Resolve one request and render the outcome.
///
/// Every way of not finding a package collapses into the same 404. A store
/// failure is logged and answered with a 500 carrying no detail.
pub async fn handle_request(
    request: &VanityRequest,
    store: &dyn KvStore,
    renderer: &Renderer,
) -> VanityResponse {
    match resolver::resolve(store, &request.hostname, &request.path).await {
        Ok(Some(resolution)) => {
            VanityResponse::html(renderer.render(&resolution.key, &resolution.metadata))
        }
        Ok(None) => VanityResponse::not_found(),
        Err(e) => {
            tracing::error!(
                host = %request.hostname,
                path = %request.path,
                "Store lookup failed: {}",
                e
            );
            VanityResponse::internal_error()
        }
    }
}

/// Store and renderer for the current configuration.
///
/// Cheap to share; a configuration reload builds a new instance instead of
/// mutating this one.
pub struct VanityService {
    store: Arc<dyn KvStore>,
    renderer: Renderer,
}

impl VanityService {
    pub fn new(store: Arc<dyn KvStore>, renderer: Renderer) -> Self {
        Self { store, renderer }
    }

    /// Build the service for `config` around an already constructed store.
    pub fn from_config(config: &ServerConfig, store: Arc<dyn KvStore>) -> Self {
        Self::new(store, Renderer::new(&config.render))
    }

    pub fn store(&self) -> &Arc<dyn KvStore> {
        &self.store
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    pub async fn handle(&self, request: &VanityRequest) -> VanityResponse {
        handle_request(request, self.store.as_ref(), &self.renderer).await
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use bytes::Bytes;

    use super::*;
    use crate::{
        adapters::MemoryKvStore,
        config::RenderConfig,
        ports::kv_store::{KeyPage, KvResult, KvStoreError},
    };

    struct UnavailableStore;

    #[async_trait]
    impl KvStore for UnavailableStore {
        async fn get(&self, _key: &str) -> KvResult<Option<Bytes>> {
            Err(KvStoreError::Unavailable("connection refused".to_string()))
        }

        async fn list(&self, _cursor: Option<&str>) -> KvResult<KeyPage> {
            Err(KvStoreError::Unavailable("connection refused".to_string()))
        }
    }

    fn renderer() -> Renderer {
        Renderer::new(&RenderConfig::default())
    }

    #[tokio::test]
    async fn test_hit_renders_html() {
        let store = MemoryKvStore::from_records([("example.com/foo", "github.com/acme/foo")]);
        let response =
            handle_request(&VanityRequest::new("example.com", "/foo"), &store, &renderer()).await;

        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.content_type, "text/html");
        assert!(
            response
                .body
                .contains(r#"content="example.com/foo git https://github.com/acme/foo""#)
        );
        assert!(response.body.contains("https://pkg.go.dev/example.com/foo"));
    }

    #[tokio::test]
    async fn test_miss_is_flat_404() {
        let store = MemoryKvStore::new();
        for path in ["/nothere", "/", "/a/b"] {
            let response =
                handle_request(&VanityRequest::new("example.com", path), &store, &renderer())
                    .await;
            assert_eq!(response, VanityResponse::not_found());
            assert_eq!(response.body, "404 NOT FOUND");
            assert_eq!(response.content_type, "text/plain");
        }
    }

    #[tokio::test]
    async fn test_store_failure_is_500_without_detail() {
        let response = handle_request(
            &VanityRequest::new("example.com", "/foo"),
            &UnavailableStore,
            &renderer(),
        )
        .await;

        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!response.body.contains("connection refused"));
    }

    #[tokio::test]
    async fn test_service_delegates_to_handler() {
        let store: Arc<dyn KvStore> = Arc::new(MemoryKvStore::from_records([(
            "example.com/user/pkg",
            r#"{"source":"github.com/user/pkg","vcs":"hg","defaultBranch":"master"}"#,
        )]));
        let service = VanityService::new(store, renderer());

        let response = service
            .handle(&VanityRequest::new("example.com", "/user/pkg"))
            .await;
        assert_eq!(response.status, StatusCode::OK);
        assert!(response.body.contains("example.com/user/pkg hg https://github.com/user/pkg"));
        assert!(response.body.contains("/tree/master{/dir}"));
    }
}
