// Integration tests for the HTTP key-value store against a local mock API
#[cfg(test)]
mod tests {
    use std::{collections::BTreeMap, sync::Arc, time::Duration};

    use arc_swap::ArcSwap;
    use axum::{
        Json, Router,
        body::Body,
        extract::{Path, Query, State},
        http::{HeaderMap, Request, StatusCode, header},
        response::{IntoResponse, Response},
        routing::get,
    };
    use serde::Deserialize;
    use serde_json::json;
    use tower::ServiceExt; // for oneshot
    use vanity::{
        HttpKvStore, KvStore, KvStoreError, VanityHttpHandler, VanityService,
        config::ServerConfig, core::listing::fetch_all_keys, router,
    };

    const TOKEN: &str = "test-token";

    type Records = Arc<BTreeMap<String, String>>;

    #[derive(Deserialize)]
    struct ListQuery {
        limit: usize,
        cursor: Option<String>,
    }

    fn authorized(headers: &HeaderMap) -> bool {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == format!("Bearer {TOKEN}"))
    }

    async fn get_value(
        State(records): State<Records>,
        headers: HeaderMap,
        Path(key): Path<String>,
    ) -> Response {
        if !authorized(&headers) {
            return StatusCode::UNAUTHORIZED.into_response();
        }
        if key == "example.com/broken" {
            return StatusCode::SERVICE_UNAVAILABLE.into_response();
        }
        match records.get(&key) {
            Some(value) => value.clone().into_response(),
            None => StatusCode::NOT_FOUND.into_response(),
        }
    }

    // Cursor is the index of the next key to return
    async fn list_keys(
        State(records): State<Records>,
        headers: HeaderMap,
        Query(query): Query<ListQuery>,
    ) -> Response {
        if !authorized(&headers) {
            return StatusCode::UNAUTHORIZED.into_response();
        }
        let start: usize = query
            .cursor
            .as_deref()
            .and_then(|c| c.parse().ok())
            .unwrap_or(0);
        let end = (start + query.limit).min(records.len());
        let names: Vec<_> = records
            .keys()
            .skip(start)
            .take(end - start)
            .map(|name| json!({ "name": name }))
            .collect();
        let cursor = if end < records.len() {
            end.to_string()
        } else {
            String::new()
        };

        Json(json!({
            "success": true,
            "result": names,
            "result_info": { "count": names.len(), "cursor": cursor }
        }))
        .into_response()
    }

    async fn spawn_mock_kv(records: BTreeMap<String, String>) -> String {
        let app = Router::new()
            .route("/values/{key}", get(get_value))
            .route("/keys", get(list_keys))
            .with_state(Arc::new(records));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn records() -> BTreeMap<String, String> {
        let mut records = BTreeMap::new();
        records.insert(
            "example.com/foo".to_string(),
            r#"{"source":"github.com/acme/foo"}"#.to_string(),
        );
        records.insert(
            "example.com/user/pkg".to_string(),
            "github.com/user/pkg".to_string(),
        );
        for i in 0..5 {
            records.insert(
                format!("example.com/extra{i}"),
                format!("github.com/acme/extra{i}"),
            );
        }
        records
    }

    fn store(base_url: &str, token: Option<&str>) -> HttpKvStore {
        HttpKvStore::new(
            base_url,
            token.map(str::to_string),
            Duration::from_secs(5),
            3,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_get_present_and_absent() {
        let base_url = spawn_mock_kv(records()).await;
        let store = store(&base_url, Some(TOKEN));

        let value = store.get("example.com/user/pkg").await.unwrap().unwrap();
        assert_eq!(value.as_ref(), b"github.com/user/pkg");

        assert!(store.get("example.com/missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_backend_error_status() {
        let base_url = spawn_mock_kv(records()).await;

        let err = store(&base_url, Some(TOKEN))
            .get("example.com/broken")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            KvStoreError::Backend { status, .. } if status == StatusCode::SERVICE_UNAVAILABLE
        ));

        let err = store(&base_url, None).get("example.com/foo").await.unwrap_err();
        assert!(matches!(
            err,
            KvStoreError::Backend { status, .. } if status == StatusCode::UNAUTHORIZED
        ));
    }

    #[tokio::test]
    async fn test_unreachable_store() {
        // Nothing listens on the discard port
        let err = store("http://127.0.0.1:9", Some(TOKEN))
            .get("example.com/foo")
            .await
            .unwrap_err();
        assert!(matches!(err, KvStoreError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_fetch_all_keys_paginates() {
        let base_url = spawn_mock_kv(records()).await;
        let store = store(&base_url, Some(TOKEN));

        let first = store.list(None).await.unwrap();
        assert_eq!(first.keys.len(), 3);
        assert!(!first.list_complete);

        let keys = fetch_all_keys(&store).await.unwrap();
        let expected: Vec<String> = records().into_keys().collect();
        assert_eq!(keys, expected);
    }

    #[tokio::test]
    async fn test_router_over_http_store() {
        let base_url = spawn_mock_kv(records()).await;
        let service =
            VanityService::from_config(&ServerConfig::default(), Arc::new(store(&base_url, Some(TOKEN))));
        let app = router(VanityHttpHandler::new(Arc::new(ArcSwap::from_pointee(service))));

        let request = |uri: &str| {
            Request::builder()
                .uri(uri)
                .header(header::HOST, "example.com")
                .body(Body::empty())
                .unwrap()
        };

        let ok = app.clone().oneshot(request("/user/pkg")).await.unwrap();
        assert_eq!(ok.status(), StatusCode::OK);

        let missing = app.clone().oneshot(request("/nothere")).await.unwrap();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let broken = app.oneshot(request("/broken")).await.unwrap();
        assert_eq!(broken.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
