use std::{sync::Arc, time::Duration};

use eyre::{Result, WrapErr};

use crate::{
    adapters::{FileKvStore, HttpKvStore, MemoryKvStore},
    config::models::StoreConfig,
    ports::kv_store::KvStore,
};

/// Build the key-value store selected by the `[store]` config section.
///
/// File stores with `watch = true` spawn their reload task, so this must run
/// inside a tokio runtime.
pub fn build_store(config: &StoreConfig) -> Result<Arc<dyn KvStore>> {
    let store: Arc<dyn KvStore> = match config {
        StoreConfig::Memory { records } => {
            tracing::info!("Using in-memory store with {} records", records.len());
            Arc::new(MemoryKvStore::from_inline(records))
        }
        StoreConfig::File { path, watch } => {
            tracing::info!("Using file store at {} (watch: {})", path, watch);
            if *watch {
                Arc::new(FileKvStore::open_watched(path)?)
            } else {
                Arc::new(FileKvStore::open(path)?)
            }
        }
        StoreConfig::Http {
            base_url,
            api_token,
            api_token_env,
            timeout,
            page_size,
        } => {
            let timeout: Duration = humantime::parse_duration(timeout)
                .wrap_err_with(|| format!("Invalid store timeout '{timeout}'"))?;
            let token = resolve_token(api_token.as_deref(), api_token_env.as_deref())?;
            tracing::info!(
                "Using HTTP store at {} (timeout: {:?}, authenticated: {})",
                base_url,
                timeout,
                token.is_some()
            );
            Arc::new(HttpKvStore::new(base_url, token, timeout, *page_size)?)
        }
    };
    Ok(store)
}

fn resolve_token(inline: Option<&str>, env_var: Option<&str>) -> Result<Option<String>> {
    if let Some(token) = inline {
        return Ok(Some(token.to_string()));
    }
    match env_var {
        Some(name) => std::env::var(name)
            .map(Some)
            .wrap_err_with(|| format!("Environment variable {name} is not set")),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::models::{InlineRecord, InlineValue};

    #[tokio::test]
    async fn test_build_memory_store() {
        let store = build_store(&StoreConfig::Memory {
            records: vec![InlineRecord {
                key: "example.com/foo".to_string(),
                value: InlineValue::Source("github.com/acme/foo".to_string()),
            }],
        })
        .unwrap();

        assert!(store.get("example.com/foo").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_build_file_store_missing_file_fails() {
        let result = build_store(&StoreConfig::File {
            path: "/nonexistent/records.json".to_string(),
            watch: false,
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_resolve_token() {
        assert_eq!(
            resolve_token(Some("inline"), Some("IGNORED")).unwrap(),
            Some("inline".to_string())
        );
        assert_eq!(resolve_token(None, None).unwrap(), None);
        assert!(resolve_token(None, Some("VANITY_TEST_TOKEN_THAT_IS_NOT_SET")).is_err());
    }

    #[test]
    fn test_build_http_store_rejects_bad_timeout() {
        let result = build_store(&StoreConfig::Http {
            base_url: "https://kv.example.com/ns".to_string(),
            api_token: None,
            api_token_env: None,
            timeout: "later".to_string(),
            page_size: 10,
        });
        assert!(result.is_err());
    }
}
