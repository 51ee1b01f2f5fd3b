//! Configuration data structures for the vanity server.
//!
//! These types map directly to TOML (also JSON / YAML) configuration files and
//! carry defaults so that a minimal config only needs a store.
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::core::metadata::StoredRecord;

fn default_listen_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_documentation_base_url() -> String {
    "https://pkg.go.dev".to_string()
}

fn default_refresh_delay_secs() -> u64 {
    3
}

fn default_true() -> bool {
    true
}

fn default_http_timeout() -> String {
    "10s".to_string()
}

fn default_page_size() -> u32 {
    1000
}

/// Top-level server configuration.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerConfig {
    /// Socket address to listen on, e.g. `0.0.0.0:8080`
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub render: RenderConfig,

    #[serde(default)]
    pub store: StoreConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            logging: LoggingConfig::default(),
            render: RenderConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

/// Log output settings. `RUST_LOG` takes precedence over `level`.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info` or `vanity=debug`
    pub level: String,
    /// JSON lines when true, pretty console output otherwise
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: true,
        }
    }
}

/// HTML rendering settings.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RenderConfig {
    /// Documentation site the page redirects to; the key is appended as a path
    #[serde(default = "default_documentation_base_url")]
    pub documentation_base_url: String,
    /// Meta refresh delay in seconds, 0 redirects immediately
    #[serde(default = "default_refresh_delay_secs")]
    pub refresh_delay_secs: u64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            documentation_base_url: default_documentation_base_url(),
            refresh_delay_secs: default_refresh_delay_secs(),
        }
    }
}

/// Which key-value store backs the lookups.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StoreConfig {
    /// Records declared inline in this configuration
    Memory {
        #[serde(default)]
        records: Vec<InlineRecord>,
    },
    /// A JSON object file mapping keys to values
    File {
        path: String,
        /// Reload the file when it changes on disk
        #[serde(default = "default_true")]
        watch: bool,
    },
    /// A Workers-KV style REST namespace
    Http {
        /// Namespace base URL; `/values/{key}` and `/keys` are appended
        base_url: String,
        /// Bearer token, if not taken from the environment
        #[serde(default)]
        api_token: Option<String>,
        /// Environment variable holding the bearer token
        #[serde(default)]
        api_token_env: Option<String>,
        /// Request timeout in humantime format, e.g. `10s`
        #[serde(default = "default_http_timeout")]
        timeout: String,
        /// Keys requested per listing page
        #[serde(default = "default_page_size")]
        page_size: u32,
    },
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::Memory {
            records: Vec::new(),
        }
    }
}

impl StoreConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            StoreConfig::Memory { .. } => "memory",
            StoreConfig::File { .. } => "file",
            StoreConfig::Http { .. } => "http",
        }
    }
}

/// One record of the `memory` store.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct InlineRecord {
    /// Lookup key, `host/segment` or `host/segment/segment`
    pub key: String,
    pub value: InlineValue,
}

/// Either encoding a store value can take.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum InlineValue {
    /// Legacy bare source string
    Source(String),
    /// Structured record
    Record(StoredRecord),
}

impl InlineValue {
    /// Raw bytes as they would sit in a key-value store.
    pub fn to_bytes(&self) -> Bytes {
        match self {
            InlineValue::Source(source) => Bytes::from(source.clone()),
            InlineValue::Record(record) => {
                // A struct of optional strings always serializes
                Bytes::from(serde_json::to_vec(record).unwrap_or_default())
            }
        }
    }

    /// Source the value points at, if any.
    pub fn source(&self) -> Option<&str> {
        match self {
            InlineValue::Source(source) => Some(source),
            InlineValue::Record(record) => record.source.as_deref(),
        }
    }

    pub fn vcs(&self) -> Option<&str> {
        match self {
            InlineValue::Source(_) => None,
            InlineValue::Record(record) => record.vcs.as_deref(),
        }
    }
}
