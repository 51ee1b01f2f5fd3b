//! Vanity - a Go vanity import path server.
//!
//! `go get example.com/foo` first fetches `https://example.com/foo?go-get=1`
//! and looks for `go-import` / `go-source` meta tags telling it where the code
//! really lives. This crate answers those requests from a key-value store that
//! maps `host/path` keys to repository locations.
//!
//! # Features
//! - Two-tier lookup: `host/seg1` first, then `host/seg1/seg2`
//! - Structured records (`source`, `vcs`, `defaultBranch`) and legacy raw values
//! - Pluggable stores: inline config records, a watched JSON file, or an HTTP
//!   key-value API in the Workers KV layout
//! - Live configuration hot-reload & validation
//! - Metrics via the `metrics` facade & structured tracing via `tracing`
//! - Graceful shutdown
//!
//! # Quick Example
//! ```no_run
//! use std::sync::Arc;
//!
//! use vanity::{MemoryKvStore, VanityRequest, VanityService, config::ServerConfig};
//!
//! # #[tokio::main] async fn main() -> eyre::Result<()> {
//! let store = MemoryKvStore::from_records([("example.com/foo", "github.com/acme/foo")]);
//! let service = VanityService::from_config(&ServerConfig::default(), Arc::new(store));
//!
//! let response = service.handle(&VanityRequest::new("example.com", "/foo/bar")).await;
//! assert_eq!(response.status, 200);
//! # Ok(()) }
//! ```
//!
//! # Architecture
//! The crate separates **ports** (traits) from **adapters** (implementations) while keeping
//! the lookup and rendering logic inside `core`. `core::handle_request` is the whole serving
//! path without any HTTP types, so it can be driven directly from tests.
//!
//! # Error Handling
//! Store adapters return the domain error `KvStoreError`; application plumbing returns
//! `eyre::Result<T>` with context attached through `WrapErr`.
// Re-export public modules with explicit visibility controls
pub mod config;
pub mod metrics;
pub mod ports;
pub mod tracing_setup;
pub mod utils;

// These modules are implementation details and should not be directly used by users
pub mod adapters;
pub mod core;

// Re-export the specific types needed by the binary crate
pub use crate::{
    adapters::{
        FileConfigProvider, FileKvStore, HttpKvStore, MemoryKvStore, VanityHttpHandler,
        build_store, router,
    },
    core::{Renderer, VanityRequest, VanityResponse, VanityService, handle_request},
    ports::kv_store::{KeyPage, KvStore, KvStoreError},
    utils::GracefulShutdown,
};
