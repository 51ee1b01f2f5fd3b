pub mod config_provider;
pub mod http_server;
pub mod kv_store;

pub use config_provider::ConfigProvider;
pub use http_server::{HandlerError, HttpHandler};
pub use kv_store::{KeyPage, KvResult, KvStore, KvStoreError};
