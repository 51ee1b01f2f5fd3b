pub mod config_providers;
pub mod file_store;
pub mod http_handler;
pub mod http_store;
pub mod memory_store;
pub mod middleware;
pub mod store_factory;

/// Re-export commonly used types from adapters
pub use config_providers::FileConfigProvider;
pub use file_store::FileKvStore;
pub use http_handler::{VanityHttpHandler, router};
pub use http_store::HttpKvStore;
pub use memory_store::MemoryKvStore;
pub use middleware::*;
pub use store_factory::build_store;
