pub mod file_watch;
pub mod graceful_shutdown;

pub use file_watch::watch_file;
pub use graceful_shutdown::{GracefulShutdown, ShutdownReason};
