use std::path::PathBuf;

use async_trait::async_trait;
use eyre::Result;
use tokio::sync::mpsc;

use crate::{
    config::{loader::load_config, models::ServerConfig},
    ports::config_provider::ConfigProvider,
    utils::watch_file,
};

/// Configuration provider that loads from a local file and watches for changes.
pub struct FileConfigProvider {
    path: PathBuf,
    // Dropping the watcher stops notifications
    _watcher: notify::RecommendedWatcher,
    // Taken once by `watch()`
    update_rx: std::sync::Mutex<Option<mpsc::Receiver<()>>>,
}

impl FileConfigProvider {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let (tx, rx) = mpsc::channel(1);
        let watcher = watch_file(&path, tx)?;

        Ok(Self {
            path,
            _watcher: watcher,
            update_rx: std::sync::Mutex::new(Some(rx)),
        })
    }
}

#[async_trait]
impl ConfigProvider for FileConfigProvider {
    async fn load_config(&self) -> Result<ServerConfig> {
        let path_str = self
            .path
            .to_str()
            .ok_or_else(|| eyre::eyre!("Invalid path: {}", self.path.display()))?;
        load_config(path_str).await
    }

    fn watch(&self) -> mpsc::Receiver<()> {
        let taken = self
            .update_rx
            .lock()
            .ok()
            .and_then(|mut guard| guard.take());

        taken.unwrap_or_else(|| {
            tracing::warn!("Config watch channel already taken; returning a closed channel");
            let (_tx, rx) = mpsc::channel(1);
            rx
        })
    }
}
