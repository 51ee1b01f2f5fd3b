use std::path::Path;

use eyre::{Result, WrapErr};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

/// Watch a single file and signal `tx` whenever it is modified, created or
/// removed.
///
/// The parent directory is watched rather than the file itself so that
/// editors which replace the file on save are still picked up. The returned
/// watcher must be kept alive for notifications to keep flowing.
pub fn watch_file(path: &Path, tx: mpsc::Sender<()>) -> Result<RecommendedWatcher> {
    let file_name = path
        .file_name()
        .ok_or_else(|| eyre::eyre!("Invalid watch path: {}", path.display()))?
        .to_owned();

    let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
        match res {
            Ok(event) => {
                if (event.kind.is_modify() || event.kind.is_create() || event.kind.is_remove())
                    && event
                        .paths
                        .iter()
                        .any(|p| p.file_name() == Some(file_name.as_os_str()))
                {
                    tracing::debug!("Watched file changed: {:?}", event.kind);
                    // Channel full means a reload is already pending
                    let _ = tx.try_send(());
                }
            }
            Err(e) => tracing::error!("File watch error: {:?}", e),
        }
    })?;

    let watch_dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    watcher
        .watch(watch_dir, RecursiveMode::NonRecursive)
        .wrap_err_with(|| format!("Failed to watch directory {}", watch_dir.display()))?;

    Ok(watcher)
}
