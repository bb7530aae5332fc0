use anyhow::Result;
use notify::{Event, EventKind, RecursiveMode, Watcher};
use rssr::{Config, PageServer, ReloadScheduler};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

/// File the bundler rewrites after every build
const MANIFEST_NAME: &str = ".meta.json";

/// A finished build, observed through its manifest
#[derive(Debug, Clone)]
pub struct BuildChange {
    pub path: PathBuf,
}

/// Hot reload watcher that monitors the build output
pub struct HotReloadWatcher {
    tx: broadcast::Sender<BuildChange>,
    _watcher: notify::RecommendedWatcher,
}

impl HotReloadWatcher {
    /// Create a new hot reload watcher
    pub fn new(watch_paths: Vec<PathBuf>) -> Result<Self> {
        let (tx, _) = broadcast::channel(100);
        let tx_clone = tx.clone();

        let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
            match res {
                Ok(event) => {
                    // Only process modify and create events
                    if matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
                        for path in event.paths.into_iter().filter(|path| is_manifest(path)) {
                            info!("Build manifest changed: {:?}", path);
                            // Broadcast change event (ignore if no receivers)
                            let _ = tx_clone.send(BuildChange { path });
                        }
                    }
                }
                Err(e) => error!("Watch error: {:?}", e),
            }
        })?;

        for path in watch_paths {
            if path.exists() {
                watcher.watch(&path, RecursiveMode::Recursive)?;
                info!("Watching: {:?}", path);
            } else {
                warn!("Path does not exist: {:?}", path);
            }
        }

        Ok(Self {
            tx,
            _watcher: watcher,
        })
    }

    /// Subscribe to build events
    pub fn subscribe(&self) -> broadcast::Receiver<BuildChange> {
        self.tx.subscribe()
    }
}

fn is_manifest(path: &Path) -> bool {
    path.file_name().and_then(|name| name.to_str()) == Some(MANIFEST_NAME)
}

/// Watches the configured paths and reloads `server` after each build
///
/// Bursts of events collapse into one running reload plus one pending.
pub fn spawn(server: Arc<PageServer>, config: &Config) -> Result<HotReloadWatcher> {
    let base = PathBuf::from(&config.routing.base_dir);
    let watch_paths = config.dev.watch_paths.iter().map(|path| base.join(path)).collect();
    let watcher = HotReloadWatcher::new(watch_paths)?;

    let scheduler = ReloadScheduler::new(move || {
        let server = server.clone();
        async move {
            match tokio::task::spawn_blocking(move || server.reload()).await {
                Ok(Ok(())) => info!("Reloaded after build"),
                Ok(Err(e)) => error!("Reload failed, keeping previous routes: {}", e),
                Err(e) => error!("Reload task panicked: {}", e),
            }
        }
    });

    let mut rx = watcher.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(_) => scheduler.trigger(),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Missed {} build events", skipped);
                    scheduler.trigger();
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    Ok(watcher)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_manifest_counts() {
        assert!(is_manifest(Path::new("demo/.build/.meta.json")));
        assert!(!is_manifest(Path::new("demo/.build/pages/index.js")));
        assert!(!is_manifest(Path::new("demo/.build/meta.json")));
    }
}
