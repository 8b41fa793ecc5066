//! Configuration file watcher for hot reload.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::GatewayConfig;

/// Watches the configuration file and publishes every valid new version.
///
/// Invalid versions are logged and skipped; the receiver only ever sees
/// configurations that passed validation.
pub struct ConfigWatcher {
    path: PathBuf,
    updates: mpsc::UnboundedSender<GatewayConfig>,
}

impl ConfigWatcher {
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<GatewayConfig>) {
        let (updates, rx) = mpsc::unbounded_channel();
        let watcher = Self {
            path: path.to_path_buf(),
            updates,
        };
        (watcher, rx)
    }

    /// Start watching on notify's background thread.
    ///
    /// Watching stops when the returned handle is dropped.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let Self { path, updates } = self;
        let reload_path = path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                let event = match res {
                    Ok(event) => event,
                    Err(e) => {
                        tracing::error!(error = %e, "Config watch error");
                        return;
                    }
                };
                if !matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
                    return;
                }

                match load_config(&reload_path) {
                    Ok(config) => {
                        tracing::info!(
                            path = %reload_path.display(),
                            modules = config.modules.len(),
                            tenants = config.tenants.len(),
                            "Configuration reloaded"
                        );
                        if updates.send(config).is_err() {
                            tracing::debug!("Config receiver gone, dropping update");
                        }
                    }
                    Err(e) => tracing::error!(
                        path = %reload_path.display(),
                        error = %e,
                        "Rejected configuration change, keeping current configuration"
                    ),
                }
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&path, RecursiveMode::NonRecursive)?;
        tracing::info!(path = %path.display(), "Config watcher started");
        Ok(watcher)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[tokio::test]
    async fn test_valid_change_is_published() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gateway.toml");
        fs::write(&path, "").unwrap();

        let (watcher, mut rx) = ConfigWatcher::new(&path);
        let _handle = watcher.run().unwrap();

        // An invalid version is skipped, the following valid one arrives.
        fs::write(&path, "[[tenants]]\nid = \"t1\"\nmodules = [\"missing-1.0.0\"]\n").unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        fs::write(&path, "[[tenants]]\nid = \"t2\"\n").unwrap();

        let config = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let config = rx.recv().await.unwrap();
                if !config.tenants.is_empty() {
                    return config;
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(config.tenants[0].id, "t2");
    }
}
