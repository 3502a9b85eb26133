//! Gate config watcher for hot policy reload.
//!
//! Watches the config file's directory rather than the file itself, so
//! editors that save by writing a temp file and renaming it over the
//! original are still seen. Saves that leave the text unchanged are dropped
//! so one edit reloads the policy once.

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::config::loader::parse_config;
use crate::config::schema::GateConfig;

/// Watches the gate config and sends each new valid version.
pub struct ConfigWatcher {
    reloader: Reloader,
    update_tx: mpsc::UnboundedSender<GateConfig>,
}

impl ConfigWatcher {
    /// Returns the watcher and a receiver for validated configuration updates.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<GateConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        (
            Self {
                reloader: Reloader::new(path),
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching in a background thread.
    ///
    /// The returned watcher must be kept alive for events to keep flowing.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let Self {
            mut reloader,
            update_tx,
        } = self;
        let dir = reloader.dir();
        let path = reloader.path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if reloader.concerns(&event) => {
                    if let Some(config) = reloader.reload() {
                        let _ = update_tx.send(config);
                    }
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = ?e, "Watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        tracing::info!(path = %path.display(), "Gate config watcher started");
        Ok(watcher)
    }
}

/// Re-reads the config file and remembers the last text it accepted.
struct Reloader {
    path: PathBuf,
    file_name: Option<OsString>,
    applied: Option<String>,
}

impl Reloader {
    fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            file_name: path.file_name().map(OsString::from),
            applied: fs::read_to_string(path).ok(),
        }
    }

    fn dir(&self) -> PathBuf {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    /// Write, create or rename events naming the config file.
    fn concerns(&self, event: &Event) -> bool {
        (event.kind.is_modify() || event.kind.is_create())
            && event
                .paths
                .iter()
                .any(|p| p.file_name().map(OsString::from) == self.file_name)
    }

    /// The new config, if the text changed and validates.
    fn reload(&mut self) -> Option<GateConfig> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                // Mid-rename the file can briefly be missing.
                tracing::debug!(error = %e, "Gate config unreadable, waiting for next event");
                return None;
            }
        };
        if self.applied.as_deref() == Some(content.as_str()) {
            return None;
        }

        match parse_config(&content) {
            Ok(config) => {
                tracing::info!(
                    routes = config.gate.routes.len(),
                    checkout_paths = config.gate.checkout_paths.len(),
                    "Gate config changed, reloading policy"
                );
                self.applied = Some(content);
                Some(config)
            }
            Err(e) => {
                tracing::error!(error = %e, "Invalid gate config, keeping current policy");
                None
            }
        }
    }
}
