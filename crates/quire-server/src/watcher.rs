//! File watching for rebuilds.

use std::path::{Component, Path, PathBuf};
use std::sync::mpsc;

use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc as async_mpsc;

/// Events emitted by the file watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// File or directory was created
    Created(PathBuf),

    /// Contents, metadata or name changed
    Modified(PathBuf),

    /// File or directory was removed
    Removed(PathBuf),
}

impl WatchEvent {
    pub fn path(&self) -> &Path {
        match self {
            Self::Created(path) | Self::Modified(path) | Self::Removed(path) => path,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("Failed to start file watcher: {0}")]
    Start(#[source] notify::Error),

    #[error("Failed to watch {path}: {source}")]
    Watch {
        path: PathBuf,
        source: notify::Error,
    },

    #[error("Failed to resolve {path}: {source}")]
    Resolve {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Decides which changed paths are worth a rebuild.
#[derive(Debug, Clone, Default)]
pub struct WatchFilter {
    roots: Vec<PathBuf>,
    output: Option<PathBuf>,
    ignore: Vec<String>,
}

impl WatchFilter {
    /// `roots` are the watched directories; paths under `output` and paths
    /// with a component named in `ignore` are dropped.
    pub fn new(roots: Vec<PathBuf>, output: Option<PathBuf>, ignore: Vec<String>) -> Self {
        Self {
            roots,
            output,
            ignore,
        }
    }

    pub fn accepts(&self, path: &Path) -> bool {
        if let Some(output) = &self.output {
            if path.starts_with(output) {
                return false;
            }
        }

        // Hidden components only count below the watched root.
        let relative = self
            .roots
            .iter()
            .filter(|root| path.starts_with(root))
            .max_by_key(|root| root.components().count())
            .and_then(|root| path.strip_prefix(root).ok())
            .unwrap_or(path);

        !relative.components().any(|c| match c {
            Component::Normal(name) => {
                let name = name.to_string_lossy();
                name.starts_with('.') || self.ignore.iter().any(|i| *i == name)
            }
            _ => false,
        })
    }
}

/// Recursive watcher over a set of directories.
///
/// Dropping it stops the watch and closes the event channel.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
}

impl FileWatcher {
    /// Watch `paths` recursively, forwarding accepted events.
    ///
    /// Paths that do not exist are skipped. The filter's roots and output
    /// path are matched against absolute event paths.
    pub fn new(
        paths: &[PathBuf],
        filter: WatchFilter,
    ) -> Result<(Self, async_mpsc::Receiver<WatchEvent>), WatchError> {
        let (sync_tx, sync_rx) = mpsc::channel();
        let (async_tx, async_rx) = async_mpsc::channel(256);

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            match res {
                Ok(event) => {
                    let _ = sync_tx.send(event);
                }
                Err(e) => tracing::warn!("File watcher error: {}", e),
            }
        })
        .map_err(WatchError::Start)?;

        let mut roots = Vec::with_capacity(paths.len());
        for path in paths {
            if !path.exists() {
                tracing::debug!("Not watching missing {}", path.display());
                continue;
            }
            let absolute = absolute(path)?;
            watcher
                .watch(&absolute, RecursiveMode::Recursive)
                .map_err(|source| WatchError::Watch {
                    path: absolute.clone(),
                    source,
                })?;
            tracing::debug!("Watching {}", absolute.display());
            roots.push(absolute);
        }

        let filter = WatchFilter {
            roots,
            output: filter.output.map(|o| absolute(&o)).transpose()?,
            ignore: filter.ignore,
        };

        // Bridge notify's callback thread onto the async channel.
        std::thread::spawn(move || {
            while let Ok(event) = sync_rx.recv() {
                for path in event.paths {
                    let Some(watch_event) = classify_event(path, &event.kind) else {
                        continue;
                    };
                    if !filter.accepts(watch_event.path()) {
                        continue;
                    }
                    if async_tx.blocking_send(watch_event).is_err() {
                        return;
                    }
                }
            }
        });

        Ok((Self { _watcher: watcher }, async_rx))
    }
}

fn absolute(path: &Path) -> Result<PathBuf, WatchError> {
    std::path::absolute(path).map_err(|source| WatchError::Resolve {
        path: path.to_path_buf(),
        source,
    })
}

/// Classify a notify event into a WatchEvent.
fn classify_event(path: PathBuf, kind: &EventKind) -> Option<WatchEvent> {
    match kind {
        EventKind::Create(_) => Some(WatchEvent::Created(path)),
        EventKind::Remove(_) => Some(WatchEvent::Removed(path)),
        EventKind::Modify(_) => Some(WatchEvent::Modified(path)),
        _ => None,
    }
}
