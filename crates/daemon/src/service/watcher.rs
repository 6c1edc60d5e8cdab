//! Share directory watcher
//!
//! Wraps a [`notify`] watcher over the shared directory and reduces its
//! platform events to [`ChangeEvent`]s on a flume channel. The watch is
//! intentionally non-recursive: only direct children of the share matter.

use std::path::{Path, PathBuf};

use notify::event::ModifyKind;
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use common::event::{ChangeEvent, ChangeKind};

/// Owns the running watcher; dropping it stops event delivery.
pub struct ShareWatcher {
    // Held for its Drop impl; notify stops the inotify thread when dropped.
    _watcher: RecommendedWatcher,
    path: PathBuf,
}

impl ShareWatcher {
    /// Start watching `path` and return the receiving end of the event stream.
    pub fn spawn(path: &Path) -> Result<(Self, flume::Receiver<ChangeEvent>), WatchError> {
        let (tx, rx) = flume::unbounded();

        let mut watcher = RecommendedWatcher::new(
            move |result: Result<notify::Event, notify::Error>| match result {
                Ok(event) => {
                    for change in map_event(&event) {
                        // Send only fails once the service loop is gone.
                        let _ = tx.send(change);
                    }
                }
                Err(error) => {
                    tracing::error!("watch error: {error}");
                }
            },
            notify::Config::default(),
        )?;

        watcher.watch(path, RecursiveMode::NonRecursive)?;
        tracing::info!("watching {} for changes", path.display());

        Ok((
            Self {
                _watcher: watcher,
                path: path.to_path_buf(),
            },
            rx,
        ))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stop watching. No events are delivered after this returns.
    pub fn stop(self) {
        tracing::info!("stopped watching {}", self.path.display());
    }
}

/// Reduce one notify event to zero or more change events, one per path.
fn map_event(event: &notify::Event) -> Vec<ChangeEvent> {
    let kind = match event.kind {
        EventKind::Create(_) => ChangeKind::Created,
        EventKind::Modify(ModifyKind::Name(_)) => ChangeKind::Moved,
        EventKind::Modify(_) => ChangeKind::Modified,
        EventKind::Remove(_) => ChangeKind::Deleted,
        // Access and catch-all kinds carry no content change.
        _ => return Vec::new(),
    };

    event
        .paths
        .iter()
        .map(|path| ChangeEvent::new(path.clone(), kind))
        .collect()
}

#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("failed to watch share directory: {0}")]
    Notify(#[from] notify::Error),
}
