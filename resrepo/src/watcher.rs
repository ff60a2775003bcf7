//! File system watching via `notify`.
//!
//! [`FsWatcher`] watches a resource root recursively and turns native events
//! into [`ChangeEvent::File`] values on a tokio channel:
//!
//! ```text
//! notify callback ──► classify ──► UnboundedSender<ChangeEvent> ──► repository.listen()
//! ```
//!
//! Renames arrive as a removal of the old path and a creation of the new one.

use notify::event::{ModifyKind, RenameMode};
use notify::{Config as NotifyConfig, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::changes::{ChangeEvent, ChangeSource, FileEvent, FileEventKind};
use crate::error::RepositoryError;

/// Recursive watcher over one resource root.
pub struct FsWatcher {
    root: PathBuf,
    // Dropping the watcher stops event delivery.
    _watcher: RecommendedWatcher,
    rx: Option<mpsc::UnboundedReceiver<ChangeEvent>>,
}

impl FsWatcher {
    /// Start watching `root`.
    pub fn start(root: impl Into<PathBuf>) -> Result<Self, RepositoryError> {
        let root = root.into();
        let (tx, rx) = mpsc::unbounded_channel();

        let mut watcher = RecommendedWatcher::new(
            move |res: Result<Event, notify::Error>| match res {
                Ok(event) => {
                    for file_event in classify(&event) {
                        if tx.send(ChangeEvent::File(file_event)).is_err() {
                            return;
                        }
                    }
                }
                Err(e) => warn!(error = %e, "File watcher error"),
            },
            NotifyConfig::default(),
        )
        .map_err(|e| RepositoryError::Watch(format!("failed to create watcher: {}", e)))?;

        watcher
            .watch(&root, RecursiveMode::Recursive)
            .map_err(|e| {
                RepositoryError::Watch(format!("failed to watch {}: {}", root.display(), e))
            })?;

        debug!(root = %root.display(), "Watching resource root");
        Ok(Self {
            root,
            _watcher: watcher,
            rx: Some(rx),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ChangeSource for FsWatcher {
    fn take_events(&mut self) -> Option<mpsc::UnboundedReceiver<ChangeEvent>> {
        self.rx.take()
    }
}

/// Map a native event onto file events. Access events yield nothing.
fn classify(event: &Event) -> Vec<FileEvent> {
    let modified_or_gone = |path: &PathBuf| {
        let kind = if path.exists() {
            FileEventKind::Modified
        } else {
            FileEventKind::Removed
        };
        FileEvent::new(path.clone(), kind)
    };

    match event.kind {
        EventKind::Create(_) => event
            .paths
            .iter()
            .map(|p| FileEvent::new(p.clone(), FileEventKind::Created))
            .collect(),
        EventKind::Remove(_) => event
            .paths
            .iter()
            .map(|p| FileEvent::new(p.clone(), FileEventKind::Removed))
            .collect(),
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => event
            .paths
            .iter()
            .map(|p| FileEvent::new(p.clone(), FileEventKind::Removed))
            .collect(),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => event
            .paths
            .iter()
            .map(|p| FileEvent::new(p.clone(), FileEventKind::Created))
            .collect(),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) if event.paths.len() == 2 => vec![
            FileEvent::new(event.paths[0].clone(), FileEventKind::Removed),
            FileEvent::new(event.paths[1].clone(), FileEventKind::Created),
        ],
        EventKind::Access(_) => Vec::new(),
        _ => event.paths.iter().map(modified_or_gone).collect(),
    }
}
