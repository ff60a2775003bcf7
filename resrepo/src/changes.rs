//! Change notifications consumed by the incremental repository.
//!
//! Two kinds of events reach a repository:
//!
//! - [`FileEvent`]: a file or directory was created, modified or removed on
//!   disk. Always handled with a (re)scan of the affected file.
//! - [`DocumentChange`]: an editor reports a structural edit of an open
//!   document. Edits that provably keep the file's resource names intact are
//!   applied in place; everything else falls back to a rescan.
//!
//! Any producer implements [`ChangeSource`]; the repository only sees the
//! event stream.

use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

use crate::resource::{ResourceType, ResourceValue};

/// What happened to a path on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileEventKind {
    Created,
    Modified,
    Removed,
}

/// A file system change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEvent {
    pub path: PathBuf,
    pub kind: FileEventKind,
}

impl FileEvent {
    pub fn new(path: impl Into<PathBuf>, kind: FileEventKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

/// What part of a document an edit touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeTarget {
    /// The text content of one value element.
    ValueText {
        resource_type: ResourceType,
        name: String,
        text: String,
    },
    /// The `name` attribute of one value element.
    ValueName {
        resource_type: ResourceType,
        old_name: String,
        new_name: String,
    },
    /// One whole value element. `value` is the element's new value when it
    /// was added or replaced.
    ValueElement {
        resource_type: ResourceType,
        name: String,
        value: Option<ResourceValue>,
    },
    /// Whitespace or comments only.
    Whitespace,
    /// Anything that cannot be attributed to a single value.
    Structure,
}

/// An edit reported by a live document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentChange {
    ChildAdded { file: PathBuf, target: ChangeTarget },
    ChildRemoved { file: PathBuf, target: ChangeTarget },
    ChildReplaced { file: PathBuf, target: ChangeTarget },
    /// The document was rewritten wholesale (undo, reformat, external
    /// reload).
    BulkChange { file: PathBuf },
}

impl DocumentChange {
    pub fn file(&self) -> &Path {
        match self {
            DocumentChange::ChildAdded { file, .. }
            | DocumentChange::ChildRemoved { file, .. }
            | DocumentChange::ChildReplaced { file, .. }
            | DocumentChange::BulkChange { file } => file,
        }
    }

    /// The touched part, `None` for bulk changes.
    pub fn target(&self) -> Option<&ChangeTarget> {
        match self {
            DocumentChange::ChildAdded { target, .. }
            | DocumentChange::ChildRemoved { target, .. }
            | DocumentChange::ChildReplaced { target, .. } => Some(target),
            DocumentChange::BulkChange { .. } => None,
        }
    }
}

/// Any change a repository reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    File(FileEvent),
    Document(DocumentChange),
}

impl From<FileEvent> for ChangeEvent {
    fn from(event: FileEvent) -> Self {
        ChangeEvent::File(event)
    }
}

impl From<DocumentChange> for ChangeEvent {
    fn from(change: DocumentChange) -> Self {
        ChangeEvent::Document(change)
    }
}

/// A producer of change events.
///
/// The receiver can be taken once and handed to
/// [`ResourceFolderRepository::listen`](crate::repository::ResourceFolderRepository::listen).
pub trait ChangeSource: Send {
    fn take_events(&mut self) -> Option<mpsc::UnboundedReceiver<ChangeEvent>>;
}

/// A change source fed by hand, for editors and tests.
#[derive(Debug)]
pub struct ChannelSource {
    tx: mpsc::UnboundedSender<ChangeEvent>,
    rx: Option<mpsc::UnboundedReceiver<ChangeEvent>>,
}

impl ChannelSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { tx, rx: Some(rx) }
    }

    /// Publish an event. Returns `false` once the receiver is gone.
    pub fn publish(&self, event: impl Into<ChangeEvent>) -> bool {
        self.tx.send(event.into()).is_ok()
    }

    pub fn sender(&self) -> mpsc::UnboundedSender<ChangeEvent> {
        self.tx.clone()
    }
}

impl Default for ChannelSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeSource for ChannelSource {
    fn take_events(&mut self) -> Option<mpsc::UnboundedReceiver<ChangeEvent>> {
        self.rx.take()
    }
}
