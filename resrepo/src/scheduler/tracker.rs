//! Per-file scan bookkeeping.
//!
//! A path is *pending* from the moment a scan is scheduled until the worker
//! starts it, and *running* while the scan executes. Scheduling is
//! idempotent: a second request for a pending path is absorbed by the scan
//! already queued. Scheduling a path that is running cancels the running
//! scan's token; it notices before committing and leaves the work to the
//! newly queued scan.

use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

/// Where a path stands in the scan lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Idle,
    Pending,
    Running,
}

/// Handle given to a starting scan.
#[derive(Debug, Clone)]
pub struct ScanTicket {
    serial: u64,
    token: CancellationToken,
}

impl ScanTicket {
    /// Whether a newer request superseded this scan.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

#[derive(Debug, Default)]
struct Scans {
    pending: HashSet<PathBuf>,
    running: HashMap<PathBuf, ScanTicket>,
    next_serial: u64,
}

/// Pending and running scans, under one lock.
#[derive(Debug, Default)]
pub struct ScanTracker {
    scans: Mutex<Scans>,
}

impl ScanTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, path: &Path) -> ScanState {
        let scans = self.scans.lock();
        if scans.pending.contains(path) {
            ScanState::Pending
        } else if scans.running.contains_key(path) {
            ScanState::Running
        } else {
            ScanState::Idle
        }
    }

    /// Mark `path` pending. Returns `false` if it already was, in which case
    /// nothing should be enqueued. A running scan of the path is cancelled.
    pub fn mark_pending(&self, path: &Path) -> bool {
        let mut scans = self.scans.lock();
        if !scans.pending.insert(path.to_path_buf()) {
            return false;
        }
        if let Some(running) = scans.running.get(path) {
            tracing::debug!(path = %path.display(), "Superseding running scan");
            running.token.cancel();
        }
        true
    }

    /// Move `path` from pending to running.
    ///
    /// Returns `None` when the path is no longer pending (it was cleared in
    /// the meantime). Any older running scan of the path is cancelled.
    pub fn begin(&self, path: &Path) -> Option<ScanTicket> {
        let mut scans = self.scans.lock();
        if !scans.pending.remove(path) {
            return None;
        }
        scans.next_serial += 1;
        let ticket = ScanTicket {
            serial: scans.next_serial,
            token: CancellationToken::new(),
        };
        if let Some(old) = scans.running.insert(path.to_path_buf(), ticket.clone()) {
            old.token.cancel();
        }
        Some(ticket)
    }

    /// Mark the scan behind `ticket` as done.
    pub fn finish(&self, path: &Path, ticket: &ScanTicket) {
        let mut scans = self.scans.lock();
        if scans
            .running
            .get(path)
            .is_some_and(|current| current.serial == ticket.serial)
        {
            scans.running.remove(path);
        }
    }

    /// Drop a pending mark whose job could not be enqueued.
    pub fn forget(&self, path: &Path) {
        self.scans.lock().pending.remove(path);
    }

    pub fn pending_count(&self) -> usize {
        self.scans.lock().pending.len()
    }

    pub fn running_count(&self) -> usize {
        self.scans.lock().running.len()
    }

    /// Forget all pending scans and cancel running ones.
    pub fn clear(&self) {
        let mut scans = self.scans.lock();
        scans.pending.clear();
        for ticket in scans.running.values() {
            ticket.token.cancel();
        }
        scans.running.clear();
    }
}
