// sessiontail - app/multiplexer.rs
//
// Tail multiplexer: owns the active tails for the live session window.
//
// `sync` reconciles the active set against the window the grouper computed:
//   - a window reset (any active tail no longer in the window) detaches
//     everything before the new session's files are attached;
//   - window entries without a tail are attached in window order, each with
//     the display index it holds at attach time (stable thereafter; used
//     for colour selection only, so a later mid-window insertion sharing an
//     index is harmless);
//   - unchanged membership attaches and detaches nothing.
//
// The returned report carries the side effects the event loop renders: a
// session separator after a reset of a non-empty set, and a warning per
// entry whose file vanished before it could be attached.

use crate::app::runtime::{RuntimeEvent, TailId};
use crate::app::tail::TailHandle;
use crate::core::session::LogFileEntry;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::mpsc;

/// One attached tail: the window entry it serves, its stable display index,
/// and the owning handle for the poll thread.
struct ActiveTail {
    path: PathBuf,
    display_index: usize,
    handle: TailHandle,
}

/// Attach/detach side effects of one `sync` call.
#[derive(Debug, Default)]
pub struct SyncReport {
    /// True when a non-empty active set was torn down; the caller emits a
    /// session separator.
    pub reset: bool,
    pub attached: usize,
    pub detached: usize,
    /// Entries skipped because the file could not be attached.
    pub failures: Vec<(PathBuf, std::io::Error)>,
}

pub struct TailMultiplexer {
    active: HashMap<TailId, ActiveTail>,
    next_id: u64,
    tx: mpsc::Sender<RuntimeEvent>,
}

impl TailMultiplexer {
    pub fn new(tx: mpsc::Sender<RuntimeEvent>) -> Self {
        Self {
            active: HashMap::new(),
            next_id: 0,
            tx,
        }
    }

    /// Reconcile the active tails with the current window.
    pub fn sync(&mut self, window: &[LogFileEntry]) -> SyncReport {
        let mut report = SyncReport::default();

        let window_paths: HashSet<&Path> = window.iter().map(|e| e.path.as_path()).collect();
        let window_crossed = self
            .active
            .values()
            .any(|tail| !window_paths.contains(tail.path.as_path()));

        if window_crossed {
            report.detached = self.active.len();
            report.reset = true;
            // Dropping the handles cancels the poll threads.
            self.active.clear();
            tracing::info!(detached = report.detached, "Session boundary crossed");
        }

        for (position, entry) in window.iter().enumerate() {
            if self.is_attached(&entry.path) {
                continue;
            }
            let id = TailId(self.next_id);
            match TailHandle::spawn(entry.path.clone(), id, self.tx.clone()) {
                Ok(handle) => {
                    self.next_id += 1;
                    self.active.insert(
                        id,
                        ActiveTail {
                            path: entry.path.clone(),
                            display_index: position,
                            handle,
                        },
                    );
                    report.attached += 1;
                }
                Err(e) => report.failures.push((entry.path.clone(), e)),
            }
        }

        report
    }

    /// Display index of an active tail. `None` once it has been detached,
    /// which is the membership check that drops in-flight line events.
    pub fn display_index(&self, id: TailId) -> Option<usize> {
        self.active.get(&id).map(|tail| tail.display_index)
    }

    /// Path served by an active tail, for diagnostics.
    pub fn path_of(&self, id: TailId) -> Option<&Path> {
        self.active.get(&id).map(|tail| tail.path.as_path())
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Detach everything (process shutdown).
    pub fn shutdown(&mut self) {
        for tail in self.active.values() {
            tail.handle.stop();
        }
        self.active.clear();
    }

    fn is_attached(&self, path: &Path) -> bool {
        self.active.values().any(|tail| tail.path == path)
    }
}

// =============================================================================
// Tests
// =============================================================================
