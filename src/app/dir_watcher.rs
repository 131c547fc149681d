// sessiontail - app/dir_watcher.rs
//
// Directory watcher: polls the log directory on a background thread and
// reports session log files that appear after the startup scan.
//
// Architecture:
//   - `DirWatcher::spawn` starts the poll thread; an `Arc<AtomicBool>`
//     cancel flag stops it (the handle's Drop sets the flag).
//   - One directory level only; filenames are matched with the same
//     session-log rule the grouper applies, so non-candidates are never
//     reported.
//   - `known` is seeded from the startup scan so initial population is
//     suppressed, and updated after each report so a file is only ever
//     reported once.
//   - Per-entry I/O errors are skipped silently; a vanished or unreadable
//     entry is re-examined on the next poll if it still exists.

use crate::app::runtime::RuntimeEvent;
use crate::core::session::parse_session_stamp;
use crate::util::constants::{DIR_WATCH_CANCEL_CHECK_INTERVAL_MS, DIR_WATCH_POLL_INTERVAL_MS};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::time::Duration;

/// Owning handle for the watcher thread. Dropping the handle stops it.
pub struct DirWatcher {
    cancel: Arc<AtomicBool>,
}

impl DirWatcher {
    /// Start watching `root` for new session log files.
    ///
    /// `known` is the set of filenames already seen by the startup scan;
    /// anything else matching the session-log pattern is reported as a
    /// `RuntimeEvent::FileAppeared` message.
    pub fn spawn(root: PathBuf, known: HashSet<String>, tx: mpsc::Sender<RuntimeEvent>) -> Self {
        let cancel = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancel);

        std::thread::spawn(move || run_dir_watcher(root, known, tx, flag));
        tracing::debug!("Directory watcher started");

        Self { cancel }
    }

    /// Request the watcher thread to stop. Idempotent.
    pub fn stop(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }
}

impl Drop for DirWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

// =============================================================================
// Background thread
// =============================================================================

fn run_dir_watcher(
    root: PathBuf,
    mut known: HashSet<String>,
    tx: mpsc::Sender<RuntimeEvent>,
    cancel: Arc<AtomicBool>,
) {
    // Sleep in cancel-check slices so shutdown is prompt.
    let slices = (DIR_WATCH_POLL_INTERVAL_MS / DIR_WATCH_CANCEL_CHECK_INTERVAL_MS).max(1);

    loop {
        for _ in 0..slices {
            std::thread::sleep(Duration::from_millis(DIR_WATCH_CANCEL_CHECK_INTERVAL_MS));
            if cancel.load(Ordering::SeqCst) {
                tracing::debug!("Directory watcher stopped");
                return;
            }
        }

        for name in poll_for_new_files(&root, &known) {
            // Update `known` before sending so a slow consumer never causes
            // the same file to be reported twice.
            known.insert(name.clone());
            tracing::debug!(file = %name, "Directory watcher: new log file");
            if tx.send(RuntimeEvent::FileAppeared { name }).is_err() {
                // Event loop dropped the receiver — exit cleanly.
                return;
            }
        }
    }
}

/// One poll: session log filenames in `root` that are not yet known.
///
/// The directory read itself failing (directory deleted mid-run, permission
/// flap) yields an empty result; the next poll retries.
fn poll_for_new_files(root: &Path, known: &HashSet<String>) -> Vec<String> {
    let Ok(reader) = std::fs::read_dir(root) else {
        return Vec::new();
    };

    let mut found = Vec::new();
    for entry in reader.flatten() {
        let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
        if !is_file {
            continue;
        }
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        if parse_session_stamp(&name).is_none() || known.contains(&name) {
            continue;
        }
        found.push(name);
    }
    found
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_poll_finds_new_session_logs_and_skips_known() {
        let dir = TempDir::new().expect("tmpdir");
        let name = "output_log_2024-01-01_10-00-00.txt";
        fs::write(dir.path().join(name), b"").unwrap();

        let found = poll_for_new_files(dir.path(), &HashSet::new());
        assert_eq!(found, vec![name.to_string()]);

        let known: HashSet<String> = [name.to_string()].into();
        assert!(poll_for_new_files(dir.path(), &known).is_empty());
    }

    #[test]
    fn test_poll_ignores_non_matching_names() {
        let dir = TempDir::new().expect("tmpdir");
        fs::write(dir.path().join("Player.log"), b"").unwrap();
        fs::write(dir.path().join("output_log.txt"), b"").unwrap();
        fs::create_dir(dir.path().join("output_log_2024-01-01_10-00-01.txt.d")).unwrap();

        assert!(poll_for_new_files(dir.path(), &HashSet::new()).is_empty());
    }

    #[test]
    fn test_poll_of_missing_directory_is_empty() {
        let dir = TempDir::new().expect("tmpdir");
        let gone = dir.path().join("gone");
        assert!(poll_for_new_files(&gone, &HashSet::new()).is_empty());
    }

    /// Watcher thread delivers an event for a file created after spawn.
    #[test]
    fn test_watcher_reports_appearing_file() {
        let dir = TempDir::new().expect("tmpdir");
        let (tx, rx) = mpsc::channel();
        let watcher = DirWatcher::spawn(dir.path().to_path_buf(), HashSet::new(), tx);

        let name = "output_log_2024-01-01_10-00-00.txt";
        fs::write(dir.path().join(name), b"").unwrap();

        match rx.recv_timeout(Duration::from_secs(5)) {
            Ok(RuntimeEvent::FileAppeared { name: reported }) => assert_eq!(reported, name),
            other => panic!("expected FileAppeared, got {other:?}"),
        }
        watcher.stop();
    }
}
