// sessiontail - app/tail.rs
//
// Per-file live tail: a background thread polls one log file for content
// appended after attachment and streams complete lines to the event loop.
//
// Architecture:
//   - `TailHandle::spawn` seeds the read offset at the *current* end of the
//     file (follow-from-now semantics) and starts the poll thread.
//   - An `Arc<AtomicBool>` cancel flag detaches the tail; the thread exits
//     within one cancel-check interval and sends nothing afterwards. The
//     event loop additionally drops any line whose tail is no longer active,
//     so an in-flight event racing the detach is harmless.
//   - Lines are sent as `RuntimeEvent::Line` over the shared mpsc channel.
//
// Encoding: new bytes are decoded as lossy UTF-8. Truncated/rotated files
// (size < last offset) reset the offset to 0 so the rewritten content is
// picked up cleanly. A per-tick byte cap keeps a burst of large writes from
// stalling delivery; the partial-line carry buffer is capped so a file that
// never produces a newline cannot grow memory without bound.

use crate::app::runtime::{RuntimeEvent, TailId};
use crate::util::constants::{
    MAX_TAIL_PARTIAL_BYTES, MAX_TAIL_READ_BYTES_PER_TICK, TAIL_CANCEL_CHECK_INTERVAL_MS,
    TAIL_POLL_INTERVAL_MS,
};
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::time::Duration;

// =============================================================================
// TailHandle
// =============================================================================

/// Owning handle for one tail thread. Dropping the handle detaches the tail.
pub struct TailHandle {
    cancel: Arc<AtomicBool>,
}

impl TailHandle {
    /// Attach to `path` and start streaming lines appended from now on.
    ///
    /// The pre-flight `metadata` call doubles as the attach check: a file
    /// that vanished between discovery and attach fails here and the caller
    /// skips the entry (retried only via a fresh file-appeared event).
    pub fn spawn(
        path: PathBuf,
        id: TailId,
        tx: mpsc::Sender<RuntimeEvent>,
    ) -> std::io::Result<Self> {
        let offset = std::fs::metadata(&path)?.len();

        let cancel = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancel);

        tracing::debug!(file = %path.display(), offset, "Tail attached");
        std::thread::spawn(move || run_tail(path, id, offset, tx, flag));

        Ok(Self { cancel })
    }

    /// Request the tail thread to stop. Idempotent.
    pub fn stop(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }
}

impl Drop for TailHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

// =============================================================================
// Background poll loop
// =============================================================================

struct TailState {
    offset: u64,
    /// Bytes from the most recent read that followed the final newline —
    /// an in-progress line, prepended to the next tick's decoded bytes.
    partial: String,
    /// Whether the current error streak has already been reported. Reset on
    /// the first successful stat so a reappearing file warns again next time.
    error_reported: bool,
}

fn run_tail(
    path: PathBuf,
    id: TailId,
    offset: u64,
    tx: mpsc::Sender<RuntimeEvent>,
    cancel: Arc<AtomicBool>,
) {
    let mut state = TailState {
        offset,
        partial: String::new(),
        error_reported: false,
    };

    // Sub-divide each poll interval into cancel-check slices so detachment
    // takes effect within TAIL_CANCEL_CHECK_INTERVAL_MS.
    let slices = (TAIL_POLL_INTERVAL_MS / TAIL_CANCEL_CHECK_INTERVAL_MS).max(1);

    loop {
        for _ in 0..slices {
            std::thread::sleep(Duration::from_millis(TAIL_CANCEL_CHECK_INTERVAL_MS));
            if cancel.load(Ordering::SeqCst) {
                tracing::debug!(file = %path.display(), "Tail detached");
                return;
            }
        }

        if poll_once(&path, id, &mut state, &tx).is_err() {
            // Event loop dropped the receiver — exit silently.
            return;
        }
    }
}

/// One poll tick. Returns `Err` only when the channel is closed.
fn poll_once(
    path: &Path,
    id: TailId,
    state: &mut TailState,
    tx: &mpsc::Sender<RuntimeEvent>,
) -> Result<(), mpsc::SendError<RuntimeEvent>> {
    let current_size = match std::fs::metadata(path) {
        Ok(m) => m.len(),
        Err(e) => {
            if !state.error_reported {
                state.error_reported = true;
                tx.send(RuntimeEvent::TailWarning {
                    id,
                    message: format!("cannot stat: {e}"),
                })?;
            }
            return Ok(());
        }
    };
    state.error_reported = false;

    // Truncation / rotation: start over from the top of the new content.
    if current_size < state.offset {
        tracing::debug!(
            file = %path.display(),
            old_offset = state.offset,
            new_size = current_size,
            "Tail: file truncated or rotated, resetting offset"
        );
        state.offset = 0;
        state.partial.clear();
    }

    if current_size == state.offset {
        return Ok(());
    }

    let bytes_available = (current_size - state.offset) as usize;
    let read_limit = bytes_available.min(MAX_TAIL_READ_BYTES_PER_TICK);

    let new_bytes = match read_bytes_at(path, state.offset, read_limit) {
        Ok(b) => b,
        Err(e) => {
            tx.send(RuntimeEvent::TailWarning {
                id,
                message: format!("read error: {e}"),
            })?;
            return Ok(());
        }
    };

    if new_bytes.is_empty() {
        return Ok(());
    }

    // The bytes are consumed whether or not they complete a line.
    state.offset += new_bytes.len() as u64;
    state.partial.push_str(&String::from_utf8_lossy(&new_bytes));

    // Everything up to and including the final '\n' is complete; the rest
    // carries forward to the next tick.
    let Some(newline_pos) = state.partial.rfind('\n') else {
        if state.partial.len() > MAX_TAIL_PARTIAL_BYTES {
            tx.send(RuntimeEvent::TailWarning {
                id,
                message: format!(
                    "discarded a {} byte line fragment with no newline",
                    state.partial.len()
                ),
            })?;
            state.partial.clear();
        }
        return Ok(());
    };
    let complete = state.partial[..newline_pos].to_string();
    state.partial.drain(..=newline_pos);

    for line in complete.split('\n') {
        let line = line.strip_suffix('\r').unwrap_or(line);
        tx.send(RuntimeEvent::Line {
            id,
            line: line.to_string(),
        })?;
    }
    Ok(())
}

/// Read up to `limit` bytes from `path` starting at byte position `offset`.
fn read_bytes_at(path: &Path, offset: u64, limit: usize) -> std::io::Result<Vec<u8>> {
    let mut file = std::fs::File::open(path)?;
    file.seek(SeekFrom::Start(offset))?;
    let mut buf = vec![0u8; limit];
    let n = file.read(&mut buf)?;
    buf.truncate(n);
    Ok(buf)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::OpenOptions;
    use std::io::Write;
    use std::time::Duration;
    use tempfile::TempDir;

    const RECV_TIMEOUT: Duration = Duration::from_secs(3);

    fn append(path: &Path, text: &str) {
        let mut f = OpenOptions::new().append(true).open(path).expect("open");
        f.write_all(text.as_bytes()).expect("write");
    }

    fn expect_line(rx: &mpsc::Receiver<RuntimeEvent>) -> String {
        loop {
            match rx.recv_timeout(RECV_TIMEOUT).expect("expected a line event") {
                RuntimeEvent::Line { line, .. } => return line,
                other => panic!("unexpected event: {other:?}"),
            }
        }
    }

    /// Content present before attach is skipped; appended lines arrive.
    #[test]
    fn test_tail_follows_from_end() {
        let dir = TempDir::new().expect("tmpdir");
        let path = dir.path().join("output_log_2024-01-01_10-00-00.txt");
        std::fs::write(&path, "old content\n").unwrap();

        let (tx, rx) = mpsc::channel();
        let handle = TailHandle::spawn(path.clone(), TailId(1), tx).expect("spawn");

        append(&path, "first\nsecond\n");
        assert_eq!(expect_line(&rx), "first");
        assert_eq!(expect_line(&rx), "second");

        handle.stop();
    }

    /// Partial lines are held back until their newline arrives.
    #[test]
    fn test_partial_lines_carry_across_ticks() {
        let dir = TempDir::new().expect("tmpdir");
        let path = dir.path().join("output_log_2024-01-01_10-00-00.txt");
        std::fs::write(&path, "").unwrap();

        let (tx, rx) = mpsc::channel();
        let handle = TailHandle::spawn(path.clone(), TailId(1), tx).expect("spawn");

        append(&path, "hel");
        assert!(
            rx.recv_timeout(Duration::from_millis(1_500)).is_err(),
            "incomplete line must not be delivered"
        );
        append(&path, "lo\r\n");
        assert_eq!(expect_line(&rx), "hello");

        handle.stop();
    }

    #[test]
    fn test_truncation_resets_offset() {
        let dir = TempDir::new().expect("tmpdir");
        let path = dir.path().join("output_log_2024-01-01_10-00-00.txt");
        std::fs::write(&path, "a long run of early content\n").unwrap();

        let (tx, rx) = mpsc::channel();
        let handle = TailHandle::spawn(path.clone(), TailId(1), tx).expect("spawn");

        std::fs::write(&path, "rewritten\n").unwrap();
        assert_eq!(expect_line(&rx), "rewritten");

        handle.stop();
    }

    #[test]
    fn test_spawn_fails_for_missing_file() {
        let dir = TempDir::new().expect("tmpdir");
        let (tx, _rx) = mpsc::channel();
        let result = TailHandle::spawn(dir.path().join("gone.txt"), TailId(1), tx);
        assert!(result.is_err());
    }

    /// After stop, nothing further is delivered.
    #[test]
    fn test_stop_silences_the_tail() {
        let dir = TempDir::new().expect("tmpdir");
        let path = dir.path().join("output_log_2024-01-01_10-00-00.txt");
        std::fs::write(&path, "").unwrap();

        let (tx, rx) = mpsc::channel();
        let handle = TailHandle::spawn(path.clone(), TailId(1), tx).expect("spawn");
        handle.stop();

        // Give the thread time to observe the flag, then append.
        std::thread::sleep(Duration::from_millis(
            TAIL_CANCEL_CHECK_INTERVAL_MS * 4,
        ));
        append(&path, "late\n");
        assert!(
            rx.recv_timeout(Duration::from_millis(1_500)).is_err(),
            "a stopped tail must not deliver lines"
        );
    }
}
