// sessiontail - util/constants.rs
//
// Single source of truth for all named constants, limits, and defaults.

// =============================================================================
// Application metadata
// =============================================================================

/// Application display name.
pub const APP_NAME: &str = "sessiontail";

/// Current application version (updated by release script).
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// =============================================================================
// Session grouping
// =============================================================================

/// Default maximum gap in seconds between two log files that still belong to
/// the same session. Applications that open several log files at launch do so
/// within a few seconds; 30 s absorbs slow starts without merging runs.
pub const DEFAULT_GROUP_PERIOD_SECS: u64 = 30;

// =============================================================================
// Live tail limits
// =============================================================================

/// How often each tail thread polls its file for new content (ms).
pub const TAIL_POLL_INTERVAL_MS: u64 = 500;

/// How often the cancel flag is checked within each poll sleep interval (ms).
/// A tail thread wakes every this many ms to check for detachment.
pub const TAIL_CANCEL_CHECK_INTERVAL_MS: u64 = 100;

/// Maximum bytes read from a single file in one poll tick.
/// Prevents a large burst of new content from stalling delivery.
pub const MAX_TAIL_READ_BYTES_PER_TICK: usize = 512 * 1_024; // 512 KiB

/// Maximum accumulated size of the partial (in-progress) line buffer for a
/// single tailed file.
///
/// Guards against OOM when a tailed file produces no newlines — binary
/// content or an extremely long single line. Set to 4x
/// `MAX_TAIL_READ_BYTES_PER_TICK` so legitimate lines up to ~2 MiB are
/// tolerated before the fragment is discarded with a warning.
pub const MAX_TAIL_PARTIAL_BYTES: usize = MAX_TAIL_READ_BYTES_PER_TICK * 4; // 2 MiB

// =============================================================================
// Directory watcher limits
// =============================================================================

/// How often the directory watcher polls for new files (ms).
/// The scan is a single non-recursive directory level, so this is cheap.
pub const DIR_WATCH_POLL_INTERVAL_MS: u64 = 1_000;

/// How often the cancel flag is checked within each directory watch poll
/// sleep (ms).
pub const DIR_WATCH_CANCEL_CHECK_INTERVAL_MS: u64 = 100;

// =============================================================================
// Keyboard reader
// =============================================================================

/// How long the keyboard thread waits for a terminal event before checking
/// the cancel flag (ms).
pub const INPUT_POLL_INTERVAL_MS: u64 = 200;

// =============================================================================
// Output
// =============================================================================

/// Rule line emitted between sessions when the live window resets.
pub const SESSION_SEPARATOR: &str =
    "────────────────────────────────────────────────────────────";

// =============================================================================
// Logging
// =============================================================================

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";
