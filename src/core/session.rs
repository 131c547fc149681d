// sessiontail - core/session.rs
//
// Session grouping: classifies discovered log files into time-ordered
// entries and partitions them into the live session window.
//
// A "session" is a maximal run of log files whose filename timestamps are
// each within `group_period` of the previous one. Applications that open
// several log files at launch produce tight clusters; a gap wider than the
// period marks a new run. Only the newest cluster (the window) is tailed.
//
// Core layer: pure logic, no I/O.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use regex::Regex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Anchored filename pattern for session log files, e.g.
/// `output_log_2024-01-01_10-00-00.txt`. Anything else in the directory is
/// ignored without comment; stray files are expected noise.
static SESSION_LOG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^output_log_(\d+)-(\d+)-(\d+)_(\d+)-(\d+)-(\d+)\.txt$")
        .expect("session log filename pattern must compile")
});

/// Parse the session timestamp embedded in a log filename.
///
/// Returns `None` for filenames that do not match the pattern, and for
/// numeric combinations the calendar rejects (month 13 and the like);
/// those files are simply not candidates, never errors.
pub fn parse_session_stamp(name: &str) -> Option<NaiveDateTime> {
    let caps = SESSION_LOG_RE.captures(name)?;
    let field = |i: usize| caps[i].parse::<u32>().ok();

    let date = NaiveDate::from_ymd_opt(field(1)? as i32, field(2)?, field(3)?)?;
    let time = NaiveTime::from_hms_opt(field(4)?, field(5)?, field(6)?)?;
    Some(NaiveDateTime::new(date, time))
}

// =============================================================================
// Entries
// =============================================================================

/// A discovered session log file with its filename timestamp.
///
/// Immutable once created. Owned by `SessionGrouper`; the multiplexer refers
/// to entries by path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFileEntry {
    /// Full path to the log file.
    pub path: PathBuf,
    /// Timestamp parsed from the filename (second resolution, local wall
    /// clock; filenames carry no timezone).
    pub stamp: NaiveDateTime,
}

// =============================================================================
// SessionGrouper
// =============================================================================

/// Orders discovered log files by their filename timestamp and maintains the
/// live session window.
///
/// Invariants:
///   - `entries` is sorted ascending by `stamp`; equal stamps keep discovery
///     order; no duplicate paths.
///   - The window is the suffix `entries[window_start..]` in which every
///     consecutive pair is at most `group_period` apart, and it is the
///     maximal such suffix, recomputed after every insertion.
///   - `entries` grows monotonically. Files that fall out of the window stay
///     in the sequence as a historical record; they are just no longer live.
pub struct SessionGrouper {
    root: PathBuf,
    entries: Vec<LogFileEntry>,
    known: HashSet<PathBuf>,
    window_start: usize,
}

impl SessionGrouper {
    /// Classify a startup directory listing.
    ///
    /// Filenames that do not match the session-log pattern are dropped here;
    /// matching files are ordered ascending by parsed timestamp (listing
    /// order preserved for equal stamps) and the initial window is computed.
    pub fn classify<I>(root: &Path, names: I, group_period: TimeDelta) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut entries: Vec<LogFileEntry> = names
            .into_iter()
            .filter_map(|name| {
                let name = name.as_ref();
                parse_session_stamp(name).map(|stamp| LogFileEntry {
                    path: root.join(name),
                    stamp,
                })
            })
            .collect();

        // Stable sort: discovery order is the tie-break for equal stamps.
        entries.sort_by_key(|e| e.stamp);

        let known = entries.iter().map(|e| e.path.clone()).collect();

        let mut grouper = Self {
            root: root.to_path_buf(),
            entries,
            known,
            window_start: 0,
        };
        grouper.recompute_window(group_period);

        tracing::debug!(
            entries = grouper.entries.len(),
            window = grouper.window().len(),
            "Session classification complete"
        );
        grouper
    }

    /// Record a file that appeared after startup.
    ///
    /// Returns `true` if the filename matched the pattern and was inserted
    /// (i.e. the window may have changed and the caller should re-sync the
    /// multiplexer); `false` for non-matching names and duplicates.
    pub fn on_file_appeared(&mut self, name: &str, group_period: TimeDelta) -> bool {
        let Some(stamp) = parse_session_stamp(name) else {
            return false;
        };

        let path = self.root.join(name);
        if !self.known.insert(path.clone()) {
            tracing::trace!(file = name, "Duplicate file event ignored");
            return false;
        }

        // Insert after any equal stamps so ties keep discovery order.
        let idx = self.entries.partition_point(|e| e.stamp <= stamp);
        self.entries.insert(idx, LogFileEntry { path, stamp });
        self.recompute_window(group_period);

        tracing::debug!(
            file = name,
            window = self.window().len(),
            "New session log file recorded"
        );
        true
    }

    /// The live session window: every entry here should have an active tail.
    pub fn window(&self) -> &[LogFileEntry] {
        &self.entries[self.window_start..]
    }

    /// All entries ever discovered, ascending by stamp.
    pub fn entries(&self) -> &[LogFileEntry] {
        &self.entries
    }

    /// Recompute the window as the maximal bounded-gap suffix.
    ///
    /// The same rule serves the startup scan and live appends; insertion
    /// order never changes the result, only the timestamps do.
    fn recompute_window(&mut self, group_period: TimeDelta) {
        if self.entries.is_empty() {
            self.window_start = 0;
            return;
        }
        let mut start = self.entries.len() - 1;
        while start > 0
            && self.entries[start].stamp - self.entries[start - 1].stamp <= group_period
        {
            start -= 1;
        }
        self.window_start = start;
    }
}

// =============================================================================
// Tests
// =============================================================================
