// sessiontail - core/discovery.rs
//
// Startup directory scan. One directory level, names only: the session
// grouper decides which names are log files, this module only owns the
// filesystem boundary and the fatal-path validation.

use crate::util::error::StartupError;
use std::path::Path;

/// List the filenames (regular files only) in the log directory.
///
/// # Fatal errors
/// Returns `Err` when the root is missing, not a directory, or unreadable —
/// the fatal startup conditions. Per-entry oddities (non-UTF-8 names,
/// entries vanishing mid-scan) are skipped silently; a log directory always
/// contains noise.
pub fn scan_log_dir(root: &Path) -> Result<Vec<String>, StartupError> {
    let metadata = std::fs::metadata(root).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            StartupError::RootNotFound {
                path: root.to_path_buf(),
            }
        } else {
            StartupError::ReadDir {
                path: root.to_path_buf(),
                source: e,
            }
        }
    })?;

    if !metadata.is_dir() {
        return Err(StartupError::NotADirectory {
            path: root.to_path_buf(),
        });
    }

    let reader = std::fs::read_dir(root).map_err(|e| StartupError::ReadDir {
        path: root.to_path_buf(),
        source: e,
    })?;

    let mut names = Vec::new();
    for entry in reader.flatten() {
        let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
        if !is_file {
            continue;
        }
        if let Ok(name) = entry.file_name().into_string() {
            names.push(name);
        }
    }

    tracing::debug!(root = %root.display(), names = names.len(), "Startup scan complete");
    Ok(names)
}

// =============================================================================
// Tests
// =============================================================================
