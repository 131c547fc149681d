// sessiontail - util/error.rs
//
// Typed error hierarchy with context-preserving error chains.
// No string-based error propagation; all errors preserve the causal chain
// for diagnostic logging.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Top-level error type for all sessiontail operations.
/// Errors are categorised by the subsystem that produced them.
#[derive(Debug)]
pub enum SessionTailError {
    /// Startup validation of the log directory failed.
    Startup(StartupError),

    /// The terminal could not be put into (or taken out of) raw mode.
    Terminal { operation: &'static str, source: io::Error },

    /// I/O error with path context.
    Io {
        path: PathBuf,
        operation: &'static str,
        source: io::Error,
    },
}

impl fmt::Display for SessionTailError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Startup(e) => write!(f, "Startup error: {e}"),
            Self::Terminal { operation, source } => {
                write!(f, "Terminal error during {operation}: {source}")
            }
            Self::Io {
                path,
                operation,
                source,
            } => write!(
                f,
                "I/O error during {operation} on '{}': {source}",
                path.display()
            ),
        }
    }
}

impl std::error::Error for SessionTailError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Startup(e) => Some(e),
            Self::Terminal { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
        }
    }
}

// ---------------------------------------------------------------------------
// Startup errors
// ---------------------------------------------------------------------------

/// Fatal startup conditions. These terminate the process with exit code 1
/// and are never retried.
#[derive(Debug)]
pub enum StartupError {
    /// The log directory does not exist or is not accessible.
    RootNotFound { path: PathBuf },

    /// The log directory path exists but is not a directory.
    NotADirectory { path: PathBuf },

    /// No filenames matched the session-log pattern at startup.
    /// Only fatal when watch mode is off; with watching enabled the tool
    /// waits for files to appear instead.
    NoLogFiles { path: PathBuf },

    /// The directory listing itself could not be read.
    ReadDir { path: PathBuf, source: io::Error },
}

impl fmt::Display for StartupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RootNotFound { path } => {
                write!(f, "Log directory '{}' does not exist", path.display())
            }
            Self::NotADirectory { path } => {
                write!(f, "Log path '{}' is not a directory", path.display())
            }
            Self::NoLogFiles { path } => {
                write!(f, "No log files found in '{}'", path.display())
            }
            Self::ReadDir { path, source } => {
                write!(f, "Cannot list '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for StartupError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ReadDir { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<StartupError> for SessionTailError {
    fn from(e: StartupError) -> Self {
        Self::Startup(e)
    }
}

/// Convenience type alias for sessiontail results.
pub type Result<T> = std::result::Result<T, SessionTailError>;
