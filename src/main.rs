// sessiontail - main.rs
//
// Application entry point. Handles:
// 1. CLI argument parsing
// 2. Logging initialisation (debug mode support)
// 3. Startup scan and fatal-path validation
// 4. Thread wiring (tails, directory watcher, keyboard) and the event loop

use chrono::TimeDelta;
use clap::Parser;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};

use sessiontail::app::dir_watcher::DirWatcher;
use sessiontail::app::input;
use sessiontail::app::multiplexer::TailMultiplexer;
use sessiontail::app::runtime::{OutputSink, Runtime};
use sessiontail::core::discovery::scan_log_dir;
use sessiontail::core::format::LineFormatter;
use sessiontail::core::options::OptionsState;
use sessiontail::core::session::{parse_session_stamp, SessionGrouper};
use sessiontail::util;
use sessiontail::util::constants::DEFAULT_GROUP_PERIOD_SECS;
use sessiontail::util::error::{SessionTailError, StartupError};

/// sessiontail - live multiplexed tail for session-based log files.
///
/// Watches a directory of `output_log_<date>_<time>.txt` files, groups the
/// files of the current application run by timestamp proximity, and streams
/// their appended lines to stdout with per-file colouring. Press `?` while
/// running for the interactive commands.
#[derive(Parser, Debug)]
#[command(name = "sessiontail", version, about)]
struct Cli {
    /// Directory containing the session log files.
    dir: PathBuf,

    /// Initial literal substring filter (case-insensitive unless
    /// --case-sensitive is set).
    #[arg(short = 'f', long)]
    filter: Option<String>,

    /// Filter matches are case-sensitive.
    #[arg(short = 'c', long)]
    case_sensitive: bool,

    /// Suppress blank lines.
    #[arg(short = 's', long)]
    ignore_blank_lines: bool,

    /// Disable log-level colouring.
    #[arg(short = 'l', long = "no-colored-log-level")]
    no_colored_log_level: bool,

    /// Omit the date segment embedded in log lines.
    #[arg(short = 'd', long)]
    suppress_log_date: bool,

    /// Maximum gap in seconds between log files of one session.
    #[arg(short = 'g', long, default_value_t = DEFAULT_GROUP_PERIOD_SECS)]
    group_period: u64,

    /// Tail only the files present at startup; do not watch for new ones.
    #[arg(long = "no-watch")]
    no_watch: bool,

    /// Plain output even when stdout is a terminal.
    #[arg(long)]
    no_color: bool,

    /// Enable debug logging (equivalent to RUST_LOG=debug).
    #[arg(long)]
    debug: bool,
}

fn main() {
    let cli = Cli::parse();

    util::logging::init(cli.debug);

    tracing::info!(
        version = util::constants::APP_VERSION,
        dir = %cli.dir.display(),
        watch = !cli.no_watch,
        "sessiontail starting"
    );

    if let Err(e) = run(cli) {
        tracing::error!(error = %e, "Fatal startup error");
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), SessionTailError> {
    let names = scan_log_dir(&cli.dir)?;

    let options = OptionsState {
        filter: cli.filter,
        case_sensitive: cli.case_sensitive,
        ignore_blank_lines: cli.ignore_blank_lines,
        colored_log_level: !cli.no_colored_log_level,
        suppress_log_date: cli.suppress_log_date,
        group_period: TimeDelta::seconds(cli.group_period as i64),
    };

    let grouper = SessionGrouper::classify(&cli.dir, &names, options.group_period);

    if cli.no_watch && grouper.entries().is_empty() {
        return Err(StartupError::NoLogFiles { path: cli.dir }.into());
    }

    let (tx, rx) = mpsc::channel();

    // Raw mode only when stdin is a real terminal; otherwise commands are
    // read line-by-line from the pipe.
    let interactive = std::io::stdin().is_terminal();
    let raw_guard = if interactive {
        Some(RawModeGuard::enable()?)
    } else {
        None
    };

    let input_cancel = Arc::new(AtomicBool::new(false));
    if interactive {
        input::spawn_key_reader(tx.clone(), Arc::clone(&input_cancel));
    } else {
        input::spawn_line_reader(tx.clone(), Arc::clone(&input_cancel));
    }

    // The watcher's known-set is seeded from the startup scan so files that
    // already exist are not reported a second time.
    let watcher = if cli.no_watch {
        None
    } else {
        let known = names
            .iter()
            .filter(|name| parse_session_stamp(name).is_some())
            .cloned()
            .collect();
        Some(DirWatcher::spawn(cli.dir.clone(), known, tx.clone()))
    };

    let colors = !cli.no_color && std::io::stdout().is_terminal();
    let sink = OutputSink::stdout(raw_guard.is_some());
    let multiplexer = TailMultiplexer::new(tx);

    Runtime::new(
        rx,
        options,
        grouper,
        multiplexer,
        LineFormatter::new(colors),
        sink,
    )
    .run();

    // Quit: stop the producers, restore the terminal (guard drop), exit 0.
    input_cancel.store(true, Ordering::SeqCst);
    drop(watcher);
    drop(raw_guard);
    Ok(())
}

/// Puts the terminal into raw mode for the lifetime of the value and always
/// restores it on the way out, quit and error paths alike.
struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> Result<Self, SessionTailError> {
        crossterm::terminal::enable_raw_mode().map_err(|e| SessionTailError::Terminal {
            operation: "enable raw mode",
            source: e,
        })?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = crossterm::terminal::disable_raw_mode();
    }
}
