// sessiontail - app/runtime.rs
//
// The single-consumer event loop and the messages that feed it.
//
// Every producer thread (tails, directory watcher, keyboard reader) holds a
// clone of one `Sender<RuntimeEvent>`; this loop is the only receiver and
// the only place that touches OptionsState, the grouper, the multiplexer,
// and the output sink. Option mutation and line formatting are therefore
// single-threaded by construction — no locks.
//
// Output records are emitted in channel-arrival order across sources; lines
// from different files interleave by wall-clock arrival, not by their
// embedded log timestamps.

use crate::app::multiplexer::TailMultiplexer;
use crate::core::format::LineFormatter;
use crate::core::options::{ControlEffect, InputKey, InteractiveOptionsController, OptionsState};
use crate::core::session::SessionGrouper;
use crate::util::constants::SESSION_SEPARATOR;
use std::io::Write;
use std::sync::mpsc;

// =============================================================================
// Messages
// =============================================================================

/// Identifies one tail attachment for the lifetime of the process. Never
/// reused, so an event from a detached tail can never alias a live one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TailId(pub u64);

/// The event vocabulary of the loop.
#[derive(Debug)]
pub enum RuntimeEvent {
    /// A complete line appended to a tailed file.
    Line { id: TailId, line: String },
    /// A non-fatal problem inside a tail thread.
    TailWarning { id: TailId, message: String },
    /// A file appeared in the watched directory.
    FileAppeared { name: String },
    /// One unit of interactive input.
    Key(InputKey),
    /// stdin reached EOF (line-buffered variant only).
    InputClosed,
}

// =============================================================================
// Output sink
// =============================================================================

/// Serialised writer for everything the user sees on stdout.
///
/// While the terminal is in raw mode the kernel no longer translates `\n`,
/// so the sink owns the line terminator. The target is injectable for the
/// end-to-end tests.
pub struct OutputSink {
    raw_mode: bool,
    target: Box<dyn Write + Send>,
}

impl OutputSink {
    pub fn stdout(raw_mode: bool) -> Self {
        Self::new(raw_mode, Box::new(std::io::stdout()))
    }

    pub fn new(raw_mode: bool, target: Box<dyn Write + Send>) -> Self {
        Self { raw_mode, target }
    }

    /// Write one terminated output line.
    pub fn line(&mut self, text: &str) {
        let terminator = self.terminator();
        let _ = write!(self.target, "{text}{terminator}");
        let _ = self.target.flush();
    }

    /// Write a possibly multi-line notice (help, confirmations).
    pub fn notice(&mut self, text: &str) {
        for line in text.split('\n') {
            self.line(line);
        }
    }

    /// Echo one character of filter input without a terminator.
    pub fn echo(&mut self, c: char) {
        if c == '\n' {
            let terminator = self.terminator();
            let _ = write!(self.target, "{terminator}");
        } else {
            let _ = write!(self.target, "{c}");
        }
        let _ = self.target.flush();
    }

    fn terminator(&self) -> &'static str {
        if self.raw_mode {
            "\r\n"
        } else {
            "\n"
        }
    }
}

// =============================================================================
// Event loop
// =============================================================================

pub struct Runtime {
    rx: mpsc::Receiver<RuntimeEvent>,
    options: OptionsState,
    grouper: SessionGrouper,
    multiplexer: TailMultiplexer,
    controller: InteractiveOptionsController,
    formatter: LineFormatter,
    sink: OutputSink,
}

impl Runtime {
    pub fn new(
        rx: mpsc::Receiver<RuntimeEvent>,
        options: OptionsState,
        grouper: SessionGrouper,
        multiplexer: TailMultiplexer,
        formatter: LineFormatter,
        sink: OutputSink,
    ) -> Self {
        Self {
            rx,
            options,
            grouper,
            multiplexer,
            controller: InteractiveOptionsController::new(),
            formatter,
            sink,
        }
    }

    /// Attach the startup window and dispatch events until the user quits
    /// or every producer is gone.
    pub fn run(mut self) {
        self.sync_window();

        while let Ok(event) = self.rx.recv() {
            if self.dispatch(event) == Flow::Quit {
                break;
            }
        }
        self.multiplexer.shutdown();
    }

    fn dispatch(&mut self, event: RuntimeEvent) -> Flow {
        match event {
            RuntimeEvent::Line { id, line } => {
                // Membership check: a line racing its tail's detachment is
                // dropped, never formatted against a stale index.
                if let Some(index) = self.multiplexer.display_index(id) {
                    if let Some(text) = self.formatter.format(&line, index, &self.options) {
                        self.sink.line(&text);
                    }
                } else {
                    tracing::trace!("Dropped line from a detached tail");
                }
            }

            RuntimeEvent::TailWarning { id, message } => match self.multiplexer.path_of(id) {
                Some(path) => {
                    tracing::warn!(file = %path.display(), %message, "Tail warning");
                }
                None => tracing::trace!(%message, "Warning from a detached tail"),
            },

            RuntimeEvent::FileAppeared { name } => {
                if self.grouper.on_file_appeared(&name, self.options.group_period) {
                    self.sync_window();
                }
            }

            RuntimeEvent::Key(key) => {
                for effect in self.controller.handle(key, &mut self.options) {
                    match effect {
                        ControlEffect::Quit => return Flow::Quit,
                        ControlEffect::Notice(text) => self.sink.notice(&text),
                        ControlEffect::Echo(c) => self.sink.echo(c),
                    }
                }
            }

            RuntimeEvent::InputClosed => {
                tracing::debug!("Interactive input closed; tailing continues");
            }
        }
        Flow::Continue
    }

    /// Reconcile tails with the current window and render the side effects:
    /// a separator on a session boundary, a warning per skipped entry.
    fn sync_window(&mut self) {
        let report = self.multiplexer.sync(self.grouper.window());
        if report.reset {
            self.sink.line(SESSION_SEPARATOR);
        }
        for (path, error) in &report.failures {
            tracing::warn!(
                file = %path.display(),
                %error,
                "Cannot attach log file; entry skipped"
            );
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

// =============================================================================
// Tests
// =============================================================================
