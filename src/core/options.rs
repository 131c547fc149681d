// sessiontail - core/options.rs
//
// Live-mutable output options and the interactive command state machine.
//
// The options struct is owned by the event loop and passed by reference to
// the formatter; the controller is the only mutator. Both run on the same
// loop, so no locking is involved.
// Core layer: pure logic, no I/O.

use crate::util::constants::DEFAULT_GROUP_PERIOD_SECS;
use chrono::TimeDelta;

// =============================================================================
// Options
// =============================================================================

/// The option set read by the formatter on every line.
#[derive(Debug, Clone)]
pub struct OptionsState {
    /// Literal substring filter. `None` = no filter.
    pub filter: Option<String>,

    /// When true, filter matches are exact-case; otherwise both sides are
    /// lowercased before comparison.
    pub case_sensitive: bool,

    /// Suppress zero-length lines.
    pub ignore_blank_lines: bool,

    /// Colour the leading `YYYY.MM.DD HH:mm:ss <Level>` segment by level.
    pub colored_log_level: bool,

    /// Omit the embedded log date segment from the emitted body.
    pub suppress_log_date: bool,

    /// Maximum gap between log files of the same session.
    pub group_period: TimeDelta,
}

impl Default for OptionsState {
    fn default() -> Self {
        Self {
            filter: None,
            case_sensitive: false,
            ignore_blank_lines: false,
            colored_log_level: true,
            suppress_log_date: false,
            group_period: TimeDelta::seconds(DEFAULT_GROUP_PERIOD_SECS as i64),
        }
    }
}

// =============================================================================
// Controller
// =============================================================================

/// One unit of interactive input, normalised away from any particular
/// terminal backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKey {
    Char(char),
    Enter,
    CtrlC,
}

/// Side effects the event loop applies after a key is handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlEffect {
    /// Terminate the process with exit code 0.
    Quit,
    /// Print a `> `-prefixed line (confirmations, help).
    Notice(String),
    /// Echo a character of filter input as typed (raw mode does not echo).
    Echo(char),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Normal,
    FilterEntry,
}

const HELP_TEXT: &str = "> Commands:\n\
                         >   ? - show this help\n\
                         >   q - quit\n\
                         >   c - toggle case sensitive filter\n\
                         >   s - toggle ignore blank lines\n\
                         >   l - toggle coloured log level\n\
                         >   d - toggle suppress log date\n\
                         >   /<text> - set filter\n\
                         >   r - reset filter";

/// Two-mode command state machine over single keystrokes.
///
/// Transitions are total: every key in every mode has a defined (possibly
/// no-op) effect. The only exit is the explicit quit command.
pub struct InteractiveOptionsController {
    mode: Mode,
    buffer: String,
}

impl InteractiveOptionsController {
    pub fn new() -> Self {
        Self {
            mode: Mode::Normal,
            buffer: String::new(),
        }
    }

    /// Apply one input unit, mutating `options` as commanded.
    pub fn handle(&mut self, key: InputKey, options: &mut OptionsState) -> Vec<ControlEffect> {
        // Ctrl-C quits from either mode.
        if key == InputKey::CtrlC {
            return vec![ControlEffect::Quit];
        }

        match self.mode {
            Mode::Normal => self.handle_normal(key, options),
            Mode::FilterEntry => self.handle_filter_entry(key, options),
        }
    }

    fn handle_normal(&mut self, key: InputKey, options: &mut OptionsState) -> Vec<ControlEffect> {
        let InputKey::Char(c) = key else {
            return Vec::new(); // Enter outside filter entry is a no-op
        };

        match c {
            '?' => vec![ControlEffect::Notice(HELP_TEXT.to_string())],
            'q' => vec![ControlEffect::Quit],
            'c' => {
                options.case_sensitive = !options.case_sensitive;
                vec![notice("case_sensitive", options.case_sensitive)]
            }
            's' => {
                options.ignore_blank_lines = !options.ignore_blank_lines;
                vec![notice("ignore_blank_lines", options.ignore_blank_lines)]
            }
            'l' => {
                options.colored_log_level = !options.colored_log_level;
                vec![notice("colored_log_level", options.colored_log_level)]
            }
            'd' => {
                options.suppress_log_date = !options.suppress_log_date;
                vec![notice("suppress_log_date", options.suppress_log_date)]
            }
            'r' => {
                options.filter = None;
                vec![ControlEffect::Notice("> filter cleared".to_string())]
            }
            '/' => {
                self.mode = Mode::FilterEntry;
                self.buffer.clear();
                vec![ControlEffect::Echo('/')]
            }
            _ => Vec::new(),
        }
    }

    fn handle_filter_entry(
        &mut self,
        key: InputKey,
        options: &mut OptionsState,
    ) -> Vec<ControlEffect> {
        match key {
            InputKey::Char(c) => {
                self.buffer.push(c);
                vec![ControlEffect::Echo(c)]
            }
            InputKey::Enter => {
                let filter = std::mem::take(&mut self.buffer);
                self.mode = Mode::Normal;
                let effect = ControlEffect::Notice(format!("> filter = {filter}"));
                options.filter = Some(filter);
                vec![ControlEffect::Echo('\n'), effect]
            }
            InputKey::CtrlC => unreachable!("handled before mode dispatch"),
        }
    }
}

impl Default for InteractiveOptionsController {
    fn default() -> Self {
        Self::new()
    }
}

fn notice(name: &str, value: bool) -> ControlEffect {
    ControlEffect::Notice(format!("> {name} = {value}"))
}

// =============================================================================
// Tests
// =============================================================================
