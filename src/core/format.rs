// sessiontail - core/format.rs
//
// Line decoration: (raw line, source index, live options) -> printable
// record, or suppression.
//
// Every accepted line gets a wall-clock arrival prefix and its source's
// bracketed display index. Each source is coloured from a cyclic palette
// keyed by the index; a recognised log-level header is re-coloured by level
// so warnings and errors stand out inside the source colour.
//
// Core layer: pure logic — colour emission is the only terminal-specific
// concern, and it reduces to string formatting via crossterm's Stylize.

use crate::core::options::OptionsState;
use chrono::{DateTime, Local};
use crossterm::style::{Color, Stylize};
use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;

/// Leading `YYYY.MM.DD HH:mm:ss <Level>` header written by the logging
/// runtime of the tailed application.
static LOG_LEVEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4}\.\d{2}\.\d{2} \d{2}:\d{2}:\d{2}) (Log|Warning|Error|Exception)")
        .expect("log level pattern must compile")
});

/// The embedded log date segment stripped by `suppress_log_date`.
static LOG_DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{4}\.\d{2}\.\d{2} \d{2}:\d{2}:\d{2} ").expect("log date pattern must compile")
});

/// Cyclic per-source palette, keyed by `display_index % len`.
const SOURCE_PALETTE: [Color; 6] = [
    Color::Green,
    Color::Blue,
    Color::Magenta,
    Color::Cyan,
    Color::White,
    Color::Grey,
];

/// Level colours, distinct in role from the per-source palette.
fn level_color(level: &str) -> Color {
    match level {
        "Warning" => Color::Yellow,
        "Error" | "Exception" => Color::Red,
        _ => Color::Blue, // "Log"
    }
}

// =============================================================================
// Formatter
// =============================================================================

/// Stateless line decorator. Holds only the colour switch; all per-line
/// behaviour comes from the `OptionsState` passed to each call.
pub struct LineFormatter {
    colors_enabled: bool,
}

impl LineFormatter {
    /// `colors_enabled` is false when stdout is not a terminal or the user
    /// passed --no-color; the emitted text is identical either way, minus
    /// the escape sequences.
    pub fn new(colors_enabled: bool) -> Self {
        Self { colors_enabled }
    }

    /// Decorate one raw line from the source at `display_index`.
    ///
    /// Returns `None` when the line is suppressed by the filter or the
    /// blank-line option.
    pub fn format(
        &self,
        raw: &str,
        display_index: usize,
        options: &OptionsState,
    ) -> Option<String> {
        if !matches_filter(raw, options) {
            return None;
        }
        if options.ignore_blank_lines && raw.is_empty() {
            return None;
        }

        let prefix = format!("{} [{display_index}] ", wall_clock_stamp(Local::now()));
        let index_color = SOURCE_PALETTE[display_index % SOURCE_PALETTE.len()];

        if options.colored_log_level {
            if let Some(caps) = LOG_LEVEL_RE.captures(raw) {
                let date = &caps[1];
                let level = &caps[2];
                // The pattern is anchored, so the match length is the end of
                // the header within `raw`.
                let rest = &raw[caps[0].len()..];

                let level_segment = if options.suppress_log_date {
                    level.to_string()
                } else {
                    format!("{date} {level}")
                };

                return Some(if self.colors_enabled {
                    format!(
                        "{}{}{}",
                        prefix.with(index_color),
                        level_segment.with(level_color(level)),
                        rest.with(index_color)
                    )
                } else {
                    format!("{prefix}{level_segment}{rest}")
                });
            }
        }

        let body: Cow<'_, str> = if options.suppress_log_date {
            LOG_DATE_RE.replace(raw, "")
        } else {
            Cow::Borrowed(raw)
        };

        let plain = format!("{prefix}{body}");
        Some(if self.colors_enabled {
            plain.with(index_color).to_string()
        } else {
            plain
        })
    }
}

/// Literal substring filter check. Case-insensitive matching lowercases both
/// sides rather than escaping the text into a pattern engine.
fn matches_filter(raw: &str, options: &OptionsState) -> bool {
    let Some(filter) = options.filter.as_deref() else {
        return true;
    };
    if options.case_sensitive {
        raw.contains(filter)
    } else {
        raw.to_lowercase().contains(&filter.to_lowercase())
    }
}

/// Arrival timestamp in the `YYYY-MM-DD HH:mm:ss.ffff` shape, the fraction
/// being a four-digit millisecond field.
fn wall_clock_stamp(now: DateTime<Local>) -> String {
    format!(
        "{}.{:04}",
        now.format("%Y-%m-%d %H:%M:%S"),
        now.timestamp_subsec_millis()
    )
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn plain_formatter() -> LineFormatter {
        LineFormatter::new(false)
    }

    #[test]
    fn test_wall_clock_stamp_shape() {
        let now = Local.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap()
            + chrono::TimeDelta::milliseconds(42);
        assert_eq!(wall_clock_stamp(now), "2024-01-01 10:00:00.0042");
    }

    /// Without a level match the body passes through untouched after the
    /// prefix/index decoration.
    #[test]
    fn test_plain_line_round_trips() {
        let options = OptionsState::default();
        let out = plain_formatter()
            .format("hello world", 3, &options)
            .unwrap();
        assert!(out.ends_with("hello world"), "got {out}");
        assert!(out.contains("[3] "), "got {out}");
        assert!(!out.contains('\u{1b}'), "plain output must carry no escapes");
    }

    #[test]
    fn test_blank_line_boundary() {
        let mut options = OptionsState::default();
        let formatter = plain_formatter();

        assert!(formatter.format("", 0, &options).is_some());
        options.ignore_blank_lines = true;
        assert!(formatter.format("", 0, &options).is_none());
        // Only zero-length lines count as blank.
        assert!(formatter.format(" ", 0, &options).is_some());
    }

    #[test]
    fn test_filter_is_case_insensitive_by_default() {
        let mut options = OptionsState::default();
        options.filter = Some("abc".to_string());
        let formatter = plain_formatter();

        assert!(formatter.format("xABCy", 0, &options).is_some());
        assert!(formatter.format("xyz", 0, &options).is_none());
    }

    #[test]
    fn test_case_sensitive_filter_requires_exact_case() {
        let mut options = OptionsState::default();
        options.filter = Some("abc".to_string());
        options.case_sensitive = true;
        let formatter = plain_formatter();

        assert!(formatter.format("xABCy", 0, &options).is_none());
        assert!(formatter.format("xabcy", 0, &options).is_some());
    }

    /// Filter text is a literal, not a pattern: regex metacharacters match
    /// themselves.
    #[test]
    fn test_filter_text_is_literal() {
        let mut options = OptionsState::default();
        options.filter = Some("a.c".to_string());
        let formatter = plain_formatter();

        assert!(formatter.format("xa.cy", 0, &options).is_some());
        assert!(formatter.format("xabcy", 0, &options).is_none());
    }

    #[test]
    fn test_level_header_retained_with_dates() {
        let options = OptionsState::default();
        let out = plain_formatter()
            .format("2024.01.01 10:00:00 Error something failed", 0, &options)
            .unwrap();
        assert!(out.contains("2024.01.01 10:00:00 Error something failed"));
    }

    #[test]
    fn test_suppress_log_date_keeps_level_token() {
        let mut options = OptionsState::default();
        options.suppress_log_date = true;
        let out = plain_formatter()
            .format("2024.01.01 10:00:00 Error something failed", 0, &options)
            .unwrap();
        assert!(!out.contains("2024.01.01 10:00:00"), "got {out}");
        assert!(out.contains("Error something failed"), "got {out}");
    }

    /// With level colouring off, date suppression still strips the embedded
    /// date from level-less and level-bearing lines alike.
    #[test]
    fn test_suppress_log_date_without_level_colouring() {
        let mut options = OptionsState::default();
        options.colored_log_level = false;
        options.suppress_log_date = true;
        let formatter = plain_formatter();

        let out = formatter
            .format("2024.01.01 10:00:00 loading world", 1, &options)
            .unwrap();
        assert!(out.ends_with("loading world"), "got {out}");
        assert!(!out.contains("2024.01.01"), "got {out}");
    }

    #[test]
    fn test_colored_output_carries_escapes() {
        let options = OptionsState::default();
        let formatter = LineFormatter::new(true);

        let out = formatter
            .format("2024.01.01 10:00:00 Warning low memory", 0, &options)
            .unwrap();
        assert!(out.contains('\u{1b}'), "expected escapes, got {out:?}");
        assert!(out.contains("Warning"));

        // A level-less line is coloured as a single segment.
        let plain = formatter.format("hello", 0, &options).unwrap();
        assert!(plain.contains('\u{1b}'));
        assert!(plain.contains("hello"));
    }

    /// The level header is only special when it starts the line.
    #[test]
    fn test_level_header_must_anchor_at_line_start() {
        let mut options = OptionsState::default();
        options.suppress_log_date = true;
        let out = plain_formatter()
            .format("prefix 2024.01.01 10:00:00 Error x", 0, &options)
            .unwrap();
        assert!(
            out.contains("prefix 2024.01.01 10:00:00 Error x"),
            "mid-line headers must pass through untouched, got {out}"
        );
    }

    #[test]
    fn test_palette_cycles_by_display_index() {
        let options = OptionsState::default();
        let formatter = LineFormatter::new(true);

        // The opening SGR sequence is the source colour.
        fn opening_sgr(s: &str) -> &str {
            &s[..s.find('m').expect("coloured output starts with an SGR") + 1]
        }

        let a = formatter.format("x", 0, &options).unwrap();
        let b = formatter.format("x", SOURCE_PALETTE.len(), &options).unwrap();
        let c = formatter.format("x", 1, &options).unwrap();

        assert_eq!(opening_sgr(&a), opening_sgr(&b), "palette must wrap");
        assert_ne!(
            opening_sgr(&a),
            opening_sgr(&c),
            "adjacent indices must differ"
        );
    }
}
