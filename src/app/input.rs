// sessiontail - app/input.rs
//
// Interactive control channel: reads stdin on a background thread and
// forwards normalised `InputKey` units to the event loop.
//
// Two variants, chosen by the caller:
//   - `spawn_key_reader`: stdin is a terminal. crossterm delivers key
//     events one keystroke at a time (the terminal is in raw mode); the
//     reader polls with a short timeout so the cancel flag is honoured.
//   - `spawn_line_reader`: stdin is a pipe or file. Each line's characters
//     are fed through the same state machine followed by Enter, which gives
//     the line-buffered command variant for free.

use crate::app::runtime::RuntimeEvent;
use crate::core::options::InputKey;
use crate::util::constants::INPUT_POLL_INTERVAL_MS;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::time::Duration;

/// Start the raw-mode keyboard reader.
pub fn spawn_key_reader(tx: mpsc::Sender<RuntimeEvent>, cancel: Arc<AtomicBool>) {
    std::thread::spawn(move || {
        loop {
            if cancel.load(Ordering::SeqCst) {
                return;
            }
            match event::poll(Duration::from_millis(INPUT_POLL_INTERVAL_MS)) {
                Ok(false) => continue,
                Ok(true) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "Keyboard poll failed; stopping input reader");
                    return;
                }
            }
            let Ok(ev) = event::read() else {
                continue;
            };
            if let Some(key) = map_terminal_event(&ev) {
                if tx.send(RuntimeEvent::Key(key)).is_err() {
                    return;
                }
            }
        }
    });
}

/// Start the line-buffered stdin reader (non-terminal stdin).
pub fn spawn_line_reader(tx: mpsc::Sender<RuntimeEvent>, cancel: Arc<AtomicBool>) {
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            if cancel.load(Ordering::SeqCst) {
                return;
            }
            let Ok(line) = line else {
                break;
            };
            for c in line.chars() {
                if tx.send(RuntimeEvent::Key(InputKey::Char(c))).is_err() {
                    return;
                }
            }
            if tx.send(RuntimeEvent::Key(InputKey::Enter)).is_err() {
                return;
            }
        }
        // EOF: interactive control ends, tailing continues.
        let _ = tx.send(RuntimeEvent::InputClosed);
    });
}

/// Map a terminal event to an input unit. Non-key events, key releases, and
/// keys outside the command alphabet map to `None` (ignored).
fn map_terminal_event(ev: &Event) -> Option<InputKey> {
    let Event::Key(key) = ev else {
        return None;
    };
    if key.kind != KeyEventKind::Press {
        return None;
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c') => Some(InputKey::CtrlC),
            _ => None,
        };
    }
    match key.code {
        KeyCode::Char(c) => Some(InputKey::Char(c)),
        KeyCode::Enter => Some(InputKey::Enter),
        _ => None,
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyEvent, KeyEventState};

    fn press(code: KeyCode, modifiers: KeyModifiers) -> Event {
        Event::Key(KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        })
    }

    #[test]
    fn test_maps_plain_characters_and_enter() {
        assert_eq!(
            map_terminal_event(&press(KeyCode::Char('q'), KeyModifiers::NONE)),
            Some(InputKey::Char('q'))
        );
        assert_eq!(
            map_terminal_event(&press(KeyCode::Enter, KeyModifiers::NONE)),
            Some(InputKey::Enter)
        );
    }

    #[test]
    fn test_maps_ctrl_c() {
        assert_eq!(
            map_terminal_event(&press(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(InputKey::CtrlC)
        );
        // Other control chords are ignored, not misread as text.
        assert_eq!(
            map_terminal_event(&press(KeyCode::Char('d'), KeyModifiers::CONTROL)),
            None
        );
    }

    #[test]
    fn test_ignores_releases_and_special_keys() {
        let release = Event::Key(KeyEvent {
            code: KeyCode::Char('q'),
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Release,
            state: KeyEventState::NONE,
        });
        assert_eq!(map_terminal_event(&release), None);
        assert_eq!(
            map_terminal_event(&press(KeyCode::Backspace, KeyModifiers::NONE)),
            None
        );
        assert_eq!(
            map_terminal_event(&press(KeyCode::Up, KeyModifiers::NONE)),
            None
        );
    }
}
