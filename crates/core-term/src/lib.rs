//! Terminal backend: key acquisition, raw-mode lifecycle, ANSI emission.
//!
//! The rest of the system consumes exactly two seams from here: a blocking
//! [`KeySource`] delivering one logical keypress at a time, and the
//! [`Video`] compositor which is the only writer to the output fd. Raw-mode
//! setup and byte-level escape parsing live behind the crossterm-backed
//! implementations; tests substitute [`ScriptedKeys`] and an in-memory sink.

use anyhow::Result;
use crossterm::{
    cursor::{Hide, Show},
    event::{self, Event, KeyCode as CtKeyCode, KeyEventKind, KeyModifiers as CtMods},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use std::collections::VecDeque;
use std::io::stdout;

pub mod escapes;
pub mod video;

pub use video::Video;

/// One logical keypress, already decoded from its byte sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Char(char),
    Ctrl(char),
    Esc,
    Enter,
    Backspace,
    Tab,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
    Insert,
    Delete,
    F(u8),
}

/// Blocking key supplier. `read_key` parks until one keypress arrives;
/// `None` means the source is exhausted (scripted input) or closed.
pub trait KeySource {
    fn read_key(&mut self) -> Option<Key>;
}

/// Crossterm-backed key source. Key-release/repeat events are filtered so a
/// press is delivered exactly once; resize events are swallowed here (the
/// caller re-queries dimensions on redraw).
#[derive(Default)]
pub struct TermKeys;

impl KeySource for TermKeys {
    fn read_key(&mut self) -> Option<Key> {
        loop {
            match event::read() {
                Ok(Event::Key(k)) if k.kind == KeyEventKind::Press => {
                    if let Some(key) = translate(k.code, k.modifiers) {
                        return Some(key);
                    }
                }
                Ok(_) => continue,
                Err(e) => {
                    tracing::warn!(target: "term.keys", error = %e, "input read failed");
                    return None;
                }
            }
        }
    }
}

fn translate(code: CtKeyCode, mods: CtMods) -> Option<Key> {
    let key = match code {
        CtKeyCode::Char(c) => {
            if mods.contains(CtMods::CONTROL) {
                Key::Ctrl(c.to_ascii_lowercase())
            } else {
                Key::Char(c)
            }
        }
        CtKeyCode::Esc => Key::Esc,
        CtKeyCode::Enter => Key::Enter,
        CtKeyCode::Backspace => Key::Backspace,
        CtKeyCode::Tab => Key::Tab,
        CtKeyCode::Up => Key::Up,
        CtKeyCode::Down => Key::Down,
        CtKeyCode::Left => Key::Left,
        CtKeyCode::Right => Key::Right,
        CtKeyCode::Home => Key::Home,
        CtKeyCode::End => Key::End,
        CtKeyCode::PageUp => Key::PageUp,
        CtKeyCode::PageDown => Key::PageDown,
        CtKeyCode::Insert => Key::Insert,
        CtKeyCode::Delete => Key::Delete,
        CtKeyCode::F(n) => Key::F(n),
        _ => return None,
    };
    Some(key)
}

/// Scripted key source for tests: a fixed queue, then `None`.
#[derive(Debug, Default)]
pub struct ScriptedKeys {
    queue: VecDeque<Key>,
}

impl ScriptedKeys {
    pub fn new(keys: impl IntoIterator<Item = Key>) -> Self {
        Self {
            queue: keys.into_iter().collect(),
        }
    }

    /// Build from a plain string; `\x1b`, `\n`, `\t` and `\x7f` map to
    /// Esc/Enter/Tab/Backspace, everything else to `Key::Char`.
    pub fn typed(s: &str) -> Self {
        let mut queue = VecDeque::new();
        for c in s.chars() {
            queue.push_back(match c {
                '\x1b' => Key::Esc,
                '\n' | '\r' => Key::Enter,
                '\t' => Key::Tab,
                '\x7f' => Key::Backspace,
                c => Key::Char(c),
            });
        }
        Self { queue }
    }

    pub fn push(&mut self, key: Key) {
        self.queue.push_back(key);
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl KeySource for ScriptedKeys {
    fn read_key(&mut self) -> Option<Key> {
        self.queue.pop_front()
    }
}

/// Raw-mode + alternate-screen lifecycle. `enter` is idempotent; the
/// terminal is restored on `leave` or drop, whichever comes first.
pub struct Term {
    entered: bool,
    pub rows: usize,
    pub cols: usize,
}

impl Term {
    pub fn new() -> Result<Self> {
        let (cols, rows) = crossterm::terminal::size().unwrap_or((80, 24));
        Ok(Self {
            entered: false,
            rows: rows as usize,
            cols: cols as usize,
        })
    }

    pub fn enter(&mut self) -> Result<()> {
        if !self.entered {
            enable_raw_mode()?;
            execute!(stdout(), EnterAlternateScreen, Hide)?;
            self.entered = true;
            tracing::debug!(target: "term", rows = self.rows, cols = self.cols, "raw mode entered");
        }
        Ok(())
    }

    pub fn leave(&mut self) -> Result<()> {
        if self.entered {
            execute!(stdout(), LeaveAlternateScreen, Show)?;
            disable_raw_mode()?;
            self.entered = false;
        }
        Ok(())
    }

    /// Re-query the terminal size (after a resize).
    pub fn refresh_size(&mut self) {
        if let Ok((cols, rows)) = crossterm::terminal::size() {
            self.cols = cols as usize;
            self.rows = rows as usize;
        }
    }

    /// Current absolute cursor position, 1-based, via the `ESC [ 6 n` query.
    pub fn cursor_position(&self) -> Result<(usize, usize)> {
        let (col, row) = crossterm::cursor::position()?;
        Ok((row as usize + 1, col as usize + 1))
    }
}

impl Drop for Term {
    fn drop(&mut self) {
        let _ = self.leave();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_keys_typed_mapping() {
        let mut keys = ScriptedKeys::typed("ab\x1b\n");
        assert_eq!(keys.read_key(), Some(Key::Char('a')));
        assert_eq!(keys.read_key(), Some(Key::Char('b')));
        assert_eq!(keys.read_key(), Some(Key::Esc));
        assert_eq!(keys.read_key(), Some(Key::Enter));
        assert_eq!(keys.read_key(), None);
    }

    #[test]
    fn translate_control_chord() {
        let k = translate(CtKeyCode::Char('W'), CtMods::CONTROL).unwrap();
        assert_eq!(k, Key::Ctrl('w'));
        let k = translate(CtKeyCode::Char('x'), CtMods::NONE).unwrap();
        assert_eq!(k, Key::Char('x'));
    }
}
