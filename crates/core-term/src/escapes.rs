//! The exact escape sequences the compositor emits.
//!
//! These bytes are part of the external contract; renderers diffing our
//! output depend on them verbatim. Formatting helpers return owned strings
//! appended into the video's scratch render buffer.

pub const CURSOR_HIDE: &str = "\x1b[?25l";
pub const CURSOR_SHOW: &str = "\x1b[?25h";
pub const SCREEN_SAVE: &str = "\x1b[?47h";
pub const SCREEN_RESTORE: &str = "\x1b[?47l";
pub const SCREEN_CLEAR: &str = "\x1b[2J";
pub const LINE_CLR_EOL: &str = "\x1b[2K";
pub const GET_CURSOR_POS: &str = "\x1b[6n";
pub const COLOR_RESET: &str = "\x1b[m";
pub const BOLD: &str = "\x1b[1m";
pub const ITALIC: &str = "\x1b[3m";
pub const UNDERLINE: &str = "\x1b[4m";
pub const INVERTED: &str = "\x1b[7m";

/// `ESC [ <row> ; <col> H` — absolute move, 1-based.
pub fn goto(row: usize, col: usize) -> String {
    format!("\x1b[{row};{col}H")
}

/// `ESC [ <top> ; <bot> r` — scroll region.
pub fn scroll_region(top: usize, bot: usize) -> String {
    format!("\x1b[{top};{bot}r")
}

/// `ESC [ <n> m` — SGR foreground color.
pub fn color(n: u8) -> String {
    format!("\x1b[{n}m")
}

/// Standard foreground color numbers used across the UI.
pub mod colors {
    pub const RED: u8 = 31;
    pub const GREEN: u8 = 32;
    pub const YELLOW: u8 = 33;
    pub const BLUE: u8 = 34;
    pub const MAGENTA: u8 = 35;
    pub const CYAN: u8 = 36;
    pub const WHITE: u8 = 37;
}

/// Strip SGR/CSI sequences; used by tests asserting rendered cell widths.
pub fn strip_sgr(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\x1b' && chars.peek() == Some(&'[') {
            chars.next();
            for c2 in chars.by_ref() {
                if c2.is_ascii_alphabetic() {
                    break;
                }
            }
        } else {
            out.push(c);
        }
    }
    out
}
