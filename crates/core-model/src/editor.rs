//! One editor instance.
//!
//! An editor owns its windows, the video/terminal pair, the register file,
//! history, the filetype registry, the action tables, and the special
//! scratch buffers (`[messages]`, `[search]`, `[diff]`, `[scratch]`) hosted
//! in a special window that default cycling skips. Screen geometry reserves
//! one top line, one message line and one prompt line; everything between
//! belongs to the current window's frames.

use crate::window::{Window, WindowType};
use core_config::{Settings, VedDirs};
use core_rline::History;
use core_search::Search;
use core_state::{
    Buffer, BufferFlags, EditOutcome, FrameDim, Ftype, Register, Registers, Row, Syntax, ftype,
};
use core_term::Video;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};

pub const MSG_BUF: &str = "[messages]";
pub const SEARCH_BUF: &str = "[search]";
pub const DIFF_BUF: &str = "[diff]";
pub const SCRATCH_BUF: &str = "[scratch]";

/// System clipboard bridge (`+` / `*` registers). The default editor has
/// none; reads come back empty and writes report failure.
pub trait Clipboard {
    fn get(&mut self, primary: bool) -> Option<String>;
    fn set(&mut self, text: &str, primary: bool) -> bool;
}

/// Shell collaborator for `r!` / `!`; absent by default.
pub trait ShellRunner {
    fn run(&mut self, cmd: &str) -> anyhow::Result<String>;
}

/// Menu-driven action over the word under the cursor (`W`).
pub struct WordAction {
    pub key: char,
    pub label: String,
    pub apply: fn(&mut Editor, &str) -> EditOutcome,
}

/// Menu-driven action over the whole file (`F`).
pub struct FileAction {
    pub key: char,
    pub label: String,
    pub apply: fn(&mut Editor) -> EditOutcome,
}

/// Menu-driven action over a linewise visual range.
pub struct LineAction {
    pub key: char,
    pub label: String,
    pub apply: fn(&mut Editor, (usize, usize)) -> EditOutcome,
}

pub struct Editor {
    pub windows: Vec<Window>,
    pub cur_win: usize,
    pub prev_win: usize,
    pub video: Video,
    pub registers: Registers,
    pub history: History,
    pub settings: Settings,
    pub dirs: VedDirs,
    pub ftypes: Vec<(Ftype, Syntax)>,
    /// Last completed insert run, replayed by `.` and insert-mode CTRL-A.
    pub last_insert: String,
    pub num_rows: usize,
    pub num_cols: usize,
    /// Pending message-line banner `(text, is_error)`.
    pub banner: Option<(String, bool)>,
    pub clipboard: Option<Box<dyn Clipboard>>,
    pub shell: Option<Box<dyn ShellRunner>>,
    /// Committed search state driving `n` / `N`.
    pub last_search: Option<Search>,
    pub word_actions: Vec<WordAction>,
    pub file_actions: Vec<FileAction>,
    pub line_actions: Vec<LineAction>,
}

impl Editor {
    /// Build an editor with one normal window plus the special window.
    /// `num_rows` must leave room for the three reserved rows.
    pub fn new(num_rows: usize, num_cols: usize, out: Box<dyn Write + Send>) -> Self {
        let num_rows = num_rows.max(5);
        let num_cols = num_cols.max(10);
        let video = Video::new(out, num_rows, num_cols);
        let settings = Settings::default();
        let dirs = VedDirs::resolve();
        let mut history = History::default();
        history.max_entries = settings.max_num_hist_entries;
        let window_dim = FrameDim::new(2, num_rows - 2, 1, num_cols);
        let mut ed = Self {
            windows: Vec::new(),
            cur_win: 0,
            prev_win: 0,
            video,
            registers: Registers::default(),
            history,
            settings,
            dirs,
            ftypes: ftype::builtin_registry(),
            last_insert: String::new(),
            num_rows,
            num_cols,
            banner: None,
            clipboard: None,
            shell: None,
            last_search: None,
            word_actions: Vec::new(),
            file_actions: Vec::new(),
            line_actions: Vec::new(),
        };
        let mut main = Window::new("main", WindowType::Normal, window_dim);
        main.attach(ed.make_buffer(), 0);
        ed.windows.push(main);
        let mut special = Window::new("special", WindowType::Special, window_dim);
        for name in [MSG_BUF, SEARCH_BUF, DIFF_BUF, SCRATCH_BUF] {
            let mut buf = ed.make_buffer();
            buf.fname = Some(name.into());
            buf.flags
                .insert(BufferFlags::BUF_IS_SPECIAL | BufferFlags::BUF_IS_PAGER);
            special.attach(buf, 0);
        }
        ed.windows.push(special);
        info!(target: "model.ed", rows = num_rows, cols = num_cols, "editor created");
        ed
    }

    /// A fresh buffer carrying the editor's settings.
    pub fn make_buffer(&self) -> Buffer {
        let mut buf = Buffer::new();
        buf.undo.max_entries = self.settings.max_num_undo_entries;
        buf.autosave = self.settings.autosave;
        if let Some(tw) = self.settings.tabwidth {
            buf.ftype.tabwidth = tw;
        }
        if let Some(sw) = self.settings.shiftwidth {
            buf.ftype.shiftwidth = sw;
        }
        buf
    }

    /// A buffer loaded from `path` with its filetype resolved by extension.
    /// Load errors surface to the caller; a missing file is not an error.
    pub fn make_file_buffer(&self, path: &Path) -> core_state::Result<Buffer> {
        let mut buf = self.make_buffer();
        buf.load_from_path(path)?;
        let (ft, syn) = ftype::by_extname(&self.ftypes, buf.extname().as_deref());
        buf.ftype = ft.clone();
        buf.syn = syn.clone();
        if let Some(tw) = self.settings.tabwidth {
            buf.ftype.tabwidth = tw;
        }
        if let Some(sw) = self.settings.shiftwidth {
            buf.ftype.shiftwidth = sw;
        }
        Ok(buf)
    }

    pub fn win(&self) -> &Window {
        &self.windows[self.cur_win]
    }

    pub fn win_mut(&mut self) -> &mut Window {
        &mut self.windows[self.cur_win]
    }

    pub fn buf(&self) -> &Buffer {
        self.win().cur_buf()
    }

    pub fn buf_mut(&mut self) -> &mut Buffer {
        self.win_mut().cur_buf_mut()
    }

    /// Screen rows reserved at the bottom.
    pub fn msg_row(&self) -> usize {
        self.num_rows - 1
    }

    pub fn prompt_row(&self) -> usize {
        self.num_rows
    }

    pub fn window_dim(&self) -> FrameDim {
        FrameDim::new(2, self.num_rows - 2, 1, self.num_cols)
    }

    fn special_win(&self) -> usize {
        self.windows
            .iter()
            .position(|w| w.wtype == WindowType::Special)
            .expect("special window exists")
    }

    /// Append one line to `[messages]` (bounded like a pager scrollback).
    pub fn append_message(&mut self, text: &str) {
        let idx = self.special_win();
        if let Some(pos) = self.windows[idx].find_buffer(MSG_BUF) {
            let buf = &mut self.windows[idx].buffers[pos];
            if buf.num_rows() == 1 && buf.current().is_empty() {
                buf.current_mut().replace(text);
            } else {
                let end = buf.num_rows();
                buf.insert_row(end, Row::new(text));
            }
        }
    }

    pub fn msg_error(&mut self, text: impl Into<String>) {
        let text = text.into();
        debug!(target: "model.ed", msg = %text, "error banner");
        self.append_message(&text);
        self.banner = Some((text, true));
    }

    pub fn msg_info(&mut self, text: impl Into<String>) {
        let text = text.into();
        self.append_message(&text);
        self.banner = Some((text, false));
    }

    /// Focus a special buffer by name (`messages`, `searches`, ...).
    pub fn show_special(&mut self, name: &str) -> EditOutcome {
        let idx = self.special_win();
        let Some(pos) = self.windows[idx].find_buffer(name) else {
            return EditOutcome::Nothing;
        };
        if self.cur_win != idx {
            self.prev_win = self.cur_win;
            self.cur_win = idx;
        }
        self.windows[idx].make_visible(pos);
        EditOutcome::Done
    }

    /// Replace a special buffer's content wholesale.
    pub fn fill_special(&mut self, name: &str, lines: Vec<String>) {
        let idx = self.special_win();
        if let Some(pos) = self.windows[idx].find_buffer(name) {
            let win_dim = self.windows[idx].frames[0];
            let buf = &mut self.windows[idx].buffers[pos];
            *buf = Buffer::from_lines(if lines.is_empty() {
                vec![String::new()]
            } else {
                lines
            });
            buf.fname = Some(name.into());
            buf.flags
                .insert(BufferFlags::BUF_IS_SPECIAL | BufferFlags::BUF_IS_PAGER);
            buf.dim = win_dim;
            buf.sync_view();
        }
    }

    /// Windows eligible for default cycling (special ones are skipped).
    fn normal_windows(&self) -> Vec<usize> {
        self.windows
            .iter()
            .enumerate()
            .filter(|(_, w)| w.wtype == WindowType::Normal)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn win_next(&mut self) -> EditOutcome {
        let normals = self.normal_windows();
        if normals.is_empty() {
            return EditOutcome::Nothing;
        }
        let pos = normals.iter().position(|&i| i == self.cur_win);
        let next = match pos {
            Some(p) => normals[(p + 1) % normals.len()],
            None => normals[0],
        };
        if next == self.cur_win {
            return EditOutcome::Nothing;
        }
        self.prev_win = self.cur_win;
        self.cur_win = next;
        EditOutcome::Done
    }

    pub fn win_prev(&mut self) -> EditOutcome {
        let normals = self.normal_windows();
        if normals.is_empty() {
            return EditOutcome::Nothing;
        }
        let pos = normals.iter().position(|&i| i == self.cur_win);
        let prev = match pos {
            Some(p) => normals[p.checked_sub(1).unwrap_or(normals.len() - 1)],
            None => normals[0],
        };
        if prev == self.cur_win {
            return EditOutcome::Nothing;
        }
        self.prev_win = self.cur_win;
        self.cur_win = prev;
        EditOutcome::Done
    }

    pub fn win_prev_focused(&mut self) -> EditOutcome {
        if self.prev_win == self.cur_win || self.prev_win >= self.windows.len() {
            return EditOutcome::Nothing;
        }
        std::mem::swap(&mut self.prev_win, &mut self.cur_win);
        EditOutcome::Done
    }

    /// Allocate a new normal window hosting `buf`.
    pub fn new_window(&mut self, buf: Buffer) -> usize {
        let dim = self.window_dim();
        let name = format!("win{}", self.windows.len());
        let mut win = Window::new(name, WindowType::Normal, dim);
        win.attach(buf, 0);
        self.windows.push(win);
        self.prev_win = self.cur_win;
        self.cur_win = self.windows.len() - 1;
        self.cur_win
    }

    /// All buffer display names across windows (buffer-name completion).
    pub fn buffer_names(&self) -> Vec<String> {
        self.windows
            .iter()
            .flat_map(|w| w.buffers.iter().map(|b| b.display_name()))
            .collect()
    }

    /// Read a register, computing the specials.
    pub fn register_read(&self, name: char) -> Option<Register> {
        match name {
            '/' => self
                .history
                .last_search()
                .map(|s| Register::charwise(s.to_string())),
            ':' => self
                .history
                .last_rline()
                .map(|s| Register::charwise(s.to_string())),
            '%' => Some(Register::charwise(self.buf().display_name())),
            '^' => self.buf().word_under_cursor().map(Register::charwise),
            '=' => None,
            '_' => Some(Register::charwise(String::new())),
            _ => self.registers.get(name).cloned(),
        }
    }

    /// Read the clipboard registers (`+` charwise unless the payload has a
    /// newline, then linewise).
    pub fn register_read_clipboard(&mut self, name: char) -> Option<Register> {
        if name != '+' && name != '*' {
            return self.register_read(name);
        }
        let text = self.clipboard.as_mut()?.get(name == '*')?;
        if text.contains('\n') {
            Some(Register::linewise(
                text.trim_end_matches('\n').split('\n').map(String::from).collect(),
            ))
        } else {
            Some(Register::charwise(text))
        }
    }

    pub fn register_set(&mut self, name: char, reg: Register) {
        if name == '+' || name == '*' {
            if let Some(cb) = self.clipboard.as_mut() {
                cb.set(&reg.text(), name == '*');
            }
            return;
        }
        self.registers.set_with_default(name, reg);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn editor() -> Editor {
        let (video, _sink) = Video::with_shared_sink(24, 80);
        let mut ed = Editor::new(24, 80, Box::new(std::io::sink()));
        // swap in the sized sink-backed video to keep dimensions explicit
        ed.video = video;
        ed
    }

    #[test]
    fn reserved_rows_layout() {
        let ed = editor();
        assert_eq!(ed.window_dim(), FrameDim::new(2, 22, 1, 80));
        assert_eq!(ed.msg_row(), 23);
        assert_eq!(ed.prompt_row(), 24);
    }

    #[test]
    fn special_window_skipped_in_cycling() {
        let mut ed = editor();
        // only one normal window: cycling is a no-op
        assert_eq!(ed.win_next(), EditOutcome::Nothing);
        let b = ed.make_buffer();
        ed.new_window(b);
        assert_eq!(ed.cur_win, 2);
        assert!(ed.win_next().is_done());
        assert_eq!(ed.cur_win, 0);
        assert!(ed.win_prev().is_done());
        assert_eq!(ed.cur_win, 2);
    }

    #[test]
    fn messages_buffer_accumulates() {
        let mut ed = editor();
        ed.msg_error("boom");
        ed.msg_info("fine");
        assert_eq!(ed.banner.as_ref().unwrap().0, "fine");
        ed.show_special(MSG_BUF);
        let lines: Vec<&str> = ed.buf().lines().collect();
        assert_eq!(lines, vec!["boom", "fine"]);
    }

    #[test]
    fn special_registers_computed() {
        let mut ed = editor();
        ed.history.push_search("needle");
        assert_eq!(ed.register_read('/').unwrap().text(), "needle");
        assert_eq!(ed.register_read('%').unwrap().text(), "[No Name]");
        assert_eq!(ed.register_read('_').unwrap().text(), "");
        assert!(ed.register_read('a').is_none());
    }

    #[test]
    fn named_register_round_trip() {
        let mut ed = editor();
        ed.register_set('a', Register::charwise("payload"));
        assert_eq!(ed.register_read('a').unwrap().text(), "payload");
        // unnamed mirrors the write
        assert_eq!(ed.register_read('"').unwrap().text(), "payload");
    }

    #[test]
    fn file_buffer_picks_ftype() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.rs");
        std::fs::write(&path, "fn main() {}\n").unwrap();
        let ed = editor();
        let buf = ed.make_file_buffer(&path).unwrap();
        assert_eq!(buf.ftype.name, "rust");
    }
}
