//! Buffer state: rows, cursor, marks, jumps, registers, undo, filetype.
//!
//! A buffer is an ordered sequence of independent heap-allocated line
//! strings with a current-row cursor. Per-row cursor bytes (`first_col_idx`,
//! `cur_col_idx`) always land on codepoint boundaries; motion primitives
//! keep the viewport anchored so the cursor stays on screen. The undo engine
//! records coarse line actions (insert/delete/replace with former bytes and
//! a cursor snapshot), never whole-buffer snapshots.

use bitflags::bitflags;
use std::path::PathBuf;

pub mod error;
pub mod fileio;
pub mod ftype;
pub mod marks;
pub mod motion;
pub mod registers;
pub mod row;
pub mod undo;

pub use error::{Result, VedError};
pub use fileio::{FileStat, WriteOpts};
pub use ftype::{Ftype, Syntax};
pub use marks::{Jumps, Mark, NUM_JUMPS};
pub use registers::{RegType, Register, Registers};
pub use row::Row;
pub use undo::{Act, ActKind, Action, UndoEngine};

/// The canonical letter run shared by register and mark name tables. Every
/// letter-class validity check derives from this one constant.
pub const NAME_LETTERS: &str = "abcdefghijklmnopqrstuvwxyz";
/// Mark designators: unnamed (backtick), then letters, then digits.
pub const MARK_CHARS: &str = "`abcdefghijklmnopqrstuvwxyz0123456789";
pub const NUM_MARKS: usize = 37;
/// Count prefixes stop accumulating after this many digits.
pub const MAX_COUNT_DIGITS: usize = 8;
/// Name shown for a buffer without a file.
pub const UNNAMED: &str = "[No Name]";

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct BufferFlags: u16 {
        const FILE_EXISTS      = 1 << 0;
        const FILE_IS_RDONLY   = 1 << 1;
        const FILE_IS_WRITABLE = 1 << 2;
        const BUF_IS_MODIFIED  = 1 << 3;
        const BUF_IS_VISIBLE   = 1 << 4;
        const BUF_IS_RDONLY    = 1 << 5;
        const BUF_IS_PAGER     = 1 << 6;
        const BUF_IS_SPECIAL   = 1 << 7;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Normal,
    Insert,
    VisualChar,
    VisualLine,
    VisualBlock,
}

impl Mode {
    pub fn display(&self) -> &'static str {
        match self {
            Mode::Normal => "NORMAL",
            Mode::Insert => "INSERT",
            Mode::VisualChar => "VISUAL",
            Mode::VisualLine => "VISUAL LINE",
            Mode::VisualBlock => "VISUAL BLOCK",
        }
    }
}

/// Result of a motion or edit: did anything change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    Done,
    Nothing,
}

impl EditOutcome {
    pub fn done(changed: bool) -> Self {
        if changed { Self::Done } else { Self::Nothing }
    }
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }
}

/// A frame rectangle in absolute 1-based screen coordinates, inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameDim {
    pub first_row: usize,
    pub last_row: usize,
    pub first_col: usize,
    pub last_col: usize,
}

impl FrameDim {
    pub fn new(first_row: usize, last_row: usize, first_col: usize, last_col: usize) -> Self {
        Self {
            first_row,
            last_row,
            first_col,
            last_col,
        }
    }
    pub fn num_rows(&self) -> usize {
        self.last_row.saturating_sub(self.first_row) + 1
    }
    pub fn num_cols(&self) -> usize {
        self.last_col.saturating_sub(self.first_col) + 1
    }
}

impl Default for FrameDim {
    fn default() -> Self {
        Self::new(1, 24, 1, 80)
    }
}

/// An editable sequence of rows with cursor, marks, undo and filetype.
pub struct Buffer {
    rows: Vec<Row>,
    pub cur_idx: usize,
    pub fname: Option<PathBuf>,
    pub cwd: PathBuf,
    pub flags: BufferFlags,
    pub mode: Mode,
    pub(crate) marks: [Option<Mark>; NUM_MARKS],
    pub jumps: Jumps,
    pub undo: UndoEngine,
    /// Buffer row drawn on the frame's top display row.
    pub video_first_row_idx: usize,
    /// Index of the owning window's frame hosting this buffer.
    pub at_frame: usize,
    /// The frame rectangle this buffer renders into.
    pub dim: FrameDim,
    /// Absolute screen position of the cursor, 1-based.
    pub row_pos: usize,
    pub col_pos: usize,
    pub ftype: Ftype,
    pub syn: Syntax,
    /// Autosave period in seconds; 0 disables.
    pub autosave: u64,
    pub(crate) last_saved: std::time::SystemTime,
    pub backupfile: Option<PathBuf>,
    pub stat: Option<FileStat>,
}

impl Buffer {
    pub fn new() -> Self {
        let dim = FrameDim::default();
        Self {
            rows: vec![Row::new("")],
            cur_idx: 0,
            fname: None,
            cwd: std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/")),
            flags: BufferFlags::empty(),
            mode: Mode::Normal,
            marks: [const { None }; NUM_MARKS],
            jumps: Jumps::default(),
            undo: UndoEngine::default(),
            video_first_row_idx: 0,
            at_frame: 0,
            dim,
            row_pos: dim.first_row,
            col_pos: dim.first_col,
            ftype: Ftype::default(),
            syn: Syntax::default(),
            autosave: 0,
            last_saved: std::time::SystemTime::now(),
            backupfile: None,
            stat: None,
        }
    }

    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut b = Self::new();
        b.rows = lines.into_iter().map(|s| Row::new(s.into())).collect();
        if b.rows.is_empty() {
            b.rows.push(Row::new(""));
        }
        b
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn row(&self, idx: usize) -> Option<&Row> {
        self.rows.get(idx)
    }

    pub fn row_mut(&mut self, idx: usize) -> Option<&mut Row> {
        self.rows.get_mut(idx)
    }

    pub fn current(&self) -> &Row {
        &self.rows[self.cur_idx]
    }

    pub fn current_mut(&mut self) -> &mut Row {
        &mut self.rows[self.cur_idx]
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().map(|r| r.bytes())
    }

    /// Insert a row at `idx` (clamped), shifting later rows down.
    pub fn insert_row(&mut self, idx: usize, row: Row) {
        let idx = idx.min(self.rows.len());
        self.rows.insert(idx, row);
    }

    /// Remove the row at `idx`. A transient empty row is restored when the
    /// last one goes, so `cur_idx` stays valid.
    pub fn remove_row(&mut self, idx: usize) -> Option<Row> {
        if idx >= self.rows.len() {
            return None;
        }
        let row = self.rows.remove(idx);
        if self.rows.is_empty() {
            self.rows.push(Row::new(""));
        }
        if self.cur_idx >= self.rows.len() {
            self.cur_idx = self.rows.len() - 1;
        }
        Some(row)
    }

    pub fn set_modified(&mut self) {
        self.flags.insert(BufferFlags::BUF_IS_MODIFIED);
    }

    pub fn is_modified(&self) -> bool {
        self.flags.contains(BufferFlags::BUF_IS_MODIFIED)
    }

    pub fn is_special(&self) -> bool {
        self.flags.contains(BufferFlags::BUF_IS_SPECIAL)
    }

    pub fn display_name(&self) -> String {
        self.fname
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| UNNAMED.to_string())
    }

    pub fn basename(&self) -> String {
        self.fname
            .as_ref()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| UNNAMED.to_string())
    }

    pub fn extname(&self) -> Option<String> {
        self.fname
            .as_ref()
            .and_then(|p| p.extension())
            .map(|e| e.to_string_lossy().into_owned())
    }

    /// The word under the cursor (register `^`, `*`/`#` seeding).
    pub fn word_under_cursor(&self) -> Option<String> {
        let row = self.current();
        let (s, e) = core_text::word::word_at(row.bytes(), row.cur_col_idx)?;
        Some(row.bytes()[s..e].to_string())
    }

    /// Cursor + viewport snapshot used by marks, jumps and undo acts.
    pub fn cursor_snapshot(&self) -> Mark {
        Mark {
            cur_idx: self.cur_idx,
            cur_col_idx: self.current().cur_col_idx,
            first_col_idx: self.current().first_col_idx,
            video_first_row_idx: self.video_first_row_idx,
            row_pos: self.row_pos,
        }
    }

    /// Restore a snapshot, clamping against the current row count.
    pub fn restore_cursor(&mut self, m: &Mark) {
        self.cur_idx = m.cur_idx.min(self.rows.len().saturating_sub(1));
        self.video_first_row_idx = m.video_first_row_idx.min(self.cur_idx);
        let row = &mut self.rows[self.cur_idx];
        row.cur_col_idx = core_text::floor_boundary(row.bytes(), m.cur_col_idx);
        row.first_col_idx = core_text::floor_boundary(row.bytes(), m.first_col_idx)
            .min(row.cur_col_idx);
        self.sync_view();
    }
}

impl Default for Buffer {
    fn default() -> Self {
        Self::new()
    }
}
