//! Double-buffered terminal grid.
//!
//! All screen mutations land in the in-memory row list; the scratch `render`
//! string batches ANSI output so [`Video::flush`] issues exactly one write to
//! the output sink. Flushing an empty scratch is a no-op, which makes flush
//! idempotent.

use crate::escapes;
use anyhow::Result;
use std::io::Write;
use std::sync::{Arc, Mutex};

/// An `Arc<Mutex<Vec<u8>>>`-backed sink so tests can inspect emitted bytes.
#[derive(Clone, Default)]
pub struct SharedSink(pub Arc<Mutex<Vec<u8>>>);

impl SharedSink {
    pub fn take(&self) -> Vec<u8> {
        std::mem::take(&mut *self.0.lock().unwrap())
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for SharedSink {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }
    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

pub struct Video {
    out: Box<dyn Write + Send>,
    pub num_rows: usize,
    pub num_cols: usize,
    /// Logical viewport origin on the physical screen, 1-based.
    pub first_row: usize,
    pub first_col: usize,
    /// Absolute cursor position, 1-based.
    pub row_pos: usize,
    pub col_pos: usize,
    rows: Vec<String>,
    render: String,
    /// Saved underlay for transient popups: `(row index, previous render)`.
    painted: Vec<(usize, String)>,
}

impl Video {
    pub fn new(out: Box<dyn Write + Send>, num_rows: usize, num_cols: usize) -> Self {
        Self {
            out,
            num_rows,
            num_cols,
            first_row: 1,
            first_col: 1,
            row_pos: 1,
            col_pos: 1,
            rows: vec![String::new(); num_rows],
            render: String::new(),
            painted: Vec::new(),
        }
    }

    /// A video writing into a [`SharedSink`]; the sink handle is returned for
    /// inspection. Test-oriented but also backs the pager special buffers.
    pub fn with_shared_sink(num_rows: usize, num_cols: usize) -> (Self, SharedSink) {
        let sink = SharedSink::default();
        (Self::new(Box::new(sink.clone()), num_rows, num_cols), sink)
    }

    pub fn resize(&mut self, num_rows: usize, num_cols: usize) {
        self.num_rows = num_rows;
        self.num_cols = num_cols;
        self.rows.resize(num_rows, String::new());
        self.painted.clear();
    }

    /// Stored render of a grid row (0-based).
    pub fn row(&self, idx: usize) -> &str {
        self.rows.get(idx).map(String::as_str).unwrap_or("")
    }

    /// Replace the stored render for grid row `idx` (0-based).
    pub fn set_row_with(&mut self, idx: usize, bytes: &str) {
        if let Some(slot) = self.rows.get_mut(idx) {
            slot.clear();
            slot.push_str(bytes);
        }
    }

    pub fn set_cursor(&mut self, row_pos: usize, col_pos: usize) {
        self.row_pos = row_pos.max(1);
        self.col_pos = col_pos.max(1);
    }

    /// Append move + clear-eol + row bytes for screen rows `first..=last`
    /// (1-based) into the scratch render.
    pub fn render_set_from_to(&mut self, first: usize, last: usize) {
        let first = first.max(1);
        let last = last.min(self.num_rows);
        for screen_row in first..=last {
            let idx = screen_row - 1;
            self.render.push_str(&escapes::goto(screen_row, self.first_col));
            self.render.push_str(escapes::LINE_CLR_EOL);
            self.render.push_str(&self.rows[idx]);
        }
    }

    /// Append a cursor restore to the scratch render.
    pub fn render_cursor(&mut self) {
        self.render
            .push_str(&escapes::goto(self.row_pos, self.col_pos));
    }

    /// Immediately repaint one screen row (1-based) with cursor-hide guard
    /// and cursor restore.
    pub fn draw_row_at(&mut self, screen_row: usize) -> Result<()> {
        if screen_row == 0 || screen_row > self.num_rows {
            return Ok(());
        }
        self.render.push_str(escapes::CURSOR_HIDE);
        self.render_set_from_to(screen_row, screen_row);
        self.render_cursor();
        self.render.push_str(escapes::CURSOR_SHOW);
        self.flush()
    }

    /// Full repaint: scroll region reset, every row, cursor restore.
    pub fn draw_all(&mut self) -> Result<()> {
        self.render.push_str(escapes::CURSOR_HIDE);
        self.render.push_str(&escapes::scroll_region(0, self.num_rows));
        self.render_set_from_to(1, self.num_rows);
        self.render_cursor();
        self.render.push_str(escapes::CURSOR_SHOW);
        self.flush()
    }

    /// Inject an SGR color across the byte range `[fidx, lidx)` of the stored
    /// render for grid row `idx`. Offsets are clamped to char boundaries.
    pub fn row_hl_at(&mut self, idx: usize, color: u8, fidx: usize, lidx: usize) {
        let Some(row) = self.rows.get_mut(idx) else {
            return;
        };
        let mut f = fidx.min(row.len());
        while f > 0 && !row.is_char_boundary(f) {
            f -= 1;
        }
        let mut l = lidx.min(row.len());
        while l > 0 && !row.is_char_boundary(l) {
            l -= 1;
        }
        if f >= l {
            return;
        }
        let mut out = String::with_capacity(row.len() + 12);
        out.push_str(&row[..f]);
        out.push_str(&escapes::color(color));
        out.push_str(&row[f..l]);
        out.push_str(escapes::COLOR_RESET);
        out.push_str(&row[l..]);
        *row = out;
    }

    /// Open a transient popup on `screen_row` (1-based): the underlay render
    /// is saved and `text` is painted across `[col_from, col_to]`.
    pub fn paint_rows_with(
        &mut self,
        screen_row: usize,
        col_from: usize,
        col_to: usize,
        text: &str,
    ) -> Result<()> {
        if screen_row == 0 || screen_row > self.num_rows {
            return Ok(());
        }
        let idx = screen_row - 1;
        if !self.painted.iter().any(|(i, _)| *i == idx) {
            self.painted.push((idx, self.rows[idx].clone()));
        }
        let mut composed = String::new();
        if col_from > 1 {
            composed.push_str(&" ".repeat(col_from - 1));
        }
        let span = col_to.saturating_sub(col_from).saturating_add(1);
        let end = core_fit(text, span);
        composed.push_str(&text[..end]);
        self.set_row_with(idx, &composed);
        self.draw_row_at(screen_row)
    }

    /// Close all transient popups, restoring and repainting the underlays.
    pub fn resume_painted_rows(&mut self) -> Result<()> {
        let saved: Vec<(usize, String)> = self.painted.drain(..).collect();
        self.render.push_str(escapes::CURSOR_HIDE);
        for (idx, bytes) in saved {
            self.rows[idx] = bytes;
            let screen_row = idx + 1;
            self.render_set_from_to(screen_row, screen_row);
        }
        self.render_cursor();
        self.render.push_str(escapes::CURSOR_SHOW);
        self.flush()
    }

    /// Whether any popup underlay is currently saved.
    pub fn has_painted_rows(&self) -> bool {
        !self.painted.is_empty()
    }

    /// Single write of the composed scratch to the sink. No-op when empty.
    pub fn flush(&mut self) -> Result<()> {
        if self.render.is_empty() {
            return Ok(());
        }
        self.out.write_all(self.render.as_bytes())?;
        self.out.flush()?;
        self.render.clear();
        Ok(())
    }
}

// Byte length of the longest prefix of `text` within `cols` ASCII-ish cells;
// popup text is pre-rendered so a plain char count is sufficient here.
fn core_fit(text: &str, cols: usize) -> usize {
    let mut n = 0usize;
    let mut end = 0usize;
    for (i, c) in text.char_indices() {
        if n >= cols {
            break;
        }
        n += 1;
        end = i + c.len_utf8();
    }
    end
}
