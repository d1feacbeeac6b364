//! Motion primitives.
//!
//! Horizontal motion counts codepoints, never bytes. Vertical motion keeps
//! the "nth codepoint" column with an end-of-line latch: moving up or down
//! re-seeks the same codepoint index on the new row, clamped to its length,
//! and a cursor that sat at end-of-line stays at end-of-line. Every motion
//! re-anchors the viewport so the cursor remains visible and refreshes the
//! absolute screen position.

use crate::{Buffer, EditOutcome, Mode};
use core_text::width::visual_col;

impl Buffer {
    /// Rightmost legal cursor byte on the current row for the active mode.
    fn max_col_idx(&self) -> usize {
        let row = self.current();
        match self.mode {
            Mode::Insert => row.len(),
            _ => core_text::last_offset(row.bytes()),
        }
    }

    /// Re-anchor the viewport (both axes) and refresh `row_pos`/`col_pos`.
    pub fn sync_view(&mut self) {
        let nrows = self.dim.num_rows();
        if self.cur_idx < self.video_first_row_idx {
            self.video_first_row_idx = self.cur_idx;
        } else if self.cur_idx >= self.video_first_row_idx + nrows {
            self.video_first_row_idx = self.cur_idx + 1 - nrows;
        }
        self.row_pos = self.dim.first_row + (self.cur_idx - self.video_first_row_idx);

        let tab = self.ftype.tabwidth;
        let ncols = self.dim.num_cols();
        let row = &mut self.rows[self.cur_idx];
        if row.cur_col_idx < row.first_col_idx {
            // moving left past the anchor re-anchors to the cursor
            row.first_col_idx = row.cur_col_idx;
        }
        loop {
            let prefix = visual_col(row.bytes(), row.first_col_idx, row.cur_col_idx, tab);
            let cw = core_text::char_at(row.bytes(), row.cur_col_idx)
                .map(|c| if c == '\t' { tab.max(1) } else { core_text::ch_width(c) })
                .unwrap_or(1);
            if prefix + cw <= ncols || row.first_col_idx >= row.cur_col_idx {
                break;
            }
            row.first_col_idx = core_text::next_boundary(row.bytes(), row.first_col_idx);
        }
        self.col_pos =
            self.dim.first_col + visual_col(row.bytes(), row.first_col_idx, row.cur_col_idx, tab);
    }

    pub fn left(&mut self, count: usize) -> EditOutcome {
        let mut moved = false;
        for _ in 0..count.max(1) {
            let row = self.current_mut();
            if row.cur_col_idx == 0 {
                break;
            }
            row.cur_col_idx = core_text::prev_boundary(row.bytes(), row.cur_col_idx);
            moved = true;
        }
        if moved {
            self.sync_view();
        }
        EditOutcome::done(moved)
    }

    pub fn right(&mut self, count: usize) -> EditOutcome {
        let max = self.max_col_idx();
        let mut moved = false;
        for _ in 0..count.max(1) {
            let row = self.current_mut();
            if row.cur_col_idx >= max {
                break;
            }
            row.cur_col_idx = core_text::next_boundary(row.bytes(), row.cur_col_idx);
            moved = true;
        }
        if moved {
            self.sync_view();
        }
        EditOutcome::done(moved)
    }

    pub fn bol(&mut self) -> EditOutcome {
        let row = self.current_mut();
        let changed = row.cur_col_idx != 0 || row.first_col_idx != 0;
        row.cur_col_idx = 0;
        row.first_col_idx = 0;
        self.sync_view();
        EditOutcome::done(changed)
    }

    pub fn eol(&mut self) -> EditOutcome {
        let max = self.max_col_idx();
        let row = self.current_mut();
        let changed = row.cur_col_idx != max;
        row.cur_col_idx = max;
        self.sync_view();
        EditOutcome::done(changed)
    }

    pub fn to_first_non_blank(&mut self) -> EditOutcome {
        let target = core_text::first_non_blank(self.current().bytes());
        let row = self.current_mut();
        let changed = row.cur_col_idx != target;
        row.cur_col_idx = target;
        self.sync_view();
        EditOutcome::done(changed)
    }

    /// Column memory for a vertical step.
    fn column_seek(&self) -> (usize, bool) {
        let row = self.current();
        let nth = core_text::index_of(row.bytes(), row.cur_col_idx);
        let at_eol = row.cur_col_idx >= self.max_col_idx() && !row.is_empty();
        (nth, at_eol)
    }

    fn column_restore(&mut self, nth: usize, at_eol: bool) {
        let max = self.max_col_idx();
        let row = self.current_mut();
        if at_eol {
            row.cur_col_idx = max;
        } else {
            row.cur_col_idx = core_text::nth_offset(row.bytes(), nth).min(max);
        }
        row.clamp();
    }

    pub fn up(&mut self, count: usize) -> EditOutcome {
        if self.cur_idx == 0 {
            return EditOutcome::Nothing;
        }
        let (nth, at_eol) = self.column_seek();
        self.cur_idx = self.cur_idx.saturating_sub(count.max(1));
        self.column_restore(nth, at_eol);
        self.sync_view();
        EditOutcome::Done
    }

    pub fn down(&mut self, count: usize) -> EditOutcome {
        if self.cur_idx + 1 >= self.rows.len() {
            return EditOutcome::Nothing;
        }
        let (nth, at_eol) = self.column_seek();
        self.cur_idx = (self.cur_idx + count.max(1)).min(self.rows.len() - 1);
        self.column_restore(nth, at_eol);
        self.sync_view();
        EditOutcome::Done
    }

    pub fn bof(&mut self) -> EditOutcome {
        if self.cur_idx == 0 {
            return EditOutcome::Nothing;
        }
        self.jump_push();
        let (nth, at_eol) = self.column_seek();
        self.cur_idx = 0;
        self.column_restore(nth, at_eol);
        self.sync_view();
        EditOutcome::Done
    }

    pub fn eof(&mut self) -> EditOutcome {
        if self.cur_idx + 1 >= self.rows.len() {
            return EditOutcome::Nothing;
        }
        self.jump_push();
        let (nth, at_eol) = self.column_seek();
        self.cur_idx = self.rows.len() - 1;
        self.column_restore(nth, at_eol);
        self.sync_view();
        EditOutcome::Done
    }

    /// Jump to a 1-based line number.
    pub fn goto_linenr(&mut self, linenr: usize) -> EditOutcome {
        if linenr == 0 {
            return EditOutcome::Nothing;
        }
        let target = (linenr - 1).min(self.rows.len() - 1);
        if target == self.cur_idx {
            return EditOutcome::Nothing;
        }
        self.jump_push();
        self.cur_idx = target;
        self.current_mut().clamp();
        self.sync_view();
        EditOutcome::Done
    }

    pub fn page_down(&mut self, count: usize) -> EditOutcome {
        let step = self.dim.num_rows() * count.max(1);
        if self.cur_idx + 1 >= self.rows.len() {
            return EditOutcome::Nothing;
        }
        let (nth, at_eol) = self.column_seek();
        self.cur_idx = (self.cur_idx + step).min(self.rows.len() - 1);
        self.video_first_row_idx =
            (self.video_first_row_idx + step).min(self.cur_idx);
        self.column_restore(nth, at_eol);
        self.sync_view();
        EditOutcome::Done
    }

    pub fn page_up(&mut self, count: usize) -> EditOutcome {
        if self.cur_idx == 0 {
            return EditOutcome::Nothing;
        }
        let step = self.dim.num_rows() * count.max(1);
        let (nth, at_eol) = self.column_seek();
        self.cur_idx = self.cur_idx.saturating_sub(step);
        self.video_first_row_idx = self.video_first_row_idx.saturating_sub(step);
        self.column_restore(nth, at_eol);
        self.sync_view();
        EditOutcome::Done
    }

    /// Reframe so the current row sits roughly half a page below the top.
    pub fn adjust_view(&mut self) -> EditOutcome {
        let half = self.dim.num_rows() / 2;
        let target = self.cur_idx.saturating_sub(half);
        let changed = target != self.video_first_row_idx;
        self.video_first_row_idx = target;
        self.sync_view();
        EditOutcome::done(changed)
    }

    /// Jump to absolute row `idx`, placed `ofs` rows below the frame top,
    /// with the cursor at display column `col` (1-based).
    pub fn set_row_idx(&mut self, idx: usize, ofs: usize, col: usize) -> EditOutcome {
        if self.rows.is_empty() {
            return EditOutcome::Nothing;
        }
        self.cur_idx = idx.min(self.rows.len() - 1);
        self.video_first_row_idx = self.cur_idx.saturating_sub(ofs);
        let tab = self.ftype.tabwidth;
        let row = self.current_mut();
        row.first_col_idx = 0;
        let mut byte = 0usize;
        while byte < row.len() && visual_col(row.bytes(), 0, byte, tab) + 1 < col {
            byte = core_text::next_boundary(row.bytes(), byte);
        }
        row.cur_col_idx = byte;
        row.clamp();
        self.sync_view();
        EditOutcome::Done
    }

    // ---- word motions ------------------------------------------------------

    /// `w`: advance past the current run — to the first codepoint after a
    /// word run, or past a separator run to the next word — wrapping to the
    /// following row at end of line.
    pub fn word_forward(&mut self, count: usize) -> EditOutcome {
        let mut moved = false;
        for _ in 0..count.max(1) {
            moved |= self.word_forward_once();
        }
        if moved {
            self.sync_view();
        }
        EditOutcome::done(moved)
    }

    fn word_forward_once(&mut self) -> bool {
        let line = self.current().bytes().to_string();
        let mut b = self.current().cur_col_idx;
        match core_text::char_at(&line, b) {
            Some(c0) if core_text::word::is_word(c0) => {
                while b < line.len()
                    && core_text::char_at(&line, b).is_some_and(core_text::word::is_word)
                {
                    b = core_text::next_boundary(&line, b);
                }
            }
            Some(_) => {
                while b < line.len()
                    && core_text::char_at(&line, b).is_some_and(|c| !core_text::word::is_word(c))
                {
                    b = core_text::next_boundary(&line, b);
                }
            }
            None => {}
        }
        if b < line.len() {
            self.current_mut().cur_col_idx = b;
            return true;
        }
        // end of line: wrap
        if self.cur_idx + 1 >= self.rows.len() {
            let last = core_text::last_offset(&line);
            let changed = self.current().cur_col_idx != last;
            self.current_mut().cur_col_idx = last;
            return changed;
        }
        self.cur_idx += 1;
        self.current_mut().cur_col_idx = 0;
        true
    }

    /// `e`: end of the current or next word.
    pub fn word_end(&mut self, count: usize) -> EditOutcome {
        let mut moved = false;
        for _ in 0..count.max(1) {
            moved |= self.word_end_once();
        }
        if moved {
            self.sync_view();
        }
        EditOutcome::done(moved)
    }

    fn word_end_once(&mut self) -> bool {
        let start = (self.cur_idx, self.current().cur_col_idx);
        let mut skip_first = true;
        loop {
            let line = self.current().bytes().to_string();
            let mut b = self.current().cur_col_idx;
            if skip_first {
                b = core_text::next_boundary(&line, b);
                skip_first = false;
            }
            while b < line.len() && core_text::char_at(&line, b).is_some_and(char::is_whitespace) {
                b = core_text::next_boundary(&line, b);
            }
            if b < line.len() {
                // run to the last codepoint of this word/separator run
                let word = core_text::char_at(&line, b).is_some_and(core_text::word::is_word);
                let mut last = b;
                let mut n = core_text::next_boundary(&line, b);
                while n < line.len() {
                    match core_text::char_at(&line, n) {
                        Some(c) if !c.is_whitespace() && core_text::word::is_word(c) == word => {
                            last = n;
                            n = core_text::next_boundary(&line, n);
                        }
                        _ => break,
                    }
                }
                self.current_mut().cur_col_idx = last;
                return (self.cur_idx, last) != start;
            }
            if self.cur_idx + 1 >= self.rows.len() {
                return false;
            }
            self.cur_idx += 1;
            self.current_mut().cur_col_idx = 0;
        }
    }

    /// `b`: start of the previous word.
    pub fn word_backward(&mut self, count: usize) -> EditOutcome {
        let mut moved = false;
        for _ in 0..count.max(1) {
            moved |= self.word_backward_once();
        }
        if moved {
            self.sync_view();
        }
        EditOutcome::done(moved)
    }

    fn word_backward_once(&mut self) -> bool {
        loop {
            let line = self.current().bytes().to_string();
            let mut b = self.current().cur_col_idx;
            if b == 0 {
                if self.cur_idx == 0 {
                    return false;
                }
                self.cur_idx -= 1;
                let last = core_text::last_offset(self.current().bytes());
                self.current_mut().cur_col_idx = last;
                if self.current().is_empty() {
                    return true;
                }
                continue;
            }
            b = core_text::prev_boundary(&line, b);
            while b > 0 && core_text::char_at(&line, b).map(|c| c.is_whitespace()) == Some(true) {
                b = core_text::prev_boundary(&line, b);
            }
            match core_text::char_at(&line, b) {
                Some(c) if c.is_whitespace() => {
                    self.current_mut().cur_col_idx = 0;
                    return true;
                }
                Some(c) => {
                    let word = core_text::word::is_word(c);
                    while b > 0 {
                        let p = core_text::prev_boundary(&line, b);
                        match core_text::char_at(&line, p) {
                            Some(pc)
                                if !pc.is_whitespace()
                                    && core_text::word::is_word(pc) == word =>
                            {
                                b = p;
                            }
                            _ => break,
                        }
                    }
                    self.current_mut().cur_col_idx = b;
                    return true;
                }
                None => return false,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FrameDim;

    fn buf(lines: &[&str]) -> Buffer {
        Buffer::from_lines(lines.iter().copied())
    }

    #[test]
    fn left_right_identity_off_boundary() {
        let mut b = buf(&["hello"]);
        b.current_mut().cur_col_idx = 2;
        assert!(b.right(1).is_done());
        assert!(b.left(1).is_done());
        assert_eq!(b.current().cur_col_idx, 2);
    }

    #[test]
    fn horizontal_motion_counts_codepoints() {
        let mut b = buf(&["αβγ"]);
        assert!(b.right(2).is_done());
        assert_eq!(b.current().cur_col_idx, 4);
        assert_eq!(b.col_pos, b.dim.first_col + 2);
    }

    #[test]
    fn right_stops_at_last_codepoint_in_normal_mode() {
        let mut b = buf(&["ab"]);
        assert!(b.right(10).is_done());
        assert_eq!(b.current().cur_col_idx, 1);
        assert_eq!(b.right(1), EditOutcome::Nothing);
    }

    #[test]
    fn vertical_keeps_nth_column() {
        let mut b = buf(&["abcdef", "ab", "abcdef"]);
        b.current_mut().cur_col_idx = 4;
        b.down(1);
        assert_eq!(b.current().cur_col_idx, 1); // clamped to last codepoint
        b.down(1);
        assert_eq!(b.current().cur_col_idx, 4); // column remembered
    }

    #[test]
    fn vertical_eol_latch() {
        let mut b = buf(&["ab", "abcdef"]);
        b.eol();
        b.down(1);
        assert_eq!(b.current().cur_col_idx, core_text::last_offset("abcdef"));
    }

    #[test]
    fn up_at_top_is_nothing() {
        let mut b = buf(&["x", "y"]);
        assert_eq!(b.up(1), EditOutcome::Nothing);
        b.down(1);
        assert!(b.up(1).is_done());
    }

    #[test]
    fn viewport_follows_cursor() {
        let lines: Vec<String> = (0..100).map(|i| format!("line{i}")).collect();
        let mut b = Buffer::from_lines(lines);
        b.dim = FrameDim::new(1, 10, 1, 80);
        b.goto_linenr(50);
        assert!(b.cur_idx >= b.video_first_row_idx);
        assert!(b.cur_idx < b.video_first_row_idx + 10);
        assert_eq!(b.row_pos, 1 + (b.cur_idx - b.video_first_row_idx));
    }

    #[test]
    fn long_line_reanchors_horizontally() {
        let long: String = "x".repeat(200);
        let mut b = Buffer::from_lines([long]);
        b.dim = FrameDim::new(1, 10, 1, 40);
        b.right(120);
        let row = b.current();
        assert!(row.first_col_idx > 0);
        assert!(row.first_col_idx <= row.cur_col_idx);
        assert!(b.col_pos <= 40);
    }

    #[test]
    fn adjust_view_centers() {
        let lines: Vec<String> = (0..100).map(|i| format!("{i}")).collect();
        let mut b = Buffer::from_lines(lines);
        b.dim = FrameDim::new(1, 20, 1, 80);
        b.goto_linenr(60);
        b.adjust_view();
        assert_eq!(b.video_first_row_idx, 59 - 10);
    }

    #[test]
    fn word_forward_stops_past_word_run() {
        let mut b = buf(&["hello world"]);
        assert!(b.word_forward(1).is_done());
        assert_eq!(b.current().cur_col_idx, 5); // first codepoint after the run
        assert!(b.word_forward(1).is_done());
        assert_eq!(b.current().cur_col_idx, 6); // separator run skipped
    }

    #[test]
    fn word_forward_wraps_rows() {
        let mut b = buf(&["one", "two"]);
        b.word_forward(1);
        assert_eq!((b.cur_idx, b.current().cur_col_idx), (1, 0));
    }

    #[test]
    fn word_backward_basic() {
        let mut b = buf(&["hello world"]);
        b.current_mut().cur_col_idx = 6;
        assert!(b.word_backward(1).is_done());
        assert_eq!(b.current().cur_col_idx, 0);
    }

    #[test]
    fn word_end_basic() {
        let mut b = buf(&["hello world"]);
        assert!(b.word_end(1).is_done());
        assert_eq!(b.current().cur_col_idx, 4);
        assert!(b.word_end(1).is_done());
        assert_eq!(b.current().cur_col_idx, 10);
    }

    #[test]
    fn set_row_idx_places_row_and_column() {
        let lines: Vec<String> = (0..50).map(|i| format!("row {i} content")).collect();
        let mut b = Buffer::from_lines(lines);
        b.dim = FrameDim::new(1, 10, 1, 80);
        b.set_row_idx(30, 3, 5);
        assert_eq!(b.cur_idx, 30);
        assert_eq!(b.video_first_row_idx, 27);
        assert_eq!(b.row_pos, 1 + 3);
        // display column 5 (1-based) on an ascii row is byte 4
        assert_eq!(b.current().cur_col_idx, 4);
    }

    #[test]
    fn goto_linenr_pushes_jump() {
        let mut b = buf(&["a", "b", "c", "d", "e"]);
        b.goto_linenr(4);
        assert_eq!(b.cur_idx, 3);
        assert!(b.jump_back().is_done());
        assert_eq!(b.cur_idx, 0);
    }
}
