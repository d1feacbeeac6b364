//! Windows and frames.
//!
//! A window partitions its area into stacked frames (optionally separated
//! by one-row dividers) and owns an ordered buffer list. Exactly one buffer
//! per frame is visible; focus changes keep that invariant. Special windows
//! host editor-internal scratch buffers and are skipped by default cycling.

use core_state::{Buffer, BufferFlags, EditOutcome, FrameDim};
use tracing::{debug, trace};

pub const MIN_FRAMES: usize = 1;
pub const MAX_FRAMES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowType {
    Normal,
    Special,
}

pub struct Window {
    pub name: String,
    pub wtype: WindowType,
    pub buffers: Vec<Buffer>,
    pub cur_buf: usize,
    pub prev_buf: usize,
    pub frames: Vec<FrameDim>,
    pub cur_frame: usize,
    /// The window's whole area (excludes the editor's reserved rows).
    pub dim: FrameDim,
    pub has_dividers: bool,
    pub max_frames: usize,
}

impl Window {
    pub fn new(name: impl Into<String>, wtype: WindowType, dim: FrameDim) -> Self {
        let mut w = Self {
            name: name.into(),
            wtype,
            buffers: Vec::new(),
            cur_buf: 0,
            prev_buf: 0,
            frames: Vec::new(),
            cur_frame: 0,
            dim,
            has_dividers: true,
            max_frames: MAX_FRAMES,
        };
        w.dim_calc(1);
        w
    }

    pub fn num_frames(&self) -> usize {
        self.frames.len()
    }

    /// Partition the window area into `num_frames` strips. The remainder
    /// rows go to frame 0.
    pub fn dim_calc(&mut self, num_frames: usize) {
        let num_frames = num_frames.clamp(MIN_FRAMES, self.max_frames);
        let avail = self.dim.num_rows();
        let dividers = if self.has_dividers { num_frames - 1 } else { 0 };
        let per_frame = avail.saturating_sub(dividers) / num_frames;
        let extra = avail.saturating_sub(dividers) % num_frames;
        self.frames.clear();
        let mut row = self.dim.first_row;
        for i in 0..num_frames {
            let rows = per_frame + if i == 0 { extra } else { 0 };
            self.frames.push(FrameDim::new(
                row,
                row + rows - 1,
                self.dim.first_col,
                self.dim.last_col,
            ));
            row += rows;
            if self.has_dividers && i + 1 < num_frames {
                row += 1;
            }
        }
        self.cur_frame = self.cur_frame.min(num_frames - 1);
        self.reassign_frames();
        debug!(target: "model.win", window = %self.name, frames = num_frames, "dim_calc");
    }

    /// Clamp every buffer's frame and refit its viewport to the (possibly
    /// shorter) frame.
    fn reassign_frames(&mut self) {
        let last = self.frames.len() - 1;
        for buf in &mut self.buffers {
            buf.at_frame = buf.at_frame.min(last);
            buf.dim = self.frames[buf.at_frame];
            let nrows = buf.dim.num_rows();
            if buf.cur_idx >= buf.video_first_row_idx + nrows {
                buf.video_first_row_idx = buf.cur_idx + 1 - nrows;
            }
            buf.sync_view();
        }
    }

    /// Grow by one frame; refuses when a frame would drop below one row.
    pub fn add_frame(&mut self) -> EditOutcome {
        let n = self.frames.len() + 1;
        if n > self.max_frames {
            return EditOutcome::Nothing;
        }
        let dividers = if self.has_dividers { n - 1 } else { 0 };
        if self.dim.num_rows().saturating_sub(dividers) / n < 1 {
            return EditOutcome::Nothing;
        }
        self.dim_calc(n);
        EditOutcome::Done
    }

    /// Collapse to a single frame, moving every buffer there.
    pub fn only_frame(&mut self) -> EditOutcome {
        if self.frames.len() == 1 {
            return EditOutcome::Nothing;
        }
        for buf in &mut self.buffers {
            buf.at_frame = 0;
        }
        self.cur_frame = 0;
        self.dim_calc(1);
        self.make_visible(self.cur_buf);
        EditOutcome::Done
    }

    pub fn delete_frame(&mut self) -> EditOutcome {
        if self.frames.len() <= MIN_FRAMES {
            return EditOutcome::Nothing;
        }
        let gone = self.cur_frame;
        for buf in &mut self.buffers {
            if buf.at_frame >= gone && buf.at_frame > 0 {
                buf.at_frame -= 1;
            }
        }
        self.cur_frame = self.cur_frame.saturating_sub(1);
        self.dim_calc(self.frames.len() - 1);
        self.frame_change(self.cur_frame)
    }

    /// Attach a buffer to `frame`, making it the visible one there.
    pub fn attach(&mut self, mut buf: Buffer, frame: usize) -> usize {
        let frame = frame.min(self.frames.len() - 1);
        buf.at_frame = frame;
        buf.dim = self.frames[frame];
        buf.sync_view();
        self.buffers.push(buf);
        let idx = self.buffers.len() - 1;
        self.make_visible(idx);
        idx
    }

    /// Make buffer `idx` the focused, visible buffer of its frame.
    pub fn make_visible(&mut self, idx: usize) {
        if idx >= self.buffers.len() {
            return;
        }
        let frame = self.buffers[idx].at_frame;
        for (i, buf) in self.buffers.iter_mut().enumerate() {
            if buf.at_frame == frame {
                buf.flags.set(BufferFlags::BUF_IS_VISIBLE, i == idx);
            }
        }
        if idx != self.cur_buf {
            self.prev_buf = self.cur_buf;
        }
        self.cur_buf = idx;
        self.cur_frame = frame;
        trace!(target: "model.win", window = %self.name, buf = idx, frame, "focus");
    }

    /// Focus frame `n`'s visible buffer.
    pub fn frame_change(&mut self, n: usize) -> EditOutcome {
        if n >= self.frames.len() {
            return EditOutcome::Nothing;
        }
        let target = self
            .buffers
            .iter()
            .position(|b| b.at_frame == n && b.flags.contains(BufferFlags::BUF_IS_VISIBLE))
            .or_else(|| self.buffers.iter().position(|b| b.at_frame == n));
        match target {
            Some(idx) => {
                self.make_visible(idx);
                EditOutcome::Done
            }
            None => {
                self.cur_frame = n;
                EditOutcome::Nothing
            }
        }
    }

    /// Focus the next frame below (wrapping).
    pub fn frame_next(&mut self) -> EditOutcome {
        if self.frames.len() < 2 {
            return EditOutcome::Nothing;
        }
        let n = (self.cur_frame + 1) % self.frames.len();
        self.frame_change(n)
    }

    pub fn frame_prev(&mut self) -> EditOutcome {
        if self.frames.len() < 2 {
            return EditOutcome::Nothing;
        }
        let n = self
            .cur_frame
            .checked_sub(1)
            .unwrap_or(self.frames.len() - 1);
        self.frame_change(n)
    }

    pub fn cur_buf(&self) -> &Buffer {
        &self.buffers[self.cur_buf]
    }

    pub fn cur_buf_mut(&mut self) -> &mut Buffer {
        &mut self.buffers[self.cur_buf]
    }

    fn frame_members(&self, frame: usize) -> Vec<usize> {
        self.buffers
            .iter()
            .enumerate()
            .filter(|(_, b)| b.at_frame == frame)
            .map(|(i, _)| i)
            .collect()
    }

    /// Cycle to the next buffer hosted by the current frame.
    pub fn buf_next(&mut self) -> EditOutcome {
        let members = self.frame_members(self.cur_frame);
        if members.len() < 2 {
            return EditOutcome::Nothing;
        }
        let pos = members.iter().position(|&i| i == self.cur_buf).unwrap_or(0);
        let next = members[(pos + 1) % members.len()];
        self.make_visible(next);
        EditOutcome::Done
    }

    pub fn buf_prev(&mut self) -> EditOutcome {
        let members = self.frame_members(self.cur_frame);
        if members.len() < 2 {
            return EditOutcome::Nothing;
        }
        let pos = members.iter().position(|&i| i == self.cur_buf).unwrap_or(0);
        let prev = members[pos.checked_sub(1).unwrap_or(members.len() - 1)];
        self.make_visible(prev);
        EditOutcome::Done
    }

    pub fn buf_prev_focused(&mut self) -> EditOutcome {
        if self.prev_buf == self.cur_buf || self.prev_buf >= self.buffers.len() {
            return EditOutcome::Nothing;
        }
        self.make_visible(self.prev_buf);
        EditOutcome::Done
    }

    /// Remove buffer `idx`; previous-focused indices are clamped so nothing
    /// dangles. Returns the removed buffer.
    pub fn remove_buffer(&mut self, idx: usize) -> Option<Buffer> {
        if idx >= self.buffers.len() {
            return None;
        }
        let buf = self.buffers.remove(idx);
        if self.buffers.is_empty() {
            self.cur_buf = 0;
            self.prev_buf = 0;
            return Some(buf);
        }
        let prev_was_target = self.prev_buf == idx;
        if self.cur_buf > idx {
            self.cur_buf -= 1;
        }
        self.cur_buf = self.cur_buf.min(self.buffers.len() - 1);
        if self.prev_buf > idx {
            self.prev_buf -= 1;
        }
        self.prev_buf = self.prev_buf.min(self.buffers.len() - 1);
        if prev_was_target {
            self.prev_buf = self.cur_buf;
        }
        self.make_visible(self.cur_buf);
        Some(buf)
    }

    pub fn find_buffer(&self, name: &str) -> Option<usize> {
        self.buffers.iter().position(|b| {
            b.display_name() == name || b.basename() == name
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window() -> Window {
        // 22 usable rows
        Window::new("main", WindowType::Normal, FrameDim::new(2, 23, 1, 80))
    }

    fn buf(text: &str) -> Buffer {
        Buffer::from_lines(text.lines())
    }

    #[test]
    fn one_frame_spans_window() {
        let w = window();
        assert_eq!(w.num_frames(), 1);
        assert_eq!(w.frames[0], FrameDim::new(2, 23, 1, 80));
    }

    #[test]
    fn dim_calc_distributes_remainder_to_frame_zero() {
        let mut w = window();
        w.dim_calc(3);
        // 22 rows - 2 dividers = 20 -> 6 per frame, remainder 2 to frame 0
        assert_eq!(w.frames[0].num_rows(), 8);
        assert_eq!(w.frames[1].num_rows(), 6);
        assert_eq!(w.frames[2].num_rows(), 6);
        // dividers: one row between consecutive frames
        assert_eq!(w.frames[1].first_row, w.frames[0].last_row + 2);
    }

    #[test]
    fn add_frame_refuses_when_too_small() {
        let mut w = Window::new("tiny", WindowType::Normal, FrameDim::new(2, 4, 1, 80));
        // 3 rows: a second frame (plus divider) leaves 1 row each -> ok
        assert!(w.add_frame().is_done());
        // a third would need 3 rows + 2 dividers > 3
        assert_eq!(w.add_frame(), EditOutcome::Nothing);
    }

    #[test]
    fn visible_invariant_per_frame() {
        let mut w = window();
        w.attach(buf("a"), 0);
        w.attach(buf("b"), 0);
        let visible: Vec<bool> = w
            .buffers
            .iter()
            .map(|b| b.flags.contains(BufferFlags::BUF_IS_VISIBLE))
            .collect();
        assert_eq!(visible, vec![false, true]);
        w.buf_next();
        let visible: Vec<bool> = w
            .buffers
            .iter()
            .map(|b| b.flags.contains(BufferFlags::BUF_IS_VISIBLE))
            .collect();
        assert_eq!(visible, vec![true, false]);
    }

    #[test]
    fn frame_cycle_wraps() {
        let mut w = window();
        w.dim_calc(3);
        w.attach(buf("a"), 0);
        w.attach(buf("b"), 1);
        w.attach(buf("c"), 2);
        w.frame_change(0);
        assert_eq!(w.cur_buf().display_name(), "[No Name]");
        assert_eq!(w.cur_frame, 0);
        w.frame_next();
        assert_eq!(w.cur_frame, 1);
        w.frame_next();
        assert_eq!(w.cur_frame, 2);
        w.frame_next();
        assert_eq!(w.cur_frame, 0);
    }

    #[test]
    fn prev_focused_round_trip() {
        let mut w = window();
        w.attach(buf("a"), 0);
        w.attach(buf("b"), 0);
        w.make_visible(0);
        assert_eq!(w.prev_buf, 1);
        w.buf_prev_focused();
        assert_eq!(w.cur_buf, 1);
        w.buf_prev_focused();
        assert_eq!(w.cur_buf, 0);
    }

    #[test]
    fn remove_buffer_clamps_prev_focused() {
        let mut w = window();
        w.attach(buf("a"), 0);
        w.attach(buf("b"), 0);
        w.attach(buf("c"), 0);
        w.make_visible(1);
        w.remove_buffer(2);
        assert!(w.prev_buf < w.buffers.len());
        assert!(w.cur_buf < w.buffers.len());
    }

    #[test]
    fn delete_frame_reassigns_buffers() {
        let mut w = window();
        w.dim_calc(3);
        w.attach(buf("a"), 0);
        w.attach(buf("b"), 1);
        w.attach(buf("c"), 2);
        w.frame_change(2);
        assert!(w.delete_frame().is_done());
        assert_eq!(w.num_frames(), 2);
        for b in &w.buffers {
            assert!(b.at_frame < 2);
        }
        assert_eq!(w.delete_frame(), EditOutcome::Done);
        assert_eq!(w.delete_frame(), EditOutcome::Nothing);
    }

    #[test]
    fn viewport_refits_on_shrink() {
        let mut w = window();
        let mut b = Buffer::from_lines((0..100).map(|i| format!("l{i}")));
        b.dim = w.frames[0];
        b.goto_linenr(60);
        w.attach(b, 0);
        w.dim_calc(3);
        let b = w.cur_buf();
        let nrows = b.dim.num_rows();
        assert!(b.cur_idx >= b.video_first_row_idx);
        assert!(b.cur_idx < b.video_first_row_idx + nrows);
    }
}
