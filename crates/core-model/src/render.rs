//! Row rendering and screen composition.
//!
//! Per displayed line: slice from the row's horizontal anchor, walk
//! codepoints until the frame's columns are filled (tabs expanding to the
//! filetype width), hand the byte form to the syntax parse callback, and
//! store the decorated result at the row's screen position. The statusline
//! (mode, name, position, pid, clock) occupies the reserved top row and the
//! banner the message row.

use crate::editor::Editor;
use crate::window::Window;
use core_state::Buffer;
use core_term::{Video, escapes};
use std::time::{SystemTime, UNIX_EPOCH};

/// Render one buffer row for display (empty string past the end).
pub fn render_row(buf: &Buffer, idx: usize) -> String {
    let Some(row) = buf.row(idx) else {
        return String::new();
    };
    let tab = buf.ftype.tabwidth;
    let cols = buf.dim.num_cols();
    let from = if idx == buf.cur_idx { row.first_col_idx } else { 0 };
    let to = core_text::width::fit_cols(row.bytes(), from, cols, tab);
    let visible = &row.bytes()[from..to];
    let expanded = core_text::width::expand_tabs(visible, tab);
    buf.syn.parse_line(&expanded, idx)
}

/// Paint a buffer into its frame rows.
pub fn draw_buffer(buf: &Buffer, video: &mut Video) {
    let nrows = buf.dim.num_rows();
    for r in 0..nrows {
        let line = render_row(buf, buf.video_first_row_idx + r);
        video.set_row_with(buf.dim.first_row - 1 + r, &line);
    }
    video.render_set_from_to(buf.dim.first_row, buf.dim.last_row);
}

/// Paint a window: every frame's visible buffer plus divider rows.
pub fn draw_window(win: &Window, video: &mut Video) {
    use core_state::BufferFlags;
    for buf in &win.buffers {
        if buf.flags.contains(BufferFlags::BUF_IS_VISIBLE) {
            draw_buffer(buf, video);
        }
    }
    if win.has_dividers {
        let divider = "-".repeat(win.dim.num_cols());
        for pair in win.frames.windows(2) {
            let row = pair[0].last_row + 1;
            video.set_row_with(row - 1, &divider);
            video.render_set_from_to(row, row);
        }
    }
}

fn clock() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    format!("{:02}:{:02}", (secs / 3600) % 24, (secs / 60) % 60)
}

/// Compose the top status line.
pub fn statusline(ed: &Editor) -> String {
    let buf = ed.buf();
    let modified = if buf.is_modified() { " [+]" } else { "" };
    let line = format!(
        "{} {}{} {}:{} pid {} {}",
        buf.mode.display(),
        buf.display_name(),
        modified,
        buf.cur_idx + 1,
        core_text::index_of(buf.current().bytes(), buf.current().cur_col_idx) + 1,
        std::process::id(),
        clock(),
    );
    let end = core_text::width::fit_cols(&line, 0, ed.num_cols, 1);
    format!(
        "{}{}{}",
        escapes::INVERTED,
        &line[..end],
        escapes::COLOR_RESET
    )
}

/// Full repaint: topline, current window, message banner, cursor.
pub fn draw(ed: &mut Editor) {
    let top = statusline(ed);
    ed.video.set_row_with(0, &top);
    draw_window(&ed.windows[ed.cur_win], &mut ed.video);
    draw_msgline(ed);
    let (row_pos, col_pos) = (ed.buf().row_pos, ed.buf().col_pos);
    ed.video.set_cursor(row_pos, col_pos);
    let _ = ed.video.draw_all();
}

/// Repaint only the message row (banner or blank).
pub fn draw_msgline(ed: &mut Editor) {
    let content = match &ed.banner {
        Some((text, true)) => format!(
            "{}{}{}",
            escapes::color(escapes::colors::RED),
            text,
            escapes::COLOR_RESET
        ),
        Some((text, false)) => text.clone(),
        None => String::new(),
    };
    let row = ed.msg_row();
    ed.video.set_row_with(row - 1, &content);
    ed.video.render_set_from_to(row, row);
}

/// Repaint the current buffer's frame and the top line, then flush. The
/// cheap path after cursor-only or single-row changes.
pub fn refresh(ed: &mut Editor) {
    let top = statusline(ed);
    ed.video.set_row_with(0, &top);
    ed.video.render_set_from_to(1, 1);
    let win = &ed.windows[ed.cur_win];
    let buf = win.cur_buf();
    draw_buffer(buf, &mut ed.video);
    draw_msgline(ed);
    let (row_pos, col_pos) = (ed.buf().row_pos, ed.buf().col_pos);
    ed.video.set_cursor(row_pos, col_pos);
    ed.video.render_cursor();
    let _ = ed.video.flush();
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_state::FrameDim;
    use core_term::Video;

    #[test]
    fn rendered_width_fits_frame() {
        let mut buf = Buffer::from_lines(["x".repeat(200)]);
        buf.dim = FrameDim::new(1, 10, 1, 40);
        let line = render_row(&buf, 0);
        let stripped = escapes::strip_sgr(&line);
        assert!(stripped.chars().count() <= 40);
    }

    #[test]
    fn tabs_expand_in_render() {
        let mut buf = Buffer::from_lines(["a\tb"]);
        buf.dim = FrameDim::new(1, 10, 1, 40);
        buf.ftype.tabwidth = 4;
        assert_eq!(render_row(&buf, 0), "a    b");
    }

    #[test]
    fn rows_past_end_render_empty() {
        let buf = Buffer::from_lines(["only"]);
        assert_eq!(render_row(&buf, 5), "");
    }

    #[test]
    fn full_draw_emits_all_rows() {
        let (video, sink) = Video::with_shared_sink(24, 80);
        let mut ed = Editor::new(24, 80, Box::new(std::io::sink()));
        ed.video = video;
        ed.buf_mut().row_mut(0).unwrap().replace("hello");
        draw(&mut ed);
        let out = sink.contents();
        assert!(out.contains("hello"));
        assert!(out.contains("NORMAL"));
        assert!(out.contains(escapes::CURSOR_HIDE));
    }

    #[test]
    fn error_banner_is_red() {
        let (video, sink) = Video::with_shared_sink(24, 80);
        let mut ed = Editor::new(24, 80, Box::new(std::io::sink()));
        ed.video = video;
        ed.msg_error("bad things");
        draw(&mut ed);
        let out = sink.contents();
        assert!(out.contains("\x1b[31mbad things"));
    }
}
