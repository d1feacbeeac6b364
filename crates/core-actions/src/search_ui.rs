//! The search prompts (`/`, `?`, `n`, `N`, `*`, `#`).
//!
//! The prompt drives an [`Rline`] for line state but owns its key loop, so
//! each keystroke can re-run the incremental search and preview the
//! matching line (match inverted) on the message row without committing.
//! Confirmation moves the cursor, records the pattern in the search
//! history (register `/`), and arms `n`/`N`.

use core_model::{Editor, render};
use core_rline::Rline;
use core_search::{Direction, Search};
use core_state::{Buffer, EditOutcome};
use core_term::{Key, KeySource, escapes};
use tracing::debug;

fn preview(video: &mut core_term::Video, msg_row: usize, cols: usize, buf: &Buffer, s: &Search) {
    if !s.found {
        let _ = video.paint_rows_with(msg_row, 1, cols, "[no match]");
        return;
    }
    let Some(row) = buf.row(s.match_row) else {
        return;
    };
    let line = row.bytes();
    let (f, l) = (s.match_idx, s.match_idx + s.match_len);
    let composed = format!(
        "{}:{}{}{}{}{}",
        s.match_row + 1,
        &line[..f],
        escapes::INVERTED,
        &line[f..l],
        escapes::COLOR_RESET,
        &line[l..],
    );
    let _ = video.paint_rows_with(msg_row, 1, cols, &composed);
}

fn commit(ed: &mut Editor, mut s: Search) {
    if !s.found {
        let pat = s.pattern.clone();
        ed.msg_error(format!("pattern not found: {pat}"));
        ed.last_search = Some(s);
        return;
    }
    ed.history.push_search(s.pattern.clone());
    let buf = ed.buf_mut();
    buf.jump_push();
    buf.cur_idx = s.match_row;
    let col = core_text::floor_boundary(buf.current().bytes(), s.match_idx);
    buf.current_mut().cur_col_idx = col;
    buf.current_mut().clamp();
    buf.sync_view();
    s.row_idx = s.match_row;
    debug!(target: "actions.search", row = s.match_row, idx = s.match_idx, "committed");
    ed.last_search = Some(s);
}

/// `/` and `?`: incremental prompt.
pub fn prompt_search(ed: &mut Editor, keys: &mut dyn KeySource, backward: bool) -> EditOutcome {
    let dir = if backward {
        Direction::Backward
    } else {
        Direction::Forward
    };
    let origin = ed.buf().cursor_snapshot();
    let start_row = ed.buf().cur_idx;
    let prompt_row = ed.prompt_row();
    let msg_row = ed.msg_row();
    let cols = ed.num_cols;
    let mut rl = Rline::new(if backward { '?' } else { '/' }, prompt_row, cols);
    let mut s = Search::new(dir, start_row);

    let win = ed.cur_win;
    let buf_idx = ed.windows[win].cur_buf;
    // split borrows: the buffer is read while the video paints previews
    let ed_ptr: &mut Editor = ed;
    rl.render(&mut ed_ptr.video);
    while let Some(key) = keys.read_key() {
        match key {
            Key::Esc => {
                let _ = ed_ptr.video.resume_painted_rows();
                ed_ptr.buf_mut().restore_cursor(&origin);
                return EditOutcome::Nothing;
            }
            Key::Enter => {
                let _ = ed_ptr.video.resume_painted_rows();
                commit(ed_ptr, s);
                return EditOutcome::Done;
            }
            Key::Ctrl('n') | Key::Ctrl('p') => {
                let buf = &ed_ptr.windows[win].buffers[buf_idx];
                let _ = s.next(buf, key == Key::Ctrl('p'));
            }
            Key::Backspace => {
                if rl.backspace() {
                    s.rollback();
                    let pat = rl.text();
                    let _ = s.set_pattern(&pat);
                    s.row_idx = start_row;
                    let buf = &ed_ptr.windows[win].buffers[buf_idx];
                    let _ = s.step(buf);
                }
            }
            Key::Char(c) => {
                rl.insert(c);
                s.push_visited();
                let pat = rl.text();
                if s.set_pattern(&pat).is_ok() {
                    s.row_idx = start_row;
                    let buf = &ed_ptr.windows[win].buffers[buf_idx];
                    if s.step(buf).is_err() {
                        // partial patterns may be invalid regex while typing
                        s.found = false;
                    }
                }
            }
            _ => {}
        }
        {
            let (windows, video) = (&ed_ptr.windows, &mut ed_ptr.video);
            let buf = &windows[win].buffers[buf_idx];
            preview(video, msg_row, cols, buf, &s);
        }
        rl.render(&mut ed_ptr.video);
    }
    let _ = ed_ptr.video.resume_painted_rows();
    ed_ptr.buf_mut().restore_cursor(&origin);
    EditOutcome::Nothing
}

/// `n` / `N`: continue the committed search.
pub fn search_next(ed: &mut Editor, reverse: bool) -> EditOutcome {
    let Some(mut s) = ed.last_search.take() else {
        ed.msg_error("no previous search");
        return EditOutcome::Nothing;
    };
    let hit = {
        let buf = ed.buf();
        s.next(buf, reverse)
    };
    match hit {
        Ok(true) => {
            let buf = ed.buf_mut();
            buf.jump_push();
            buf.cur_idx = s.match_row;
            let col = core_text::floor_boundary(buf.current().bytes(), s.match_idx);
            buf.current_mut().cur_col_idx = col;
            buf.current_mut().clamp();
            buf.sync_view();
            ed.last_search = Some(s);
            render::refresh(ed);
            EditOutcome::Done
        }
        Ok(false) => {
            let pat = s.pattern.clone();
            ed.last_search = Some(s);
            ed.msg_error(format!("pattern not found: {pat}"));
            EditOutcome::Nothing
        }
        Err(e) => {
            ed.last_search = Some(s);
            ed.msg_error(e.to_string());
            EditOutcome::Nothing
        }
    }
}

/// `*` / `#`: seed the pattern with the word under the cursor and search.
pub fn word_search(ed: &mut Editor, backward: bool) -> EditOutcome {
    let dir = if backward {
        Direction::Backward
    } else {
        Direction::Forward
    };
    let Some(mut s) = core_search::word_search(ed.buf(), dir) else {
        ed.msg_error("no word under cursor");
        return EditOutcome::Nothing;
    };
    // start past the current row so the hit is the next occurrence
    let total = ed.buf().num_rows();
    s.row_idx = match dir {
        Direction::Forward => (ed.buf().cur_idx + 1) % total,
        Direction::Backward => ed.buf().cur_idx.checked_sub(1).unwrap_or(total - 1),
    };
    let hit = {
        let buf = ed.buf();
        s.step(buf)
    };
    match hit {
        Ok(true) => {
            commit(ed, s);
            render::refresh(ed);
            EditOutcome::Done
        }
        _ => {
            let pat = s.pattern.clone();
            ed.msg_error(format!("pattern not found: {pat}"));
            EditOutcome::Nothing
        }
    }
}
