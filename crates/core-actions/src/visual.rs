//! Visual modes: characterwise, linewise, blockwise.
//!
//! Selection is painted by rendering the selected rows plain and inverting
//! the selected byte span, so the highlight always wins over syntax
//! decoration. `ESC` leaves the mode with the cursor back on the anchor.

use crate::edits;
use core_model::{Editor, render};
use core_state::{Action, EditOutcome, Mode, RegType, Register};
use core_term::{Key, KeySource};
use core_text::width::{expand_tabs, fit_cols, visual_col};
use tracing::debug;

/// Byte offset within `line` of the codepoint covering display column
/// `col` (0-based).
fn byte_at_display_col(line: &str, col: usize, tab: usize) -> usize {
    let mut b = 0usize;
    while b < line.len() {
        if visual_col(line, 0, b, tab) >= col {
            return b;
        }
        b = core_text::next_boundary(line, b);
    }
    line.len()
}

fn paint_char_selection(ed: &mut Editor, row_idx: usize, fidx: usize, lidx: usize) {
    let buf = &ed.windows[ed.cur_win].buffers[ed.windows[ed.cur_win].cur_buf];
    if row_idx < buf.video_first_row_idx {
        return;
    }
    let screen = buf.dim.first_row + (row_idx - buf.video_first_row_idx);
    if screen > buf.dim.last_row {
        return;
    }
    let row = buf.row(row_idx).expect("selected row");
    let tab = buf.ftype.tabwidth;
    let cols = buf.dim.num_cols();
    let from = if row_idx == buf.cur_idx { row.first_col_idx } else { 0 };
    let to = fit_cols(row.bytes(), from, cols, tab);
    let visible = &row.bytes()[from..to];
    // offsets into the visible slice; tabs shift bytes on expansion so the
    // selection is mapped through display columns
    let f = fidx.clamp(from, to) - from;
    let l = lidx.clamp(from, to) - from;
    let plain = expand_tabs(visible, tab);
    let df = visual_col(visible, 0, f, tab);
    let dl = visual_col(visible, 0, l, tab);
    let bf = core_text::nth_offset(&plain, df);
    let bl = core_text::nth_offset(&plain, dl);
    ed.video.set_row_with(screen - 1, &plain);
    ed.video.row_hl_at(screen - 1, 7, bf, bl);
    let _ = ed.video.draw_row_at(screen);
}

/// Characterwise visual mode: the selection lives within one row.
pub fn visual_char(ed: &mut Editor, keys: &mut dyn KeySource, reg: char) -> EditOutcome {
    ed.buf_mut().mode = Mode::VisualChar;
    let anchor = ed.buf().current().cur_col_idx;
    let row_idx = ed.buf().cur_idx;
    render::refresh(ed);
    let mut outcome = EditOutcome::Nothing;
    loop {
        let cur = ed.buf().current().cur_col_idx;
        let line = ed.buf().current().bytes().to_string();
        let (fidx, lidx) = if anchor <= cur {
            (anchor, core_text::next_boundary(&line, cur))
        } else {
            (cur, core_text::next_boundary(&line, anchor))
        };
        paint_char_selection(ed, row_idx, fidx, lidx);
        let Some(key) = keys.read_key() else { break };
        match key {
            Key::Esc => {
                ed.buf_mut().current_mut().cur_col_idx = anchor;
                break;
            }
            Key::Char('h') | Key::Left => {
                let _ = ed.buf_mut().left(1);
            }
            Key::Char('l') | Key::Right => {
                let _ = ed.buf_mut().right(1);
            }
            Key::Char('0') => {
                let _ = ed.buf_mut().bol();
            }
            Key::Char('$') => {
                let _ = ed.buf_mut().eol();
            }
            Key::Char('w') => {
                let before = ed.buf().cur_idx;
                let _ = ed.buf_mut().word_forward(1);
                if ed.buf().cur_idx != before {
                    // selection cannot leave the row
                    ed.buf_mut().cur_idx = before;
                    let _ = ed.buf_mut().eol();
                }
            }
            Key::Char('b') => {
                let before = ed.buf().cur_idx;
                let _ = ed.buf_mut().word_backward(1);
                if ed.buf().cur_idx != before {
                    ed.buf_mut().cur_idx = before;
                    let _ = ed.buf_mut().bol();
                }
            }
            Key::Char('d') | Key::Char('x') => {
                let buf = ed.buf_mut();
                let mut action = Action::default();
                action.push(buf.act_replace(buf.cur_idx));
                let removed = buf.current_mut().remove_range(fidx, lidx);
                buf.current_mut().cur_col_idx =
                    core_text::floor_boundary(buf.current().bytes(), fidx);
                buf.push_action(action);
                buf.set_modified();
                buf.sync_view();
                ed.register_set(reg, Register::charwise(removed));
                outcome = EditOutcome::Done;
                break;
            }
            Key::Char('y') => {
                let text = line[fidx..lidx].to_string();
                ed.register_set(reg, Register::charwise(text));
                ed.buf_mut().current_mut().cur_col_idx = anchor;
                outcome = EditOutcome::Done;
                break;
            }
            Key::Char('+') | Key::Char('*') => {
                let text = line[fidx..lidx].to_string();
                ed.register_set(key_char(key), Register::charwise(text));
                outcome = EditOutcome::Done;
                break;
            }
            Key::Char('~') => {
                let buf = ed.buf_mut();
                let mut action = Action::default();
                action.push(buf.act_replace(buf.cur_idx));
                let toggled: String = line[fidx..lidx]
                    .chars()
                    .map(core_text::case::toggle)
                    .collect();
                buf.current_mut().remove_range(fidx, lidx);
                buf.current_mut().insert_str(fidx, &toggled);
                buf.current_mut().cur_col_idx = fidx;
                buf.push_action(action);
                buf.set_modified();
                outcome = EditOutcome::Done;
                break;
            }
            _ => {}
        }
    }
    ed.buf_mut().mode = Mode::Normal;
    render::refresh(ed);
    outcome
}

fn key_char(k: Key) -> char {
    match k {
        Key::Char(c) => c,
        _ => '"',
    }
}

/// Linewise visual mode over whole rows.
pub fn visual_line(ed: &mut Editor, keys: &mut dyn KeySource, reg: char) -> EditOutcome {
    ed.buf_mut().mode = Mode::VisualLine;
    let anchor = ed.buf().cur_idx;
    let origin = ed.buf().cursor_snapshot();
    render::refresh(ed);
    let mut outcome = EditOutcome::Nothing;
    loop {
        let cur = ed.buf().cur_idx;
        let (first, last) = (anchor.min(cur), anchor.max(cur));
        paint_line_selection(ed, first, last);
        let Some(key) = keys.read_key() else { break };
        match key {
            Key::Esc => {
                ed.buf_mut().restore_cursor(&origin);
                break;
            }
            Key::Char('j') | Key::Down => {
                let _ = ed.buf_mut().down(1);
            }
            Key::Char('k') | Key::Up => {
                let _ = ed.buf_mut().up(1);
            }
            Key::Char('G') => {
                let _ = ed.buf_mut().eof();
            }
            Key::Char('g') => {
                if let Some(Key::Char('g')) = keys.read_key() {
                    let _ = ed.buf_mut().bof();
                }
            }
            Key::Char('d') => {
                let win = ed.cur_win;
                let bi = ed.windows[win].cur_buf;
                let buf = &mut ed.windows[win].buffers[bi];
                buf.cur_idx = first;
                let count = last - first + 1;
                edits::delete_lines(buf, &mut ed.registers, count, reg);
                outcome = EditOutcome::Done;
                break;
            }
            Key::Char('y') => {
                let win = ed.cur_win;
                let bi = ed.windows[win].cur_buf;
                let buf = &mut ed.windows[win].buffers[bi];
                buf.cur_idx = first;
                edits::yank_lines(buf, &mut ed.registers, last - first + 1, reg);
                buf.cur_idx = anchor;
                outcome = EditOutcome::Done;
                break;
            }
            Key::Char('>') | Key::Char('<') => {
                let out = key == Key::Char('<');
                let buf = ed.buf_mut();
                let width = buf.ftype.shiftwidth;
                let mut action = Action::default();
                for idx in first..=last {
                    action.push(buf.act_replace(idx));
                    let row = buf.row_mut(idx).expect("row in range");
                    if out {
                        let present = row
                            .bytes()
                            .char_indices()
                            .take_while(|(_, c)| *c == ' ')
                            .count();
                        let strip = present.min(width);
                        row.remove_range(0, strip);
                    } else {
                        row.insert_str(0, &" ".repeat(width));
                    }
                }
                buf.push_action(action);
                buf.set_modified();
                outcome = EditOutcome::Done;
                break;
            }
            Key::Char('s') => {
                let prefill = format!("substitute --range={},{} --pat=", first + 1, last + 1);
                ed.buf_mut().mode = Mode::Normal;
                let _ = crate::commands::command_prompt_with(ed, keys, &prefill);
                render::refresh(ed);
                return EditOutcome::Done;
            }
            Key::Char('w') => {
                let prefill = format!("write --range={},{} --fname=", first + 1, last + 1);
                ed.buf_mut().mode = Mode::Normal;
                let _ = crate::commands::command_prompt_with(ed, keys, &prefill);
                render::refresh(ed);
                return EditOutcome::Done;
            }
            Key::Char('+') | Key::Char('*') => {
                let lines: Vec<String> = (first..=last)
                    .filter_map(|i| ed.buf().row(i).map(|r| r.bytes().to_string()))
                    .collect();
                ed.register_set(key_char(key), Register::linewise(lines));
                outcome = EditOutcome::Done;
                break;
            }
            Key::Char(c) => {
                // user-registered linewise actions
                if let Some(pos) = ed.line_actions.iter().position(|a| a.key == c) {
                    let apply = ed.line_actions[pos].apply;
                    ed.buf_mut().mode = Mode::Normal;
                    outcome = apply(ed, (first, last));
                    break;
                }
            }
            _ => {}
        }
    }
    ed.buf_mut().mode = Mode::Normal;
    render::refresh(ed);
    outcome
}

fn paint_line_selection(ed: &mut Editor, first: usize, last: usize) {
    let win = ed.cur_win;
    let buf_idx = ed.windows[win].cur_buf;
    let (dim, vfirst, tab) = {
        let buf = &ed.windows[win].buffers[buf_idx];
        (buf.dim, buf.video_first_row_idx, buf.ftype.tabwidth)
    };
    for idx in first..=last {
        if idx < vfirst {
            continue;
        }
        let screen = dim.first_row + (idx - vfirst);
        if screen > dim.last_row {
            break;
        }
        let line = {
            let buf = &ed.windows[win].buffers[buf_idx];
            buf.row(idx).map(|r| r.bytes().to_string()).unwrap_or_default()
        };
        let to = fit_cols(&line, 0, dim.num_cols(), tab);
        let plain = expand_tabs(&line[..to], tab);
        let len = plain.len();
        ed.video.set_row_with(screen - 1, &plain);
        ed.video.row_hl_at(screen - 1, 7, 0, len.max(1));
        let _ = ed.video.draw_row_at(screen);
    }
}

/// Blockwise visual mode: a rectangle of rows and display columns.
pub fn visual_block(ed: &mut Editor, keys: &mut dyn KeySource, reg: char) -> EditOutcome {
    ed.buf_mut().mode = Mode::VisualBlock;
    let anchor_row = ed.buf().cur_idx;
    let tab = ed.buf().ftype.tabwidth;
    let anchor_col = visual_col(
        ed.buf().current().bytes(),
        0,
        ed.buf().current().cur_col_idx,
        tab,
    );
    let origin = ed.buf().cursor_snapshot();
    render::refresh(ed);
    let mut outcome = EditOutcome::Nothing;
    loop {
        let cur_row = ed.buf().cur_idx;
        let cur_col = visual_col(
            ed.buf().current().bytes(),
            0,
            ed.buf().current().cur_col_idx,
            tab,
        );
        let (first, last) = (anchor_row.min(cur_row), anchor_row.max(cur_row));
        let (cfrom, cto) = (anchor_col.min(cur_col), anchor_col.max(cur_col) + 1);
        paint_block_selection(ed, first, last, cfrom, cto);
        let Some(key) = keys.read_key() else { break };
        match key {
            Key::Esc => {
                ed.buf_mut().restore_cursor(&origin);
                break;
            }
            Key::Char('h') | Key::Left => {
                let _ = ed.buf_mut().left(1);
            }
            Key::Char('l') | Key::Right => {
                let _ = ed.buf_mut().right(1);
            }
            Key::Char('j') | Key::Down => {
                let _ = ed.buf_mut().down(1);
            }
            Key::Char('k') | Key::Up => {
                let _ = ed.buf_mut().up(1);
            }
            Key::Char('d') => {
                block_delete(ed, first, last, cfrom, cto, reg);
                outcome = EditOutcome::Done;
                break;
            }
            Key::Char('c') => {
                block_delete(ed, first, last, cfrom, cto, reg);
                block_insert(ed, keys, first, last, cfrom);
                outcome = EditOutcome::Done;
                break;
            }
            Key::Char('I') => {
                block_insert(ed, keys, first, last, cfrom);
                outcome = EditOutcome::Done;
                break;
            }
            _ => {}
        }
    }
    if ed.buf().mode == Mode::VisualBlock {
        ed.buf_mut().mode = Mode::Normal;
    }
    render::refresh(ed);
    outcome
}

fn paint_block_selection(ed: &mut Editor, first: usize, last: usize, cfrom: usize, cto: usize) {
    let win = ed.cur_win;
    let buf_idx = ed.windows[win].cur_buf;
    let (dim, vfirst, tab) = {
        let buf = &ed.windows[win].buffers[buf_idx];
        (buf.dim, buf.video_first_row_idx, buf.ftype.tabwidth)
    };
    for idx in first..=last {
        if idx < vfirst {
            continue;
        }
        let screen = dim.first_row + (idx - vfirst);
        if screen > dim.last_row {
            break;
        }
        let line = {
            let buf = &ed.windows[win].buffers[buf_idx];
            buf.row(idx).map(|r| r.bytes().to_string()).unwrap_or_default()
        };
        let to = fit_cols(&line, 0, dim.num_cols(), tab);
        let plain = expand_tabs(&line[..to], tab);
        let bf = core_text::nth_offset(&plain, cfrom.min(plain.chars().count()));
        let bl = core_text::nth_offset(&plain, cto.min(plain.chars().count()));
        ed.video.set_row_with(screen - 1, &plain);
        if bf < bl {
            ed.video.row_hl_at(screen - 1, 7, bf, bl);
        }
        let _ = ed.video.draw_row_at(screen);
    }
}

fn block_delete(
    ed: &mut Editor,
    first: usize,
    last: usize,
    cfrom: usize,
    cto: usize,
    reg: char,
) {
    let buf = ed.buf_mut();
    let tab = buf.ftype.tabwidth;
    let mut action = Action::default();
    let mut parts = Vec::new();
    for idx in first..=last {
        action.push(buf.act_replace(idx));
        let row = buf.row_mut(idx).expect("row in range");
        let bf = byte_at_display_col(row.bytes(), cfrom, tab);
        let bl = byte_at_display_col(row.bytes(), cto, tab);
        parts.push(row.remove_range(bf, bl));
    }
    buf.cur_idx = first;
    buf.current_mut().clamp();
    buf.push_action(action);
    buf.set_modified();
    buf.sync_view();
    ed.register_set(reg, Register {
        rtype: RegType::Linewise,
        entries: parts,
    });
    debug!(target: "actions.visual", rows = last - first + 1, "block delete");
}

/// `I` / post-`c`: run an insert on the first row of the block, then
/// replicate the typed text at the same column on every other row, folded
/// into the same undo action.
fn block_insert(
    ed: &mut Editor,
    keys: &mut dyn KeySource,
    first: usize,
    last: usize,
    cfrom: usize,
) {
    let tab = ed.buf().ftype.tabwidth;
    {
        let buf = ed.buf_mut();
        buf.cur_idx = first;
        let at = byte_at_display_col(buf.current().bytes(), cfrom, tab);
        buf.current_mut().cur_col_idx = at;
        buf.mode = Mode::Insert;
    }
    crate::insert::insert_mode(ed, keys);
    let text = ed.last_insert.clone();
    if text.is_empty() || text.contains('\n') || last == first {
        return;
    }
    let buf = ed.buf_mut();
    let mut extra = Vec::new();
    for idx in first + 1..=last {
        extra.push(buf.act_replace(idx));
        let row = buf.row_mut(idx).expect("row in range");
        let at = byte_at_display_col(row.bytes(), cfrom, tab);
        row.insert_str(at, &text);
    }
    if let Some(action) = buf.undo.last_action_mut() {
        for act in extra {
            action.push(act);
        }
    }
    buf.set_modified();
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_state::Buffer;
    use core_term::ScriptedKeys;

    fn editor_with(lines: &[&str]) -> Editor {
        let mut ed = Editor::new(24, 80, Box::new(std::io::sink()));
        let dim = ed.buf().dim;
        let flags = ed.buf().flags;
        *ed.buf_mut() = Buffer::from_lines(lines.iter().copied());
        ed.buf_mut().dim = dim;
        ed.buf_mut().flags = flags;
        ed
    }

    #[test]
    fn charwise_delete_selection() {
        let mut ed = editor_with(&["hello world"]);
        // select "hello" (anchor at 0, move right 4, delete)
        let mut keys = ScriptedKeys::typed("lllld");
        visual_char(&mut ed, &mut keys, '"');
        assert_eq!(ed.buf().current().bytes(), " world");
        assert_eq!(ed.registers.unnamed().unwrap().text(), "hello");
        assert_eq!(ed.buf().mode, Mode::Normal);
    }

    #[test]
    fn charwise_escape_returns_to_anchor() {
        let mut ed = editor_with(&["abcdef"]);
        ed.buf_mut().current_mut().cur_col_idx = 2;
        let mut keys = ScriptedKeys::typed("lll\x1b");
        visual_char(&mut ed, &mut keys, '"');
        assert_eq!(ed.buf().current().cur_col_idx, 2);
    }

    #[test]
    fn charwise_case_toggle() {
        let mut ed = editor_with(&["abc"]);
        let mut keys = ScriptedKeys::typed("ll~");
        visual_char(&mut ed, &mut keys, '"');
        assert_eq!(ed.buf().current().bytes(), "ABC");
    }

    #[test]
    fn linewise_delete_and_put_restores() {
        let mut ed = editor_with(&["a", "b", "c", "d"]);
        let mut keys = ScriptedKeys::typed("jd");
        visual_line(&mut ed, &mut keys, '"');
        assert_eq!(ed.buf().lines().collect::<Vec<_>>(), vec!["c", "d"]);
        let reg = ed.registers.unnamed().unwrap().clone();
        assert_eq!(reg.rtype, RegType::Linewise);
        // put before restores the original order
        edits::put(ed.buf_mut(), &reg, true);
        assert_eq!(
            ed.buf().lines().collect::<Vec<_>>(),
            vec!["a", "b", "c", "d"]
        );
    }

    #[test]
    fn linewise_indent_range() {
        let mut ed = editor_with(&["x", "y"]);
        ed.buf_mut().ftype.shiftwidth = 2;
        let mut keys = ScriptedKeys::typed("j>");
        visual_line(&mut ed, &mut keys, '"');
        assert_eq!(ed.buf().lines().collect::<Vec<_>>(), vec!["  x", "  y"]);
        assert_eq!(ed.buf().undo.undo_depth(), 1);
    }

    #[test]
    fn blockwise_delete_rectangle() {
        let mut ed = editor_with(&["abcd", "efgh", "ijkl"]);
        ed.buf_mut().current_mut().cur_col_idx = 1;
        // anchor col 1; extend to col 2 and down two rows, delete
        let mut keys = ScriptedKeys::typed("ljjd");
        visual_block(&mut ed, &mut keys, '"');
        assert_eq!(ed.buf().lines().collect::<Vec<_>>(), vec!["ad", "eh", "il"]);
        let reg = ed.registers.unnamed().unwrap();
        let expect: Vec<String> = ["bc", "fg", "jk"].iter().map(|s| s.to_string()).collect();
        assert_eq!(reg.entries, expect);
    }

    #[test]
    fn blockwise_insert_replicates() {
        let mut ed = editor_with(&["one", "two", "three"]);
        // I on col 0 over all three rows; type "# ", Esc
        let mut keys = ScriptedKeys::new([
            Key::Char('j'),
            Key::Char('j'),
            Key::Char('I'),
            Key::Char('#'),
            Key::Char(' '),
            Key::Esc,
        ]);
        visual_block(&mut ed, &mut keys, '"');
        assert_eq!(
            ed.buf().lines().collect::<Vec<_>>(),
            vec!["# one", "# two", "# three"]
        );
        // one undo step reverses the whole block insertion
        ed.buf_mut().buffer_undo();
        assert_eq!(
            ed.buf().lines().collect::<Vec<_>>(),
            vec!["one", "two", "three"]
        );
    }
}
