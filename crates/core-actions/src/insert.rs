//! Insert mode.
//!
//! One codepoint at a time into the current row. The whole run — entry to
//! `ESC` — is a single undo action; every mutation records its act first,
//! so reverse replay restores the pre-run bytes exactly. The typed run is
//! collected into `cur_insert` and saved as the editor's `last_insert` on
//! exit for `.`-replay and insert-mode CTRL-A.

use crate::autosave;
use core_model::{Editor, render};
use core_rline::{Menu, menu};
use core_state::{Action, Buffer, Mode, Row};
use core_term::{Key, KeySource};
use core_text::word;
use tracing::debug;

/// A small digraph table for CTRL-K; label → inserted codepoint.
const DIGRAPHS: &[(&str, char)] = &[
    ("a* alpha α", 'α'),
    ("b* beta β", 'β'),
    ("g* gamma γ", 'γ'),
    ("d* delta δ", 'δ'),
    ("p* pi π", 'π'),
    ("l* lambda λ", 'λ'),
    ("m* mu μ", 'μ'),
    ("Ok check ✓", '✓'),
    ("XX cross ✗", '✗'),
    ("-> arrow →", '→'),
    ("<- arrow ←", '←'),
    ("<= leq ≤", '≤'),
    (">= geq ≥", '≥'),
    ("!= neq ≠", '≠'),
    ("oo infinity ∞", '∞'),
    ("Eu euro €", '€'),
    ("Pd pound £", '£'),
    ("SE section §", '§'),
    ("co copyright ©", '©'),
    ("dg degree °", '°'),
];

pub(crate) fn insert_text(buf: &mut Buffer, action: &mut Action, text: &str) {
    action.push(buf.act_replace(buf.cur_idx));
    let row = buf.current_mut();
    let at = row.cur_col_idx;
    row.insert_str(at, text);
    row.cur_col_idx = at + text.len();
    buf.set_modified();
    buf.sync_view();
}

pub(crate) fn insert_newline(buf: &mut Buffer, action: &mut Action) {
    action.push(buf.act_replace(buf.cur_idx));
    let at = buf.current().cur_col_idx;
    let len = buf.current().len();
    let tail = buf.current_mut().remove_range(at, len);
    let indent = match &buf.ftype.autoindent {
        Some(ai) => ai(buf, buf.cur_idx),
        None => String::new(),
    };
    let new_line = format!("{indent}{tail}");
    action.push(buf.act_insert(buf.cur_idx + 1, new_line.clone()));
    let mut row = Row::new(new_line);
    row.cur_col_idx = indent.len();
    let at_row = buf.cur_idx + 1;
    buf.insert_row(at_row, row);
    buf.cur_idx = at_row;
    buf.set_modified();
    buf.sync_view();
}

fn backspace(buf: &mut Buffer, action: &mut Action) {
    let col = buf.current().cur_col_idx;
    if col > 0 {
        action.push(buf.act_replace(buf.cur_idx));
        let prev = core_text::prev_boundary(buf.current().bytes(), col);
        buf.current_mut().remove_range(prev, col);
        buf.current_mut().cur_col_idx = prev;
        buf.set_modified();
        buf.sync_view();
        return;
    }
    if buf.cur_idx == 0 {
        return;
    }
    // join with the previous line
    action.push(buf.act_replace(buf.cur_idx - 1));
    action.push(buf.act_delete(buf.cur_idx));
    let gone = buf.remove_row(buf.cur_idx).expect("current row");
    buf.cur_idx -= 1;
    let row = buf.current_mut();
    let join_at = row.len();
    row.push_str(gone.bytes());
    row.cur_col_idx = join_at;
    buf.set_modified();
    buf.sync_view();
}

/// The codepoint in the same display column of the row above/below.
fn adjacent_codepoint(buf: &Buffer, above: bool) -> Option<char> {
    let other = if above {
        buf.cur_idx.checked_sub(1)?
    } else {
        buf.cur_idx + 1
    };
    let other_row = buf.row(other)?;
    let tab = buf.ftype.tabwidth;
    let col = core_text::width::visual_col(
        buf.current().bytes(),
        0,
        buf.current().cur_col_idx,
        tab,
    );
    let mut b = 0usize;
    while b < other_row.len() {
        let w = core_text::width::visual_col(other_row.bytes(), 0, b, tab);
        if w >= col {
            break;
        }
        b = core_text::next_boundary(other_row.bytes(), b);
    }
    core_text::char_at(other_row.bytes(), b)
}

/// Candidates for CTRL-N word completion: words elsewhere in the buffer
/// sharing the prefix left of the cursor.
fn word_completion(buf: &Buffer) -> (usize, Vec<String>) {
    let row = buf.current();
    let mut start = row.cur_col_idx;
    loop {
        let prev = core_text::prev_boundary(row.bytes(), start);
        if prev == start {
            break;
        }
        match core_text::char_at(row.bytes(), prev) {
            Some(c) if word::is_word(c) => start = prev,
            _ => break,
        }
    }
    let prefix = &row.bytes()[start..row.cur_col_idx];
    let mut seen = std::collections::BTreeSet::new();
    for (idx, line) in buf.lines().enumerate() {
        let mut b = 0;
        while b < line.len() {
            match word::word_at(line, b) {
                Some((s, e)) => {
                    let w = &line[s..e];
                    if w.starts_with(prefix) && !(idx == buf.cur_idx && s == start) && w != prefix {
                        seen.insert(w.to_string());
                    }
                    b = e.max(s + 1);
                }
                None => b = core_text::next_boundary(line, b),
            }
        }
    }
    (start, seen.into_iter().collect())
}

fn menu_pick(
    ed: &mut Editor,
    keys: &mut dyn KeySource,
    header: &str,
    items: Vec<String>,
) -> Option<String> {
    if items.is_empty() {
        return None;
    }
    if items.len() == 1 {
        return items.into_iter().next();
    }
    let anchor = ed.prompt_row();
    let cols = ed.num_cols;
    let mut m = Menu::new(anchor, cols, header);
    let mut provider = |menu: &mut Menu| {
        menu.list = items
            .iter()
            .filter(|i| i.contains(&menu.pat))
            .cloned()
            .collect();
    };
    menu::run(&mut m, keys, &mut ed.video, &mut provider)
}

/// Run insert mode until `ESC`. The buffer is already in `Mode::Insert`
/// with the cursor where typing should begin.
pub fn insert_mode(ed: &mut Editor, keys: &mut dyn KeySource) {
    let mut action = Action::default();
    let mut cur_insert = String::new();
    let mut literal_tab_latch = false;
    render::refresh(ed);
    while let Some(key) = keys.read_key() {
        match key {
            Key::Esc => break,
            Key::Char(c) => {
                insert_text(ed.buf_mut(), &mut action, &c.to_string());
                cur_insert.push(c);
            }
            Key::Enter => {
                insert_newline(ed.buf_mut(), &mut action);
                cur_insert.push('\n');
            }
            Key::Backspace => backspace(ed.buf_mut(), &mut action),
            Key::Tab => {
                let literal = ed.buf().ftype.tab_indents || literal_tab_latch;
                literal_tab_latch = false;
                let text = if literal {
                    "\t".to_string()
                } else {
                    " ".repeat(ed.buf().ftype.shiftwidth)
                };
                insert_text(ed.buf_mut(), &mut action, &text);
                cur_insert.push_str(&text);
            }
            Key::Left => {
                let _ = ed.buf_mut().left(1);
            }
            Key::Right => {
                let _ = ed.buf_mut().right(1);
            }
            Key::Up => {
                let _ = ed.buf_mut().up(1);
            }
            Key::Down => {
                let _ = ed.buf_mut().down(1);
            }
            Key::Ctrl('r') => {
                if let Some(Key::Char(name)) = keys.read_key()
                    && let Some(reg) = ed.register_read_clipboard(name)
                {
                    let text = reg.text();
                    let text = text.trim_end_matches('\n');
                    insert_text(ed.buf_mut(), &mut action, text);
                    cur_insert.push_str(text);
                }
            }
            Key::Ctrl('a') => {
                let text = ed.last_insert.clone();
                if !text.is_empty() {
                    for part in split_runs(&text) {
                        match part {
                            Run::Text(t) => {
                                insert_text(ed.buf_mut(), &mut action, t);
                                cur_insert.push_str(t);
                            }
                            Run::Newline => {
                                insert_newline(ed.buf_mut(), &mut action);
                                cur_insert.push('\n');
                            }
                        }
                    }
                }
            }
            Key::Ctrl('y') | Key::Ctrl('e') => {
                if let Some(c) = adjacent_codepoint(ed.buf(), key == Key::Ctrl('y')) {
                    insert_text(ed.buf_mut(), &mut action, &c.to_string());
                    cur_insert.push(c);
                }
            }
            Key::Ctrl('v') => match keys.read_key() {
                Some(Key::Tab) => {
                    literal_tab_latch = true;
                    insert_text(ed.buf_mut(), &mut action, "\t");
                    cur_insert.push('\t');
                }
                Some(Key::Char(d)) if d.is_ascii_digit() => {
                    let mut digits = String::from(d);
                    while let Some(k) = keys.read_key() {
                        match k {
                            Key::Char(d) if d.is_ascii_digit() => digits.push(d),
                            _ => break,
                        }
                    }
                    if let Some(c) = digits.parse::<u32>().ok().and_then(char::from_u32) {
                        insert_text(ed.buf_mut(), &mut action, &c.to_string());
                        cur_insert.push(c);
                    }
                }
                Some(Key::Char(c)) => {
                    insert_text(ed.buf_mut(), &mut action, &c.to_string());
                    cur_insert.push(c);
                }
                _ => {}
            },
            Key::Ctrl('n') => {
                let (start, items) = word_completion(ed.buf());
                if let Some(chosen) = menu_pick(ed, keys, "word completion", items) {
                    let buf = ed.buf_mut();
                    action.push(buf.act_replace(buf.cur_idx));
                    let end = buf.current().cur_col_idx;
                    buf.current_mut().remove_range(start, end);
                    buf.current_mut().insert_str(start, &chosen);
                    buf.current_mut().cur_col_idx = start + chosen.len();
                    buf.set_modified();
                }
            }
            Key::Ctrl('l') => line_completion(ed, keys, &mut action),
            Key::Ctrl('f') => filename_completion(ed, keys, &mut action, &mut cur_insert),
            Key::Ctrl('x') => match keys.read_key() {
                Some(Key::Char('l')) | Some(Key::Ctrl('l')) => {
                    line_completion(ed, keys, &mut action)
                }
                Some(Key::Char('f')) | Some(Key::Ctrl('f')) => {
                    filename_completion(ed, keys, &mut action, &mut cur_insert)
                }
                _ => {}
            },
            Key::Ctrl('k') => {
                let items: Vec<String> = DIGRAPHS.iter().map(|(l, _)| l.to_string()).collect();
                if let Some(chosen) = menu_pick(ed, keys, "digraphs", items)
                    && let Some((_, c)) = DIGRAPHS.iter().find(|(l, _)| *l == chosen)
                {
                    insert_text(ed.buf_mut(), &mut action, &c.to_string());
                    cur_insert.push(*c);
                }
            }
            _ => {}
        }
        autosave::check(ed);
        render::refresh(ed);
    }
    // leave insert mode: cursor one codepoint left, run saved for replay
    let buf = ed.buf_mut();
    buf.mode = Mode::Normal;
    let _ = buf.left(1);
    if !action.is_empty() {
        buf.push_action(action);
    }
    if !cur_insert.is_empty() {
        ed.last_insert = cur_insert;
    }
    debug!(target: "actions.insert", run_len = ed.last_insert.len(), "insert run ended");
    render::refresh(ed);
}

enum Run<'a> {
    Text(&'a str),
    Newline,
}

fn split_runs(text: &str) -> Vec<Run<'_>> {
    let mut out = Vec::new();
    for (i, part) in text.split('\n').enumerate() {
        if i > 0 {
            out.push(Run::Newline);
        }
        if !part.is_empty() {
            out.push(Run::Text(part));
        }
    }
    out
}

fn line_completion(ed: &mut Editor, keys: &mut dyn KeySource, action: &mut Action) {
    let buf = ed.buf();
    let cur = buf.cur_idx;
    let prefix = buf.current().bytes()[..buf.current().cur_col_idx].to_string();
    let items: Vec<String> = buf
        .lines()
        .enumerate()
        .filter(|(i, l)| *i != cur && l.starts_with(&prefix) && !l.is_empty())
        .map(|(_, l)| l.to_string())
        .collect();
    if let Some(chosen) = menu_pick(ed, keys, "line completion", items) {
        let buf = ed.buf_mut();
        action.push(buf.act_replace(buf.cur_idx));
        buf.current_mut().replace(chosen);
        let end = buf.current().len();
        buf.current_mut().cur_col_idx = end;
        buf.set_modified();
        buf.sync_view();
    }
}

fn filename_completion(
    ed: &mut Editor,
    keys: &mut dyn KeySource,
    action: &mut Action,
    cur_insert: &mut String,
) {
    let cwd = ed.buf().cwd.clone();
    let items = core_rline::complete::complete_filenames(&cwd, "");
    if let Some(chosen) = menu_pick(ed, keys, "filenames", items) {
        insert_text(ed.buf_mut(), action, &chosen);
        cur_insert.push_str(&chosen);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_term::ScriptedKeys;

    fn editor_with(lines: &[&str]) -> Editor {
        let mut ed = Editor::new(24, 80, Box::new(std::io::sink()));
        let dim = ed.buf().dim;
        let flags = ed.buf().flags;
        *ed.buf_mut() = Buffer::from_lines(lines.iter().copied());
        ed.buf_mut().dim = dim;
        ed.buf_mut().flags = flags;
        ed.buf_mut().mode = Mode::Insert;
        ed
    }

    #[test]
    fn typing_is_one_undo_action() {
        let mut ed = editor_with(&[""]);
        let mut keys = ScriptedKeys::typed("hello\x1b");
        insert_mode(&mut ed, &mut keys);
        assert_eq!(ed.buf().current().bytes(), "hello");
        assert_eq!(ed.buf().mode, Mode::Normal);
        assert_eq!(ed.buf().undo.undo_depth(), 1);
        ed.buf_mut().buffer_undo();
        assert_eq!(ed.buf().current().bytes(), "");
        assert_eq!(ed.last_insert, "hello");
    }

    #[test]
    fn escape_leaves_cursor_one_left() {
        let mut ed = editor_with(&[""]);
        let mut keys = ScriptedKeys::typed("ab\x1b");
        insert_mode(&mut ed, &mut keys);
        // cursor was after 'b' (col 2); Esc steps to 'b' (col 1)
        assert_eq!(ed.buf().current().cur_col_idx, 1);
    }

    #[test]
    fn newline_splits_and_undo_restores() {
        let mut ed = editor_with(&["ab"]);
        ed.buf_mut().current_mut().cur_col_idx = 1;
        let mut keys = ScriptedKeys::typed("\n\x1b");
        insert_mode(&mut ed, &mut keys);
        assert_eq!(ed.buf().lines().collect::<Vec<_>>(), vec!["a", "b"]);
        ed.buf_mut().buffer_undo();
        assert_eq!(ed.buf().lines().collect::<Vec<_>>(), vec!["ab"]);
    }

    #[test]
    fn backspace_joins_lines() {
        let mut ed = editor_with(&["ab", "cd"]);
        ed.buf_mut().cur_idx = 1;
        ed.buf_mut().current_mut().cur_col_idx = 0;
        let mut keys = ScriptedKeys::new([Key::Backspace, Key::Esc]);
        insert_mode(&mut ed, &mut keys);
        assert_eq!(ed.buf().lines().collect::<Vec<_>>(), vec!["abcd"]);
    }

    #[test]
    fn tab_inserts_shiftwidth_spaces_by_default() {
        let mut ed = editor_with(&[""]);
        ed.buf_mut().ftype.shiftwidth = 4;
        ed.buf_mut().ftype.tab_indents = false;
        let mut keys = ScriptedKeys::new([Key::Tab, Key::Esc]);
        insert_mode(&mut ed, &mut keys);
        assert_eq!(ed.buf().current().bytes(), "    ");
    }

    #[test]
    fn ctrl_v_tab_inserts_literal_tab() {
        let mut ed = editor_with(&[""]);
        ed.buf_mut().ftype.tab_indents = false;
        let mut keys = ScriptedKeys::new([Key::Ctrl('v'), Key::Tab, Key::Esc]);
        insert_mode(&mut ed, &mut keys);
        assert_eq!(ed.buf().current().bytes(), "\t");
    }

    #[test]
    fn ctrl_v_numeric_codepoint() {
        let mut ed = editor_with(&[""]);
        let mut keys = ScriptedKeys::new([
            Key::Ctrl('v'),
            Key::Char('9'),
            Key::Char('4'),
            Key::Char('5'),
            Key::Enter,
            Key::Esc,
        ]);
        insert_mode(&mut ed, &mut keys);
        assert_eq!(ed.buf().current().bytes(), "α"); // U+03B1 = 945
    }

    #[test]
    fn ctrl_r_inserts_register() {
        let mut ed = editor_with(&[""]);
        ed.registers
            .set('z', core_state::Register::charwise("from-reg"));
        let mut keys = ScriptedKeys::new([Key::Ctrl('r'), Key::Char('z'), Key::Esc]);
        insert_mode(&mut ed, &mut keys);
        assert_eq!(ed.buf().current().bytes(), "from-reg");
    }

    #[test]
    fn ctrl_y_copies_from_line_above() {
        let mut ed = editor_with(&["abc", ""]);
        ed.buf_mut().cur_idx = 1;
        let mut keys = ScriptedKeys::new([Key::Ctrl('y'), Key::Ctrl('y'), Key::Esc]);
        insert_mode(&mut ed, &mut keys);
        assert_eq!(ed.buf().current().bytes(), "ab");
    }

    #[test]
    fn ctrl_a_replays_last_insert() {
        let mut ed = editor_with(&[""]);
        ed.last_insert = "again".into();
        let mut keys = ScriptedKeys::new([Key::Ctrl('a'), Key::Esc]);
        insert_mode(&mut ed, &mut keys);
        assert_eq!(ed.buf().current().bytes(), "again");
    }

    #[test]
    fn ctrl_n_completes_word_from_buffer() {
        let mut ed = editor_with(&["supercal", "su"]);
        ed.buf_mut().cur_idx = 1;
        ed.buf_mut().current_mut().cur_col_idx = 2;
        let mut keys = ScriptedKeys::new([Key::Ctrl('n'), Key::Esc]);
        insert_mode(&mut ed, &mut keys);
        assert_eq!(ed.buf().row(1).unwrap().bytes(), "supercal");
    }

    #[test]
    fn ctrl_k_digraph_menu_inserts() {
        let mut ed = editor_with(&[""]);
        // menu: pick the first entry
        let mut keys = ScriptedKeys::new([Key::Ctrl('k'), Key::Enter, Key::Esc]);
        insert_mode(&mut ed, &mut keys);
        assert_eq!(ed.buf().current().bytes(), "α");
    }

    #[test]
    fn line_completion_replaces_line() {
        let mut ed = editor_with(&["complete me fully", "complete"]);
        ed.buf_mut().cur_idx = 1;
        let end = ed.buf().current().len();
        ed.buf_mut().current_mut().cur_col_idx = end;
        let mut keys = ScriptedKeys::new([Key::Ctrl('l'), Key::Esc]);
        insert_mode(&mut ed, &mut keys);
        assert_eq!(ed.buf().row(1).unwrap().bytes(), "complete me fully");
    }
}
