//! Normal-mode key dispatch.
//!
//! One dispatch handles one logical command: an optional `"x` register
//! prefix, an optional count (up to eight digits), then the command key.
//! Two-keystroke operators (`d`, `c`, `y`, `g`, `m`, backtick, `CTRL-W`,
//! `,`, `r`) read their second key inline from the blocking source, which
//! is also how the original pending-operator state behaves.

use crate::{commands, edits, insert, search_ui, visual};
use core_model::{Editor, LoopOutcome, render};
use core_state::{Action, EditOutcome, MAX_COUNT_DIGITS, Mode, Register};
use core_term::{Key, KeySource};
use tracing::trace;

/// What the main loop should do after one dispatched key.
#[derive(Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Outcome(LoopOutcome),
}

fn read_count(first: char, keys: &mut dyn KeySource) -> (usize, Option<Key>) {
    let mut digits = String::from(first);
    let mut next = None;
    while digits.len() < MAX_COUNT_DIGITS {
        match keys.read_key() {
            Some(Key::Char(c)) if c.is_ascii_digit() => digits.push(c),
            other => {
                next = other;
                break;
            }
        }
    }
    (digits.parse().unwrap_or(1), next)
}

fn put_register(ed: &mut Editor, reg: char, before: bool) -> EditOutcome {
    let Some(register) = ed.register_read_clipboard(reg) else {
        ed.msg_error(format!("register '{reg}' is empty"));
        return EditOutcome::Nothing;
    };
    edits::put(ed.buf_mut(), &register, before)
}

fn enter_insert(ed: &mut Editor, keys: &mut dyn KeySource, place: InsertAt) {
    {
        let buf = ed.buf_mut();
        buf.mode = Mode::Insert;
        match place {
            InsertAt::Cursor => {}
            InsertAt::After => {
                let _ = buf.right(1);
            }
            InsertAt::Eol => {
                let _ = buf.eol();
            }
            InsertAt::FirstNonBlank => {
                let _ = buf.to_first_non_blank();
            }
        }
    }
    insert::insert_mode(ed, keys);
}

enum InsertAt {
    Cursor,
    After,
    Eol,
    FirstNonBlank,
}

/// Replay the last insert run at the cursor as one fresh action (`.`).
fn replay_last_insert(ed: &mut Editor) -> EditOutcome {
    let text = ed.last_insert.clone();
    if text.is_empty() {
        return EditOutcome::Nothing;
    }
    let buf = ed.buf_mut();
    let mut action = Action::default();
    for (i, part) in text.split('\n').enumerate() {
        if i > 0 {
            insert::insert_newline(buf, &mut action);
        }
        if !part.is_empty() {
            insert::insert_text(buf, &mut action, part);
        }
    }
    buf.push_action(action);
    EditOutcome::Done
}

fn fname_under_cursor(line: &str, byte: usize) -> Option<String> {
    let byte = core_text::floor_boundary(line, byte);
    core_text::char_at(line, byte).filter(|c| !c.is_whitespace())?;
    let mut start = byte;
    while start > 0 {
        let prev = core_text::prev_boundary(line, start);
        match core_text::char_at(line, prev) {
            Some(c) if !c.is_whitespace() => start = prev,
            _ => break,
        }
    }
    let mut end = byte;
    while end < line.len() {
        match core_text::char_at(line, end) {
            Some(c) if !c.is_whitespace() => end = core_text::next_boundary(line, end),
            _ => break,
        }
    }
    let raw = line[start..end].trim_matches(|c: char| "\"'<>()[]{},;".contains(c));
    if raw.is_empty() {
        None
    } else {
        Some(raw.to_string())
    }
}

fn open_fname_under_cursor(ed: &mut Editor) -> EditOutcome {
    let row = ed.buf().current();
    let Some(fname) = fname_under_cursor(row.bytes(), row.cur_col_idx) else {
        ed.msg_error("no filename under cursor");
        return EditOutcome::Nothing;
    };
    if ed.buf().is_modified() {
        ed.msg_error("buffer has unsaved modifications");
        return EditOutcome::Nothing;
    }
    match ed.make_file_buffer(std::path::Path::new(&fname)) {
        Ok(mut new_buf) => {
            let old = ed.buf();
            new_buf.dim = old.dim;
            new_buf.at_frame = old.at_frame;
            new_buf.flags.insert(
                old.flags & core_state::BufferFlags::BUF_IS_VISIBLE,
            );
            new_buf.sync_view();
            *ed.buf_mut() = new_buf;
            EditOutcome::Done
        }
        Err(e) => {
            ed.msg_error(e.to_string());
            EditOutcome::Nothing
        }
    }
}

fn word_actions_menu(ed: &mut Editor, keys: &mut dyn KeySource) {
    let Some(word) = ed.buf().word_under_cursor() else {
        ed.msg_error("no word under cursor");
        return;
    };
    let items: Vec<String> = ed
        .word_actions
        .iter()
        .map(|a| format!("{} {}", a.key, a.label))
        .collect();
    if items.is_empty() {
        return;
    }
    let mut menu = core_rline::Menu::new(ed.prompt_row(), ed.num_cols, word.clone());
    let mut provider = |m: &mut core_rline::Menu| {
        m.list = items.iter().filter(|i| i.contains(&m.pat)).cloned().collect();
    };
    let chosen = core_rline::menu::run(&mut menu, keys, &mut ed.video, &mut provider);
    if let Some(chosen) = chosen
        && let Some(pos) = ed
            .word_actions
            .iter()
            .position(|a| format!("{} {}", a.key, a.label) == chosen)
    {
        let apply = ed.word_actions[pos].apply;
        let _ = apply(ed, &word);
    }
}

fn file_actions_menu(ed: &mut Editor, keys: &mut dyn KeySource) {
    let items: Vec<String> = ed
        .file_actions
        .iter()
        .map(|a| format!("{} {}", a.key, a.label))
        .collect();
    if items.is_empty() {
        return;
    }
    let mut menu = core_rline::Menu::new(ed.prompt_row(), ed.num_cols, ed.buf().display_name());
    let mut provider = |m: &mut core_rline::Menu| {
        m.list = items.iter().filter(|i| i.contains(&m.pat)).cloned().collect();
    };
    let chosen = core_rline::menu::run(&mut menu, keys, &mut ed.video, &mut provider);
    if let Some(chosen) = chosen
        && let Some(pos) = ed
            .file_actions
            .iter()
            .position(|a| format!("{} {}", a.key, a.label) == chosen)
    {
        let apply = ed.file_actions[pos].apply;
        let _ = apply(ed);
    }
}

/// Dispatch one normal-mode key (with its prefixes already peeled off by
/// recursion through `read_count` / register handling).
pub fn handle_key(ed: &mut Editor, keys: &mut dyn KeySource, key: Key) -> Flow {
    let mut reg = '"';
    let mut count = 1usize;
    let mut key = key;

    if key == Key::Char('"') {
        match keys.read_key() {
            Some(Key::Char(r)) => {
                if !core_state::Registers::is_valid_name(r) {
                    ed.msg_error(format!("invalid register name: {r}"));
                    return Flow::Continue;
                }
                reg = r;
                match keys.read_key() {
                    Some(k) => key = k,
                    None => return Flow::Continue,
                }
            }
            _ => return Flow::Continue,
        }
    }
    if let Key::Char(c @ '1'..='9') = key {
        let (n, next) = read_count(c, keys);
        count = n;
        match next {
            Some(k) => key = k,
            None => return Flow::Continue,
        }
    }
    trace!(target: "actions.normal", ?key, count, register = %reg, "dispatch");

    match key {
        Key::Char('h') | Key::Left => {
            let _ = ed.buf_mut().left(count);
        }
        Key::Char('l') | Key::Right => {
            let _ = ed.buf_mut().right(count);
        }
        Key::Char('j') | Key::Down | Key::Enter => {
            let _ = ed.buf_mut().down(count);
        }
        Key::Char('k') | Key::Up => {
            let _ = ed.buf_mut().up(count);
        }
        Key::Char('0') | Key::Home => {
            let _ = ed.buf_mut().bol();
        }
        Key::Char('^') => {
            let _ = ed.buf_mut().to_first_non_blank();
        }
        Key::Char('$') | Key::End => {
            let _ = ed.buf_mut().eol();
        }
        Key::Char('w') => {
            let _ = ed.buf_mut().word_forward(count);
        }
        Key::Char('e') => {
            let _ = ed.buf_mut().word_end(count);
        }
        Key::Char('b') => {
            let _ = ed.buf_mut().word_backward(count);
        }
        Key::PageUp | Key::Ctrl('b') => {
            let _ = ed.buf_mut().page_up(count);
        }
        Key::PageDown | Key::Ctrl('f') => {
            let _ = ed.buf_mut().page_down(count);
        }
        Key::Char('G') => {
            let buf = ed.buf_mut();
            let _ = if count > 1 { buf.goto_linenr(count) } else { buf.eof() };
        }
        Key::Char('g') => match keys.read_key() {
            Some(Key::Char('g')) => {
                let buf = ed.buf_mut();
                let _ = if count > 1 { buf.goto_linenr(count) } else { buf.bof() };
            }
            Some(Key::Char('f')) => {
                let _ = open_fname_under_cursor(ed);
            }
            _ => {}
        },
        Key::Char('x') | Key::Delete => {
            let win = ed.cur_win;
            let bi = ed.windows[win].cur_buf;
            let buf = &mut ed.windows[win].buffers[bi];
            let _ = edits::delete_chars(buf, &mut ed.registers, count, reg);
        }
        Key::Char('X') | Key::Backspace => {
            let win = ed.cur_win;
            let bi = ed.windows[win].cur_buf;
            let buf = &mut ed.windows[win].buffers[bi];
            let _ = edits::delete_chars_backward(buf, &mut ed.registers, count, reg);
        }
        Key::Char('d') => {
            let win = ed.cur_win;
            let bi = ed.windows[win].cur_buf;
            match keys.read_key() {
                Some(Key::Char('d')) => {
                    let buf = &mut ed.windows[win].buffers[bi];
                    let _ = edits::delete_lines(buf, &mut ed.registers, count, reg);
                }
                Some(Key::Char('w')) => {
                    let buf = &mut ed.windows[win].buffers[bi];
                    let _ = edits::delete_word(buf, &mut ed.registers, reg);
                }
                Some(Key::Char('$')) => {
                    let buf = &mut ed.windows[win].buffers[bi];
                    let _ = edits::delete_eol(buf, &mut ed.registers, reg);
                }
                _ => {}
            }
        }
        Key::Char('D') => {
            let win = ed.cur_win;
            let bi = ed.windows[win].cur_buf;
            let buf = &mut ed.windows[win].buffers[bi];
            let _ = edits::delete_eol(buf, &mut ed.registers, reg);
        }
        Key::Char('c') => {
            let win = ed.cur_win;
            let bi = ed.windows[win].cur_buf;
            match keys.read_key() {
                Some(Key::Char('c')) => {
                    {
                        let buf = &mut ed.windows[win].buffers[bi];
                        let len = buf.current().len();
                        if len > 0 {
                            let mut action = Action::default();
                            action.push(buf.act_replace(buf.cur_idx));
                            buf.current_mut().remove_range(0, len);
                            buf.push_action(action);
                            buf.set_modified();
                        }
                    }
                    enter_insert(ed, keys, InsertAt::Cursor);
                }
                Some(Key::Char('w')) => {
                    {
                        let buf = &mut ed.windows[win].buffers[bi];
                        let _ = edits::delete_word(buf, &mut ed.registers, reg);
                    }
                    enter_insert(ed, keys, InsertAt::Cursor);
                }
                Some(Key::Char('$')) => {
                    {
                        let buf = &mut ed.windows[win].buffers[bi];
                        let _ = edits::delete_eol(buf, &mut ed.registers, reg);
                    }
                    enter_insert(ed, keys, InsertAt::Eol);
                }
                _ => {}
            }
        }
        Key::Char('C') => {
            {
                let win = ed.cur_win;
                let bi = ed.windows[win].cur_buf;
                let buf = &mut ed.windows[win].buffers[bi];
                let _ = edits::delete_eol(buf, &mut ed.registers, reg);
            }
            enter_insert(ed, keys, InsertAt::Eol);
        }
        Key::Char('y') => {
            let win = ed.cur_win;
            let bi = ed.windows[win].cur_buf;
            match keys.read_key() {
                Some(Key::Char('y')) => {
                    let buf = &mut ed.windows[win].buffers[bi];
                    let _ = edits::yank_lines(buf, &mut ed.registers, count, reg);
                }
                Some(Key::Char('w')) => {
                    let buf = &mut ed.windows[win].buffers[bi];
                    let span = {
                        let row = buf.current();
                        core_text::word::word_at(row.bytes(), row.cur_col_idx)
                    };
                    if let Some((s, e)) = span {
                        let text = buf.current().bytes()[s..e].to_string();
                        ed.registers.set_with_default(reg, Register::charwise(text));
                    }
                }
                _ => {}
            }
        }
        Key::Char('Y') => {
            let win = ed.cur_win;
            let bi = ed.windows[win].cur_buf;
            let buf = &mut ed.windows[win].buffers[bi];
            let _ = edits::yank_lines(buf, &mut ed.registers, count, reg);
        }
        Key::Char('p') => {
            let _ = put_register(ed, reg, false);
        }
        Key::Char('P') => {
            let _ = put_register(ed, reg, true);
        }
        Key::Char('u') => {
            if !ed.buf_mut().buffer_undo().is_done() {
                ed.msg_info("nothing to undo");
            }
        }
        Key::Ctrl('r') => {
            if !ed.buf_mut().buffer_redo().is_done() {
                ed.msg_info("nothing to redo");
            }
        }
        Key::Char('m') => {
            if let Some(Key::Char(c)) = keys.read_key() {
                let _ = ed.buf_mut().mark_set(c);
            }
        }
        Key::Char('`') => {
            if let Some(Key::Char(c)) = keys.read_key() {
                if !ed.buf_mut().mark_goto(c).is_done() {
                    ed.msg_error(format!("mark '{c}' is not set"));
                }
            }
        }
        Key::Ctrl('o') => {
            let _ = ed.buf_mut().jump_back();
        }
        Key::Ctrl('i') | Key::Tab => {
            let _ = ed.buf_mut().jump_forward();
        }
        Key::Char('v') => return flow_done(visual::visual_char(ed, keys, reg)),
        Key::Char('V') => return flow_done(visual::visual_line(ed, keys, reg)),
        Key::Ctrl('v') => return flow_done(visual::visual_block(ed, keys, reg)),
        Key::Char('/') => {
            let _ = search_ui::prompt_search(ed, keys, false);
        }
        Key::Char('?') => {
            let _ = search_ui::prompt_search(ed, keys, true);
        }
        Key::Char('n') => {
            let _ = search_ui::search_next(ed, false);
        }
        Key::Char('N') => {
            let _ = search_ui::search_next(ed, true);
        }
        Key::Char('*') => {
            let _ = search_ui::word_search(ed, false);
        }
        Key::Char('#') => {
            let _ = search_ui::word_search(ed, true);
        }
        Key::Char(':') => {
            if let Some(outcome) = commands::command_prompt(ed, keys) {
                return Flow::Outcome(outcome);
            }
        }
        Key::Char('.') => {
            let _ = replay_last_insert(ed);
        }
        Key::Ctrl('w') => match keys.read_key() {
            Some(Key::Char('j')) | Some(Key::Char('l')) | Some(Key::Char('w')) => {
                let _ = ed.win_mut().frame_next();
            }
            Some(Key::Char('k')) | Some(Key::Char('h')) => {
                let _ = ed.win_mut().frame_prev();
            }
            Some(Key::Char('n')) => {
                let buf = ed.make_buffer();
                if ed.win_mut().add_frame().is_done() {
                    let frame = ed.win().num_frames() - 1;
                    ed.win_mut().attach(buf, frame);
                } else {
                    ed.msg_error("no room for another frame");
                }
            }
            Some(Key::Char('o')) => {
                let _ = ed.win_mut().only_frame();
            }
            _ => {}
        },
        Key::Char(',') => match keys.read_key() {
            Some(Key::Char('n')) => {
                let _ = ed.win_mut().buf_next();
            }
            Some(Key::Char('m')) => {
                let _ = ed.win_mut().buf_prev();
            }
            Some(Key::Char(',')) => {
                let _ = ed.win_mut().buf_prev_focused();
            }
            Some(Key::Char('.')) => {
                let _ = ed.win_prev();
            }
            Some(Key::Char('/')) => {
                let _ = ed.win_next();
            }
            Some(Key::Char(';')) => return Flow::Outcome(LoopOutcome::NextEditor),
            Some(Key::Char('\'')) => return Flow::Outcome(LoopOutcome::PrevEditor),
            _ => {}
        },
        Key::Char('J') => {
            let _ = edits::join(ed.buf_mut(), count);
        }
        Key::Char('~') => {
            let _ = edits::change_case(ed.buf_mut());
        }
        Key::Char('+') => {
            let _ = edits::inc_dec(ed.buf_mut(), count, false);
        }
        Key::Char('-') => {
            let _ = edits::inc_dec(ed.buf_mut(), count, true);
        }
        Key::Char('i') => enter_insert(ed, keys, InsertAt::Cursor),
        Key::Char('a') => enter_insert(ed, keys, InsertAt::After),
        Key::Char('A') => enter_insert(ed, keys, InsertAt::Eol),
        Key::Char('I') => enter_insert(ed, keys, InsertAt::FirstNonBlank),
        Key::Char('o') => {
            if edits::open_line(ed.buf_mut(), false).is_done() {
                insert::insert_mode(ed, keys);
            }
        }
        Key::Char('O') => {
            if edits::open_line(ed.buf_mut(), true).is_done() {
                insert::insert_mode(ed, keys);
            }
        }
        Key::Char('r') => {
            if let Some(Key::Char(c)) = keys.read_key() {
                let _ = edits::replace_char(ed.buf_mut(), c);
            }
        }
        Key::Char('s') => {
            {
                let win = ed.cur_win;
                let bi = ed.windows[win].cur_buf;
                let buf = &mut ed.windows[win].buffers[bi];
                let _ = edits::delete_chars(buf, &mut ed.registers, count, reg);
            }
            enter_insert(ed, keys, InsertAt::Cursor);
        }
        Key::Char('W') => word_actions_menu(ed, keys),
        Key::Char('F') => file_actions_menu(ed, keys),
        Key::Ctrl('l') => {
            let _ = ed.buf_mut().adjust_view();
            render::draw(ed);
            return Flow::Continue;
        }
        Key::Esc => {
            ed.banner = None;
        }
        _ => {}
    }
    render::refresh(ed);
    Flow::Continue
}

fn flow_done(_: EditOutcome) -> Flow {
    Flow::Continue
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

    fn feed(ed: &mut Editor, script: &str) {
        let mut keys = ScriptedKeys::typed(script);
        while let Some(key) = keys.read_key() {
            if let Flow::Outcome(_) = handle_key(ed, &mut keys, key) {
                break;
            }
        }
    }

    #[test]
    fn s1_w_dw_deletes_hello() {
        let mut ed = editor_with(&["hello world"]);
        feed(&mut ed, "wdw");
        assert_eq!(ed.buf().current().bytes(), " world");
        assert_eq!(
            (ed.buf().cur_idx, ed.buf().current().cur_col_idx),
            (0, 0)
        );
        let reg = ed.registers.unnamed().unwrap();
        assert_eq!(reg.text(), "hello");
        feed(&mut ed, "u");
        assert_eq!(ed.buf().current().bytes(), "hello world");
    }

    #[test]
    fn s2_dd_then_p() {
        let mut ed = editor_with(&["line1", "line2", "line3"]);
        feed(&mut ed, "dd");
        assert_eq!(
            ed.buf().lines().collect::<Vec<_>>(),
            vec!["line2", "line3"]
        );
        assert_eq!(ed.buf().cur_idx, 0);
        assert_eq!(ed.registers.unnamed().unwrap().text(), "line1\n");
        feed(&mut ed, "p");
        assert_eq!(
            ed.buf().lines().collect::<Vec<_>>(),
            vec!["line2", "line1", "line3"]
        );
        assert_eq!((ed.buf().cur_idx, ed.buf().current().cur_col_idx), (1, 0));
    }

    #[test]
    fn s3_greek_ll_x() {
        let mut ed = editor_with(&["αβγ"]);
        feed(&mut ed, "ll");
        assert_eq!(ed.buf().current().cur_col_idx, 4);
        assert_eq!(ed.buf().col_pos, 3);
        feed(&mut ed, "x");
        assert_eq!(ed.buf().current().bytes(), "αβ");
        assert_eq!(ed.registers.unnamed().unwrap().text(), "γ");
    }

    #[test]
    fn count_prefix_applies() {
        let mut ed = editor_with(&["abcdefgh"]);
        feed(&mut ed, "3l");
        assert_eq!(ed.buf().current().cur_col_idx, 3);
        feed(&mut ed, "2x");
        assert_eq!(ed.buf().current().bytes(), "abcfgh");
    }

    #[test]
    fn named_register_prefix() {
        let mut ed = editor_with(&["take this"]);
        feed(&mut ed, "\"zdd");
        assert_eq!(ed.register_read('z').unwrap().text(), "take this\n");
    }

    #[test]
    fn undo_redo_round_trip() {
        let mut ed = editor_with(&["one", "two"]);
        feed(&mut ed, "dd");
        let after: Vec<String> = ed.buf().lines().map(String::from).collect();
        feed(&mut ed, "u");
        assert_eq!(ed.buf().lines().collect::<Vec<_>>(), vec!["one", "two"]);
        let mut keys = ScriptedKeys::new([Key::Ctrl('r')]);
        handle_key(&mut ed, &mut keys, Key::Ctrl('r'));
        let redone: Vec<String> = ed.buf().lines().map(String::from).collect();
        assert_eq!(redone, after);
    }

    #[test]
    fn marks_and_backtick() {
        let mut ed = editor_with(&["a", "b", "c"]);
        feed(&mut ed, "ma");
        feed(&mut ed, "jj");
        assert_eq!(ed.buf().cur_idx, 2);
        feed(&mut ed, "`a");
        assert_eq!(ed.buf().cur_idx, 0);
    }

    #[test]
    fn dot_replays_insert() {
        let mut ed = editor_with(&[""]);
        feed(&mut ed, "iabc\x1b");
        assert_eq!(ed.buf().current().bytes(), "abc");
        feed(&mut ed, ".");
        assert_eq!(ed.buf().current().bytes(), "ababcc");
    }

    #[test]
    fn colon_quit_returns_outcome() {
        let mut ed = editor_with(&["x"]);
        let mut keys = ScriptedKeys::typed("q\n");
        let flow = handle_key(&mut ed, &mut keys, Key::Char(':'));
        assert_eq!(flow, Flow::Outcome(LoopOutcome::Exit));
    }

    #[test]
    fn frame_split_and_cycle() {
        let mut ed = editor_with(&["x"]);
        let mut keys = ScriptedKeys::typed("n");
        handle_key(&mut ed, &mut keys, Key::Ctrl('w'));
        assert_eq!(ed.win().num_frames(), 2);
        let before = ed.win().cur_frame;
        let mut keys = ScriptedKeys::typed("j");
        handle_key(&mut ed, &mut keys, Key::Ctrl('w'));
        assert_ne!(ed.win().cur_frame, before);
    }

    #[test]
    fn word_action_menu_applies() {
        let mut ed = editor_with(&["word"]);
        crate::install_default_actions(&mut ed);
        // pick the uppercase action by narrowing to its label
        let mut keys = ScriptedKeys::typed("uppercase\n");
        handle_key(&mut ed, &mut keys, Key::Char('W'));
        assert_eq!(ed.buf().current().bytes(), "WORD");
    }

    #[test]
    fn g_prefix_motions() {
        let mut ed = editor_with(&["a", "b", "c"]);
        feed(&mut ed, "G");
        assert_eq!(ed.buf().cur_idx, 2);
        feed(&mut ed, "gg");
        assert_eq!(ed.buf().cur_idx, 0);
        feed(&mut ed, "2G");
        assert_eq!(ed.buf().cur_idx, 1);
    }
}
