//! Editing primitives.
//!
//! Each function here is one user-visible edit: it snapshots the touched
//! rows into a single undo action, mutates, yanks into the requested
//! register (mirroring the unnamed one), and reports `Done`/`Nothing`.
//! Counts default to 1; `reg` is the explicit `"x` prefix or `"` for none.

use core_state::{Action, Buffer, EditOutcome, Mode, RegType, Register, Registers, Row};
use core_text::word;
use tracing::trace;

/// `x` / DEL: delete `count` codepoints forward on the current row.
pub fn delete_chars(
    buf: &mut Buffer,
    regs: &mut Registers,
    count: usize,
    reg: char,
) -> EditOutcome {
    let row = buf.current();
    if row.cur_col_idx >= row.len() {
        return EditOutcome::Nothing;
    }
    let mut end = row.cur_col_idx;
    for _ in 0..count.max(1) {
        end = core_text::next_boundary(row.bytes(), end);
    }
    let mut action = Action::default();
    action.push(buf.act_replace(buf.cur_idx));
    let start = buf.current().cur_col_idx;
    let removed = buf.current_mut().remove_range(start, end);
    let clamped = core_text::floor_boundary(buf.current().bytes(), start)
        .min(core_text::last_offset(buf.current().bytes()));
    buf.current_mut().cur_col_idx = clamped;
    buf.push_action(action);
    buf.set_modified();
    regs.set_with_default(reg, Register::charwise(removed));
    buf.sync_view();
    EditOutcome::Done
}

/// `X` / BS: delete `count` codepoints backward.
pub fn delete_chars_backward(
    buf: &mut Buffer,
    regs: &mut Registers,
    count: usize,
    reg: char,
) -> EditOutcome {
    let row = buf.current();
    if row.cur_col_idx == 0 {
        return EditOutcome::Nothing;
    }
    let end = row.cur_col_idx;
    let mut start = end;
    for _ in 0..count.max(1) {
        start = core_text::prev_boundary(row.bytes(), start);
    }
    let mut action = Action::default();
    action.push(buf.act_replace(buf.cur_idx));
    let removed = buf.current_mut().remove_range(start, end);
    buf.current_mut().cur_col_idx = start;
    buf.push_action(action);
    buf.set_modified();
    regs.set_with_default(reg, Register::charwise(removed));
    buf.sync_view();
    EditOutcome::Done
}

/// `D` / `d$`: delete from the cursor to end of row.
pub fn delete_eol(buf: &mut Buffer, regs: &mut Registers, reg: char) -> EditOutcome {
    let row = buf.current();
    if row.cur_col_idx >= row.len() {
        return EditOutcome::Nothing;
    }
    let mut action = Action::default();
    action.push(buf.act_replace(buf.cur_idx));
    let start = buf.current().cur_col_idx;
    let len = buf.current().len();
    let removed = buf.current_mut().remove_range(start, len);
    let last = core_text::last_offset(buf.current().bytes());
    buf.current_mut().cur_col_idx = last;
    buf.push_action(action);
    buf.set_modified();
    regs.set_with_default(reg, Register::charwise(removed));
    buf.sync_view();
    EditOutcome::Done
}

/// `dd`: delete `count` whole rows, yanking linewise.
pub fn delete_lines(
    buf: &mut Buffer,
    regs: &mut Registers,
    count: usize,
    reg: char,
) -> EditOutcome {
    let count = count.max(1).min(buf.num_rows() - buf.cur_idx);
    let mut action = Action::default();
    let mut yanked = Vec::with_capacity(count);
    let idx = buf.cur_idx;
    for _ in 0..count {
        action.push(buf.act_delete(idx));
        let row = buf.remove_row(idx).expect("row exists");
        yanked.push(row.bytes().to_string());
    }
    buf.cur_idx = idx.min(buf.num_rows() - 1);
    buf.current_mut().clamp();
    buf.push_action(action);
    buf.set_modified();
    regs.set_with_default(reg, Register::linewise(yanked));
    buf.sync_view();
    trace!(target: "actions.edit", count, "delete_lines");
    EditOutcome::Done
}

/// `dw`: delete the word run immediately left of the cursor, up to it.
pub fn delete_word(buf: &mut Buffer, regs: &mut Registers, reg: char) -> EditOutcome {
    let row = buf.current();
    let end = row.cur_col_idx;
    let mut start = end;
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
    if start == end {
        return EditOutcome::Nothing;
    }
    let mut action = Action::default();
    action.push(buf.act_replace(buf.cur_idx));
    let removed = buf.current_mut().remove_range(start, end);
    buf.current_mut().cur_col_idx = start;
    buf.push_action(action);
    buf.set_modified();
    regs.set_with_default(reg, Register::charwise(removed));
    buf.sync_view();
    EditOutcome::Done
}

/// `yw`-style charwise yank of `count` codepoints from the cursor.
pub fn yank_chars(buf: &Buffer, regs: &mut Registers, count: usize, reg: char) -> EditOutcome {
    let row = buf.current();
    if row.cur_col_idx >= row.len() {
        return EditOutcome::Nothing;
    }
    let mut end = row.cur_col_idx;
    for _ in 0..count.max(1) {
        end = core_text::next_boundary(row.bytes(), end);
    }
    let text = row.bytes()[row.cur_col_idx..end].to_string();
    regs.set_with_default(reg, Register::charwise(text));
    EditOutcome::Done
}

/// `yy` / `Y`: linewise yank without mutation.
pub fn yank_lines(buf: &Buffer, regs: &mut Registers, count: usize, reg: char) -> EditOutcome {
    let count = count.max(1).min(buf.num_rows() - buf.cur_idx);
    let lines: Vec<String> = (buf.cur_idx..buf.cur_idx + count)
        .filter_map(|i| buf.row(i).map(|r| r.bytes().to_string()))
        .collect();
    regs.set_with_default(reg, Register::linewise(lines));
    EditOutcome::Done
}

/// `p` / `P`: insert register contents after/before.
pub fn put(buf: &mut Buffer, reg: &Register, before: bool) -> EditOutcome {
    if reg.entries.is_empty() {
        return EditOutcome::Nothing;
    }
    let mut action = Action::default();
    match reg.rtype {
        RegType::Linewise => {
            let at = if before { buf.cur_idx } else { buf.cur_idx + 1 };
            for (i, line) in reg.entries.iter().enumerate() {
                action.push(buf.act_insert(at + i, line.clone()));
                buf.insert_row(at + i, Row::new(line.clone()));
            }
            buf.cur_idx = at;
            buf.current_mut().cur_col_idx = 0;
        }
        RegType::Charwise => {
            let text = reg.entries.concat();
            action.push(buf.act_replace(buf.cur_idx));
            let row = buf.current_mut();
            let at = if before {
                row.cur_col_idx
            } else {
                core_text::next_boundary(row.bytes(), row.cur_col_idx)
            };
            row.insert_str(at, &text);
            row.cur_col_idx = at;
        }
    }
    buf.push_action(action);
    buf.set_modified();
    buf.sync_view();
    EditOutcome::Done
}

/// `J`: merge the next row into the current one, stripping its leading
/// blank run.
pub fn join(buf: &mut Buffer, count: usize) -> EditOutcome {
    if buf.cur_idx + 1 >= buf.num_rows() {
        return EditOutcome::Nothing;
    }
    let mut action = Action::default();
    let mut joined = false;
    for _ in 0..count.max(1) {
        if buf.cur_idx + 1 >= buf.num_rows() {
            break;
        }
        action.push(buf.act_replace(buf.cur_idx));
        action.push(buf.act_delete(buf.cur_idx + 1));
        let next = buf.remove_row(buf.cur_idx + 1).expect("next row");
        let stripped = next.bytes().trim_start().to_string();
        let row = buf.current_mut();
        let at = row.len();
        if !row.is_empty() && !stripped.is_empty() {
            row.push_str(" ");
        }
        row.push_str(&stripped);
        row.cur_col_idx = core_text::floor_boundary(row.bytes(), at);
        joined = true;
    }
    if !joined {
        return EditOutcome::Nothing;
    }
    buf.push_action(action);
    buf.set_modified();
    buf.sync_view();
    EditOutcome::Done
}

/// `>` / `<`: indent or outdent the current row by `count * shiftwidth`.
pub fn indent(buf: &mut Buffer, count: usize, out: bool) -> EditOutcome {
    let width = buf.ftype.shiftwidth * count.max(1);
    if width == 0 {
        return EditOutcome::Nothing;
    }
    let mut action = Action::default();
    action.push(buf.act_replace(buf.cur_idx));
    let row = buf.current_mut();
    if out {
        let present = row
            .bytes()
            .char_indices()
            .take_while(|(_, c)| *c == ' ')
            .count();
        let strip = present.min(width);
        if strip == 0 {
            return EditOutcome::Nothing;
        }
        row.remove_range(0, strip);
    } else {
        row.insert_str(0, &" ".repeat(width));
    }
    buf.push_action(action);
    buf.set_modified();
    buf.sync_view();
    EditOutcome::Done
}

/// `~`: toggle case of the codepoint at the cursor, then advance.
pub fn change_case(buf: &mut Buffer) -> EditOutcome {
    let row = buf.current();
    let Some(c) = core_text::char_at(row.bytes(), row.cur_col_idx) else {
        return EditOutcome::Nothing;
    };
    let toggled = core_text::case::toggle(c);
    if toggled == c {
        let _ = buf.right(1);
        return EditOutcome::Nothing;
    }
    let mut action = Action::default();
    action.push(buf.act_replace(buf.cur_idx));
    let start = buf.current().cur_col_idx;
    let end = core_text::next_boundary(buf.current().bytes(), start);
    buf.current_mut().remove_range(start, end);
    buf.current_mut().insert_str(start, &toggled.to_string());
    buf.current_mut().cur_col_idx = start;
    buf.push_action(action);
    buf.set_modified();
    let _ = buf.right(1);
    EditOutcome::Done
}

/// `+` / `-`: arithmetic on the integer word under the cursor, falling back
/// to shifting the codepoint value when no number is recognized.
pub fn inc_dec(buf: &mut Buffer, count: usize, dec: bool) -> EditOutcome {
    let delta = count.max(1) as i64 * if dec { -1 } else { 1 };
    let row = buf.current();
    if let Some(num) = word::numeric_at(row.bytes(), row.cur_col_idx) {
        let Some(new_value) = num.value.checked_add(delta) else {
            return EditOutcome::Nothing;
        };
        let rendered = word::format_numeric(&num, new_value);
        let mut action = Action::default();
        action.push(buf.act_replace(buf.cur_idx));
        buf.current_mut().remove_range(num.start, num.end);
        buf.current_mut().insert_str(num.start, &rendered);
        buf.current_mut().cur_col_idx = num.start;
        buf.push_action(action);
        buf.set_modified();
        buf.sync_view();
        return EditOutcome::Done;
    }
    // no number: shift the codepoint itself
    let Some(c) = core_text::char_at(row.bytes(), row.cur_col_idx) else {
        return EditOutcome::Nothing;
    };
    let shifted = (c as i64).checked_add(delta).and_then(|v| {
        u32::try_from(v).ok().and_then(char::from_u32)
    });
    let Some(shifted) = shifted else {
        return EditOutcome::Nothing;
    };
    let mut action = Action::default();
    action.push(buf.act_replace(buf.cur_idx));
    let start = buf.current().cur_col_idx;
    let end = core_text::next_boundary(buf.current().bytes(), start);
    buf.current_mut().remove_range(start, end);
    buf.current_mut().insert_str(start, &shifted.to_string());
    buf.current_mut().cur_col_idx = start;
    buf.push_action(action);
    buf.set_modified();
    EditOutcome::Done
}

/// `r`: replace the codepoint at the cursor.
pub fn replace_char(buf: &mut Buffer, c: char) -> EditOutcome {
    let row = buf.current();
    if core_text::char_at(row.bytes(), row.cur_col_idx).is_none() {
        return EditOutcome::Nothing;
    }
    let mut action = Action::default();
    action.push(buf.act_replace(buf.cur_idx));
    let start = buf.current().cur_col_idx;
    let end = core_text::next_boundary(buf.current().bytes(), start);
    buf.current_mut().remove_range(start, end);
    buf.current_mut().insert_str(start, &c.to_string());
    buf.current_mut().cur_col_idx = start;
    buf.push_action(action);
    buf.set_modified();
    EditOutcome::Done
}

/// `o` / `O`: open a new line after/before, seeded by the autoindent hook.
/// The caller switches the buffer into insert mode.
pub fn open_line(buf: &mut Buffer, above: bool) -> EditOutcome {
    let seed_row = buf.cur_idx;
    let indent = match (&buf.ftype.autoindent, above) {
        (Some(ai), false) => ai(buf, seed_row),
        (Some(ai), true) if seed_row > 0 => ai(buf, seed_row - 1),
        _ => String::new(),
    };
    let at = if above { buf.cur_idx } else { buf.cur_idx + 1 };
    let mut action = Action::default();
    action.push(buf.act_insert(at, indent.clone()));
    let mut row = Row::new(indent);
    row.cur_col_idx = row.len();
    buf.insert_row(at, row);
    buf.cur_idx = at;
    buf.push_action(action);
    buf.set_modified();
    buf.mode = Mode::Insert;
    buf.sync_view();
    EditOutcome::Done
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup(lines: &[&str]) -> (Buffer, Registers) {
        (Buffer::from_lines(lines.iter().copied()), Registers::default())
    }

    #[test]
    fn x_deletes_codepoint_into_register() {
        // spec scenario S3
        let (mut buf, mut regs) = setup(&["αβγ"]);
        buf.right(2);
        assert_eq!(buf.current().cur_col_idx, 4);
        delete_chars(&mut buf, &mut regs, 1, '"');
        assert_eq!(buf.current().bytes(), "αβ");
        assert_eq!(regs.unnamed().unwrap().text(), "γ");
        buf.buffer_undo();
        assert_eq!(buf.current().bytes(), "αβγ");
    }

    #[test]
    fn dd_yanks_linewise_and_put_restores() {
        // spec scenario S2
        let (mut buf, mut regs) = setup(&["line1", "line2", "line3"]);
        delete_lines(&mut buf, &mut regs, 1, '"');
        assert_eq!(buf.lines().collect::<Vec<_>>(), vec!["line2", "line3"]);
        assert_eq!(buf.cur_idx, 0);
        let reg = regs.unnamed().unwrap();
        assert_eq!(reg.rtype, RegType::Linewise);
        assert_eq!(reg.text(), "line1\n");
        let reg = reg.clone();
        put(&mut buf, &reg, false);
        assert_eq!(
            buf.lines().collect::<Vec<_>>(),
            vec!["line2", "line1", "line3"]
        );
        assert_eq!((buf.cur_idx, buf.current().cur_col_idx), (1, 0));
    }

    #[test]
    fn w_then_dw_deletes_leading_word() {
        // spec scenario S1
        let (mut buf, mut regs) = setup(&["hello world"]);
        buf.word_forward(1);
        delete_word(&mut buf, &mut regs, '"');
        assert_eq!(buf.current().bytes(), " world");
        assert_eq!((buf.cur_idx, buf.current().cur_col_idx), (0, 0));
        let reg = regs.unnamed().unwrap();
        assert_eq!(reg.rtype, RegType::Charwise);
        assert_eq!(reg.text(), "hello");
        buf.buffer_undo();
        assert_eq!(buf.current().bytes(), "hello world");
    }

    #[test]
    fn visual_line_delete_put_before_restores() {
        let (mut buf, mut regs) = setup(&["a", "b", "c"]);
        buf.cur_idx = 1;
        delete_lines(&mut buf, &mut regs, 2, '"');
        assert_eq!(buf.lines().collect::<Vec<_>>(), vec!["a"]);
        let reg = regs.unnamed().unwrap().clone();
        buf.cur_idx = 0;
        // deleted rows came from below; restore after the survivor
        put(&mut buf, &reg, false);
        assert_eq!(buf.lines().collect::<Vec<_>>(), vec!["a", "b", "c"]);
    }

    #[test]
    fn yank_then_put_grows_by_count() {
        let (mut buf, mut regs) = setup(&["x", "y", "z"]);
        yank_lines(&buf, &mut regs, 2, '"');
        assert_eq!(buf.num_rows(), 3);
        let reg = regs.unnamed().unwrap().clone();
        put(&mut buf, &reg, false);
        assert_eq!(buf.num_rows(), 5);
        assert_eq!(buf.cur_idx, 1); // first inserted line
        assert_eq!(buf.current().bytes(), "x");
    }

    #[test]
    fn charwise_put_before_and_after() {
        let (mut buf, _) = setup(&["ab"]);
        let reg = Register::charwise("X");
        put(&mut buf, &reg, true);
        assert_eq!(buf.current().bytes(), "Xab");
        buf.current_mut().cur_col_idx = 0;
        put(&mut buf, &reg, false);
        assert_eq!(buf.current().bytes(), "XXab");
    }

    #[test]
    fn join_strips_leading_blanks() {
        let (mut buf, _) = setup(&["fn main() {", "    body"]);
        join(&mut buf, 1);
        assert_eq!(buf.current().bytes(), "fn main() { body");
        buf.buffer_undo();
        assert_eq!(
            buf.lines().collect::<Vec<_>>(),
            vec!["fn main() {", "    body"]
        );
    }

    #[test]
    fn indent_in_and_out() {
        let (mut buf, _) = setup(&["text"]);
        buf.ftype.shiftwidth = 4;
        indent(&mut buf, 1, false);
        assert_eq!(buf.current().bytes(), "    text");
        indent(&mut buf, 1, true);
        assert_eq!(buf.current().bytes(), "text");
        assert_eq!(indent(&mut buf, 1, true), EditOutcome::Nothing);
    }

    #[test]
    fn change_case_greek() {
        let (mut buf, _) = setup(&["αx"]);
        change_case(&mut buf);
        assert_eq!(buf.current().bytes(), "Αx");
        assert_eq!(buf.current().cur_col_idx, 2); // advanced past the toggled cp
    }

    #[test]
    fn inc_dec_preserves_base() {
        let (mut buf, _) = setup(&["count 0x0f end"]);
        buf.current_mut().cur_col_idx = 8;
        inc_dec(&mut buf, 1, false);
        assert_eq!(buf.current().bytes(), "count 0x10 end");
        let (mut buf, _) = setup(&["val -2"]);
        buf.current_mut().cur_col_idx = 5;
        inc_dec(&mut buf, 3, true);
        assert_eq!(buf.current().bytes(), "val -5");
    }

    #[test]
    fn inc_dec_falls_back_to_codepoint_shift() {
        let (mut buf, _) = setup(&["a"]);
        inc_dec(&mut buf, 1, false);
        assert_eq!(buf.current().bytes(), "b");
    }

    #[test]
    fn open_line_autoindents() {
        let (mut buf, _) = setup(&["    indented"]);
        buf.ftype.autoindent = Some(std::sync::Arc::new(core_state::ftype::brace_autoindent));
        open_line(&mut buf, false);
        assert_eq!(buf.cur_idx, 1);
        assert_eq!(buf.current().bytes(), "    ");
        assert_eq!(buf.mode, Mode::Insert);
        buf.mode = Mode::Normal;
        buf.buffer_undo();
        assert_eq!(buf.num_rows(), 1);
    }

    #[test]
    fn delete_eol_from_cursor() {
        let (mut buf, mut regs) = setup(&["hello world"]);
        buf.current_mut().cur_col_idx = 5;
        delete_eol(&mut buf, &mut regs, '"');
        assert_eq!(buf.current().bytes(), "hello");
        assert_eq!(regs.unnamed().unwrap().text(), " world");
    }

    #[test]
    fn replace_char_at_cursor() {
        let (mut buf, _) = setup(&["cat"]);
        buf.current_mut().cur_col_idx = 1;
        replace_char(&mut buf, 'u');
        assert_eq!(buf.current().bytes(), "cut");
    }
}
