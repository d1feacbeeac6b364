//! The `:` prompt and command dispatch.
//!
//! A confirmed line is parsed against the command table and dispatched
//! here. Every failure becomes a message-line banner; only quit and
//! editor-cycling commands bubble a [`LoopOutcome`] up to the root.

use core_model::{DIFF_BUF, Editor, LoopOutcome, MSG_BUF, SCRATCH_BUF, SEARCH_BUF, render};
use core_rline::{
    CommandId, ParsedCommand, Rline, RlineCtx, RlineOpts, parse_command, parse_range,
};
use core_search::{SubstChoice, SubstOpts, SubstPreview};
use core_state::{Action, BufferFlags, Row, VedError, WriteOpts, ftype};
use core_term::{Key, KeySource, escapes};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Open the `:` prompt and run the confirmed command.
pub fn command_prompt(ed: &mut Editor, keys: &mut dyn KeySource) -> Option<LoopOutcome> {
    command_prompt_with(ed, keys, "")
}

/// Same, with the line pre-filled (linewise visual `s` / `w`).
pub fn command_prompt_with(
    ed: &mut Editor,
    keys: &mut dyn KeySource,
    prefill: &str,
) -> Option<LoopOutcome> {
    let mut rl = Rline::new(':', ed.prompt_row(), ed.num_cols)
        .with_opts(RlineOpts::HAS_TAB_COMPLETION | RlineOpts::HAS_HISTORY_COMPLETION);
    rl.set_text(prefill);
    let buffer_names = ed.buffer_names();
    let cwd = ed.buf().cwd.clone();
    let exit = {
        let mut ctx = RlineCtx {
            cwd,
            history: &mut ed.history,
            buffer_names,
            registers: Some(&ed.registers),
        };
        rl.edit(keys, &mut ed.video, &mut ctx, &mut core_rline::NoHooks)
    };
    match exit {
        core_rline::RlineExit::Accepted(line) if !line.trim().is_empty() => {
            ed.history.push_rline(line.clone());
            execute(ed, keys, &line)
        }
        _ => {
            render::refresh(ed);
            None
        }
    }
}

/// Parse and dispatch one command line.
pub fn execute(ed: &mut Editor, keys: &mut dyn KeySource, line: &str) -> Option<LoopOutcome> {
    let cwd = ed.buf().cwd.clone();
    let parsed = match parse_command(line, &cwd) {
        Ok(p) => p,
        Err(e) => {
            ed.msg_error(e.to_string());
            return None;
        }
    };
    let Some(id) = parsed.id else {
        ed.msg_error(format!("not a command: {}", parsed.name));
        return None;
    };
    debug!(target: "actions.com", command = %parsed.name, "dispatch");
    let out = match id {
        CommandId::Write => cmd_write(ed, &parsed, false).map(|_| None),
        CommandId::WriteForce => cmd_write(ed, &parsed, true).map(|_| None),
        CommandId::WriteQuit => cmd_write(ed, &parsed, false).map(|_| Some(LoopOutcome::Exit)),
        CommandId::WriteQuitForce => {
            cmd_write(ed, &parsed, true).map(|_| Some(LoopOutcome::Exit))
        }
        CommandId::Edit => cmd_edit(ed, &parsed, false).map(|_| None),
        CommandId::EditForce => cmd_edit(ed, &parsed, true).map(|_| None),
        CommandId::Etail => cmd_edit(ed, &parsed, false).map(|_| {
            let _ = ed.buf_mut().eof();
            None
        }),
        CommandId::Enew => cmd_enew(ed, &parsed).map(|_| None),
        CommandId::Split => cmd_split(ed, &parsed).map(|_| None),
        CommandId::BufChangeNext => {
            let o = ed.win_mut().buf_next();
            report_nothing(ed, o, "no other buffer");
            Ok(None)
        }
        CommandId::BufChangePrev => {
            let o = ed.win_mut().buf_prev();
            report_nothing(ed, o, "no other buffer");
            Ok(None)
        }
        CommandId::BufChangePrevFocused => {
            let o = ed.win_mut().buf_prev_focused();
            report_nothing(ed, o, "no previous buffer");
            Ok(None)
        }
        CommandId::BufChange => cmd_buffer(ed, &parsed).map(|_| None),
        CommandId::BufDelete => cmd_bufdelete(ed, &parsed, false),
        CommandId::BufDeleteForce => cmd_bufdelete(ed, &parsed, true),
        CommandId::WinChangeNext => {
            let o = ed.win_next();
            report_nothing(ed, o, "no other window");
            Ok(None)
        }
        CommandId::WinChangePrev => {
            let o = ed.win_prev();
            report_nothing(ed, o, "no other window");
            Ok(None)
        }
        CommandId::WinChangePrevFocused => {
            let o = ed.win_prev_focused();
            report_nothing(ed, o, "no previous window");
            Ok(None)
        }
        CommandId::Quit => cmd_quit(ed, &parsed, false),
        CommandId::QuitForce => cmd_quit(ed, &parsed, true),
        CommandId::Substitute => cmd_substitute(ed, keys, &parsed, false).map(|_| None),
        CommandId::SubstituteWholeFile => {
            cmd_substitute(ed, keys, &parsed, true).map(|_| None)
        }
        CommandId::Grep => cmd_vgrep(ed, &parsed).map(|_| None),
        CommandId::Diff => cmd_diff(ed, &parsed).map(|_| None),
        CommandId::Read => cmd_read(ed, &parsed).map(|_| None),
        CommandId::ReadShell | CommandId::Shell => cmd_read_shell(ed, line).map(|_| None),
        CommandId::Messages => {
            ed.show_special(MSG_BUF);
            Ok(None)
        }
        CommandId::Searches => {
            ed.show_special(SEARCH_BUF);
            Ok(None)
        }
        CommandId::Scratch => {
            ed.show_special(SCRATCH_BUF);
            Ok(None)
        }
        CommandId::DiffBuf => {
            ed.show_special(DIFF_BUF);
            Ok(None)
        }
        CommandId::Set => cmd_set(ed, &parsed).map(|_| None),
        CommandId::BalancedCheck => cmd_balanced(ed, &parsed).map(|_| None),
        CommandId::ValidateUtf8 => cmd_validate_utf8(ed).map(|_| None),
        CommandId::Redraw => {
            render::draw(ed);
            Ok(None)
        }
        CommandId::EdNew => {
            let fname = parsed
                .opt("fname")
                .map(PathBuf::from)
                .or_else(|| parsed.filenames().next().map(PathBuf::from));
            Ok(Some(LoopOutcome::NewEditor(fname)))
        }
        CommandId::EdNext => Ok(Some(LoopOutcome::NextEditor)),
        CommandId::EdPrev => Ok(Some(LoopOutcome::PrevEditor)),
        CommandId::EdPrevFocused => Ok(Some(LoopOutcome::PrevFocusedEditor)),
    };
    match out {
        Ok(outcome) => {
            render::refresh(ed);
            outcome
        }
        Err(e) => {
            ed.msg_error(e.to_string());
            render::refresh(ed);
            None
        }
    }
}

fn report_nothing(ed: &mut Editor, outcome: core_state::EditOutcome, msg: &str) {
    if !outcome.is_done() {
        ed.msg_info(msg.to_string());
    }
}

type CmdResult<T = ()> = Result<T, VedError>;

fn arg_fname(p: &ParsedCommand) -> Option<PathBuf> {
    p.opt("fname")
        .map(PathBuf::from)
        .or_else(|| p.filenames().next().map(PathBuf::from))
}

fn cmd_write(ed: &mut Editor, p: &ParsedCommand, force: bool) -> CmdResult {
    if ed.buf().is_special() {
        return Err(VedError::BufferReadOnly);
    }
    let range = match p.opt("range") {
        Some(r) => Some(parse_range(r, ed.buf().cur_idx, ed.buf().num_rows())?),
        None => None,
    };
    let opts = WriteOpts {
        force,
        append: p.flag("append"),
        range,
        fname: p.opt("fname").map(PathBuf::from),
    };
    let (lines, bytes) = ed.buf_mut().write_file(&opts)?;
    ed.msg_info(format!("{lines} lines, {bytes} bytes written"));
    Ok(())
}

fn cmd_edit(ed: &mut Editor, p: &ParsedCommand, force: bool) -> CmdResult {
    let target = arg_fname(p).or_else(|| ed.buf().fname.clone());
    let Some(target) = target else {
        return Err(VedError::BufferUnnamed);
    };
    if ed.buf().is_modified() && !force {
        return Err(VedError::BufferModified);
    }
    let mut new_buf = ed.make_file_buffer(&target)?;
    let old = ed.buf();
    new_buf.dim = old.dim;
    new_buf.at_frame = old.at_frame;
    new_buf.flags.insert(
        old.flags
            & (BufferFlags::BUF_IS_VISIBLE | BufferFlags::BUF_IS_SPECIAL),
    );
    new_buf.sync_view();
    *ed.buf_mut() = new_buf;
    info!(target: "actions.com", fname = %target.display(), "edit");
    Ok(())
}

fn cmd_enew(ed: &mut Editor, p: &ParsedCommand) -> CmdResult {
    let buf = match arg_fname(p) {
        Some(f) => ed.make_file_buffer(&f)?,
        None => ed.make_buffer(),
    };
    ed.new_window(buf);
    Ok(())
}

fn cmd_split(ed: &mut Editor, p: &ParsedCommand) -> CmdResult {
    let buf = match arg_fname(p) {
        Some(f) => ed.make_file_buffer(&f)?,
        None => ed.make_buffer(),
    };
    if !ed.win_mut().add_frame().is_done() {
        ed.msg_error("no room for another frame");
        return Ok(());
    }
    let frame = ed.win().num_frames() - 1;
    ed.win_mut().attach(buf, frame);
    Ok(())
}

fn cmd_buffer(ed: &mut Editor, p: &ParsedCommand) -> CmdResult {
    let name = p
        .opt("bufname")
        .map(String::from)
        .or_else(|| p.filenames().next().map(String::from));
    let Some(name) = name else {
        return Err(VedError::ArgumentMissing);
    };
    match ed.win().find_buffer(&name) {
        Some(idx) => {
            ed.win_mut().make_visible(idx);
            Ok(())
        }
        None => {
            ed.msg_error(format!("no buffer named {name}"));
            Ok(())
        }
    }
}

fn cmd_bufdelete(
    ed: &mut Editor,
    p: &ParsedCommand,
    force: bool,
) -> Result<Option<LoopOutcome>, VedError> {
    let idx = match p.opt("bufname") {
        Some(name) => match ed.win().find_buffer(name) {
            Some(i) => i,
            None => {
                ed.msg_error(format!("no buffer named {name}"));
                return Ok(None);
            }
        },
        None => ed.win().cur_buf,
    };
    if ed.win().buffers[idx].is_modified() && !force {
        return Err(VedError::BufferModified);
    }
    ed.win_mut().remove_buffer(idx);
    if ed.win().buffers.is_empty() {
        // last buffer of the window: drop the window, or the editor
        let gone = ed.cur_win;
        ed.windows.remove(gone);
        if ed.prev_win > gone {
            ed.prev_win -= 1;
        }
        ed.prev_win = ed.prev_win.min(ed.windows.len().saturating_sub(1));
        let next_normal = ed
            .windows
            .iter()
            .position(|w| w.wtype == core_model::WindowType::Normal);
        match next_normal {
            Some(i) => {
                ed.cur_win = i;
                Ok(None)
            }
            None => {
                ed.cur_win = ed.cur_win.min(ed.windows.len().saturating_sub(1));
                Ok(Some(LoopOutcome::Exit))
            }
        }
    } else {
        Ok(None)
    }
}

fn cmd_quit(
    ed: &mut Editor,
    p: &ParsedCommand,
    force: bool,
) -> Result<Option<LoopOutcome>, VedError> {
    if !force {
        let dirty = ed
            .windows
            .iter()
            .flat_map(|w| w.buffers.iter())
            .any(|b| b.is_modified() && !b.is_special());
        if dirty {
            return Err(VedError::BufferModified);
        }
    }
    if p.flag("global") {
        if force {
            Ok(Some(LoopOutcome::ExitAllForce))
        } else {
            Ok(Some(LoopOutcome::ExitAll))
        }
    } else {
        Ok(Some(LoopOutcome::Exit))
    }
}

fn cmd_substitute(
    ed: &mut Editor,
    keys: &mut dyn KeySource,
    p: &ParsedCommand,
    whole_file: bool,
) -> CmdResult {
    let Some(pat) = p.opt("pat") else {
        return Err(VedError::ArgumentMissing);
    };
    let sub = p.opt("sub").unwrap_or("");
    let range = if whole_file {
        (0, ed.buf().num_rows() - 1)
    } else {
        match p.opt("range") {
            Some(r) => parse_range(r, ed.buf().cur_idx, ed.buf().num_rows())?,
            None => (ed.buf().cur_idx, ed.buf().cur_idx),
        }
    };
    let opts = SubstOpts {
        pat: pat.to_string(),
        sub: sub.to_string(),
        global: p.flag("global"),
        interactive: p.flag("interactive"),
        range,
    };
    let msg_row = ed.msg_row();
    let cols = ed.num_cols;
    let win = ed.cur_win;
    let bi = ed.windows[win].cur_buf;
    let count = {
        let (windows, video) = (&mut ed.windows, &mut ed.video);
        let buf = &mut windows[win].buffers[bi];
        let mut confirm = |pv: &SubstPreview<'_>| -> SubstChoice {
            let prompt = format!(
                "substitute {}{}{} with {} on line {}? (y/n/a/q/c)",
                escapes::INVERTED,
                pv.matched,
                escapes::COLOR_RESET,
                pv.replacement,
                pv.row_idx + 1,
            );
            let _ = video.paint_rows_with(msg_row, 1, cols, &prompt);
            loop {
                match keys.read_key() {
                    Some(Key::Char('y')) | Some(Key::Enter) => return SubstChoice::Yes,
                    Some(Key::Char('n')) => return SubstChoice::No,
                    Some(Key::Char('a')) => return SubstChoice::All,
                    Some(Key::Char('q')) | None => return SubstChoice::Quit,
                    Some(Key::Char('c')) | Some(Key::Esc) => return SubstChoice::Cancel,
                    _ => {}
                }
            }
        };
        core_search::substitute(buf, &opts, &mut confirm)?
    };
    let _ = ed.video.resume_painted_rows();
    if count == 0 {
        ed.msg_error(format!("pattern not found: {pat}"));
    } else {
        ed.msg_info(format!("{count} substitutions"));
    }
    Ok(())
}

fn grep_walk(
    path: &Path,
    re: &regex::Regex,
    recursive: bool,
    hits: &mut Vec<String>,
) {
    if path.is_dir() {
        if !recursive {
            return;
        }
        let Ok(entries) = std::fs::read_dir(path) else {
            return;
        };
        for entry in entries.filter_map(|e| e.ok()) {
            grep_walk(&entry.path(), re, recursive, hits);
        }
        return;
    }
    let Ok(lines) = core_state::fileio::read_lines_of(path) else {
        return;
    };
    for (i, line) in lines.iter().enumerate() {
        if re.is_match(line) {
            hits.push(format!("{}:{}: {}", path.display(), i + 1, line));
        }
    }
}

fn cmd_vgrep(ed: &mut Editor, p: &ParsedCommand) -> CmdResult {
    let Some(pat) = p.opt("pat") else {
        return Err(VedError::ArgumentMissing);
    };
    let re = regex::Regex::new(pat).map_err(|e| VedError::Pattern(e.to_string()))?;
    let recursive = p.flag("recursive");
    let cwd = ed.buf().cwd.clone();
    let mut hits = Vec::new();
    for f in p.filenames() {
        let path = if Path::new(f).is_absolute() {
            PathBuf::from(f)
        } else {
            cwd.join(f)
        };
        grep_walk(&path, &re, recursive, &mut hits);
    }
    let found = hits.len();
    ed.fill_special(SEARCH_BUF, hits);
    ed.show_special(SEARCH_BUF);
    ed.msg_info(format!("vgrep: {found} matching lines"));
    Ok(())
}

/// Line-based diff between two texts, smallest-edit by LCS.
fn diff_lines(old: &[String], new: &[String]) -> Vec<String> {
    let n = old.len();
    let m = new.len();
    let mut lcs = vec![vec![0usize; m + 1]; n + 1];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            lcs[i][j] = if old[i] == new[j] {
                lcs[i + 1][j + 1] + 1
            } else {
                lcs[i + 1][j].max(lcs[i][j + 1])
            };
        }
    }
    let mut out = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < n || j < m {
        if i < n && j < m && old[i] == new[j] {
            i += 1;
            j += 1;
        } else if j < m && (i == n || lcs[i][j + 1] >= lcs[i + 1][j]) {
            out.push(format!("+{}: {}", j + 1, new[j]));
            j += 1;
        } else {
            out.push(format!("-{}: {}", i + 1, old[i]));
            i += 1;
        }
    }
    out
}

fn cmd_diff(ed: &mut Editor, p: &ParsedCommand) -> CmdResult {
    let buf = ed.buf();
    let origin = p.flag("origin");
    let base_path = if origin {
        buf.backupfile.clone()
    } else {
        buf.fname.clone()
    };
    let Some(base_path) = base_path else {
        return Err(VedError::BufferUnnamed);
    };
    let on_disk = core_state::fileio::read_lines_of(&base_path)?;
    let current: Vec<String> = buf.lines().map(String::from).collect();
    let diff = diff_lines(&on_disk, &current);
    let clean = diff.is_empty();
    ed.fill_special(DIFF_BUF, diff);
    ed.show_special(DIFF_BUF);
    if clean {
        ed.msg_info("no differences");
    }
    Ok(())
}

fn cmd_read(ed: &mut Editor, p: &ParsedCommand) -> CmdResult {
    let Some(fname) = arg_fname(p) else {
        return Err(VedError::ArgumentMissing);
    };
    let cwd = ed.buf().cwd.clone();
    let path = if fname.is_absolute() {
        fname
    } else {
        cwd.join(fname)
    };
    let lines = core_state::fileio::read_lines_of(&path)?;
    insert_lines_after_cursor(ed, &lines);
    ed.msg_info(format!("{} lines read", lines.len()));
    Ok(())
}

fn insert_lines_after_cursor(ed: &mut Editor, lines: &[String]) {
    if lines.is_empty() {
        return;
    }
    let buf = ed.buf_mut();
    let mut action = Action::default();
    let at = buf.cur_idx + 1;
    for (i, line) in lines.iter().enumerate() {
        action.push(buf.act_insert(at + i, line.clone()));
        buf.insert_row(at + i, Row::new(line.clone()));
    }
    buf.push_action(action);
    buf.set_modified();
    buf.sync_view();
}

fn cmd_read_shell(ed: &mut Editor, line: &str) -> CmdResult {
    // everything after the command token is the shell command
    let cmd = line
        .split_once(char::is_whitespace)
        .map(|(_, rest)| rest.trim())
        .unwrap_or("");
    if cmd.is_empty() {
        return Err(VedError::ArgumentMissing);
    }
    let output = {
        let Some(shell) = ed.shell.as_mut() else {
            ed.msg_error("no shell runner configured");
            return Ok(());
        };
        shell.run(cmd)
    };
    match output {
        Ok(out) => {
            let lines: Vec<String> = out
                .trim_end_matches('\n')
                .split('\n')
                .map(String::from)
                .collect();
            insert_lines_after_cursor(ed, &lines);
            ed.msg_info(format!("{} lines from shell", lines.len()));
        }
        Err(e) => ed.msg_error(format!("shell: {e}")),
    }
    Ok(())
}

fn cmd_set(ed: &mut Editor, p: &ParsedCommand) -> CmdResult {
    if let Some(name) = p.opt("ftype") {
        let found = ed
            .ftypes
            .iter()
            .find(|(f, _)| f.name == name)
            .map(|(f, s)| (f.clone(), s.clone()));
        match found {
            Some((f, s)) => {
                ed.buf_mut().ftype = f;
                ed.buf_mut().syn = s;
            }
            None => {
                ed.msg_error(format!("unknown ftype: {name}"));
                return Ok(());
            }
        }
    }
    if let Some(tw) = p.opt("tabwidth") {
        let tw: usize = tw.parse().map_err(|_| VedError::AwaitingString)?;
        ed.buf_mut().ftype.tabwidth = tw.max(1);
    }
    if let Some(sw) = p.opt("shiftwidth") {
        let sw: usize = sw.parse().map_err(|_| VedError::AwaitingString)?;
        ed.buf_mut().ftype.shiftwidth = sw;
    }
    if let Some(secs) = p.opt("autosave") {
        let secs: u64 = secs.parse().map_err(|_| VedError::AwaitingString)?;
        ed.buf_mut().autosave = secs;
    }
    if let Some(suffix) = p.opt("backup-suffix") {
        let suffix = suffix.to_string();
        ed.buf_mut().set_backupfile(&suffix)?;
    }
    if p.flag("backupfile") {
        let suffix = ed.settings.backup_suffix.clone();
        ed.buf_mut().set_backupfile(&suffix)?;
    }
    if p.flag("no-backupfile") {
        ed.buf_mut().backupfile = None;
    }
    if p.flag("enable-writing") {
        ed.buf_mut()
            .flags
            .remove(BufferFlags::BUF_IS_RDONLY | BufferFlags::FILE_IS_RDONLY);
    }
    ed.msg_info("set");
    Ok(())
}

fn cmd_balanced(ed: &mut Editor, p: &ParsedCommand) -> CmdResult {
    let buf = ed.buf();
    let pairs = buf.syn.balanced_pairs.clone();
    if pairs.is_empty() {
        ed.msg_info("no balanced pairs for this filetype");
        return Ok(());
    }
    let range = match p.opt("range") {
        Some(r) => parse_range(r, buf.cur_idx, buf.num_rows())?,
        None => (0, buf.num_rows() - 1),
    };
    let result = ftype::balanced_check(
        &pairs,
        ed.buf()
            .lines()
            .enumerate()
            .skip(range.0)
            .take(range.1 - range.0 + 1),
    );
    match result {
        Ok(()) => ed.msg_info("balanced"),
        Err((row, c)) => ed.msg_error(format!("unbalanced '{c}' at line {}", row + 1)),
    }
    Ok(())
}

pub(crate) fn cmd_validate_utf8(ed: &mut Editor) -> CmdResult {
    let Some(fname) = ed.buf().fname.clone() else {
        ed.msg_info("utf8: buffer rows are always valid");
        return Ok(());
    };
    match std::fs::read(&fname) {
        Ok(bytes) => {
            let bad = core_text::malformed_offsets(&bytes);
            if bad.is_empty() {
                ed.msg_info("utf8: valid");
            } else {
                let report: Vec<String> = bad
                    .iter()
                    .map(|b| format!("malformed sequence at byte offset {b}"))
                    .collect();
                let n = report.len();
                ed.fill_special(SCRATCH_BUF, report);
                ed.show_special(SCRATCH_BUF);
                ed.msg_error(format!("utf8: {n} malformed sequences"));
            }
        }
        Err(_) => ed.msg_info("utf8: buffer rows are always valid"),
    }
    Ok(())
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

    fn run(ed: &mut Editor, line: &str) -> Option<LoopOutcome> {
        let mut keys = ScriptedKeys::default();
        execute(ed, &mut keys, line)
    }

    #[test]
    fn substitute_range_global() {
        // spec scenario S4
        let mut ed = editor_with(&["foo", "foo", "foo foo", "foo", "foo"]);
        run(
            &mut ed,
            "substitute --pat=foo --sub=bar --range=2,4 --global",
        );
        assert_eq!(
            ed.buf().lines().collect::<Vec<_>>(),
            vec!["foo", "bar", "bar bar", "bar", "foo"]
        );
        assert_eq!(ed.buf().undo.undo_depth(), 1);
    }

    #[test]
    fn write_and_edit_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("file.txt");
        let mut ed = editor_with(&["alpha", "beta"]);
        ed.buf_mut().fname = Some(path.clone());
        ed.buf_mut().set_modified();
        run(&mut ed, &format!("write --fname={}", path.display()));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "alpha\nbeta\n");

        run(&mut ed, &format!("edit! --fname={}", path.display()));
        assert_eq!(ed.buf().lines().collect::<Vec<_>>(), vec!["alpha", "beta"]);
        assert!(!ed.buf().is_modified());
    }

    #[test]
    fn quit_refuses_dirty_without_force() {
        let mut ed = editor_with(&["x"]);
        ed.buf_mut().set_modified();
        assert_eq!(run(&mut ed, "quit"), None);
        assert!(ed.banner.as_ref().unwrap().1);
        assert_eq!(run(&mut ed, "q!"), Some(LoopOutcome::Exit));
    }

    #[test]
    fn quit_global_exits_all() {
        let mut ed = editor_with(&["x"]);
        assert_eq!(run(&mut ed, "quit --global"), Some(LoopOutcome::ExitAll));
    }

    #[test]
    fn unknown_command_banners() {
        let mut ed = editor_with(&["x"]);
        assert_eq!(run(&mut ed, "frobnicate"), None);
        let (msg, is_err) = ed.banner.clone().unwrap();
        assert!(is_err);
        assert!(msg.contains("frobnicate"));
    }

    #[test]
    fn read_inserts_after_cursor() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ins.txt");
        std::fs::write(&path, "one\ntwo\n").unwrap();
        let mut ed = editor_with(&["top", "bottom"]);
        run(&mut ed, &format!("read --fname={}", path.display()));
        assert_eq!(
            ed.buf().lines().collect::<Vec<_>>(),
            vec!["top", "one", "two", "bottom"]
        );
        // one undo action restores
        ed.buf_mut().buffer_undo();
        assert_eq!(ed.buf().lines().collect::<Vec<_>>(), vec!["top", "bottom"]);
    }

    #[test]
    fn vgrep_fills_search_buffer() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "hit here\nmiss\n").unwrap();
        std::fs::write(dir.path().join("b.txt"), "another hit\n").unwrap();
        let mut ed = editor_with(&["x"]);
        ed.buf_mut().cwd = dir.path().to_path_buf();
        run(&mut ed, "vgrep --pat=hit a.txt b.txt");
        let lines: Vec<&str> = ed.buf().lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("a.txt:1: hit here"));
        assert!(ed.buf().is_special());
    }

    #[test]
    fn diff_reports_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("d.txt");
        std::fs::write(&path, "same\nold\n").unwrap();
        let mut ed = editor_with(&["same", "new"]);
        ed.buf_mut().fname = Some(path);
        run(&mut ed, "diff");
        let lines: Vec<&str> = ed.buf().lines().collect();
        assert!(lines.iter().any(|l| l.starts_with("-2: old")));
        assert!(lines.iter().any(|l| l.starts_with("+2: new")));
    }

    #[test]
    fn set_changes_ftype_and_widths() {
        let mut ed = editor_with(&["x"]);
        run(&mut ed, "set --ftype=rust --tabwidth=3");
        assert_eq!(ed.buf().ftype.name, "rust");
        assert_eq!(ed.buf().ftype.tabwidth, 3);
    }

    #[test]
    fn balanced_check_reports_offender() {
        let mut ed = editor_with(&["fn f() {", ")"]);
        run(&mut ed, "set --ftype=rust");
        run(&mut ed, "@balanced_check");
        let (msg, is_err) = ed.banner.clone().unwrap();
        assert!(is_err);
        assert!(msg.contains("line 2"));
    }

    #[test]
    fn bufdelete_refuses_dirty() {
        let mut ed = editor_with(&["x"]);
        ed.buf_mut().set_modified();
        run(&mut ed, "bd");
        assert!(ed.banner.as_ref().unwrap().1);
        // forced: last buffer of last normal window exits
        let out = run(&mut ed, "bd!");
        assert_eq!(out, Some(LoopOutcome::Exit));
    }

    #[test]
    fn interactive_substitute_honors_answers() {
        let mut ed = editor_with(&["a a a"]);
        let mut keys = ScriptedKeys::new([Key::Char('y'), Key::Char('n'), Key::Char('a')]);
        execute(
            &mut ed,
            &mut keys,
            "substitute --pat=a --sub=z --global --interactive",
        );
        assert_eq!(ed.buf().current().bytes(), "z a z");
    }
}
