//! Modal dispatch and the main loop.
//!
//! Submodules:
//! * `normal`    - normal-mode key table with count and register prefixes
//! * `insert`    - insert mode and its completion submodes
//! * `visual`    - characterwise / linewise / blockwise selections
//! * `edits`     - the editing primitives (one undo action each)
//! * `commands`  - the `:` prompt and command dispatch
//! * `search_ui` - `/ ? n N * #`
//! * `autosave`  - the inline autosave check
//!
//! The main loop blocks on one key, dispatches through the active buffer's
//! mode, and repaints the dirty rows; everything else flows from there.

use core_model::{Editor, LoopOutcome, WordAction, render};
use core_state::{Action, EditOutcome, Register, WriteOpts};
use core_term::{Key, KeySource};
use tracing::info;

pub mod autosave;
pub mod commands;
pub mod edits;
pub mod insert;
pub mod normal;
pub mod search_ui;
pub mod visual;

pub use normal::Flow;

/// Extension seams around the normal-mode loop. A begin hook that returns
/// `true` consumed the key (it may read follow-up keys itself, which is how
/// `g`-prefix extensions attach).
#[derive(Default)]
pub struct Hooks {
    pub on_normal_beg: Vec<fn(&mut Editor, &mut dyn KeySource, Key) -> bool>,
    pub on_normal_end: Vec<fn(&mut Editor, Key)>,
    pub at_exit: Vec<fn(&mut Editor)>,
}

/// Drive one editor until it yields a [`LoopOutcome`]. An exhausted key
/// source exits cleanly (scripted runs and closed inputs).
pub fn main_loop(ed: &mut Editor, keys: &mut dyn KeySource) -> LoopOutcome {
    let mut hooks = Hooks::default();
    main_loop_with_hooks(ed, keys, &mut hooks)
}

pub fn main_loop_with_hooks(
    ed: &mut Editor,
    keys: &mut dyn KeySource,
    hooks: &mut Hooks,
) -> LoopOutcome {
    render::draw(ed);
    loop {
        let Some(key) = keys.read_key() else {
            run_at_exit(ed, hooks);
            return LoopOutcome::Exit;
        };
        let consumed = hooks
            .on_normal_beg
            .iter()
            .any(|hook| hook(ed, keys, key));
        if consumed {
            render::refresh(ed);
            continue;
        }
        match normal::handle_key(ed, keys, key) {
            Flow::Outcome(outcome) => {
                info!(target: "actions.loop", ?outcome, "loop outcome");
                run_at_exit(ed, hooks);
                return outcome;
            }
            Flow::Continue => {}
        }
        for hook in &hooks.on_normal_end {
            hook(ed, key);
        }
    }
}

fn run_at_exit(ed: &mut Editor, hooks: &mut Hooks) {
    for hook in &hooks.at_exit {
        hook(ed);
    }
}

fn word_span(ed: &Editor) -> Option<(usize, usize)> {
    let row = ed.buf().current();
    core_text::word::word_at(row.bytes(), row.cur_col_idx)
}

fn map_word(ed: &mut Editor, f: fn(char) -> char) -> EditOutcome {
    let Some((s, e)) = word_span(ed) else {
        return EditOutcome::Nothing;
    };
    let buf = ed.buf_mut();
    let mut action = Action::default();
    action.push(buf.act_replace(buf.cur_idx));
    let mapped: String = buf.current().bytes()[s..e].chars().map(f).collect();
    buf.current_mut().remove_range(s, e);
    buf.current_mut().insert_str(s, &mapped);
    buf.current_mut().cur_col_idx = s;
    buf.push_action(action);
    buf.set_modified();
    EditOutcome::Done
}

fn word_toggle(ed: &mut Editor, _word: &str) -> EditOutcome {
    map_word(ed, core_text::case::toggle)
}

fn word_lower(ed: &mut Editor, _word: &str) -> EditOutcome {
    map_word(ed, core_text::case::lower)
}

fn word_upper(ed: &mut Editor, _word: &str) -> EditOutcome {
    map_word(ed, core_text::case::upper)
}

fn word_to_primary(ed: &mut Editor, word: &str) -> EditOutcome {
    ed.register_set('*', Register::charwise(word.to_string()));
    EditOutcome::Done
}

fn word_to_clipboard(ed: &mut Editor, word: &str) -> EditOutcome {
    ed.register_set('+', Register::charwise(word.to_string()));
    EditOutcome::Done
}

fn file_write(ed: &mut Editor) -> EditOutcome {
    match ed.buf_mut().write_file(&WriteOpts::default()) {
        Ok((lines, bytes)) => {
            ed.msg_info(format!("{lines} lines, {bytes} bytes written"));
            EditOutcome::Done
        }
        Err(e) => {
            ed.msg_error(e.to_string());
            EditOutcome::Nothing
        }
    }
}

fn file_validate(ed: &mut Editor) -> EditOutcome {
    match commands::cmd_validate_utf8(ed) {
        Ok(()) => EditOutcome::Done,
        Err(e) => {
            ed.msg_error(e.to_string());
            EditOutcome::Nothing
        }
    }
}

/// Register the built-in word and file actions (`W` / `F` menus).
pub fn install_default_actions(ed: &mut Editor) {
    ed.word_actions = vec![
        WordAction {
            key: '*',
            label: "copy to primary selection".into(),
            apply: word_to_primary,
        },
        WordAction {
            key: '+',
            label: "copy to clipboard".into(),
            apply: word_to_clipboard,
        },
        WordAction {
            key: '~',
            label: "toggle case".into(),
            apply: word_toggle,
        },
        WordAction {
            key: 'L',
            label: "lowercase".into(),
            apply: word_lower,
        },
        WordAction {
            key: 'U',
            label: "uppercase".into(),
            apply: word_upper,
        },
    ];
    ed.file_actions = vec![
        core_model::FileAction {
            key: 'w',
            label: "write file".into(),
            apply: file_write,
        },
        core_model::FileAction {
            key: 'v',
            label: "validate utf8".into(),
            apply: file_validate,
        },
    ];
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_state::Buffer;
    use core_term::ScriptedKeys;

    #[test]
    fn main_loop_exits_on_quit_command() {
        let mut ed = Editor::new(24, 80, Box::new(std::io::sink()));
        let mut keys = ScriptedKeys::typed(":q\n");
        assert_eq!(main_loop(&mut ed, &mut keys), LoopOutcome::Exit);
    }

    #[test]
    fn main_loop_exits_when_keys_run_dry() {
        let mut ed = Editor::new(24, 80, Box::new(std::io::sink()));
        let mut keys = ScriptedKeys::typed("jjk");
        assert_eq!(main_loop(&mut ed, &mut keys), LoopOutcome::Exit);
    }

    #[test]
    fn begin_hook_can_consume_keys() {
        fn eat_q(ed: &mut Editor, _keys: &mut dyn KeySource, key: Key) -> bool {
            if key == Key::Char('Q') {
                ed.msg_info("intercepted");
                true
            } else {
                false
            }
        }
        let mut ed = Editor::new(24, 80, Box::new(std::io::sink()));
        let mut hooks = Hooks {
            on_normal_beg: vec![eat_q],
            ..Hooks::default()
        };
        let mut keys = ScriptedKeys::typed("Q");
        main_loop_with_hooks(&mut ed, &mut keys, &mut hooks);
        assert_eq!(ed.banner.as_ref().unwrap().0, "intercepted");
    }

    #[test]
    fn default_word_actions_cover_case_ops() {
        let mut ed = Editor::new(24, 80, Box::new(std::io::sink()));
        let dim = ed.buf().dim;
        let flags = ed.buf().flags;
        *ed.buf_mut() = Buffer::from_lines(["MiXeD"]);
        ed.buf_mut().dim = dim;
        ed.buf_mut().flags = flags;
        install_default_actions(&mut ed);
        let lower = ed
            .word_actions
            .iter()
            .find(|a| a.key == 'L')
            .map(|a| a.apply)
            .unwrap();
        lower(&mut ed, "MiXeD");
        assert_eq!(ed.buf().current().bytes(), "mixed");
    }
}
