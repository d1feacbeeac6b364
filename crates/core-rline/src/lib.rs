//! The prompt-line mini-editor.
//!
//! An rline is a list of codepoints with a cursor, bound to the bottom
//! screen row (wrapping upward when the line outgrows it). Input flows
//! through a pair of pluggable hooks around each key, which is how the
//! incremental search prompt and the interactive substitute prompt reuse
//! this editor. Completion and history are opt-in per instance through the
//! option flags.

use bitflags::bitflags;
use core_state::Registers;
use core_term::{Key, KeySource, Video};
use std::path::PathBuf;
use tracing::trace;

pub mod args;
pub mod commands;
pub mod complete;
pub mod history;
pub mod menu;

pub use args::{Arg, ParsedCommand, parse_command, parse_range};
pub use commands::{COMMANDS, CommandId, CommandSpec};
pub use history::History;
pub use menu::{Menu, MenuFlags};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RlineOpts: u8 {
        const HAS_TAB_COMPLETION     = 1 << 0;
        const HAS_HISTORY_COMPLETION = 1 << 1;
    }
}

/// Hook verdict around one input event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookSignal {
    /// Key consumed by the hook; skip default processing.
    Ok,
    /// Skip default processing and the closing hook.
    Continue,
    /// Exit the edit loop, accepting the current line.
    Break,
    /// Run the default processing.
    PostProcess,
}

pub trait RlineHooks {
    fn at_beg(&mut self, _rl: &mut Rline, _key: Key) -> HookSignal {
        HookSignal::PostProcess
    }
    fn at_end(&mut self, _rl: &mut Rline, _key: Key) -> HookSignal {
        HookSignal::Ok
    }
}

/// Hookless default.
pub struct NoHooks;
impl RlineHooks for NoHooks {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RlineExit {
    Accepted(String),
    Cancelled,
}

/// Shared editor context the rline reads while editing.
pub struct RlineCtx<'a> {
    pub cwd: PathBuf,
    pub history: &'a mut History,
    /// Buffer names offered by buffer-name completion.
    pub buffer_names: Vec<String>,
    pub registers: Option<&'a Registers>,
}

/// The key that cycles the last argument of prior commands.
pub const LAST_ARG_KEY: Key = Key::Ctrl('o');

pub struct Rline {
    items: Vec<char>,
    pub idx: usize,
    pub prompt_char: char,
    pub opts: RlineOpts,
    pub visible: bool,
    /// Bottom screen row the prompt occupies, 1-based.
    pub first_row: usize,
    pub num_cols: usize,
}

impl Rline {
    pub fn new(prompt_char: char, first_row: usize, num_cols: usize) -> Self {
        Self {
            items: Vec::new(),
            idx: 0,
            prompt_char,
            opts: RlineOpts::empty(),
            visible: false,
            first_row,
            num_cols: num_cols.max(1),
        }
    }

    pub fn with_opts(mut self, opts: RlineOpts) -> Self {
        self.opts = opts;
        self
    }

    pub fn text(&self) -> String {
        self.items.iter().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn set_text(&mut self, s: &str) {
        self.items = s.chars().collect();
        self.idx = self.items.len();
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.idx = 0;
    }

    pub fn insert(&mut self, c: char) {
        self.items.insert(self.idx, c);
        self.idx += 1;
    }

    pub fn insert_str(&mut self, s: &str) {
        for c in s.chars() {
            self.insert(c);
        }
    }

    pub fn backspace(&mut self) -> bool {
        if self.idx == 0 {
            return false;
        }
        self.idx -= 1;
        self.items.remove(self.idx);
        true
    }

    pub fn delete(&mut self) -> bool {
        if self.idx >= self.items.len() {
            return false;
        }
        self.items.remove(self.idx);
        true
    }

    pub fn left(&mut self) {
        self.idx = self.idx.saturating_sub(1);
    }

    pub fn right(&mut self) {
        self.idx = (self.idx + 1).min(self.items.len());
    }

    pub fn home(&mut self) {
        self.idx = 0;
    }

    pub fn end(&mut self) {
        self.idx = self.items.len();
    }

    /// Paint the prompt line, wrapping upward as needed.
    pub fn render(&self, video: &mut Video) {
        let mut s = String::with_capacity(self.items.len() + 1);
        s.push(self.prompt_char);
        s.extend(self.items.iter());
        let cols = self.num_cols;
        let chars: Vec<char> = s.chars().collect();
        let nrows = chars.len() / cols + 1;
        let start = self.first_row.saturating_sub(nrows - 1).max(1);
        let mut chunks = chars.chunks(cols);
        for screen_row in start..=self.first_row {
            let content: String = chunks.next().map(|c| c.iter().collect()).unwrap_or_default();
            video.set_row_with(screen_row - 1, &content);
        }
        video.render_set_from_to(start, self.first_row);
        let cur = 1 + self.idx;
        video.set_cursor(start + cur / cols, (cur % cols) + 1);
        video.render_cursor();
        let _ = video.flush();
    }

    /// Drive the edit loop to completion.
    pub fn edit(
        &mut self,
        keys: &mut dyn KeySource,
        video: &mut Video,
        ctx: &mut RlineCtx<'_>,
        hooks: &mut dyn RlineHooks,
    ) -> RlineExit {
        self.visible = true;
        let mut hist_pos: Option<usize> = None;
        let mut hist_stash = String::new();
        let mut last_arg_cycle = 0usize;
        self.render(video);
        while let Some(key) = keys.read_key() {
            match hooks.at_beg(self, key) {
                HookSignal::Break => {
                    self.visible = false;
                    return RlineExit::Accepted(self.text());
                }
                HookSignal::Continue => {
                    self.render(video);
                    continue;
                }
                HookSignal::Ok => {
                    self.render(video);
                    match hooks.at_end(self, key) {
                        HookSignal::Break => {
                            self.visible = false;
                            return RlineExit::Accepted(self.text());
                        }
                        _ => continue,
                    }
                }
                HookSignal::PostProcess => {}
            }
            if key != Key::Up && key != Key::Down {
                hist_pos = None;
            }
            if key != LAST_ARG_KEY {
                last_arg_cycle = 0;
            }
            match key {
                Key::Enter => {
                    self.visible = false;
                    trace!(target: "rline", line = %self.text(), "accepted");
                    return RlineExit::Accepted(self.text());
                }
                Key::Esc => {
                    self.visible = false;
                    return RlineExit::Cancelled;
                }
                Key::Left => self.left(),
                Key::Right => self.right(),
                Key::Home | Key::Ctrl('a') => self.home(),
                Key::End | Key::Ctrl('e') => self.end(),
                Key::Backspace => {
                    self.backspace();
                }
                Key::Delete => {
                    self.delete();
                }
                Key::Ctrl('l') => self.clear(),
                Key::Ctrl('r') => {
                    if let Some(Key::Char(name)) = keys.read_key()
                        && let Some(regs) = ctx.registers
                        && let Some(reg) = regs.get(name)
                    {
                        let text = reg.text();
                        self.insert_str(text.trim_end_matches('\n'));
                    }
                }
                Key::Tab if self.opts.contains(RlineOpts::HAS_TAB_COMPLETION) => {
                    self.complete(keys, video, ctx);
                }
                Key::Up if self.opts.contains(RlineOpts::HAS_HISTORY_COMPLETION) => {
                    if hist_pos.is_none() {
                        hist_stash = self.text();
                    }
                    let start = hist_pos.unwrap_or(ctx.history.rline.len());
                    if let Some((pos, entry)) = ctx
                        .history
                        .rline
                        .iter()
                        .enumerate()
                        .take(start)
                        .rev()
                        .find(|(_, e)| e.starts_with(&hist_stash))
                        .map(|(i, e)| (i, e.clone()))
                    {
                        hist_pos = Some(pos);
                        self.set_text(&entry);
                    }
                }
                Key::Down if self.opts.contains(RlineOpts::HAS_HISTORY_COMPLETION) => {
                    if let Some(pos) = hist_pos {
                        let next = ctx
                            .history
                            .rline
                            .iter()
                            .enumerate()
                            .skip(pos + 1)
                            .find(|(_, e)| e.starts_with(&hist_stash))
                            .map(|(i, e)| (i, e.clone()));
                        match next {
                            Some((i, e)) => {
                                hist_pos = Some(i);
                                self.set_text(&e);
                            }
                            None => {
                                hist_pos = None;
                                let stash = hist_stash.clone();
                                self.set_text(&stash);
                            }
                        }
                    }
                }
                LAST_ARG_KEY => {
                    let last_args = ctx.history.last_args();
                    if !last_args.is_empty() {
                        let arg = &last_args[last_arg_cycle % last_args.len()];
                        last_arg_cycle += 1;
                        self.replace_last_token(arg);
                    }
                }
                Key::Char(c) => self.insert(c),
                _ => {}
            }
            if matches!(hooks.at_end(self, key), HookSignal::Break) {
                self.visible = false;
                return RlineExit::Accepted(self.text());
            }
            self.render(video);
        }
        self.visible = false;
        RlineExit::Cancelled
    }

    fn replace_last_token(&mut self, replacement: &str) {
        let text = self.text();
        let start = text
            .rfind(char::is_whitespace)
            .map(|i| i + 1)
            .unwrap_or(text.len());
        let new = format!("{}{replacement}", &text[..start]);
        self.set_text(&new);
    }

    /// Tab completion: classify the trailing token, pick a candidate
    /// (directly when unique, else through a menu), splice it in. Choosing
    /// a directory recurses into it.
    fn complete(&mut self, keys: &mut dyn KeySource, video: &mut Video, ctx: &mut RlineCtx<'_>) {
        use complete::TokenKind;
        let text = self.text();
        let kind = complete::classify(&text);
        let token_start = text
            .rfind(char::is_whitespace)
            .map(|i| i + 1)
            .unwrap_or(0);
        let (replace_start, candidates) = match &kind {
            TokenKind::Command { prefix } => (token_start, commands::completions(prefix)),
            TokenKind::Option { prefix } => {
                let command = text.split_whitespace().next().unwrap_or("");
                let opts = commands::lookup(command)
                    .map(|s| {
                        s.args
                            .iter()
                            .filter(|a| a.trim_start_matches('-').starts_with(prefix.as_str()))
                            .map(|a| a.trim_end_matches('=').to_string())
                            .collect()
                    })
                    .unwrap_or_default();
                (token_start, opts)
            }
            TokenKind::OptionValue { name, prefix } => {
                let vstart = token_start + 2 + name.len() + 1;
                if name == "bufname" {
                    (vstart, complete::filter_names(&ctx.buffer_names, prefix))
                } else {
                    (vstart, complete::complete_filenames(&ctx.cwd, prefix))
                }
            }
            TokenKind::Bufname { prefix } => (
                token_start,
                complete::filter_names(&ctx.buffer_names, prefix),
            ),
            TokenKind::Filename { prefix } => {
                (token_start, complete::complete_filenames(&ctx.cwd, prefix))
            }
        };
        let mut chosen = match candidates.len() {
            0 => return,
            1 => candidates.into_iter().next().unwrap(),
            _ => {
                let mut m = Menu::new(self.first_row, self.num_cols, "");
                let mut provider = |menu: &mut Menu| {
                    menu.list = candidates
                        .iter()
                        .filter(|c| c.contains(&menu.pat))
                        .cloned()
                        .collect();
                };
                match menu::run(&mut m, keys, video, &mut provider) {
                    Some(c) => c,
                    None => return,
                }
            }
        };
        // descend into chosen directories
        while chosen.ends_with('/') {
            let inner = complete::complete_filenames(&ctx.cwd, &chosen);
            match inner.len() {
                0 => break,
                1 => chosen = inner.into_iter().next().unwrap(),
                _ => {
                    let mut m = Menu::new(self.first_row, self.num_cols, "");
                    let mut provider = |menu: &mut Menu| {
                        menu.list = inner
                            .iter()
                            .filter(|c| c.contains(&menu.pat))
                            .cloned()
                            .collect();
                    };
                    match menu::run(&mut m, keys, video, &mut provider) {
                        Some(c) => chosen = c,
                        None => break,
                    }
                }
            }
        }
        let new = format!("{}{chosen}", &text[..replace_start]);
        self.set_text(&new);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_term::ScriptedKeys;

    fn ctx_with<'a>(history: &'a mut History) -> RlineCtx<'a> {
        RlineCtx {
            cwd: PathBuf::from("/"),
            history,
            buffer_names: vec![],
            registers: None,
        }
    }

    #[test]
    fn typed_line_accepted_on_enter() {
        let (mut video, _sink) = Video::with_shared_sink(10, 40);
        let mut history = History::default();
        let mut ctx = ctx_with(&mut history);
        let mut rl = Rline::new(':', 10, 40);
        let mut keys = ScriptedKeys::typed("write\n");
        let exit = rl.edit(&mut keys, &mut video, &mut ctx, &mut NoHooks);
        assert_eq!(exit, RlineExit::Accepted("write".into()));
    }

    #[test]
    fn escape_cancels() {
        let (mut video, _sink) = Video::with_shared_sink(10, 40);
        let mut history = History::default();
        let mut ctx = ctx_with(&mut history);
        let mut rl = Rline::new(':', 10, 40);
        let mut keys = ScriptedKeys::typed("abc\x1b");
        assert_eq!(
            rl.edit(&mut keys, &mut video, &mut ctx, &mut NoHooks),
            RlineExit::Cancelled
        );
    }

    #[test]
    fn editing_keys_move_and_delete() {
        let (mut video, _sink) = Video::with_shared_sink(10, 40);
        let mut history = History::default();
        let mut ctx = ctx_with(&mut history);
        let mut rl = Rline::new(':', 10, 40);
        let mut keys = ScriptedKeys::new([
            Key::Char('a'),
            Key::Char('b'),
            Key::Char('c'),
            Key::Left,
            Key::Backspace,
            Key::Enter,
        ]);
        assert_eq!(
            rl.edit(&mut keys, &mut video, &mut ctx, &mut NoHooks),
            RlineExit::Accepted("ac".into())
        );
    }

    #[test]
    fn ctrl_l_clears() {
        let (mut video, _sink) = Video::with_shared_sink(10, 40);
        let mut history = History::default();
        let mut ctx = ctx_with(&mut history);
        let mut rl = Rline::new(':', 10, 40);
        let mut keys = ScriptedKeys::new([
            Key::Char('x'),
            Key::Ctrl('l'),
            Key::Char('y'),
            Key::Enter,
        ]);
        assert_eq!(
            rl.edit(&mut keys, &mut video, &mut ctx, &mut NoHooks),
            RlineExit::Accepted("y".into())
        );
    }

    #[test]
    fn register_contents_inserted() {
        let (mut video, _sink) = Video::with_shared_sink(10, 40);
        let mut history = History::default();
        let mut regs = Registers::default();
        regs.set('a', core_state::Register::charwise("REG"));
        let mut ctx = RlineCtx {
            cwd: PathBuf::from("/"),
            history: &mut history,
            buffer_names: vec![],
            registers: Some(&regs),
        };
        let mut rl = Rline::new(':', 10, 40);
        let mut keys = ScriptedKeys::new([Key::Ctrl('r'), Key::Char('a'), Key::Enter]);
        assert_eq!(
            rl.edit(&mut keys, &mut video, &mut ctx, &mut NoHooks),
            RlineExit::Accepted("REG".into())
        );
    }

    #[test]
    fn history_up_filters_by_prefix() {
        let (mut video, _sink) = Video::with_shared_sink(10, 40);
        let mut history = History::default();
        history.push_rline("write a");
        history.push_rline("edit b");
        history.push_rline("write c");
        let mut ctx = ctx_with(&mut history);
        let mut rl =
            Rline::new(':', 10, 40).with_opts(RlineOpts::HAS_HISTORY_COMPLETION);
        let mut keys = ScriptedKeys::new([
            Key::Char('w'),
            Key::Up,
            Key::Up,
            Key::Enter,
        ]);
        assert_eq!(
            rl.edit(&mut keys, &mut video, &mut ctx, &mut NoHooks),
            RlineExit::Accepted("write a".into())
        );
    }

    #[test]
    fn tab_completes_unique_command() {
        let (mut video, _sink) = Video::with_shared_sink(10, 40);
        let mut history = History::default();
        let mut ctx = ctx_with(&mut history);
        let mut rl = Rline::new(':', 10, 40).with_opts(RlineOpts::HAS_TAB_COMPLETION);
        let mut keys = ScriptedKeys::new([
            Key::Char('r'),
            Key::Char('e'),
            Key::Char('d'),
            Key::Tab,
            Key::Enter,
        ]);
        assert_eq!(
            rl.edit(&mut keys, &mut video, &mut ctx, &mut NoHooks),
            RlineExit::Accepted("redraw".into())
        );
    }

    #[test]
    fn last_arg_key_cycles_history_args() {
        let (mut video, _sink) = Video::with_shared_sink(10, 40);
        let mut history = History::default();
        history.push_rline("edit one.txt");
        history.push_rline("edit two.txt");
        let mut ctx = ctx_with(&mut history);
        let mut rl = Rline::new(':', 10, 40);
        let mut keys = ScriptedKeys::new([
            Key::Char('r'),
            Key::Char(' '),
            LAST_ARG_KEY,
            LAST_ARG_KEY,
            Key::Enter,
        ]);
        assert_eq!(
            rl.edit(&mut keys, &mut video, &mut ctx, &mut NoHooks),
            RlineExit::Accepted("r one.txt".into())
        );
    }

    struct BreakOnQuestion;
    impl RlineHooks for BreakOnQuestion {
        fn at_beg(&mut self, rl: &mut Rline, key: Key) -> HookSignal {
            if key == Key::Char('?') {
                rl.insert('?');
                return HookSignal::Break;
            }
            HookSignal::PostProcess
        }
    }

    #[test]
    fn hooks_can_break_the_loop() {
        let (mut video, _sink) = Video::with_shared_sink(10, 40);
        let mut history = History::default();
        let mut ctx = ctx_with(&mut history);
        let mut rl = Rline::new('/', 10, 40);
        let mut keys = ScriptedKeys::typed("ab?never");
        assert_eq!(
            rl.edit(&mut keys, &mut video, &mut ctx, &mut BreakOnQuestion),
            RlineExit::Accepted("ab?".into())
        );
    }
}
