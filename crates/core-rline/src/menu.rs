//! The transient picker over the message rows.
//!
//! A menu owns a filter pattern (edited through an embedded rline), a
//! provider callback that repopulates the list whenever the pattern
//! changes, and a selection index. It paints over the rows above its anchor
//! through the video's popup save/restore, so closing it restores the
//! underlay untouched.

use crate::Rline;
use bitflags::bitflags;
use core_term::{Key, KeySource, Video, escapes};
use tracing::trace;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MenuFlags: u8 {
        const INIT        = 1 << 0;
        const REINIT_LIST = 1 << 1;
        const QUIT        = 1 << 2;
        const DONE        = 1 << 3;
        const REDO        = 1 << 4;
        const FINALIZE    = 1 << 5;
    }
}

pub struct Menu {
    /// Current filter; providers narrow their list against it.
    pub pat: String,
    pub list: Vec<String>,
    pub sel: usize,
    pub flags: MenuFlags,
    /// Screen row just above which the list renders (usually the prompt row).
    pub anchor_row: usize,
    pub num_cols: usize,
    /// Rows of list shown per page.
    pub page_rows: usize,
    pub header: String,
    first_shown: usize,
}

impl Menu {
    pub fn new(anchor_row: usize, num_cols: usize, header: impl Into<String>) -> Self {
        Self {
            pat: String::new(),
            list: Vec::new(),
            sel: 0,
            flags: MenuFlags::INIT,
            anchor_row,
            num_cols,
            page_rows: 8,
            header: header.into(),
            first_shown: 0,
        }
    }

    fn clamp_sel(&mut self) {
        if self.list.is_empty() {
            self.sel = 0;
            self.first_shown = 0;
            return;
        }
        self.sel = self.sel.min(self.list.len() - 1);
        if self.sel < self.first_shown {
            self.first_shown = self.sel;
        } else if self.sel >= self.first_shown + self.page_rows {
            self.first_shown = self.sel + 1 - self.page_rows;
        }
    }

    fn paint(&mut self, video: &mut Video) {
        let shown = self
            .list
            .iter()
            .skip(self.first_shown)
            .take(self.page_rows)
            .count();
        let header_rows = if self.header.is_empty() { 0 } else { 1 };
        let total = shown.max(1) + header_rows;
        let mut screen_row = self.anchor_row.saturating_sub(total);
        if !self.header.is_empty() {
            let _ = video.paint_rows_with(
                screen_row,
                1,
                self.num_cols,
                &format!("{}{}{}", escapes::BOLD, self.header, escapes::COLOR_RESET),
            );
            screen_row += 1;
        }
        if self.list.is_empty() {
            let _ = video.paint_rows_with(screen_row, 1, self.num_cols, "[no match]");
            return;
        }
        for (i, item) in self
            .list
            .iter()
            .enumerate()
            .skip(self.first_shown)
            .take(self.page_rows)
        {
            let line = if i == self.sel {
                format!("{}{}{}", escapes::INVERTED, item, escapes::COLOR_RESET)
            } else {
                item.clone()
            };
            let _ = video.paint_rows_with(screen_row, 1, self.num_cols, &line);
            screen_row += 1;
        }
    }
}

/// Drive the menu until a selection or escape. The provider is re-run on
/// `INIT` and whenever further typing changes the pattern (`REINIT_LIST`).
pub fn run(
    menu: &mut Menu,
    keys: &mut dyn KeySource,
    video: &mut Video,
    provider: &mut dyn FnMut(&mut Menu),
) -> Option<String> {
    let mut pat_line = Rline::new('>', menu.anchor_row, menu.num_cols);
    pat_line.set_text(&menu.pat);
    provider(menu);
    menu.flags.remove(MenuFlags::INIT);
    menu.clamp_sel();
    menu.paint(video);
    let mut chosen = None;
    while let Some(key) = keys.read_key() {
        match key {
            Key::Esc => {
                menu.flags.insert(MenuFlags::QUIT);
                break;
            }
            Key::Enter => {
                if let Some(item) = menu.list.get(menu.sel) {
                    chosen = Some(item.clone());
                    menu.flags.insert(MenuFlags::DONE);
                }
                break;
            }
            Key::Down | Key::Tab | Key::Ctrl('n') => {
                if !menu.list.is_empty() {
                    menu.sel = (menu.sel + 1) % menu.list.len();
                }
            }
            Key::Up | Key::Ctrl('p') => {
                if !menu.list.is_empty() {
                    menu.sel = menu.sel.checked_sub(1).unwrap_or(menu.list.len() - 1);
                }
            }
            Key::PageDown => {
                menu.sel = (menu.sel + menu.page_rows).min(menu.list.len().saturating_sub(1));
            }
            Key::PageUp => {
                menu.sel = menu.sel.saturating_sub(menu.page_rows);
            }
            Key::Backspace => {
                if pat_line.backspace() {
                    menu.pat = pat_line.text();
                    menu.sel = 0;
                    menu.flags.insert(MenuFlags::REINIT_LIST);
                }
            }
            Key::Char(c) => {
                pat_line.insert(c);
                menu.pat = pat_line.text();
                menu.sel = 0;
                menu.flags.insert(MenuFlags::REINIT_LIST);
            }
            _ => {}
        }
        if menu.flags.contains(MenuFlags::REINIT_LIST) {
            provider(menu);
            menu.flags.remove(MenuFlags::REINIT_LIST);
        }
        menu.clamp_sel();
        menu.paint(video);
    }
    menu.flags.insert(MenuFlags::FINALIZE);
    let _ = video.resume_painted_rows();
    trace!(target: "rline.menu", chosen = chosen.is_some(), "menu closed");
    chosen
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_term::ScriptedKeys;

    fn provider_from<'a>(all: &'a [&'a str]) -> impl FnMut(&mut Menu) + 'a {
        move |menu: &mut Menu| {
            menu.list = all
                .iter()
                .filter(|s| s.starts_with(&menu.pat))
                .map(|s| s.to_string())
                .collect();
        }
    }

    #[test]
    fn enter_selects_current_item() {
        let (mut video, _sink) = Video::with_shared_sink(20, 60);
        let mut keys = ScriptedKeys::new([Key::Down, Key::Enter]);
        let mut menu = Menu::new(19, 60, "");
        let mut provider = provider_from(&["alpha", "beta", "gamma"]);
        let got = run(&mut menu, &mut keys, &mut video, &mut provider);
        assert_eq!(got.as_deref(), Some("beta"));
        assert!(!video.has_painted_rows());
    }

    #[test]
    fn escape_returns_none_and_restores() {
        let (mut video, _sink) = Video::with_shared_sink(20, 60);
        video.set_row_with(10, "underlay-row");
        let mut keys = ScriptedKeys::new([Key::Esc]);
        let mut menu = Menu::new(19, 60, "pick");
        let mut provider = provider_from(&["alpha"]);
        let got = run(&mut menu, &mut keys, &mut video, &mut provider);
        assert_eq!(got, None);
        assert_eq!(video.row(10), "underlay-row");
    }

    #[test]
    fn typing_narrows_list() {
        let (mut video, _sink) = Video::with_shared_sink(20, 60);
        let mut keys = ScriptedKeys::new([Key::Char('b'), Key::Enter]);
        let mut menu = Menu::new(19, 60, "");
        let mut provider = provider_from(&["alpha", "beta", "bravo"]);
        let got = run(&mut menu, &mut keys, &mut video, &mut provider);
        assert_eq!(got.as_deref(), Some("beta"));
    }

    #[test]
    fn selection_wraps() {
        let (mut video, _sink) = Video::with_shared_sink(20, 60);
        let mut keys = ScriptedKeys::new([Key::Up, Key::Enter]);
        let mut menu = Menu::new(19, 60, "");
        let mut provider = provider_from(&["one", "two", "three"]);
        let got = run(&mut menu, &mut keys, &mut video, &mut provider);
        assert_eq!(got.as_deref(), Some("three"));
    }
}
