//! The multi-editor root.
//!
//! An ordered list of editor instances with a current and previous-focused
//! index. The main loop returns a [`LoopOutcome`]; the root applies it and
//! tells the caller whether to keep running, suspend, or exit.

use crate::editor::Editor;
use core_state::Register;
use std::path::PathBuf;
use tracing::info;

/// State transition returned by one editor's main loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopOutcome {
    Exit,
    ExitAll,
    ExitAllForce,
    NewEditor(Option<PathBuf>),
    NextEditor,
    PrevEditor,
    PrevFocusedEditor,
    Suspended,
}

/// What the outer loop should do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootFlow {
    Continue,
    Suspend,
    Quit(i32),
}

pub struct Root {
    pub editors: Vec<Editor>,
    pub cur: usize,
    pub prev: usize,
    /// Cross-editor shared register, replaced whole on write.
    shared_register: Option<Register>,
}

impl Root {
    pub fn new(first: Editor) -> Self {
        Self {
            editors: vec![first],
            cur: 0,
            prev: 0,
            shared_register: None,
        }
    }

    pub fn cur_mut(&mut self) -> &mut Editor {
        &mut self.editors[self.cur]
    }

    pub fn set_shared_register(&mut self, reg: Register) {
        self.shared_register = Some(reg);
    }

    pub fn shared_register(&self) -> Option<&Register> {
        self.shared_register.as_ref()
    }

    /// Apply a loop outcome. `make_editor` constructs instances for
    /// `ednew`, loading the requested file when one was named.
    pub fn handle(
        &mut self,
        outcome: LoopOutcome,
        make_editor: impl FnOnce(Option<&PathBuf>) -> Editor,
    ) -> RootFlow {
        match outcome {
            LoopOutcome::Exit => {
                self.editors.remove(self.cur);
                if self.editors.is_empty() {
                    return RootFlow::Quit(0);
                }
                if self.prev > self.cur {
                    self.prev -= 1;
                }
                self.cur = self.cur.min(self.editors.len() - 1);
                self.prev = self.prev.min(self.editors.len() - 1);
                RootFlow::Continue
            }
            LoopOutcome::ExitAll | LoopOutcome::ExitAllForce => RootFlow::Quit(0),
            LoopOutcome::NewEditor(fname) => {
                let ed = make_editor(fname.as_ref());
                self.editors.push(ed);
                self.prev = self.cur;
                self.cur = self.editors.len() - 1;
                info!(target: "model.root", editors = self.editors.len(), "editor added");
                RootFlow::Continue
            }
            LoopOutcome::NextEditor => {
                if self.editors.len() > 1 {
                    self.prev = self.cur;
                    self.cur = (self.cur + 1) % self.editors.len();
                }
                RootFlow::Continue
            }
            LoopOutcome::PrevEditor => {
                if self.editors.len() > 1 {
                    self.prev = self.cur;
                    self.cur = self.cur.checked_sub(1).unwrap_or(self.editors.len() - 1);
                }
                RootFlow::Continue
            }
            LoopOutcome::PrevFocusedEditor => {
                if self.prev != self.cur && self.prev < self.editors.len() {
                    std::mem::swap(&mut self.prev, &mut self.cur);
                }
                RootFlow::Continue
            }
            LoopOutcome::Suspended => RootFlow::Suspend,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn editor() -> Editor {
        Editor::new(24, 80, Box::new(std::io::sink()))
    }

    #[test]
    fn exit_last_editor_quits() {
        let mut root = Root::new(editor());
        assert_eq!(
            root.handle(LoopOutcome::Exit, |_| editor()),
            RootFlow::Quit(0)
        );
    }

    #[test]
    fn new_then_cycle_editors() {
        let mut root = Root::new(editor());
        root.handle(LoopOutcome::NewEditor(None), |_| editor());
        assert_eq!(root.cur, 1);
        root.handle(LoopOutcome::NextEditor, |_| editor());
        assert_eq!(root.cur, 0);
        root.handle(LoopOutcome::PrevEditor, |_| editor());
        assert_eq!(root.cur, 1);
        root.handle(LoopOutcome::PrevFocusedEditor, |_| editor());
        assert_eq!(root.cur, 0);
    }

    #[test]
    fn exit_one_of_two_continues() {
        let mut root = Root::new(editor());
        root.handle(LoopOutcome::NewEditor(None), |_| editor());
        assert_eq!(root.handle(LoopOutcome::Exit, |_| editor()), RootFlow::Continue);
        assert_eq!(root.editors.len(), 1);
        assert_eq!(root.cur, 0);
    }

    #[test]
    fn shared_register_replaced_whole() {
        let mut root = Root::new(editor());
        root.set_shared_register(Register::charwise("one"));
        root.set_shared_register(Register::charwise("two"));
        assert_eq!(root.shared_register().unwrap().text(), "two");
    }
}
