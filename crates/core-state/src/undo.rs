//! Coarse line-action undo.
//!
//! One user-visible edit pushes one [`Action`]; an action is a stack of
//! per-row [`Act`]s, each recording the row index, the bytes needed to
//! reverse it, and the cursor snapshot at act time. Undo replays the acts in
//! reverse push order, accumulating the inverse acts into a new action for
//! the redo stack; redo is symmetric but pushes back onto the undo stack
//! without clearing redo. Any other new action clears the redo stack.
//!
//! Both stacks are bounded; on overflow the oldest action drops off.

use crate::{Buffer, EditOutcome, Mark, Row};
use tracing::trace;

/// Default bound for both stacks; configurable per buffer.
pub const DEFAULT_MAX_UNDO_ENTRIES: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActKind {
    /// A row was inserted at `idx` (reverse: delete it).
    InsertLine,
    /// A row was deleted at `idx`; `bytes` held its content (reverse: insert).
    DeleteLine,
    /// The row at `idx` was replaced; `bytes` held its former content.
    ReplaceLine,
}

#[derive(Debug, Clone)]
pub struct Act {
    pub kind: ActKind,
    pub idx: usize,
    pub bytes: String,
    pub cursor: Mark,
}

/// One undo entry: the acts of a single user-visible edit, in push order.
#[derive(Debug, Clone, Default)]
pub struct Action {
    pub acts: Vec<Act>,
}

impl Action {
    pub fn push(&mut self, act: Act) {
        self.acts.push(act);
    }
    pub fn is_empty(&self) -> bool {
        self.acts.is_empty()
    }
}

#[derive(Debug)]
pub struct UndoEngine {
    undo: Vec<Action>,
    redo: Vec<Action>,
    pub max_entries: usize,
}

impl Default for UndoEngine {
    fn default() -> Self {
        Self {
            undo: Vec::new(),
            redo: Vec::new(),
            max_entries: DEFAULT_MAX_UNDO_ENTRIES,
        }
    }
}

impl UndoEngine {
    pub fn undo_depth(&self) -> usize {
        self.undo.len()
    }
    pub fn redo_depth(&self) -> usize {
        self.redo.len()
    }

    /// Push a fresh edit action; clears redo and trims the tail.
    pub fn push(&mut self, action: Action) {
        if action.is_empty() {
            return;
        }
        self.undo.push(action);
        if self.undo.len() > self.max_entries {
            self.undo.remove(0);
            trace!(target: "state.undo", "undo_stack_trimmed");
        }
        self.redo.clear();
        trace!(target: "state.undo", undo_depth = self.undo.len(), "push_action");
    }

    fn pop_undo(&mut self) -> Option<Action> {
        self.undo.pop()
    }
    fn pop_redo(&mut self) -> Option<Action> {
        self.redo.pop()
    }

    fn push_redo(&mut self, action: Action) {
        self.redo.push(action);
        if self.redo.len() > self.max_entries {
            self.redo.remove(0);
        }
    }

    /// The most recent undo entry, for edits that must fold follow-up acts
    /// into the same user-visible action (blockwise insert replication).
    pub fn last_action_mut(&mut self) -> Option<&mut Action> {
        self.undo.last_mut()
    }

    /// Re-entry path from redo: no redo clearing.
    fn push_undo_preserving_redo(&mut self, action: Action) {
        self.undo.push(action);
        if self.undo.len() > self.max_entries {
            self.undo.remove(0);
        }
    }
}

impl Buffer {
    /// Snapshot helper: act recording that the row at `idx` is about to be
    /// replaced.
    pub fn act_replace(&self, idx: usize) -> Act {
        Act {
            kind: ActKind::ReplaceLine,
            idx,
            bytes: self.row(idx).map(|r| r.bytes().to_string()).unwrap_or_default(),
            cursor: self.cursor_snapshot(),
        }
    }

    /// Act recording that the row at `idx` is about to be deleted.
    pub fn act_delete(&self, idx: usize) -> Act {
        Act {
            kind: ActKind::DeleteLine,
            idx,
            bytes: self.row(idx).map(|r| r.bytes().to_string()).unwrap_or_default(),
            cursor: self.cursor_snapshot(),
        }
    }

    /// Act recording that a row was inserted at `idx`.
    pub fn act_insert(&self, idx: usize, bytes: impl Into<String>) -> Act {
        Act {
            kind: ActKind::InsertLine,
            idx,
            bytes: bytes.into(),
            cursor: self.cursor_snapshot(),
        }
    }

    /// Record one complete edit.
    pub fn push_action(&mut self, action: Action) {
        self.undo.push(action);
    }

    /// Apply an action's acts in reverse push order, returning the inverse
    /// action (acts again in the order they were applied).
    fn apply_action(&mut self, action: &Action) -> Action {
        let mut inverse = Action::default();
        for act in action.acts.iter().rev() {
            let now = self.cursor_snapshot();
            match act.kind {
                ActKind::ReplaceLine => {
                    let former = self
                        .row(act.idx)
                        .map(|r| r.bytes().to_string())
                        .unwrap_or_default();
                    inverse.push(Act {
                        kind: ActKind::ReplaceLine,
                        idx: act.idx,
                        bytes: former,
                        cursor: now,
                    });
                    if let Some(row) = self.row_mut(act.idx) {
                        row.replace(act.bytes.clone());
                    }
                }
                ActKind::DeleteLine => {
                    self.insert_row(act.idx, Row::new(act.bytes.clone()));
                    inverse.push(Act {
                        kind: ActKind::InsertLine,
                        idx: act.idx,
                        bytes: act.bytes.clone(),
                        cursor: now,
                    });
                }
                ActKind::InsertLine => {
                    let removed = self
                        .remove_row(act.idx)
                        .map(|r| r.bytes().to_string())
                        .unwrap_or_default();
                    inverse.push(Act {
                        kind: ActKind::DeleteLine,
                        idx: act.idx,
                        bytes: removed,
                        cursor: now,
                    });
                }
            }
        }
        if let Some(first) = action.acts.last() {
            self.restore_cursor(&first.cursor);
        }
        inverse
    }

    pub fn buffer_undo(&mut self) -> EditOutcome {
        let Some(action) = self.undo.pop_undo() else {
            return EditOutcome::Nothing;
        };
        trace!(target: "state.undo", undo_depth = self.undo.undo_depth(), "undo_pop");
        let inverse = self.apply_action(&action);
        self.undo.push_redo(inverse);
        self.set_modified();
        EditOutcome::Done
    }

    pub fn buffer_redo(&mut self) -> EditOutcome {
        let Some(action) = self.undo.pop_redo() else {
            return EditOutcome::Nothing;
        };
        trace!(target: "state.undo", redo_depth = self.undo.redo_depth(), "redo_pop");
        let inverse = self.apply_action(&action);
        self.undo.push_undo_preserving_redo(inverse);
        self.set_modified();
        EditOutcome::Done
    }
}
