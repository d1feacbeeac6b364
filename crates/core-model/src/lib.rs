//! Windows, frames, editor instances, and the multi-editor root.
//!
//! Ownership runs root → editors → windows → buffers → rows; anything that
//! needs to point the other way (a buffer's frame, a window's focus) is an
//! index, clamped on every structural change.

pub mod editor;
pub mod render;
pub mod root;
pub mod window;

pub use editor::{
    Clipboard, DIFF_BUF, Editor, FileAction, LineAction, MSG_BUF, SCRATCH_BUF, SEARCH_BUF,
    ShellRunner, WordAction,
};
pub use root::{LoopOutcome, Root, RootFlow};
pub use window::{MAX_FRAMES, MIN_FRAMES, Window, WindowType};
