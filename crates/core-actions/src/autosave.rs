//! Autosave timer check.
//!
//! Consulted after every completed insert-mode edit: when the buffer's
//! autosave interval has elapsed since its last save, a forced write runs
//! inline and the insert run continues unbroken.

use core_model::Editor;
use core_state::WriteOpts;
use tracing::info;

pub fn check(ed: &mut Editor) {
    if !ed.buf().autosave_due() {
        return;
    }
    let opts = WriteOpts {
        force: true,
        ..WriteOpts::default()
    };
    match ed.buf_mut().write_file(&opts) {
        Ok((lines, bytes)) => {
            info!(target: "actions.autosave", lines, bytes, "autosaved");
        }
        Err(e) => ed.msg_error(format!("autosave: {e}")),
    }
}
