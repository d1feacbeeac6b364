//! Named clipboard registers.
//!
//! Each register carries a linewise/charwise type and a queue of string
//! payloads (linewise entries are whole lines, newest first is irrelevant:
//! put consumes the queue in order). Uppercase names append to their
//! lowercase slot; `_` is the blackhole. The computed specials (`/ : % + *
//! = ^`) are resolved by the owning editor, which reads its own history,
//! filename and clipboard seams — this module only stores.

use crate::NAME_LETTERS;
use std::collections::HashMap;
use tracing::trace;

/// Register designators accepted by the `"` prefix: the specials, the full
/// letter run, digits, curword and blackhole.
pub const REGISTER_CHARS: &str = "\"/:%*+=abcdefghijklmnopqrstuvwxyz0123456789^_";

/// The special (non-letter, non-digit) register names.
const SPECIAL_CHARS: &str = "\"/:%*+=^_";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegType {
    Charwise,
    Linewise,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Register {
    pub rtype: RegType,
    pub entries: Vec<String>,
}

impl Register {
    pub fn charwise(text: impl Into<String>) -> Self {
        Self {
            rtype: RegType::Charwise,
            entries: vec![text.into()],
        }
    }

    pub fn linewise(lines: Vec<String>) -> Self {
        Self {
            rtype: RegType::Linewise,
            entries: lines,
        }
    }

    /// Flattened textual content (lines joined with newline for linewise).
    pub fn text(&self) -> String {
        match self.rtype {
            RegType::Charwise => self.entries.concat(),
            RegType::Linewise => {
                let mut s = self.entries.join("\n");
                s.push('\n');
                s
            }
        }
    }
}

/// Register file owned by one editor instance.
#[derive(Debug, Default)]
pub struct Registers {
    slots: HashMap<char, Register>,
}

impl Registers {
    /// Derived from [`NAME_LETTERS`] plus the fixed special set, never from
    /// a second hand-written letter run.
    pub fn is_valid_name(c: char) -> bool {
        c.is_ascii_digit()
            || NAME_LETTERS.contains(c.to_ascii_lowercase())
            || SPECIAL_CHARS.contains(c)
    }

    /// Store a payload. Uppercase names append to the lowercase slot (the
    /// register type follows the appended payload); `_` discards.
    pub fn set(&mut self, name: char, reg: Register) {
        if name == '_' {
            return;
        }
        if name.is_ascii_uppercase() {
            let lower = name.to_ascii_lowercase();
            let slot = self
                .slots
                .entry(lower)
                .or_insert_with(|| Register::linewise(Vec::new()));
            slot.rtype = reg.rtype;
            slot.entries.extend(reg.entries);
            trace!(target: "state.regs", register = %lower, "register_append");
            return;
        }
        trace!(target: "state.regs", register = %name, entries = reg.entries.len(), "register_set");
        self.slots.insert(name, reg);
    }

    pub fn get(&self, name: char) -> Option<&Register> {
        if name == '_' {
            return None;
        }
        self.slots.get(&name.to_ascii_lowercase())
    }

    /// Default register used when no `"x` prefix was given.
    pub fn unnamed(&self) -> Option<&Register> {
        self.get('"')
    }

    /// Writes always mirror into the unnamed register as well, unless the
    /// explicit target was the blackhole.
    pub fn set_with_default(&mut self, name: char, reg: Register) {
        if name != '_' && name != '"' {
            self.slots.insert('"', reg.clone());
        }
        self.set(name, reg);
    }
}
