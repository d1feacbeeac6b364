//! Regex replace over a row range.
//!
//! The replacement string is rebuilt per match: `&` and `\1`..`\9` expand to
//! capture contents, `\s` to a literal space, `\\` to a backslash. One
//! invocation pushes at most one undo action covering every touched row;
//! interactive mode prompts per match and can stop (`q`, keeping what was
//! applied) or cancel (`c`, rolling every applied replacement back).

use core_state::{Action, Buffer, Result, VedError};
use regex::Regex;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct SubstOpts {
    pub pat: String,
    pub sub: String,
    pub global: bool,
    pub interactive: bool,
    /// Inclusive 0-based row range.
    pub range: (usize, usize),
}

/// Interactive answer for one match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubstChoice {
    Yes,
    No,
    All,
    Quit,
    Cancel,
}

/// Expand the replacement template against one match's captures.
pub fn build_replacement(caps: &regex::Captures, sub: &str) -> String {
    let mut out = String::with_capacity(sub.len());
    let mut chars = sub.chars();
    while let Some(c) = chars.next() {
        match c {
            '&' => out.push_str(caps.get(0).map(|m| m.as_str()).unwrap_or("")),
            '\\' => match chars.next() {
                Some(d @ '1'..='9') => {
                    let n = d.to_digit(10).unwrap() as usize;
                    out.push_str(caps.get(n).map(|m| m.as_str()).unwrap_or(""));
                }
                Some('s') => out.push(' '),
                Some('\\') => out.push('\\'),
                Some('&') => out.push('&'),
                Some(other) => {
                    out.push('\\');
                    out.push(other);
                }
                None => out.push('\\'),
            },
            c => out.push(c),
        }
    }
    out
}

/// Context handed to the interactive confirm callback.
#[derive(Debug, Clone)]
pub struct SubstPreview<'a> {
    pub row_idx: usize,
    pub line: &'a str,
    pub matched: &'a str,
    pub replacement: &'a str,
}

/// Apply the substitution, returning the number of replacements. The
/// `confirm` callback is consulted only in interactive mode.
pub fn substitute(
    buf: &mut Buffer,
    opts: &SubstOpts,
    confirm: &mut dyn FnMut(&SubstPreview<'_>) -> SubstChoice,
) -> Result<usize> {
    let re = Regex::new(&opts.pat).map_err(|e| VedError::Pattern(e.to_string()))?;
    let (from, to) = opts.range;
    let last = buf.num_rows().saturating_sub(1);
    if from > to || to > last {
        return Err(VedError::InvalidRange(format!("{},{}", from + 1, to + 1)));
    }
    let mut action = Action::default();
    let mut count = 0usize;
    let mut ask = opts.interactive;
    let mut stopped = false;
    let mut cancelled = false;
    let mut last_changed: Option<usize> = None;

    for idx in from..=to {
        if stopped {
            break;
        }
        let mut line = buf.row(idx).map(|r| r.bytes().to_string()).unwrap_or_default();
        let mut pos = 0usize;
        let mut row_touched = false;
        loop {
            let Some(caps) = re.captures_at(&line, pos) else {
                break;
            };
            let m = caps.get(0).unwrap();
            // empty matches must not loop in place
            let (mstart, mend) = (m.start(), m.end());
            let replacement = build_replacement(&caps, &opts.sub);
            let apply = if ask {
                let preview = SubstPreview {
                    row_idx: idx,
                    line: &line,
                    matched: m.as_str(),
                    replacement: &replacement,
                };
                match confirm(&preview) {
                    SubstChoice::Yes => true,
                    SubstChoice::No => false,
                    SubstChoice::All => {
                        ask = false;
                        true
                    }
                    SubstChoice::Quit => {
                        stopped = true;
                        false
                    }
                    SubstChoice::Cancel => {
                        stopped = true;
                        cancelled = true;
                        false
                    }
                }
            } else {
                true
            };
            if stopped {
                break;
            }
            if apply {
                if !row_touched {
                    action.push(buf.act_replace(idx));
                    row_touched = true;
                }
                line.replace_range(mstart..mend, &replacement);
                count += 1;
                last_changed = Some(idx);
                pos = mstart + replacement.len();
            } else {
                pos = mend;
            }
            if mend == mstart {
                // zero-width match: force progress
                pos = pos.max(mend + 1);
            }
            if pos >= line.len() || !opts.global {
                break;
            }
        }
        if row_touched {
            buf.row_mut(idx).expect("row in range").replace(line);
        }
    }

    if cancelled {
        // roll back every applied replacement from the recorded acts
        for act in action.acts.iter().rev() {
            if let Some(row) = buf.row_mut(act.idx) {
                row.replace(act.bytes.clone());
            }
        }
        return Ok(0);
    }
    if count > 0 {
        buf.push_action(action);
        buf.set_modified();
        if let Some(idx) = last_changed {
            buf.cur_idx = idx;
            buf.current_mut().clamp();
            buf.sync_view();
        }
    }
    debug!(target: "search.subst", pattern = %opts.pat, count, "substitute");
    Ok(count)
}
