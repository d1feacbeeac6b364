//! Argument and range parsing for a confirmed prompt line.
//!
//! Grammar: the first space-delimited token is the command name; every
//! later token is `--name=value` (value may be double-quoted with `\"`
//! escapes), `--flag`, or a bare word. Bare words containing `*` expand as
//! globs against the working directory, one filename argument per match.

use crate::commands::{self, CommandId, CommandSpec};
use core_state::{Result, VedError};
use std::path::Path;
use tracing::trace;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arg {
    Opt { name: String, value: String },
    Flag(String),
    Filename(String),
}

#[derive(Debug, Clone)]
pub struct ParsedCommand {
    pub id: Option<CommandId>,
    pub name: String,
    pub args: Vec<Arg>,
}

impl ParsedCommand {
    pub fn opt(&self, name: &str) -> Option<&str> {
        self.args.iter().find_map(|a| match a {
            Arg::Opt { name: n, value } if n == name => Some(value.as_str()),
            _ => None,
        })
    }

    pub fn flag(&self, name: &str) -> bool {
        self.args
            .iter()
            .any(|a| matches!(a, Arg::Flag(n) if n == name))
    }

    pub fn filenames(&self) -> impl Iterator<Item = &str> {
        self.args.iter().filter_map(|a| match a {
            Arg::Filename(f) => Some(f.as_str()),
            _ => None,
        })
    }
}

/// Split the raw line into tokens, honoring double quotes after `=` with
/// `\"` escaping a quote inside.
fn tokenize(line: &str) -> Result<Vec<String>> {
    let mut tokens = Vec::new();
    let mut cur = String::new();
    let mut in_quote = false;
    let mut escaped = false;
    for c in line.chars() {
        if escaped {
            cur.push(c);
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_quote => escaped = true,
            '"' => in_quote = !in_quote,
            c if c.is_whitespace() && !in_quote => {
                if !cur.is_empty() {
                    tokens.push(std::mem::take(&mut cur));
                }
            }
            c => cur.push(c),
        }
    }
    if in_quote {
        return Err(VedError::UnterminatedQuote);
    }
    if !cur.is_empty() {
        tokens.push(cur);
    }
    Ok(tokens)
}

/// Very small glob: `*` matches any run, everything else is literal.
pub fn glob_match(pat: &str, name: &str) -> bool {
    fn inner(p: &[u8], n: &[u8]) -> bool {
        match (p.first(), n.first()) {
            (None, None) => true,
            (Some(b'*'), _) => {
                inner(&p[1..], n) || (!n.is_empty() && inner(p, &n[1..]))
            }
            (Some(pc), Some(nc)) if pc == nc => inner(&p[1..], &n[1..]),
            _ => false,
        }
    }
    inner(pat.as_bytes(), name.as_bytes())
}

fn expand_glob(cwd: &Path, pat: &str) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(cwd) else {
        return Vec::new();
    };
    let mut hits: Vec<String> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|name| glob_match(pat, name))
        .collect();
    hits.sort();
    hits
}

/// Parse a confirmed prompt line against the command table.
pub fn parse_command(line: &str, cwd: &Path) -> Result<ParsedCommand> {
    let tokens = tokenize(line)?;
    let mut it = tokens.into_iter();
    let name = it.next().unwrap_or_default();
    let spec: Option<&CommandSpec> = commands::lookup(&name);
    let mut args = Vec::new();
    for token in it {
        if token == "-" || token == "--" {
            return Err(VedError::ArgumentMissing);
        }
        if let Some(body) = token.strip_prefix("--") {
            match body.split_once('=') {
                Some((opt_name, value)) => {
                    if value.is_empty() {
                        return Err(VedError::AwaitingString);
                    }
                    validate_option(spec, opt_name, true)?;
                    args.push(Arg::Opt {
                        name: opt_name.to_string(),
                        value: value.to_string(),
                    });
                }
                None => {
                    validate_option(spec, body, false)?;
                    args.push(Arg::Flag(body.to_string()));
                }
            }
            continue;
        }
        if token.contains('*') {
            let hits = expand_glob(cwd, &token);
            if hits.is_empty() {
                args.push(Arg::Filename(token));
            } else {
                args.extend(hits.into_iter().map(Arg::Filename));
            }
            continue;
        }
        args.push(Arg::Filename(token));
    }
    trace!(target: "rline.parse", command = %name, args = args.len(), "parsed");
    Ok(ParsedCommand {
        id: spec.map(|s| s.id),
        name,
        args,
    })
}

fn validate_option(spec: Option<&CommandSpec>, name: &str, takes_value: bool) -> Result<()> {
    let Some(spec) = spec else {
        // unknown command: defer the error to dispatch, accept any option
        return Ok(());
    };
    let wanted_value = format!("--{name}=");
    let wanted_flag = format!("--{name}");
    let known = spec.args.iter().any(|a| {
        if takes_value {
            **a == wanted_value
        } else {
            **a == wanted_flag
        }
    });
    if known {
        Ok(())
    } else {
        Err(VedError::UnrecognizedOption(format!("--{name}")))
    }
}

/// Parse a `--range=` value into inclusive 0-based row indices.
///
/// Accepted forms: `%` (whole buffer), `.` (current line), `N`, `N,M` with
/// endpoints `.` (current) or `$` (last).
pub fn parse_range(s: &str, cur_idx: usize, num_lines: usize) -> Result<(usize, usize)> {
    let bad = || VedError::InvalidRange(s.to_string());
    if num_lines == 0 {
        return Err(bad());
    }
    let last = num_lines - 1;
    let endpoint = |tok: &str| -> Result<usize> {
        match tok {
            "." => Ok(cur_idx),
            "$" => Ok(last),
            n => {
                let v: usize = n.parse().map_err(|_| bad())?;
                if v == 0 || v > num_lines {
                    return Err(bad());
                }
                Ok(v - 1)
            }
        }
    };
    match s {
        "%" => Ok((0, last)),
        s if !s.contains(',') => {
            let a = endpoint(s)?;
            Ok((a, a))
        }
        s => {
            let (a, b) = s.split_once(',').ok_or_else(bad)?;
            let from = endpoint(a.trim())?;
            let to = endpoint(b.trim())?;
            if from > to {
                return Err(bad());
            }
            Ok((from, to))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn cwd() -> PathBuf {
        PathBuf::from("/nonexistent-for-glob")
    }

    #[test]
    fn parses_named_and_flag_args() {
        let p = parse_command(
            "substitute --pat=foo --sub=bar --global --range=2,4",
            &cwd(),
        )
        .unwrap();
        assert_eq!(p.id, Some(CommandId::Substitute));
        assert_eq!(p.opt("pat"), Some("foo"));
        assert_eq!(p.opt("sub"), Some("bar"));
        assert!(p.flag("global"));
        assert_eq!(p.opt("range"), Some("2,4"));
    }

    #[test]
    fn quoted_value_with_escape() {
        let p = parse_command(r#"substitute --pat="a \"b\" c" --sub=x"#, &cwd()).unwrap();
        assert_eq!(p.opt("pat"), Some(r#"a "b" c"#));
    }

    #[test]
    fn unterminated_quote_is_error() {
        assert!(matches!(
            parse_command(r#"substitute --pat="open"#, &cwd()),
            Err(VedError::UnterminatedQuote)
        ));
    }

    #[test]
    fn empty_value_awaits_string() {
        assert!(matches!(
            parse_command("write --fname=", &cwd()),
            Err(VedError::AwaitingString)
        ));
    }

    #[test]
    fn unknown_option_rejected() {
        assert!(matches!(
            parse_command("write --bogus", &cwd()),
            Err(VedError::UnrecognizedOption(_))
        ));
    }

    #[test]
    fn bare_dash_is_missing_argument() {
        assert!(matches!(
            parse_command("write -", &cwd()),
            Err(VedError::ArgumentMissing)
        ));
    }

    #[test]
    fn unknown_command_keeps_name() {
        let p = parse_command("frobnicate x", &cwd()).unwrap();
        assert_eq!(p.id, None);
        assert_eq!(p.name, "frobnicate");
        assert_eq!(p.filenames().collect::<Vec<_>>(), vec!["x"]);
    }

    #[test]
    fn glob_expands_matches() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.rs"), "").unwrap();
        std::fs::write(dir.path().join("b.rs"), "").unwrap();
        std::fs::write(dir.path().join("c.txt"), "").unwrap();
        let p = parse_command("edit *.rs", dir.path()).unwrap();
        assert_eq!(p.filenames().collect::<Vec<_>>(), vec!["a.rs", "b.rs"]);
    }

    #[test]
    fn glob_match_basics() {
        assert!(glob_match("*.rs", "main.rs"));
        assert!(!glob_match("*.rs", "main.rc"));
        assert!(glob_match("a*c", "abc"));
        assert!(glob_match("*", "anything"));
    }

    #[test]
    fn range_forms() {
        assert_eq!(parse_range("%", 3, 10).unwrap(), (0, 9));
        assert_eq!(parse_range(".", 3, 10).unwrap(), (3, 3));
        assert_eq!(parse_range("5", 0, 10).unwrap(), (4, 4));
        assert_eq!(parse_range("2,4", 0, 10).unwrap(), (1, 3));
        assert_eq!(parse_range(".,$", 3, 10).unwrap(), (3, 9));
        assert!(parse_range("0", 0, 10).is_err());
        assert!(parse_range("4,2", 0, 10).is_err());
        assert!(parse_range("11", 0, 10).is_err());
    }
}
