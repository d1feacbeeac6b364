//! Filetype and syntax descriptors.
//!
//! A filetype carries the editing policy (tab/shift width, whether TAB
//! indents, the autoindent seam); a syntax descriptor carries keyword
//! colors, operator characters, comment markers, the balanced-pair string
//! and the `parse` callback that decorates one displayed line with SGR.
//! Rules beyond the small built-in registry are supplied by callers through
//! these typed seams.

use crate::Buffer;
use std::sync::Arc;

/// Indent prefix for a new line opened below `row_idx`.
pub type AutoindentFn = dyn Fn(&Buffer, usize) -> String + Send + Sync;
/// Decorate a display line (already truncated and tab-expanded).
pub type SynParseFn = dyn Fn(&Syntax, &str, usize) -> String + Send + Sync;

#[derive(Clone)]
pub struct Ftype {
    pub name: String,
    pub extnames: Vec<String>,
    pub tabwidth: usize,
    pub shiftwidth: usize,
    /// TAB in insert mode inserts a literal tab (else `shiftwidth` spaces).
    pub tab_indents: bool,
    /// Strip trailing blanks when a line is committed.
    pub clear_blanklines: bool,
    pub autoindent: Option<Arc<AutoindentFn>>,
}

impl Default for Ftype {
    fn default() -> Self {
        Self {
            name: "txt".into(),
            extnames: vec!["txt".into()],
            tabwidth: 8,
            shiftwidth: 2,
            tab_indents: false,
            clear_blanklines: true,
            autoindent: None,
        }
    }
}

impl std::fmt::Debug for Ftype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ftype")
            .field("name", &self.name)
            .field("tabwidth", &self.tabwidth)
            .field("shiftwidth", &self.shiftwidth)
            .field("tab_indents", &self.tab_indents)
            .finish_non_exhaustive()
    }
}

#[derive(Clone)]
pub struct Syntax {
    pub name: String,
    /// Keyword to SGR color number.
    pub keywords: Vec<(String, u8)>,
    pub operators: String,
    pub singleline_comment: Option<String>,
    pub multiline_comment: Option<(String, String)>,
    /// Openers/closers checked by `@balanced_check`, e.g. `"{}[]()"`.
    pub balanced_pairs: String,
    pub parse: Option<Arc<SynParseFn>>,
}

impl Default for Syntax {
    fn default() -> Self {
        Self {
            name: "txt".into(),
            keywords: Vec::new(),
            operators: String::new(),
            singleline_comment: None,
            multiline_comment: None,
            balanced_pairs: String::new(),
            parse: None,
        }
    }
}

impl std::fmt::Debug for Syntax {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Syntax")
            .field("name", &self.name)
            .field("keywords", &self.keywords.len())
            .finish_non_exhaustive()
    }
}

impl Syntax {
    /// Run the parse callback, or the default decorator when none is set.
    pub fn parse_line(&self, line: &str, row_idx: usize) -> String {
        match &self.parse {
            Some(f) => f(self, line, row_idx),
            None => default_parse(self, line, row_idx),
        }
    }
}

const COLOR_COMMENT: u8 = 36;
const COLOR_OPERATOR: u8 = 35;

/// Built-in decorator: singleline comments win the rest of the line,
/// keywords colorize on word boundaries, operators per character.
pub fn default_parse(syn: &Syntax, line: &str, _row_idx: usize) -> String {
    if syn.keywords.is_empty() && syn.operators.is_empty() && syn.singleline_comment.is_none() {
        return line.to_string();
    }
    let comment_at = syn
        .singleline_comment
        .as_deref()
        .and_then(|marker| line.find(marker));
    let (code, comment) = match comment_at {
        Some(i) => (&line[..i], Some(&line[i..])),
        None => (line, None),
    };
    let mut out = String::with_capacity(line.len() + 16);
    let mut rest = code;
    let mut prev_is_word = false;
    'outer: while !rest.is_empty() {
        if !prev_is_word {
            for (kw, color) in &syn.keywords {
                if rest.starts_with(kw.as_str()) {
                    let after = rest[kw.len()..].chars().next();
                    if after.is_none_or(|c| !core_text::word::is_word(c)) {
                        out.push_str(&format!("\x1b[{color}m{kw}\x1b[m"));
                        rest = &rest[kw.len()..];
                        prev_is_word = true;
                        continue 'outer;
                    }
                }
            }
        }
        let c = rest.chars().next().unwrap();
        if syn.operators.contains(c) {
            out.push_str(&format!("\x1b[{COLOR_OPERATOR}m{c}\x1b[m"));
        } else {
            out.push(c);
        }
        prev_is_word = core_text::word::is_word(c);
        rest = &rest[c.len_utf8()..];
    }
    if let Some(comment) = comment {
        out.push_str(&format!("\x1b[{COLOR_COMMENT}m{comment}\x1b[m"));
    }
    out
}

/// Check balanced pairs over an inclusive row range. Returns the first
/// offending `(row_idx, char)` — either an unmatched closer or, at end of
/// range, the deepest unclosed opener.
pub fn balanced_check<'a>(
    pairs: &str,
    lines: impl Iterator<Item = (usize, &'a str)>,
) -> Result<(), (usize, char)> {
    if pairs.is_empty() {
        return Ok(());
    }
    let chars: Vec<char> = pairs.chars().collect();
    let closer_of = |open: char| -> Option<char> {
        chars
            .iter()
            .position(|&c| c == open)
            .filter(|i| i % 2 == 0)
            .map(|i| chars[i + 1])
    };
    let is_closer = |c: char| chars.iter().position(|&x| x == c).is_some_and(|i| i % 2 == 1);
    let mut stack: Vec<(usize, char)> = Vec::new();
    for (idx, line) in lines {
        for c in line.chars() {
            if let Some(close) = closer_of(c) {
                stack.push((idx, close));
            } else if is_closer(c) {
                match stack.pop() {
                    Some((_, expect)) if expect == c => {}
                    _ => return Err((idx, c)),
                }
            }
        }
    }
    match stack.pop() {
        Some((idx, c)) => Err((idx, c)),
        None => Ok(()),
    }
}

/// Autoindent copying the previous row's leading blanks, deepening by one
/// shiftwidth after an opening brace.
pub fn brace_autoindent(buf: &Buffer, row_idx: usize) -> String {
    let Some(row) = buf.row(row_idx) else {
        return String::new();
    };
    let line = row.bytes();
    let blank_end = line
        .char_indices()
        .find(|(_, c)| *c != ' ' && *c != '\t')
        .map(|(i, _)| i)
        .unwrap_or(line.len());
    let mut indent = line[..blank_end].to_string();
    if line.trim_end().ends_with(['{', '(', '[']) {
        indent.push_str(&" ".repeat(buf.ftype.shiftwidth));
    }
    indent
}

/// The built-in filetype registry: plain text plus two demonstrations of
/// the callback seams.
pub fn builtin_registry() -> Vec<(Ftype, Syntax)> {
    let c_keywords = [
        "if", "else", "for", "while", "switch", "case", "return", "break", "continue", "struct",
        "typedef", "static", "const", "void", "int", "char", "unsigned", "long", "sizeof",
    ];
    let rust_keywords = [
        "fn", "let", "mut", "if", "else", "for", "while", "loop", "match", "return", "struct",
        "enum", "impl", "trait", "pub", "use", "mod", "const", "static",
    ];
    let kw = |words: &[&str], color: u8| -> Vec<(String, u8)> {
        words.iter().map(|w| (w.to_string(), color)).collect()
    };
    vec![
        (Ftype::default(), Syntax::default()),
        (
            Ftype {
                name: "c".into(),
                extnames: vec!["c".into(), "h".into()],
                tabwidth: 8,
                shiftwidth: 4,
                tab_indents: true,
                clear_blanklines: true,
                autoindent: Some(Arc::new(brace_autoindent)),
            },
            Syntax {
                name: "c".into(),
                keywords: kw(&c_keywords, 33),
                operators: "+-*/%=<>!&|^~".into(),
                singleline_comment: Some("//".into()),
                multiline_comment: Some(("/*".into(), "*/".into())),
                balanced_pairs: "{}[]()".into(),
                parse: None,
            },
        ),
        (
            Ftype {
                name: "rust".into(),
                extnames: vec!["rs".into()],
                tabwidth: 4,
                shiftwidth: 4,
                tab_indents: false,
                clear_blanklines: true,
                autoindent: Some(Arc::new(brace_autoindent)),
            },
            Syntax {
                name: "rust".into(),
                keywords: kw(&rust_keywords, 33),
                operators: "+-*/%=<>!&|^".into(),
                singleline_comment: Some("//".into()),
                multiline_comment: Some(("/*".into(), "*/".into())),
                balanced_pairs: "{}[]()".into(),
                parse: None,
            },
        ),
    ]
}

/// Pick a registry entry by file extension, falling back to plain text.
pub fn by_extname<'a>(registry: &'a [(Ftype, Syntax)], ext: Option<&str>) -> &'a (Ftype, Syntax) {
    ext.and_then(|e| {
        registry
            .iter()
            .find(|(f, _)| f.extnames.iter().any(|x| x == e))
    })
    .unwrap_or(&registry[0])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balanced_ok_and_unmatched_closer() {
        let lines = ["fn main() {", "  (a[1])", "}"];
        let it = lines.iter().enumerate().map(|(i, s)| (i, *s));
        assert!(balanced_check("{}[]()", it).is_ok());

        let bad = ["fn main() {", "  )"];
        let it = bad.iter().enumerate().map(|(i, s)| (i, *s));
        assert_eq!(balanced_check("{}[]()", it), Err((1, ')')));
    }

    #[test]
    fn balanced_unclosed_opener() {
        let bad = ["{ ("];
        let it = bad.iter().enumerate().map(|(i, s)| (i, *s));
        assert_eq!(balanced_check("{}[]()", it), Err((0, ')')));
    }

    #[test]
    fn default_parse_colors_comment_tail() {
        let syn = Syntax {
            singleline_comment: Some("//".into()),
            ..Syntax::default()
        };
        let out = syn.parse_line("x // note", 0);
        assert!(out.starts_with("x "));
        assert!(out.contains("\x1b[36m// note\x1b[m"));
    }

    #[test]
    fn default_parse_keyword_boundary() {
        let syn = Syntax {
            keywords: vec![("if".into(), 33)],
            ..Syntax::default()
        };
        assert!(syn.parse_line("if x", 0).contains("\x1b[33mif\x1b[m"));
        // "iffy" must not match
        assert_eq!(syn.parse_line("iffy", 0), "iffy");
    }

    #[test]
    fn brace_autoindent_deepens() {
        let b = Buffer::from_lines(["    if (x) {"]);
        assert_eq!(brace_autoindent(&b, 0).len(), 4 + b.ftype.shiftwidth);
        let b2 = Buffer::from_lines(["  plain"]);
        assert_eq!(brace_autoindent(&b2, 0), "  ");
    }

    #[test]
    fn registry_lookup_by_ext() {
        let reg = builtin_registry();
        assert_eq!(by_extname(&reg, Some("rs")).0.name, "rust");
        assert_eq!(by_extname(&reg, Some("zzz")).0.name, "txt");
        assert_eq!(by_extname(&reg, None).0.name, "txt");
    }
}
