//! Display width arithmetic.
//!
//! One authoritative per-scalar width function plus the helpers the render
//! path and cursor placement share. Widths are 0 (combining/zero-width),
//! 1, or 2 (east-asian wide). Tabs are not widths at all: they expand to a
//! fixed `tabwidth` run of spaces at display time only, so every function
//! that can meet a tab takes the effective tab width.

use unicode_width::UnicodeWidthChar;

/// Terminal column width of one scalar. Control characters other than tab
/// render as a single replacement cell.
pub fn ch_width(ch: char) -> usize {
    if ch == '\t' {
        // caller expands tabs; a bare tab in width terms is one cell
        return 1;
    }
    if ch.is_control() {
        return 1;
    }
    UnicodeWidthChar::width(ch).unwrap_or(0)
}

/// Display columns covered by `line[from..to]` with tabs expanded.
/// Both offsets are clamped to codepoint boundaries.
pub fn visual_col(line: &str, from: usize, to: usize, tabwidth: usize) -> usize {
    let from = crate::floor_boundary(line, from);
    let to = crate::floor_boundary(line, to);
    if from >= to {
        return 0;
    }
    line[from..to]
        .chars()
        .map(|c| if c == '\t' { tabwidth.max(1) } else { ch_width(c) })
        .sum()
}

/// Expand every tab into `tabwidth` spaces. Display-only; buffer bytes keep
/// their tabs.
pub fn expand_tabs(line: &str, tabwidth: usize) -> String {
    if !line.contains('\t') {
        return line.to_string();
    }
    let tabwidth = tabwidth.max(1);
    let mut out = String::with_capacity(line.len() + tabwidth * 4);
    for c in line.chars() {
        if c == '\t' {
            for _ in 0..tabwidth {
                out.push(' ');
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Longest byte offset `end >= from` such that `line[from..end]` fits in
/// `cols` display columns. Never splits a codepoint; a wide glyph that would
/// straddle the edge is excluded.
pub fn fit_cols(line: &str, from: usize, cols: usize, tabwidth: usize) -> usize {
    let from = crate::floor_boundary(line, from);
    let mut used = 0usize;
    let mut end = from;
    for (i, c) in line[from..].char_indices() {
        let w = if c == '\t' { tabwidth.max(1) } else { ch_width(c) };
        if used + w > cols {
            break;
        }
        used += w;
        end = from + i + c.len_utf8();
    }
    end
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_widths() {
        assert_eq!(ch_width('a'), 1);
        assert_eq!(visual_col("abc", 0, 3, 8), 3);
    }

    #[test]
    fn wide_and_combining() {
        assert_eq!(ch_width('漢'), 2);
        assert_eq!(ch_width('\u{0301}'), 0); // combining acute
        assert_eq!(visual_col("e\u{0301}x", 0, "e\u{0301}x".len(), 8), 2);
    }

    #[test]
    fn tabs_expand_fixed() {
        assert_eq!(expand_tabs("a\tb", 4), "a    b");
        assert_eq!(visual_col("a\tb", 0, 3, 4), 6);
    }

    #[test]
    fn fit_cols_stops_before_wide_glyph() {
        let s = "a漢b";
        // 2 columns: 'a' fits, '漢' would need 2 more
        assert_eq!(fit_cols(s, 0, 2, 8), 1);
        assert_eq!(fit_cols(s, 0, 3, 8), 1 + "漢".len());
        assert_eq!(fit_cols(s, 0, 99, 8), s.len());
    }

    #[test]
    fn greek_prefix_width() {
        // spec scenario: two 2-byte codepoints before the cursor occupy 2 cells
        let s = "αβγ";
        assert_eq!(visual_col(s, 0, 4, 8), 2);
    }
}
