//! Tab-completion token classification and filename candidates.

use crate::commands;
use std::path::Path;

/// What the token under completion is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    /// First token: complete command names.
    Command { prefix: String },
    /// `--name=prefix`: complete the value (filenames or buffer names).
    OptionValue { name: String, prefix: String },
    /// `-pre` / `--pre`: complete the command's declared options.
    Option { prefix: String },
    /// Bare word after a known command.
    Filename { prefix: String },
    /// Bare word where the command cycles buffers.
    Bufname { prefix: String },
}

/// Classify the token being completed (the trailing token of `line`).
pub fn classify(line: &str) -> TokenKind {
    let token_start = line.rfind(char::is_whitespace).map(|i| i + 1).unwrap_or(0);
    let token = &line[token_start..];
    if token_start == 0 {
        return TokenKind::Command {
            prefix: token.to_string(),
        };
    }
    if let Some(body) = token.strip_prefix("--")
        && let Some((name, value)) = body.split_once('=')
    {
        return TokenKind::OptionValue {
            name: name.to_string(),
            prefix: value.to_string(),
        };
    }
    if token.starts_with('-') {
        return TokenKind::Option {
            prefix: token.trim_start_matches('-').to_string(),
        };
    }
    let command = line.split_whitespace().next().unwrap_or("");
    let bufname = commands::lookup(command).map(|s| s.takes_bufname).unwrap_or(false);
    if bufname {
        TokenKind::Bufname {
            prefix: token.to_string(),
        }
    } else {
        TokenKind::Filename {
            prefix: token.to_string(),
        }
    }
}

/// Filename candidates for `prefix`, resolved against `cwd`. A prefix with
/// directory components lists inside that directory; directories come back
/// with a trailing `/` so completion can descend.
pub fn complete_filenames(cwd: &Path, prefix: &str) -> Vec<String> {
    let (dir_part, name_part) = match prefix.rfind('/') {
        Some(i) => (&prefix[..=i], &prefix[i + 1..]),
        None => ("", prefix),
    };
    let dir = if dir_part.is_empty() {
        cwd.to_path_buf()
    } else if dir_part.starts_with('/') {
        Path::new(dir_part).to_path_buf()
    } else {
        cwd.join(dir_part)
    };
    let Ok(entries) = std::fs::read_dir(&dir) else {
        return Vec::new();
    };
    let mut out: Vec<String> = entries
        .filter_map(|e| e.ok())
        .filter_map(|e| {
            let name = e.file_name().to_string_lossy().into_owned();
            if !name.starts_with(name_part) {
                return None;
            }
            let is_dir = e.file_type().map(|t| t.is_dir()).unwrap_or(false);
            Some(format!(
                "{dir_part}{name}{}",
                if is_dir { "/" } else { "" }
            ))
        })
        .collect();
    out.sort();
    out
}

/// Candidates matching `prefix` from an arbitrary name list.
pub fn filter_names(names: &[String], prefix: &str) -> Vec<String> {
    names
        .iter()
        .filter(|n| n.starts_with(prefix))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_token_is_command() {
        assert_eq!(
            classify("wri"),
            TokenKind::Command {
                prefix: "wri".into()
            }
        );
    }

    #[test]
    fn option_value_and_flag_tokens() {
        assert_eq!(
            classify("write --fname=/tm"),
            TokenKind::OptionValue {
                name: "fname".into(),
                prefix: "/tm".into()
            }
        );
        assert_eq!(
            classify("write --ap"),
            TokenKind::Option {
                prefix: "ap".into()
            }
        );
    }

    #[test]
    fn bare_word_kind_follows_command() {
        assert_eq!(
            classify("edit src"),
            TokenKind::Filename {
                prefix: "src".into()
            }
        );
        assert_eq!(
            classify("buffer mybuf"),
            TokenKind::Bufname {
                prefix: "mybuf".into()
            }
        );
    }

    #[test]
    fn filename_candidates_mark_directories() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("file.txt"), "").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        let c = complete_filenames(dir.path(), "");
        assert!(c.contains(&"file.txt".to_string()));
        assert!(c.contains(&"sub/".to_string()));
        let c = complete_filenames(dir.path(), "fi");
        assert_eq!(c, vec!["file.txt".to_string()]);
    }

    #[test]
    fn filename_candidates_descend_directories() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub/inner.rs"), "").unwrap();
        let c = complete_filenames(dir.path(), "sub/");
        assert_eq!(c, vec!["sub/inner.rs".to_string()]);
    }
}
