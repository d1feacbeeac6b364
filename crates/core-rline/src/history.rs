//! Search and prompt-line history.
//!
//! Two bounded FIFOs, newest at the back. Persisted one entry per line in
//! `$data_dir/.ved_h_search` and `.ved_h_rline`, most recent last; the files
//! are rewritten whole at shutdown.

use std::collections::VecDeque;
use std::fs;
use std::io::Write;
use std::path::Path;
use tracing::debug;

pub const SEARCH_HISTORY_FILE: &str = ".ved_h_search";
pub const RLINE_HISTORY_FILE: &str = ".ved_h_rline";
pub const DEFAULT_MAX_HIST_ENTRIES: usize = 20;

#[derive(Debug)]
pub struct History {
    pub search: VecDeque<String>,
    pub rline: VecDeque<String>,
    pub max_entries: usize,
}

impl Default for History {
    fn default() -> Self {
        Self {
            search: VecDeque::new(),
            rline: VecDeque::new(),
            max_entries: DEFAULT_MAX_HIST_ENTRIES,
        }
    }
}

fn push_bounded(list: &mut VecDeque<String>, entry: String, max: usize) {
    if entry.is_empty() || list.back() == Some(&entry) {
        return;
    }
    if list.len() == max {
        list.pop_front();
    }
    list.push_back(entry);
}

impl History {
    pub fn push_search(&mut self, pattern: impl Into<String>) {
        push_bounded(&mut self.search, pattern.into(), self.max_entries);
    }

    pub fn push_rline(&mut self, line: impl Into<String>) {
        push_bounded(&mut self.rline, line.into(), self.max_entries);
    }

    /// Most recent search pattern (register `/`).
    pub fn last_search(&self) -> Option<&str> {
        self.search.back().map(String::as_str)
    }

    /// Most recent prompt line (register `:`).
    pub fn last_rline(&self) -> Option<&str> {
        self.rline.back().map(String::as_str)
    }

    /// The last whitespace-separated argument of the most recent command
    /// lines, newest first (the rline's last-arg cycling key).
    pub fn last_args(&self) -> Vec<String> {
        self.rline
            .iter()
            .rev()
            .filter_map(|l| l.split_whitespace().last())
            .map(String::from)
            .collect()
    }

    pub fn load(&mut self, data_dir: &Path) {
        for (file, list) in [
            (SEARCH_HISTORY_FILE, &mut self.search),
            (RLINE_HISTORY_FILE, &mut self.rline),
        ] {
            let path = data_dir.join(file);
            let Ok(text) = fs::read_to_string(&path) else {
                continue;
            };
            for line in text.lines().filter(|l| !l.is_empty()) {
                push_bounded(list, line.to_string(), self.max_entries);
            }
            debug!(target: "rline.hist", file = %path.display(), entries = list.len(), "history loaded");
        }
    }

    /// Rewrite both files whole (truncate-and-write), most recent last.
    pub fn flush(&self, data_dir: &Path) -> std::io::Result<()> {
        fs::create_dir_all(data_dir)?;
        for (file, list) in [
            (SEARCH_HISTORY_FILE, &self.search),
            (RLINE_HISTORY_FILE, &self.rline),
        ] {
            let mut f = fs::File::create(data_dir.join(file))?;
            for entry in list {
                writeln!(f, "{entry}")?;
            }
            f.flush()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounded_and_deduped() {
        let mut h = History {
            max_entries: 3,
            ..History::default()
        };
        h.push_search("a");
        h.push_search("a"); // consecutive duplicate dropped
        h.push_search("b");
        h.push_search("c");
        h.push_search("d");
        assert_eq!(h.search.len(), 3);
        assert_eq!(h.last_search(), Some("d"));
        assert_eq!(h.search.front().map(String::as_str), Some("b"));
    }

    #[test]
    fn flush_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let mut h = History::default();
        h.push_search("pat1");
        h.push_rline("write --fname=/tmp/x");
        h.flush(dir.path()).unwrap();

        let mut h2 = History::default();
        h2.load(dir.path());
        assert_eq!(h2.last_search(), Some("pat1"));
        assert_eq!(h2.last_rline(), Some("write --fname=/tmp/x"));
    }

    #[test]
    fn last_args_newest_first() {
        let mut h = History::default();
        h.push_rline("edit a.txt");
        h.push_rline("write b.txt");
        assert_eq!(h.last_args(), vec!["b.txt".to_string(), "a.txt".to_string()]);
    }
}
