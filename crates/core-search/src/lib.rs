//! Incremental wrapped search and substitute over buffer rows.
//!
//! The pattern engine is the `regex` crate; patterns are compiled once per
//! search. A search walks rows in its direction, wrapping past the ends at
//! most one full revolution, and keeps a history of visited rows so an
//! incremental prompt can roll a failed step back. Matches are `(row,
//! byte_start, byte_len)` spans into the buffer — nothing borrows across
//! iterations.

use core_state::{Buffer, Result, VedError};
use regex::Regex;
use tracing::trace;

pub mod substitute;

pub use substitute::{SubstChoice, SubstOpts, SubstPreview, substitute};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// One search in progress (or its committed result).
#[derive(Debug)]
pub struct Search {
    pub pattern: String,
    pub dir: Direction,
    /// Row the next step starts from.
    pub row_idx: usize,
    /// Most recent hit.
    pub found: bool,
    pub match_row: usize,
    pub match_idx: usize,
    pub match_len: usize,
    /// Rows visited by prior steps, for incremental rollback.
    visited: Vec<usize>,
    compiled: Option<Regex>,
}

impl Search {
    pub fn new(dir: Direction, start_row: usize) -> Self {
        Self {
            pattern: String::new(),
            dir,
            row_idx: start_row,
            found: false,
            match_row: 0,
            match_idx: 0,
            match_len: 0,
            visited: Vec::new(),
            compiled: None,
        }
    }

    /// Swap in a (possibly partial) pattern; recompiles lazily on search.
    pub fn set_pattern(&mut self, pattern: &str) -> Result<()> {
        if self.pattern != pattern {
            self.pattern = pattern.to_string();
            self.compiled = None;
        }
        Ok(())
    }

    fn regex(&mut self) -> Result<&Regex> {
        if self.compiled.is_none() {
            let re = Regex::new(&self.pattern).map_err(|e| VedError::Pattern(e.to_string()))?;
            self.compiled = Some(re);
        }
        Ok(self.compiled.as_ref().unwrap())
    }

    /// Record the step origin so `rollback` can return to it.
    pub fn push_visited(&mut self) {
        self.visited.push(self.row_idx);
    }

    /// Undo the last step (incremental prompt backspace).
    pub fn rollback(&mut self) {
        if let Some(row) = self.visited.pop() {
            self.row_idx = row;
        }
    }

    /// Search from `row_idx` in the current direction, wrapping once around
    /// the buffer. On a hit, records the match and leaves `row_idx` there.
    pub fn step(&mut self, buf: &Buffer) -> Result<bool> {
        if self.pattern.is_empty() {
            self.found = false;
            return Ok(false);
        }
        self.regex()?;
        let re = self.compiled.as_ref().unwrap();
        let total = buf.num_rows();
        let mut row = self.row_idx.min(total - 1);
        for _ in 0..total {
            let line = buf.row(row).map(|r| r.bytes()).unwrap_or("");
            if let Some(m) = re.find(line) {
                self.found = true;
                self.match_row = row;
                self.match_idx = m.start();
                self.match_len = m.end() - m.start();
                self.row_idx = row;
                trace!(target: "search", row, idx = m.start(), len = self.match_len, "match");
                return Ok(true);
            }
            row = match self.dir {
                Direction::Forward => {
                    if row + 1 >= total {
                        0
                    } else {
                        row + 1
                    }
                }
                Direction::Backward => {
                    if row == 0 {
                        total - 1
                    } else {
                        row - 1
                    }
                }
            };
        }
        self.found = false;
        Ok(false)
    }

    /// Continue past the current match (`n`), or against the direction
    /// (`N`) when `reverse` is set.
    pub fn next(&mut self, buf: &Buffer, reverse: bool) -> Result<bool> {
        if !self.found {
            return self.step(buf);
        }
        let total = buf.num_rows();
        let effective = match (self.dir, reverse) {
            (Direction::Forward, false) | (Direction::Backward, true) => Direction::Forward,
            _ => Direction::Backward,
        };
        self.push_visited();
        self.row_idx = match effective {
            Direction::Forward => (self.match_row + 1) % total,
            Direction::Backward => {
                if self.match_row == 0 {
                    total - 1
                } else {
                    self.match_row - 1
                }
            }
        };
        let saved = self.dir;
        self.dir = effective;
        let hit = self.step(buf);
        self.dir = saved;
        hit
    }
}

/// Seed a search with the word under the cursor (`*` / `#`).
pub fn word_search(buf: &Buffer, dir: Direction) -> Option<Search> {
    let word = buf.word_under_cursor()?;
    let mut s = Search::new(dir, buf.cur_idx);
    s.pattern = regex::escape(&word);
    Some(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer() -> Buffer {
        Buffer::from_lines(["alpha", "beta", "gamma beta", "delta"])
    }

    #[test]
    fn forward_search_finds_first_hit() {
        let b = buffer();
        let mut s = Search::new(Direction::Forward, 0);
        s.set_pattern("beta").unwrap();
        assert!(s.step(&b).unwrap());
        assert_eq!((s.match_row, s.match_idx, s.match_len), (1, 0, 4));
    }

    #[test]
    fn forward_wraps_past_end() {
        let b = buffer();
        let mut s = Search::new(Direction::Forward, 3);
        s.set_pattern("alpha").unwrap();
        assert!(s.step(&b).unwrap());
        assert_eq!(s.match_row, 0);
    }

    #[test]
    fn backward_search_walks_up() {
        let b = buffer();
        let mut s = Search::new(Direction::Backward, 3);
        s.set_pattern("beta").unwrap();
        assert!(s.step(&b).unwrap());
        assert_eq!(s.match_row, 2);
    }

    #[test]
    fn repeated_next_returns_to_origin() {
        let b = buffer();
        let mut s = Search::new(Direction::Forward, 0);
        s.set_pattern("beta").unwrap();
        s.step(&b).unwrap();
        let origin = s.match_row;
        let mut seen = vec![origin];
        loop {
            s.next(&b, false).unwrap();
            if s.match_row == origin {
                break;
            }
            seen.push(s.match_row);
            assert!(seen.len() <= b.num_rows(), "n failed to wrap");
        }
        assert_eq!(seen, vec![1, 2]);
    }

    #[test]
    fn reverse_next_traverses_same_set_backwards() {
        let b = buffer();
        let mut s = Search::new(Direction::Forward, 0);
        s.set_pattern("beta").unwrap();
        s.step(&b).unwrap();
        assert_eq!(s.match_row, 1);
        s.next(&b, true).unwrap(); // N
        assert_eq!(s.match_row, 2); // wrapped backward
        s.next(&b, true).unwrap();
        assert_eq!(s.match_row, 1);
    }

    #[test]
    fn rollback_restores_step_origin() {
        let b = buffer();
        let mut s = Search::new(Direction::Forward, 0);
        s.set_pattern("beta").unwrap();
        s.step(&b).unwrap();
        s.next(&b, false).unwrap();
        assert_eq!(s.match_row, 2);
        s.rollback();
        assert_eq!(s.row_idx, 1);
    }

    #[test]
    fn invalid_pattern_reports_error() {
        let b = buffer();
        let mut s = Search::new(Direction::Forward, 0);
        s.set_pattern("[unclosed").unwrap();
        assert!(matches!(s.step(&b), Err(VedError::Pattern(_))));
    }

    #[test]
    fn word_search_escapes_metacharacters() {
        let mut b = Buffer::from_lines(["foo_bar baz"]);
        b.current_mut().cur_col_idx = 1;
        let s = word_search(&b, Direction::Forward).unwrap();
        assert_eq!(s.pattern, "foo_bar");
    }
}
