//! The error taxonomy surfaced on the message line.
//!
//! Nothing here aborts the editor: every variant renders as a red banner (or
//! an appended `[messages]` entry) and the main loop continues.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VedError {
    // filesystem
    #[error("{}: no such file or directory", .0.display())]
    FileMissing(PathBuf),
    #[error("{}: is a directory", .0.display())]
    IsDirectory(PathBuf),
    #[error("{}: is not readable", .0.display())]
    Unreadable(PathBuf),
    #[error("{}: is not writable", .0.display())]
    Unwritable(PathBuf),
    #[error("{}: looks like a binary file", .0.display())]
    BinaryFile(PathBuf),
    #[error("{}: is already loaded in another buffer", .0.display())]
    AlreadyLoaded(PathBuf),
    #[error("{}: has been removed from the filesystem", .0.display())]
    RemovedOnDisk(PathBuf),
    #[error("{}: has been modified on disk since last operation", .0.display())]
    StaleOnDisk(PathBuf),
    #[error("i/o: {0}")]
    Io(#[from] std::io::Error),

    // buffer policy
    #[error("buffer is read only")]
    BufferReadOnly,
    #[error("buffer has not been modified")]
    BufferUnmodified,
    #[error("buffer has unsaved modifications")]
    BufferModified,
    #[error("buffer has no filename")]
    BufferUnnamed,

    // pattern / regex
    #[error("pattern: {0}")]
    Pattern(String),
    #[error("pattern not found: {0}")]
    NoMatch(String),

    // rline parsing
    #[error("argument missing after '-'")]
    ArgumentMissing,
    #[error("unterminated quoted string")]
    UnterminatedQuote,
    #[error("awaiting a string after '='")]
    AwaitingString,
    #[error("unrecognized option: {0}")]
    UnrecognizedOption(String),
    #[error("invalid range: {0}")]
    InvalidRange(String),

    // generic
    #[error("index {idx} out of range (0..{len})")]
    OutOfRange { idx: usize, len: usize },
    #[error("integer overflow")]
    Overflow,
}

pub type Result<T> = std::result::Result<T, VedError>;
