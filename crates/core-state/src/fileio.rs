//! Whole-file read/write with the buffer's filesystem policy.
//!
//! Reads reject directories and binaries; a missing file yields an empty
//! buffer without `FILE_EXISTS`, and the first successful write turns
//! `FILE_EXISTS | FILE_IS_WRITABLE` on. Writes always emit a trailing
//! newline, honor append/range/write-as, refuse read-only or stale-on-disk
//! targets without `force`, and copy the previous on-disk content to the
//! backup file when one is configured. Every open descriptor is scoped to
//! the operation that opened it.

use crate::{Buffer, BufferFlags, Result, Row, VedError};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, warn};

/// On-disk snapshot taken at load/save time for staleness checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    pub mtime: SystemTime,
    pub size: u64,
    pub readonly: bool,
}

impl FileStat {
    pub fn of(path: &Path) -> Option<Self> {
        let md = fs::metadata(path).ok()?;
        Some(Self {
            mtime: md.modified().ok()?,
            size: md.len(),
            readonly: md.permissions().readonly(),
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct WriteOpts {
    pub force: bool,
    pub append: bool,
    /// Inclusive 0-based row range; `None` writes the whole buffer.
    pub range: Option<(usize, usize)>,
    /// Write-as target; `None` uses the buffer's own filename.
    pub fname: Option<PathBuf>,
}

/// Longest backup suffix accepted by `set --backup-suffix=`.
pub const MAX_BACKUP_SUFFIX: usize = 7;

fn looks_binary(bytes: &[u8]) -> bool {
    bytes.starts_with(b"\x7fELF") || bytes.iter().take(4096).any(|&b| b == 0)
}

impl Buffer {
    fn absolute(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.cwd.join(path)
        }
    }

    /// Load `path` into this buffer, replacing its rows. A missing file is
    /// not an error: the buffer starts empty and `FILE_EXISTS` stays off.
    pub fn load_from_path(&mut self, path: &Path) -> Result<()> {
        let abs = self.absolute(path);
        if abs.is_dir() {
            return Err(VedError::IsDirectory(abs));
        }
        match fs::read(&abs) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                self.rows = vec![Row::new("")];
                self.cur_idx = 0;
                self.fname = Some(abs);
                self.flags.remove(BufferFlags::FILE_EXISTS);
                self.flags.insert(BufferFlags::FILE_IS_WRITABLE);
                self.stat = None;
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                Err(VedError::Unreadable(abs))
            }
            Err(e) => Err(e.into()),
            Ok(bytes) => {
                if looks_binary(&bytes) {
                    return Err(VedError::BinaryFile(abs));
                }
                let text = String::from_utf8_lossy(&bytes);
                let mut rows: Vec<Row> = text.split('\n').map(Row::new).collect();
                if text.ends_with('\n') {
                    rows.pop();
                }
                if rows.is_empty() {
                    rows.push(Row::new(""));
                }
                self.rows = rows;
                self.cur_idx = 0;
                self.video_first_row_idx = 0;
                let stat = FileStat::of(&abs);
                self.flags.insert(BufferFlags::FILE_EXISTS);
                if stat.map(|s| s.readonly).unwrap_or(false) {
                    self.flags.insert(BufferFlags::FILE_IS_RDONLY);
                    self.flags.remove(BufferFlags::FILE_IS_WRITABLE);
                } else {
                    self.flags.insert(BufferFlags::FILE_IS_WRITABLE);
                }
                self.flags.remove(BufferFlags::BUF_IS_MODIFIED);
                self.stat = stat;
                debug!(target: "state.io", fname = %abs.display(), rows = self.rows.len(), "file loaded");
                self.fname = Some(abs);
                Ok(())
            }
        }
    }

    /// Fresh buffer loaded from `path`.
    pub fn from_file(path: &Path) -> Result<Self> {
        let mut b = Self::new();
        b.load_from_path(path)?;
        Ok(b)
    }

    /// Staleness check against the stat snapshot.
    pub fn check_on_disk(&self) -> Result<()> {
        let Some(fname) = &self.fname else {
            return Ok(());
        };
        let Some(recorded) = self.stat else {
            return Ok(());
        };
        match FileStat::of(fname) {
            None => Err(VedError::RemovedOnDisk(fname.clone())),
            Some(now) if now.mtime != recorded.mtime => Err(VedError::StaleOnDisk(fname.clone())),
            Some(_) => Ok(()),
        }
    }

    /// Save the buffer (or a range of it). Returns `(lines, bytes)` written.
    pub fn write_file(&mut self, opts: &WriteOpts) -> Result<(usize, usize)> {
        let write_as = opts.fname.as_ref().map(|p| self.absolute(p));
        let target = match write_as.clone().or_else(|| self.fname.clone()) {
            Some(p) => p,
            None => return Err(VedError::BufferUnnamed),
        };
        let own_file = write_as.is_none() || Some(&target) == self.fname.as_ref();
        if !opts.force {
            if self.flags.contains(BufferFlags::BUF_IS_RDONLY)
                || (own_file && self.flags.contains(BufferFlags::FILE_IS_RDONLY))
            {
                return Err(VedError::BufferReadOnly);
            }
            if own_file
                && opts.range.is_none()
                && !opts.append
                && self.flags.contains(BufferFlags::FILE_EXISTS)
                && !self.is_modified()
            {
                return Err(VedError::BufferUnmodified);
            }
            if own_file {
                self.check_on_disk()?;
            }
        }
        let (from, to) = match opts.range {
            Some((a, b)) => {
                let last = self.rows.len().saturating_sub(1);
                if a > b || b > last {
                    return Err(VedError::OutOfRange {
                        idx: b,
                        len: self.rows.len(),
                    });
                }
                (a, b)
            }
            None => (0, self.rows.len() - 1),
        };
        let mut content = String::new();
        for row in &self.rows[from..=to] {
            content.push_str(row.bytes());
            content.push('\n');
        }

        if own_file
            && let Some(backup) = self.backupfile.clone()
            && target.exists()
            && fs::copy(&target, &backup).is_err()
        {
            warn!(target: "state.io", backup = %backup.display(), "backup copy failed");
        }

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create(true)
            .append(opts.append)
            .truncate(!opts.append)
            .open(&target)
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::PermissionDenied => VedError::Unwritable(target.clone()),
                _ => VedError::Io(e),
            })?;
        file.write_all(content.as_bytes())?;
        file.flush()?;
        drop(file);

        if own_file {
            self.flags
                .insert(BufferFlags::FILE_EXISTS | BufferFlags::FILE_IS_WRITABLE);
            if opts.range.is_none() && !opts.append {
                self.flags.remove(BufferFlags::BUF_IS_MODIFIED);
            }
            self.stat = FileStat::of(&target);
            self.note_saved();
        }
        debug!(target: "state.io", fname = %target.display(), lines = to - from + 1, bytes = content.len(), "file written");
        Ok((to - from + 1, content.len()))
    }

    /// Configure the backup path `<dir>/.<basename><suffix>` next to the
    /// buffer's file. The suffix is bounded to [`MAX_BACKUP_SUFFIX`] bytes.
    pub fn set_backupfile(&mut self, suffix: &str) -> Result<()> {
        let Some(fname) = &self.fname else {
            return Err(VedError::BufferUnnamed);
        };
        let mut suffix = suffix.to_string();
        suffix.truncate(MAX_BACKUP_SUFFIX);
        if suffix.is_empty() {
            suffix.push('~');
        }
        let dir = fname.parent().unwrap_or(Path::new("/"));
        let base = self.basename();
        self.backupfile = Some(dir.join(format!(".{base}{suffix}")));
        Ok(())
    }

    pub fn note_saved(&mut self) {
        self.last_saved = SystemTime::now();
    }

    /// Whether the autosave interval has elapsed since the last save.
    pub fn autosave_due(&self) -> bool {
        if self.autosave == 0 || !self.is_modified() {
            return false;
        }
        self.last_saved
            .elapsed()
            .map(|e| e.as_secs() >= self.autosave)
            .unwrap_or(false)
    }
}

/// Read a file into lines for `:read` insertion.
pub fn read_lines_of(path: &Path) -> Result<Vec<String>> {
    if path.is_dir() {
        return Err(VedError::IsDirectory(path.to_path_buf()));
    }
    let bytes = fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => VedError::FileMissing(path.to_path_buf()),
        std::io::ErrorKind::PermissionDenied => VedError::Unreadable(path.to_path_buf()),
        _ => VedError::Io(e),
    })?;
    if looks_binary(&bytes) {
        return Err(VedError::BinaryFile(path.to_path_buf()));
    }
    let text = String::from_utf8_lossy(&bytes);
    let mut lines: Vec<String> = text.split('\n').map(String::from).collect();
    if text.ends_with('\n') {
        lines.pop();
    }
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_creates_empty_buffer_then_write_flips_flags() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nofile");
        let mut b = Buffer::new();
        b.load_from_path(&path).unwrap();
        assert!(!b.flags.contains(BufferFlags::FILE_EXISTS));
        assert_eq!(b.num_rows(), 1);

        b.row_mut(0).unwrap().replace("created");
        b.set_modified();
        b.write_file(&WriteOpts::default()).unwrap();
        assert!(b.flags.contains(BufferFlags::FILE_EXISTS));
        assert!(b.flags.contains(BufferFlags::FILE_IS_WRITABLE));
        assert_eq!(fs::read_to_string(&path).unwrap(), "created\n");
    }

    #[test]
    fn write_then_read_round_trips_modulo_final_newline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.txt");
        let mut b = Buffer::from_lines(["one", "two", "three"]);
        b.fname = Some(path.clone());
        b.set_modified();
        b.write_file(&WriteOpts::default()).unwrap();

        let b2 = Buffer::from_file(&path).unwrap();
        assert_eq!(
            b2.lines().collect::<Vec<_>>(),
            vec!["one", "two", "three"]
        );
    }

    #[test]
    fn unmodified_write_refused_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.txt");
        fs::write(&path, "x\n").unwrap();
        let mut b = Buffer::from_file(&path).unwrap();
        assert!(matches!(
            b.write_file(&WriteOpts::default()),
            Err(VedError::BufferUnmodified)
        ));
        let opts = WriteOpts {
            force: true,
            ..WriteOpts::default()
        };
        b.write_file(&opts).unwrap();
    }

    #[test]
    fn range_write_emits_only_selected_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("part.txt");
        let mut b = Buffer::from_lines(["a", "b", "c", "d"]);
        b.fname = Some(dir.path().join("orig.txt"));
        b.set_modified();
        let opts = WriteOpts {
            range: Some((1, 2)),
            fname: Some(path.clone()),
            ..WriteOpts::default()
        };
        b.write_file(&opts).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "b\nc\n");
        // write-as keeps the buffer modified
        assert!(b.is_modified());
    }

    #[test]
    fn stale_on_disk_detected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.txt");
        fs::write(&path, "x\n").unwrap();
        let mut b = Buffer::from_file(&path).unwrap();
        // simulate an external writer with a different mtime
        let newer = FileStat {
            mtime: SystemTime::UNIX_EPOCH,
            ..b.stat.unwrap()
        };
        b.stat = Some(newer);
        b.set_modified();
        assert!(matches!(
            b.write_file(&WriteOpts::default()),
            Err(VedError::StaleOnDisk(_))
        ));
        let opts = WriteOpts {
            force: true,
            ..WriteOpts::default()
        };
        b.write_file(&opts).unwrap();
    }

    #[test]
    fn backup_copies_previous_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.txt");
        fs::write(&path, "old\n").unwrap();
        let mut b = Buffer::from_file(&path).unwrap();
        b.set_backupfile("~").unwrap();
        b.row_mut(0).unwrap().replace("new");
        b.set_modified();
        b.write_file(&WriteOpts::default()).unwrap();
        let backup = dir.path().join(".f.txt~");
        assert_eq!(fs::read_to_string(&backup).unwrap(), "old\n");
        assert_eq!(fs::read_to_string(&path).unwrap(), "new\n");
    }

    #[test]
    fn directory_read_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut b = Buffer::new();
        assert!(matches!(
            b.load_from_path(dir.path()),
            Err(VedError::IsDirectory(_))
        ));
    }

    #[test]
    fn binary_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bin");
        fs::write(&path, b"\x7fELFxxxx").unwrap();
        let mut b = Buffer::new();
        assert!(matches!(
            b.load_from_path(&path),
            Err(VedError::BinaryFile(_))
        ));
    }
}
