//! Settings and directory resolution.
//!
//! Directories come from `LIBVED_DIR` / `LIBVED_TMPDIR` / `LIBVED_DATADIR`
//! with `$HOME/.ved` as the fallback base. An optional `ved.toml` in the
//! base directory supplies overrides; unknown fields are ignored so the
//! file can grow without breaking older binaries.

use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use tracing::{debug, info};

pub const DEFAULT_MAX_UNDO_ENTRIES: usize = 40;
pub const DEFAULT_MAX_HIST_ENTRIES: usize = 20;
pub const DEFAULT_BACKUP_SUFFIX: &str = "~";

/// Effective runtime settings after merging defaults, config file, and any
/// caller overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub max_num_undo_entries: usize,
    pub max_num_hist_entries: usize,
    /// Autosave period in seconds; 0 disables.
    pub autosave: u64,
    pub backup_suffix: String,
    pub tabwidth: Option<usize>,
    pub shiftwidth: Option<usize>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_num_undo_entries: DEFAULT_MAX_UNDO_ENTRIES,
            max_num_hist_entries: DEFAULT_MAX_HIST_ENTRIES,
            autosave: 0,
            backup_suffix: DEFAULT_BACKUP_SUFFIX.to_string(),
            tabwidth: None,
            shiftwidth: None,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
struct SettingsFile {
    #[serde(default)]
    max_num_undo_entries: Option<usize>,
    #[serde(default)]
    max_num_hist_entries: Option<usize>,
    #[serde(default)]
    autosave: Option<u64>,
    #[serde(default)]
    backup_suffix: Option<String>,
    #[serde(default)]
    tabwidth: Option<usize>,
    #[serde(default)]
    shiftwidth: Option<usize>,
}

/// Resolved filesystem locations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VedDirs {
    pub base_dir: PathBuf,
    pub data_dir: PathBuf,
    pub tmp_dir: PathBuf,
}

impl VedDirs {
    /// Resolve from the environment. Never fails: the fallbacks bottom out
    /// at the system temp directory.
    pub fn resolve() -> Self {
        let home = env::var_os("HOME").map(PathBuf::from);
        let base_dir = env::var_os("LIBVED_DIR")
            .map(PathBuf::from)
            .or_else(|| home.map(|h| h.join(".ved")))
            .unwrap_or_else(env::temp_dir);
        let data_dir = env::var_os("LIBVED_DATADIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| base_dir.clone());
        let tmp_dir = env::var_os("LIBVED_TMPDIR")
            .map(PathBuf::from)
            .unwrap_or_else(env::temp_dir);
        debug!(target: "config", base = %base_dir.display(), data = %data_dir.display(), "dirs resolved");
        Self {
            base_dir,
            data_dir,
            tmp_dir,
        }
    }

    /// Create the base/data directories if absent.
    pub fn ensure(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.base_dir)?;
        std::fs::create_dir_all(&self.data_dir)?;
        Ok(())
    }
}

impl Settings {
    /// Load `ved.toml` from the base directory; missing file or bad TOML
    /// fall back to the defaults (a parse failure is logged, not fatal).
    pub fn load(dirs: &VedDirs) -> Self {
        let path = dirs.base_dir.join("ved.toml");
        let mut out = Self::default();
        let Ok(text) = std::fs::read_to_string(&path) else {
            return out;
        };
        let parsed: SettingsFile = match toml::from_str(&text) {
            Ok(p) => p,
            Err(e) => {
                info!(target: "config", file = %path.display(), error = %e, "config parse failed; using defaults");
                return out;
            }
        };
        if let Some(v) = parsed.max_num_undo_entries {
            out.max_num_undo_entries = v.max(1);
        }
        if let Some(v) = parsed.max_num_hist_entries {
            out.max_num_hist_entries = v.max(1);
        }
        if let Some(v) = parsed.autosave {
            out.autosave = v;
        }
        if let Some(mut v) = parsed.backup_suffix {
            v.truncate(7);
            if !v.is_empty() {
                out.backup_suffix = v;
            }
        }
        out.tabwidth = parsed.tabwidth;
        out.shiftwidth = parsed.shiftwidth;
        info!(target: "config", file = %path.display(), "config loaded");
        out
    }
}
