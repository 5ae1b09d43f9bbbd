//! Centralized path resolution for nemo.
//!
//! Everything lives under one data directory: the note database, the
//! reminder handle file and the background timer's log. Notes are scoped by a
//! storage key derived from the directory they were added in.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Resolve the data directory.
/// Checks `NEMO_HOME`, falls back to `$HOME/.nemo`.
pub fn data_dir() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os("NEMO_HOME").filter(|d| !d.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    let home = std::env::var_os("HOME")
        .filter(|h| !h.is_empty())
        .context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".nemo"))
}

pub fn db_path(data_dir: &Path) -> PathBuf {
    data_dir.join("nemo.db")
}

pub fn handle_path(data_dir: &Path) -> PathBuf {
    data_dir.join("reminder.pid")
}

pub fn timer_log_path(data_dir: &Path) -> PathBuf {
    data_dir.join("timer.log")
}

pub fn ensure_dir(dir: &Path) -> Result<()> {
    if !dir.exists() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create directory {}", dir.display()))?;
    }
    Ok(())
}

/// Storage key for the notes of `dir`: its canonical absolute path.
/// Distinct directories never share a key, and symlinked spellings of the
/// same directory always do.
pub fn dir_key(dir: &Path) -> Result<String> {
    let real = dir
        .canonicalize()
        .with_context(|| format!("failed to resolve directory {}", dir.display()))?;
    let key = real
        .to_str()
        .with_context(|| format!("directory {} is not valid UTF-8", real.display()))?;
    Ok(key.to_string())
}

/// Storage key for `dir_override`, or the current working directory.
pub fn current_key(dir_override: Option<&Path>) -> Result<String> {
    match dir_override {
        Some(dir) => dir_key(dir),
        None => {
            let cwd = std::env::current_dir().context("failed to read current directory")?;
            dir_key(&cwd)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn files_live_under_data_dir() {
        let dir = Path::new("/data");
        assert_eq!(db_path(dir), PathBuf::from("/data/nemo.db"));
        assert_eq!(handle_path(dir), PathBuf::from("/data/reminder.pid"));
        assert_eq!(timer_log_path(dir), PathBuf::from("/data/timer.log"));
    }

    #[test]
    fn key_is_canonical() {
        let tmp = tempfile::tempdir().unwrap();
        let sub = tmp.path().join("a");
        std::fs::create_dir(&sub).unwrap();
        let dotted = tmp.path().join("a").join("..").join("a");
        assert_eq!(dir_key(&sub).unwrap(), dir_key(&dotted).unwrap());
    }

    #[test]
    fn keys_do_not_collide_on_separators() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("a").join("b");
        let flat = tmp.path().join("a_b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::create_dir_all(&flat).unwrap();
        assert_ne!(dir_key(&nested).unwrap(), dir_key(&flat).unwrap());
    }

    #[test]
    fn missing_directory_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(dir_key(&tmp.path().join("gone")).is_err());
    }

    #[test]
    fn ensure_dir_creates_nested() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("x").join("y");
        ensure_dir(&nested).unwrap();
        assert!(nested.is_dir());
        ensure_dir(&nested).unwrap();
    }
}
