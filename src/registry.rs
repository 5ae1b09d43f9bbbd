//! Single-slot record of the most recently started reminder timer.
//!
//! The slot is a PID file. Starting a reminder overwrites it, the timer
//! clears it when it fires, and `cancel` signals the recorded process and
//! clears it whether or not the signal landed. Writers serialize on an
//! `flock` held on a sibling lock file.

use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, warn};

pub struct HandleRegistry {
    path: PathBuf,
}

/// What `cancel` found and did.
#[derive(Debug)]
pub enum CancelOutcome {
    NoActive,
    Terminated(u32),
    /// The recorded pid is gone or belongs to something other than a
    /// reminder timer. It was not signaled; the record was cleared.
    Stale(u32),
    /// The record was cleared but the process could not be signaled.
    SignalFailed { pid: u32, error: io::Error },
}

impl HandleRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Exclusive lock over the slot, released when the returned file drops.
    fn lock(&self) -> Result<File> {
        let lock_path = self.path.with_extension("pid.lock");
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .with_context(|| format!("failed to open {}", lock_path.display()))?;
        let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX) };
        if rc != 0 {
            return Err(io::Error::last_os_error())
                .with_context(|| format!("failed to lock {}", lock_path.display()));
        }
        Ok(file)
    }

    /// Record `pid` as the active reminder, replacing any previous record.
    pub fn save(&self, pid: u32) -> Result<()> {
        let _lock = self.lock()?;
        self.write_record(pid)
    }

    fn write_record(&self, pid: u32) -> Result<()> {
        let tmp = self.path.with_extension("pid.tmp");
        std::fs::write(&tmp, format!("{pid}"))
            .with_context(|| format!("failed to write {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("failed to write {}", self.path.display()))?;
        debug!("recorded reminder pid {pid} in {}", self.path.display());
        Ok(())
    }

    /// The recorded pid, if any. A record that does not hold a usable pid is
    /// treated as absent.
    pub fn read(&self) -> Result<Option<u32>> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("failed to read {}", self.path.display()))
            }
        };
        match parse_pid(&raw) {
            Some(pid) => Ok(Some(pid)),
            None => {
                warn!("ignoring invalid pid {:?} in {}", raw.trim(), self.path.display());
                Ok(None)
            }
        }
    }

    pub fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("failed to remove {}", self.path.display())),
        }
    }

    /// Clear the record only if it still names `pid`. Returns whether it did.
    pub fn clear_if(&self, pid: u32) -> Result<bool> {
        let _lock = self.lock()?;
        if self.read()? == Some(pid) {
            self.clear()?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Terminate the recorded reminder. The record is cleared in every case
    /// so a dead pid never lingers. A pid that no longer belongs to a
    /// reminder timer is not signaled.
    pub fn cancel(&self) -> Result<CancelOutcome> {
        let _lock = self.lock()?;
        let Some(pid) = self.read()? else {
            self.clear()?;
            return Ok(CancelOutcome::NoActive);
        };
        let outcome = if !is_reminder_timer(pid) {
            CancelOutcome::Stale(pid)
        } else {
            match terminate(pid) {
                Ok(()) => CancelOutcome::Terminated(pid),
                Err(error) => CancelOutcome::SignalFailed { pid, error },
            }
        };
        self.clear()?;
        Ok(outcome)
    }
}

fn parse_pid(raw: &str) -> Option<u32> {
    let pid: u32 = raw.trim().parse().ok()?;
    // 0 and negative pid_t values address process groups, never one process.
    (pid > 0 && pid <= i32::MAX as u32).then_some(pid)
}

/// Send SIGTERM to `pid`.
pub fn terminate(pid: u32) -> io::Result<()> {
    let ret = unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) };
    if ret == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

pub fn is_alive(pid: u32) -> bool {
    let ret = unsafe { libc::kill(pid as libc::pid_t, 0) };
    ret == 0 || (ret == -1 && io::Error::last_os_error().raw_os_error() == Some(libc::EPERM))
}

/// Whether `pid` is a running `nemo timer` process. A recycled pid that now
/// belongs to another program is not. Without `/proc` this falls back to a
/// liveness check.
pub fn is_reminder_timer(pid: u32) -> bool {
    match std::fs::read(format!("/proc/{pid}/cmdline")) {
        Ok(raw) => is_timer_cmdline(&raw),
        Err(_) if !Path::new("/proc/self").exists() => is_alive(pid),
        Err(_) => false,
    }
}

fn is_timer_cmdline(raw: &[u8]) -> bool {
    let args: Vec<&[u8]> = raw.split(|&b| b == 0).collect();
    args.windows(2).any(|w| w[0] == b"timer" && w[1] == b"--after-secs")
}
