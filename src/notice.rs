//! Delivery of reminder notices to the user's terminal.
//!
//! A detached timer has no usable stdout, so the scheduling invocation looks
//! up the terminal device it was started from and hands the path to the
//! timer, which opens it fresh for every notice. Delivery is best effort:
//! if the terminal is gone the notice is dropped.

use std::ffi::CStr;
use std::fs::OpenOptions;
use std::io::Write;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use log::{debug, info};

pub trait Notifier {
    fn notify(&mut self, text: &str);
}

/// Writes notices to a terminal device (or any writable path).
pub struct TerminalNotifier {
    path: Option<PathBuf>,
}

impl TerminalNotifier {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    fn write_to(path: &Path, text: &str) -> std::io::Result<()> {
        // O_NOCTTY: a session leader must not adopt the user's terminal.
        let mut f = OpenOptions::new()
            .append(true)
            .custom_flags(libc::O_NOCTTY)
            .open(path)?;
        f.write_all(format!("\n{text}\n").as_bytes())?;
        f.flush()
    }
}

impl Notifier for TerminalNotifier {
    fn notify(&mut self, text: &str) {
        let Some(path) = &self.path else {
            debug!("no terminal; dropped notice: {text}");
            return;
        };
        match Self::write_to(path, text) {
            Ok(()) => info!("delivered notice to {}", path.display()),
            Err(e) => debug!("dropped notice for {}: {e}", path.display()),
        }
    }
}

/// Path of the terminal attached to stdin, stdout or stderr, whichever is
/// found first.
pub fn controlling_tty() -> Option<PathBuf> {
    [libc::STDIN_FILENO, libc::STDOUT_FILENO, libc::STDERR_FILENO]
        .into_iter()
        .find_map(tty_path)
}

fn tty_path(fd: libc::c_int) -> Option<PathBuf> {
    unsafe {
        if libc::isatty(fd) != 1 {
            return None;
        }
        let name = libc::ttyname(fd);
        if name.is_null() {
            return None;
        }
        let bytes = CStr::from_ptr(name).to_bytes();
        Some(PathBuf::from(std::ffi::OsStr::from_bytes(bytes)))
    }
}

#[cfg(test)]
pub(crate) struct RecordingNotifier {
    pub notices: Vec<String>,
}

#[cfg(test)]
impl Notifier for RecordingNotifier {
    fn notify(&mut self, text: &str) {
        self.notices.push(text.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_to_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tty");
        std::fs::write(&path, "").unwrap();
        let mut n = TerminalNotifier::new(Some(path.clone()));
        n.notify("first");
        n.notify("second");
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "\nfirst\n\nsecond\n"
        );
    }

    #[test]
    fn missing_channel_drops_silently() {
        let dir = tempfile::tempdir().unwrap();
        let mut n = TerminalNotifier::new(Some(dir.path().join("no").join("such")));
        n.notify("lost");
        let mut none = TerminalNotifier::new(None);
        none.notify("lost");
    }
}
