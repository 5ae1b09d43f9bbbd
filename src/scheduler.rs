//! Detached reminder timers.
//!
//! `Launcher::schedule` starts a copy of the `nemo` binary in timer mode,
//! records its pid in the handle registry and returns immediately. The timer
//! process detaches from the invoking session (`setsid`, stdio to
//! `/dev/null`), sleeps through its timeline, writes notices to the terminal
//! it was scheduled from and clears its own handle when it fires.

use std::io;
use std::os::unix::io::AsRawFd;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use log::{info, warn};

use crate::notice::{Notifier, TerminalNotifier};
use crate::output;
use crate::registry::{self, HandleRegistry};
use crate::validate::validate_message;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderRequest {
    pub message: String,
    pub fire_after: Duration,
    /// Cadence of "time left" notices. Only meaningful when shorter than
    /// `fire_after`.
    pub notice_interval: Option<Duration>,
}

impl ReminderRequest {
    pub fn new(
        message: impl Into<String>,
        fire_after: Duration,
        notice_interval: Option<Duration>,
    ) -> Result<Self> {
        let message = message.into();
        validate_message(&message)?;
        if fire_after.is_zero() {
            bail!("reminder delay must be greater than zero");
        }
        Ok(Self {
            message,
            fire_after,
            notice_interval: notice_interval.filter(|d| !d.is_zero()),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    Interim { remaining: Duration },
    Fire,
}

/// One sleep followed by one notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub sleep: Duration,
    pub tick: Tick,
}

/// Plan the sleeps and notices of a reminder. Interim notices repeat every
/// `notice_interval` while more than one interval remains; the last step is
/// always the fire.
pub fn timeline(fire_after: Duration, notice_interval: Option<Duration>) -> Vec<Step> {
    let mut steps = Vec::new();
    let mut remaining = fire_after;
    if let Some(every) = notice_interval.filter(|d| !d.is_zero()) {
        while remaining > every {
            remaining -= every;
            steps.push(Step {
                sleep: every,
                tick: Tick::Interim { remaining },
            });
        }
    }
    steps.push(Step {
        sleep: remaining,
        tick: Tick::Fire,
    });
    steps
}

/// Walk the timeline of `req`, sleeping with `sleep` and emitting every
/// notice through `notifier`.
pub fn run_timer(
    req: &ReminderRequest,
    notifier: &mut dyn Notifier,
    mut sleep: impl FnMut(Duration),
) {
    for step in timeline(req.fire_after, req.notice_interval) {
        sleep(step.sleep);
        let text = match step.tick {
            Tick::Interim { remaining } => output::interim_notice(&req.message, remaining),
            Tick::Fire => output::fire_notice(&req.message),
        };
        notifier.notify(&text);
    }
}

/// Whole seconds, rounded up so a timer never fires early.
fn whole_secs(d: Duration) -> u64 {
    d.as_secs() + u64::from(d.subsec_nanos() > 0)
}

/// A freshly started reminder.
#[derive(Debug)]
pub struct Scheduled {
    pub pid: u32,
    /// A previous reminder that is still running but no longer cancelable.
    pub orphaned: Option<u32>,
}

pub struct Launcher {
    program: PathBuf,
    registry: HandleRegistry,
    tty: Option<PathBuf>,
    log: Option<PathBuf>,
}

impl Launcher {
    /// `program` is a `nemo` binary; it is re-run with the hidden `timer`
    /// subcommand.
    pub fn new(program: impl Into<PathBuf>, registry: HandleRegistry) -> Self {
        Self {
            program: program.into(),
            registry,
            tty: None,
            log: None,
        }
    }

    pub fn with_tty(mut self, tty: Option<PathBuf>) -> Self {
        self.tty = tty;
        self
    }

    pub fn with_log(mut self, log: Option<PathBuf>) -> Self {
        self.log = log;
        self
    }

    fn timer_command(&self, req: &ReminderRequest) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("timer")
            .arg("--after-secs")
            .arg(whole_secs(req.fire_after).to_string())
            .arg("--handle")
            .arg(self.registry.path());
        if let Some(every) = req.notice_interval {
            cmd.arg("--every-secs").arg(whole_secs(every).to_string());
        }
        if let Some(tty) = &self.tty {
            cmd.arg("--tty").arg(tty);
        }
        if let Some(log) = &self.log {
            cmd.arg("--log").arg(log);
        }
        cmd.arg("--").arg(&req.message);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        cmd
    }

    /// Start a detached timer for `req` and record it as the active reminder.
    /// Does not wait for the timer.
    pub fn schedule(&self, req: &ReminderRequest) -> Result<Scheduled> {
        let orphaned = self
            .registry
            .read()?
            .filter(|&pid| registry::is_reminder_timer(pid));

        let child = self.timer_command(req).spawn().with_context(|| {
            format!("failed to start reminder timer {}", self.program.display())
        })?;
        let pid = child.id();

        if let Err(e) = self.registry.save(pid) {
            let _ = registry::terminate(pid);
            return Err(e).context("failed to record reminder; timer stopped");
        }
        info!(
            "scheduled reminder pid {pid} in {}s",
            whole_secs(req.fire_after)
        );
        if let Some(prev) = orphaned {
            warn!("reminder pid {prev} is still running and can no longer be canceled");
        }
        Ok(Scheduled { pid, orphaned })
    }
}

/// Leave the invoking session and drop the inherited standard streams.
pub fn detach() -> Result<()> {
    unsafe {
        if libc::setsid() == -1 {
            bail!("setsid failed: {:?}", io::Error::last_os_error());
        }
    }

    let dev_null = std::fs::OpenOptions::new()
        .read(true)
        .write(true)
        .open("/dev/null")
        .context("failed to open /dev/null")?;
    let null_fd = dev_null.as_raw_fd();
    unsafe {
        libc::dup2(null_fd, libc::STDIN_FILENO);
        libc::dup2(null_fd, libc::STDOUT_FILENO);
        libc::dup2(null_fd, libc::STDERR_FILENO);
    }
    Ok(())
}

/// Where a timer process reports and whose handle it owns.
pub struct TimerConfig {
    pub handle: PathBuf,
    pub tty: Option<PathBuf>,
}

/// Body of the detached timer process.
pub fn run_timer_process(req: &ReminderRequest, config: TimerConfig) -> Result<()> {
    detach()?;
    let pid = std::process::id();
    info!(
        "timer {pid} started: fire in {}s, notices every {:?}",
        whole_secs(req.fire_after),
        req.notice_interval.map(whole_secs)
    );

    let mut notifier = TerminalNotifier::new(config.tty);
    run_timer(req, &mut notifier, std::thread::sleep);

    match HandleRegistry::new(config.handle).clear_if(pid) {
        Ok(true) => info!("timer {pid} fired; handle cleared"),
        Ok(false) => info!("timer {pid} fired; handle belongs to a newer reminder"),
        Err(e) => warn!("timer {pid} fired; failed to clear handle: {e:#}"),
    }
    Ok(())
}
