use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "nemo",
    about = "Notes for the current directory, and reminders that find you later",
    version
)]
pub struct Cli {
    /// Path to the SQLite database [default: ~/.nemo/nemo.db]
    #[arg(long, env = "NEMO_DB", global = true)]
    pub db: Option<String>,

    /// Directory whose notes to use [default: current directory]
    #[arg(long, env = "NEMO_DIR", global = true)]
    pub dir: Option<PathBuf>,

    /// List the notes for this directory
    #[arg(long)]
    pub list: bool,

    /// With --list: output as JSON
    #[arg(long, requires = "list")]
    pub json: bool,

    /// Delete the note at this 1-based index
    #[arg(long, value_name = "INDEX", conflicts_with = "list")]
    pub del: Option<usize>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show notes whose time or interval is due (the default with no arguments)
    Check,

    /// Add a note to this directory
    Add {
        /// Note text (up to 255 characters)
        message: String,
        /// Time of day (HH:MM) to show the note, or an interval in minutes
        when: Option<String>,
        /// Interval in minutes, after a time of day
        interval: Option<String>,
        /// Start the interval now instead of showing the note on the next check
        #[arg(long)]
        from_now: bool,
    },

    /// Start a background reminder
    Schedule {
        /// Reminder text
        message: String,
        /// Minutes from now, or at:HH:MM
        delay: String,
        /// rm:X to also print the time left every X minutes
        notice: Option<String>,
        /// Terminal to write notices to [default: this terminal]
        #[arg(long, env = "NEMO_TTY", hide = true)]
        tty: Option<PathBuf>,
    },

    /// Cancel the active background reminder
    Done,

    /// Show the active background reminder
    Status,

    /// Run a reminder timer in the foreground (used by `schedule`)
    #[command(hide = true)]
    Timer {
        /// Seconds until the reminder fires
        #[arg(long)]
        after_secs: u64,
        /// Seconds between "time left" notices
        #[arg(long)]
        every_secs: Option<u64>,
        /// Handle file to clear when the reminder fires
        #[arg(long)]
        handle: PathBuf,
        /// Terminal device for notices
        #[arg(long)]
        tty: Option<PathBuf>,
        /// Log file
        #[arg(long)]
        log: Option<PathBuf>,
        /// Reminder text
        message: String,
    },
}
