mod cli;

use std::fs::OpenOptions;
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::debug;
use rusqlite::Connection;

use cli::{Cli, Command};
use nemo::model::Note;
use nemo::registry::{CancelOutcome, HandleRegistry};
use nemo::scheduler::{Launcher, ReminderRequest, TimerConfig};
use nemo::timespec::{self, Delay};
use nemo::{db, notice, output, paths, registry, scheduler, store, trigger, validate};

fn resolve_db_path(cli_db: Option<String>, data_dir: &Path) -> Result<String> {
    match cli_db {
        Some(p) => Ok(p),
        None => Ok(paths::db_path(data_dir)
            .to_str()
            .context("default DB path is not valid UTF-8")?
            .to_string()),
    }
}

fn ensure_db_dir(db_path: &str) -> Result<()> {
    if let Some(parent) = Path::new(db_path).parent() {
        if !parent.as_os_str().is_empty() {
            paths::ensure_dir(parent)?;
        }
    }
    Ok(())
}

fn open_db(db_path: &str) -> Result<Connection> {
    ensure_db_dir(db_path)?;
    let conn = db::open(db_path)?;
    db::init(&conn)?;
    Ok(conn)
}

fn setup_logging() {
    env_logger::Builder::from_env(env_logger::Env::new().filter_or("NEMO_LOG", "warn"))
        .format_timestamp_secs()
        .init();
}

/// The detached timer has no stderr; it appends to a log file instead.
fn setup_timer_logging(log_path: Option<&Path>) {
    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(log::LevelFilter::Info)
        .format_timestamp_secs();
    match log_path.and_then(|p| OpenOptions::new().create(true).append(true).open(p).ok()) {
        Some(file) => builder.target(env_logger::Target::Pipe(Box::new(file))),
        None => builder.filter_level(log::LevelFilter::Off),
    };
    builder.init();
}

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    match &cli.command {
        Some(Command::Timer { log, .. }) => setup_timer_logging(log.as_deref()),
        _ => setup_logging(),
    }

    let data_dir = paths::data_dir()?;
    let db_path = resolve_db_path(cli.db, &data_dir)?;
    debug!("data dir {}, db {db_path}", data_dir.display());

    if (cli.list || cli.del.is_some()) && cli.command.is_some() {
        bail!("--list and --del cannot be combined with a command");
    }

    if cli.list {
        let conn = open_db(&db_path)?;
        let key = paths::current_key(cli.dir.as_deref())?;
        let notes = store::load(&conn, &key)?;
        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&output::note_entries(&notes))?
            );
        } else {
            print!("{}", output::format_note_list(&notes));
        }
        return Ok(());
    }

    if let Some(index) = cli.del {
        let conn = open_db(&db_path)?;
        let key = paths::current_key(cli.dir.as_deref())?;
        match store::delete(&conn, &key, index)? {
            Some(removed) => eprintln!("Deleted note {index}: {}", removed.message),
            None => validate::validate_index(index, store::count(&conn, &key)?)?,
        }
        return Ok(());
    }

    match cli.command.unwrap_or(Command::Check) {
        Command::Check => {
            let conn = open_db(&db_path)?;
            let key = paths::current_key(cli.dir.as_deref())?;
            check(&conn, &key)?;
        }

        Command::Add {
            message,
            when,
            interval,
            from_now,
        } => {
            let (time_of_day, interval_minutes) =
                timespec::parse_trigger(when.as_deref(), interval.as_deref())?;
            let note = Note {
                message,
                time_of_day,
                interval_minutes,
                last_fired: if from_now {
                    chrono::Utc::now().timestamp()
                } else {
                    0
                },
            };
            let conn = open_db(&db_path)?;
            let key = paths::current_key(cli.dir.as_deref())?;
            let index = store::add(&conn, &key, &note)?;
            eprintln!("Saved note {index} for this directory");
        }

        Command::Schedule {
            message,
            delay,
            notice: notice_arg,
            tty,
        } => {
            let delay = Delay::parse(&delay)?;
            let notice_interval = notice_arg
                .as_deref()
                .map(timespec::parse_notice_interval)
                .transpose()?
                .flatten();
            let fire_after = delay.fire_after(chrono::Local::now().naive_local());
            let req = ReminderRequest::new(message, fire_after, notice_interval)?;

            paths::ensure_dir(&data_dir)?;
            let program = std::env::current_exe().context("failed to locate nemo binary")?;
            let launcher = Launcher::new(program, handle_registry(&data_dir))
                .with_tty(tty.or_else(notice::controlling_tty))
                .with_log(Some(paths::timer_log_path(&data_dir)));
            let scheduled = launcher.schedule(&req)?;

            if let Some(prev) = scheduled.orphaned {
                eprintln!("Warning: reminder {prev} is still running and can no longer be canceled");
            }
            eprintln!(
                "Reminder scheduled in {} (pid {})",
                output::format_delay(req.fire_after),
                scheduled.pid
            );
        }

        Command::Done => match handle_registry(&data_dir).cancel()? {
            CancelOutcome::NoActive => eprintln!("No active reminder"),
            CancelOutcome::Terminated(pid) => eprintln!("Canceled reminder (pid {pid})"),
            CancelOutcome::Stale(pid) => {
                eprintln!("Reminder {pid} is no longer running; cleared stale handle")
            }
            CancelOutcome::SignalFailed { pid, error } => {
                eprintln!("Reminder {pid} was not running ({error}); cleared")
            }
        },

        Command::Status => {
            let handles = handle_registry(&data_dir);
            match handles.read()? {
                None => eprintln!("No active reminder"),
                Some(pid) if registry::is_reminder_timer(pid) => {
                    println!("Active reminder: pid {pid}")
                }
                Some(pid) => {
                    handles.clear_if(pid)?;
                    eprintln!("Reminder {pid} is no longer running; cleared stale handle");
                }
            }
        }

        Command::Timer {
            after_secs,
            every_secs,
            handle,
            tty,
            log: _,
            message,
        } => {
            let req = ReminderRequest::new(
                message,
                Duration::from_secs(after_secs),
                every_secs.map(Duration::from_secs),
            )?;
            scheduler::run_timer_process(&req, TimerConfig { handle, tty })?;
        }
    }

    Ok(())
}

fn handle_registry(data_dir: &Path) -> HandleRegistry {
    HandleRegistry::new(paths::handle_path(data_dir))
}

/// Passive check: print due notes and persist their new timestamps.
fn check(conn: &Connection, key: &str) -> Result<()> {
    let notes = store::load(conn, key)?;
    let outcome = trigger::evaluate_all(&notes, &chrono::Local::now());
    print!("{}", output::format_fired(&outcome.fired));
    if outcome.changed {
        store::save(conn, key, &outcome.updated)?;
    }
    Ok(())
}
