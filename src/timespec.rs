//! Parsing for the time-related arguments of `add` and `schedule`, plus the
//! wall-clock arithmetic that turns an `at:HH:MM` target into a delay.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::{Days, NaiveDateTime};

use crate::model::TimeOfDay;

const AT_PREFIX: &str = "at:";
const NOTICE_PREFIX: &str = "rm:";

impl TimeOfDay {
    /// Parse a strict `HH:MM` string. One- or two-digit fields are accepted;
    /// anything else (signs, spaces, seconds, trailing words) is rejected.
    pub fn parse(s: &str) -> Result<Self> {
        let Some((h, m)) = s.split_once(':') else {
            bail!("invalid time '{s}': expected HH:MM");
        };
        let hour = parse_clock_field(h).with_context(|| format!("invalid time '{s}'"))?;
        let minute = parse_clock_field(m).with_context(|| format!("invalid time '{s}'"))?;
        TimeOfDay::new(hour, minute).with_context(|| format!("invalid time '{s}'"))
    }

    fn naive(self) -> chrono::NaiveTime {
        // Range-checked in TimeOfDay::new.
        chrono::NaiveTime::from_hms_opt(self.hour(), self.minute(), 0).unwrap_or_default()
    }
}

fn parse_clock_field(field: &str) -> Result<u8> {
    if field.is_empty() || field.len() > 2 || !field.bytes().all(|b| b.is_ascii_digit()) {
        bail!("'{field}' is not a one- or two-digit number");
    }
    Ok(field.parse()?)
}

/// Parse a strictly positive whole number of minutes.
pub fn parse_minutes(s: &str) -> Result<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        bail!("invalid minutes '{s}': expected a positive whole number");
    }
    let minutes: u32 = s
        .parse()
        .with_context(|| format!("invalid minutes '{s}'"))?;
    if minutes == 0 {
        bail!("invalid minutes '{s}': must be greater than zero");
    }
    Ok(minutes)
}

/// The trigger arguments accepted by `add`: the optional second positional is
/// a time of day when it contains `:` and an interval otherwise; the optional
/// third positional is an interval and only follows a time of day.
pub fn parse_trigger(
    when: Option<&str>,
    interval: Option<&str>,
) -> Result<(Option<TimeOfDay>, Option<u32>)> {
    match (when, interval) {
        (None, None) => Ok((None, None)),
        (None, Some(_)) => bail!("an interval needs a time of day before it"),
        (Some(w), None) if !w.contains(':') => Ok((None, Some(parse_minutes(w)?))),
        (Some(w), None) => Ok((Some(TimeOfDay::parse(w)?), None)),
        (Some(w), Some(i)) => {
            if !w.contains(':') {
                bail!("'{w}' is not a time of day; only one interval may be given");
            }
            Ok((Some(TimeOfDay::parse(w)?), Some(parse_minutes(i)?)))
        }
    }
}

/// When a scheduled reminder should fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delay {
    Minutes(u32),
    At(TimeOfDay),
}

impl Delay {
    /// Parse `<minutes>` or `at:HH:MM`.
    pub fn parse(s: &str) -> Result<Self> {
        match s.strip_prefix(AT_PREFIX) {
            Some(t) => Ok(Delay::At(TimeOfDay::parse(t)?)),
            None => Ok(Delay::Minutes(
                parse_minutes(s).with_context(|| format!("invalid delay '{s}'"))?,
            )),
        }
    }

    /// Time from `now` (local wall clock) until the reminder fires.
    pub fn fire_after(self, now: NaiveDateTime) -> Duration {
        match self {
            Delay::Minutes(m) => Duration::from_secs(u64::from(m) * 60),
            Delay::At(t) => until_next(now, t),
        }
    }
}

/// Parse the optional `rm:X` interim-notice cadence. `rm:0` disables
/// interim notices and yields `None`.
pub fn parse_notice_interval(s: &str) -> Result<Option<Duration>> {
    let Some(raw) = s.strip_prefix(NOTICE_PREFIX) else {
        bail!("invalid notice interval '{s}': expected rm:<minutes>");
    };
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        bail!("invalid notice interval '{s}': expected rm:<minutes>");
    }
    let minutes: u64 = raw
        .parse()
        .with_context(|| format!("invalid notice interval '{s}'"))?;
    Ok((minutes > 0).then(|| Duration::from_secs(minutes * 60)))
}

/// Duration from `now` until the next occurrence of `target`. A target equal
/// to or earlier than `now` rolls over to tomorrow.
pub fn until_next(now: NaiveDateTime, target: TimeOfDay) -> Duration {
    let mut next = now.date().and_time(target.naive());
    if next <= now {
        next = next.checked_add_days(Days::new(1)).unwrap_or(next);
    }
    (next - now).to_std().unwrap_or_default()
}
