use std::fmt;

use serde::Serialize;

/// Longest message a note or reminder may carry, in characters.
pub const MAX_MESSAGE_LEN: usize = 255;

/// Most notes a single directory may hold.
pub const MAX_NOTES: usize = 100;

/// A wall-clock minute of the day, e.g. `09:30`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(into = "String")]
pub struct TimeOfDay {
    hour: u8,
    minute: u8,
}

impl TimeOfDay {
    pub fn new(hour: u8, minute: u8) -> anyhow::Result<Self> {
        if hour > 23 {
            anyhow::bail!("hour {hour} out of range (0-23)");
        }
        if minute > 59 {
            anyhow::bail!("minute {minute} out of range (0-59)");
        }
        Ok(Self { hour, minute })
    }

    pub fn hour(self) -> u32 {
        u32::from(self.hour)
    }

    pub fn minute(self) -> u32 {
        u32::from(self.minute)
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl From<TimeOfDay> for String {
    fn from(t: TimeOfDay) -> Self {
        t.to_string()
    }
}

/// A stored note and its trigger spec.
///
/// `last_fired` is a Unix timestamp in seconds; 0 means the note has never
/// fired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Note {
    pub message: String,
    pub time_of_day: Option<TimeOfDay>,
    pub interval_minutes: Option<u32>,
    pub last_fired: i64,
}

impl Note {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            time_of_day: None,
            interval_minutes: None,
            last_fired: 0,
        }
    }

    pub fn at(mut self, time_of_day: TimeOfDay) -> Self {
        self.time_of_day = Some(time_of_day);
        self
    }

    pub fn every(mut self, minutes: u32) -> Self {
        self.interval_minutes = Some(minutes);
        self
    }
}
