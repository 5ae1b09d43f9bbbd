use chrono::{DateTime, TimeZone, Timelike};

use crate::model::Note;

/// Result of checking one note against the clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evaluation {
    pub fires: bool,
    pub last_fired: i64,
}

/// Decide whether `note` fires at `now`.
///
/// A time-of-day note fires when `now`'s hour and minute (in `now`'s zone)
/// match, at most once per matching minute. An interval note fires when at
/// least `interval_minutes` have elapsed since `last_fired`. Either condition
/// alone is enough. A fire moves `last_fired` to `now`.
pub fn evaluate<Tz: TimeZone>(note: &Note, now: &DateTime<Tz>) -> Evaluation {
    let now_ts = now.timestamp();

    let at_time = note.time_of_day.is_some_and(|t| {
        now.hour() == t.hour()
            && now.minute() == t.minute()
            && note.last_fired.div_euclid(60) != now_ts.div_euclid(60)
    });

    let elapsed = note.interval_minutes.is_some_and(|minutes| {
        now_ts.saturating_sub(note.last_fired) >= i64::from(minutes) * 60
    });

    if at_time || elapsed {
        Evaluation {
            fires: true,
            last_fired: now_ts,
        }
    } else {
        Evaluation {
            fires: false,
            last_fired: note.last_fired,
        }
    }
}

/// Outcome of a passive check over a whole collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckOutcome {
    /// Notes that fired, in collection order, with their new `last_fired`.
    pub fired: Vec<Note>,
    /// The full collection with updated timestamps.
    pub updated: Vec<Note>,
    /// True when at least one note fired and the collection needs saving.
    pub changed: bool,
}

pub fn evaluate_all<Tz: TimeZone>(notes: &[Note], now: &DateTime<Tz>) -> CheckOutcome {
    let mut outcome = CheckOutcome::default();
    for note in notes {
        let eval = evaluate(note, now);
        let mut note = note.clone();
        note.last_fired = eval.last_fired;
        if eval.fires {
            outcome.fired.push(note.clone());
            outcome.changed = true;
        }
        outcome.updated.push(note);
    }
    outcome
}
