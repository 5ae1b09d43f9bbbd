use std::time::Duration;

use serde::Serialize;

use crate::model::Note;

#[derive(Serialize)]
pub struct NoteEntry<'a> {
    pub index: usize,
    #[serde(flatten)]
    pub note: &'a Note,
}

pub fn note_entries(notes: &[Note]) -> Vec<NoteEntry<'_>> {
    notes
        .iter()
        .enumerate()
        .map(|(i, note)| NoteEntry { index: i + 1, note })
        .collect()
}

pub fn format_note_list(notes: &[Note]) -> String {
    if notes.is_empty() {
        return "No notes for this directory.\n".to_string();
    }
    let mut out = String::from("Notes for this directory:\n");
    for (i, note) in notes.iter().enumerate() {
        out.push_str(&format!("[{}] {}", i + 1, note.message));
        if let Some(t) = note.time_of_day {
            out.push_str(&format!(" @ {t}"));
        }
        if let Some(m) = note.interval_minutes {
            out.push_str(&format!(" every {m} min"));
        }
        out.push('\n');
    }
    out
}

pub fn format_fired(notes: &[Note]) -> String {
    let mut out = String::new();
    for note in notes {
        out.push_str(&format!("🔔 {}\n", note.message));
    }
    out
}

pub fn fire_notice(message: &str) -> String {
    format!("🔔 Reminder: {message}")
}

pub fn interim_notice(message: &str, remaining: Duration) -> String {
    let minutes = remaining.as_secs() / 60;
    let unit = if minutes == 1 { "minute" } else { "minutes" };
    format!("⏳ {minutes} {unit} left: {message}")
}

/// Human form of a delay, e.g. `1h 05m` or `25m`.
pub fn format_delay(d: Duration) -> String {
    let total_minutes = d.as_secs().div_ceil(60);
    let (h, m) = (total_minutes / 60, total_minutes % 60);
    if h > 0 {
        format!("{h}h {m:02}m")
    } else {
        format!("{m}m")
    }
}
