use anyhow::{bail, Context, Result};
use rusqlite::{params, Connection, OptionalExtension};

use crate::model::{Note, TimeOfDay, MAX_NOTES};
use crate::validate::validate_message;

fn row_to_note(row: &rusqlite::Row) -> rusqlite::Result<(String, Option<String>, Option<u32>, i64)> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

/// Load the notes stored under `key`, in order.
pub fn load(conn: &Connection, key: &str) -> Result<Vec<Note>> {
    let mut stmt = conn.prepare_cached(
        "SELECT message, time_of_day, interval_minutes, last_fired
         FROM notes WHERE dir_key = ?1 ORDER BY position",
    )?;
    let rows = stmt.query_map([key], row_to_note)?;
    let mut notes = Vec::new();
    for row in rows {
        let (message, time_of_day, interval_minutes, last_fired) = row?;
        let time_of_day = time_of_day
            .map(|t| TimeOfDay::parse(&t))
            .transpose()
            .with_context(|| format!("corrupt note '{message}'"))?;
        notes.push(Note {
            message,
            time_of_day,
            interval_minutes,
            last_fired,
        });
    }
    Ok(notes)
}

/// Replace the whole collection stored under `key`.
pub fn save(conn: &Connection, key: &str, notes: &[Note]) -> Result<()> {
    if notes.len() > MAX_NOTES {
        bail!(
            "cannot store {} notes for one directory; the limit is {MAX_NOTES}",
            notes.len()
        );
    }
    for note in notes {
        validate_message(&note.message)?;
    }
    let tx = conn.unchecked_transaction()?;
    tx.execute("DELETE FROM notes WHERE dir_key = ?1", [key])?;
    {
        let mut stmt = tx.prepare_cached(
            "INSERT INTO notes (dir_key, position, message, time_of_day, interval_minutes, last_fired)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )?;
        for (position, note) in notes.iter().enumerate() {
            stmt.execute(params![
                key,
                position as i64,
                note.message,
                note.time_of_day.map(|t| t.to_string()),
                note.interval_minutes,
                note.last_fired,
            ])?;
        }
    }
    tx.commit()?;
    Ok(())
}

pub fn count(conn: &Connection, key: &str) -> Result<usize> {
    let n: i64 = conn.query_row(
        "SELECT COUNT(*) FROM notes WHERE dir_key = ?1",
        [key],
        |row| row.get(0),
    )?;
    Ok(n as usize)
}

/// Append a note; returns its 1-based index.
pub fn add(conn: &Connection, key: &str, note: &Note) -> Result<usize> {
    validate_message(&note.message)?;
    let tx = conn.unchecked_transaction()?;
    let existing = count(&tx, key)?;
    if existing >= MAX_NOTES {
        bail!("this directory already has {MAX_NOTES} notes; delete one first");
    }
    let next: Option<i64> = tx
        .query_row(
            "SELECT MAX(position) + 1 FROM notes WHERE dir_key = ?1",
            [key],
            |row| row.get(0),
        )
        .optional()?
        .flatten();
    tx.execute(
        "INSERT INTO notes (dir_key, position, message, time_of_day, interval_minutes, last_fired)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            key,
            next.unwrap_or(0),
            note.message,
            note.time_of_day.map(|t| t.to_string()),
            note.interval_minutes,
            note.last_fired,
        ],
    )?;
    tx.commit()?;
    Ok(existing + 1)
}

/// Remove the 1-based `index` from `notes`, keeping the rest in order.
/// Out-of-range indexes leave `notes` untouched.
pub fn remove_index(notes: &mut Vec<Note>, index: usize) -> Option<Note> {
    if index == 0 || index > notes.len() {
        return None;
    }
    Some(notes.remove(index - 1))
}

/// Delete the note at 1-based `index` and persist the renumbered remainder.
/// Returns `None` without writing when the index is out of range.
pub fn delete(conn: &Connection, key: &str, index: usize) -> Result<Option<Note>> {
    let mut notes = load(conn, key)?;
    let Some(removed) = remove_index(&mut notes, index) else {
        return Ok(None);
    };
    save(conn, key, &notes)?;
    Ok(Some(removed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    const KEY: &str = "/home/me/project";

    fn messages(notes: &[Note]) -> Vec<&str> {
        notes.iter().map(|n| n.message.as_str()).collect()
    }

    #[test]
    fn add_and_load_in_order() {
        let conn = db::open_memory().unwrap();
        assert_eq!(add(&conn, KEY, &Note::new("first")).unwrap(), 1);
        assert_eq!(add(&conn, KEY, &Note::new("second").every(10)).unwrap(), 2);
        let notes = load(&conn, KEY).unwrap();
        assert_eq!(messages(&notes), vec!["first", "second"]);
        assert_eq!(notes[1].interval_minutes, Some(10));
        assert_eq!(notes[1].last_fired, 0);
    }

    #[test]
    fn collections_are_scoped_by_key() {
        let conn = db::open_memory().unwrap();
        add(&conn, KEY, &Note::new("mine")).unwrap();
        add(&conn, "/elsewhere", &Note::new("theirs")).unwrap();
        assert_eq!(messages(&load(&conn, KEY).unwrap()), vec!["mine"]);
        assert_eq!(messages(&load(&conn, "/elsewhere").unwrap()), vec!["theirs"]);
        assert!(load(&conn, "/nowhere").unwrap().is_empty());
    }

    #[test]
    fn save_load_is_a_fixed_point() {
        let conn = db::open_memory().unwrap();
        let notes = vec![
            Note::new("pipes | are fine"),
            Note {
                last_fired: 1_700_000_000,
                ..Note::new("multi\nline").at(TimeOfDay::new(9, 0).unwrap()).every(45)
            },
            Note::new(&*"z".repeat(255)),
        ];
        save(&conn, KEY, &notes).unwrap();
        let loaded = load(&conn, KEY).unwrap();
        assert_eq!(loaded, notes);
        save(&conn, KEY, &loaded).unwrap();
        assert_eq!(load(&conn, KEY).unwrap(), notes);
    }

    #[test]
    fn add_enforces_limit() {
        let conn = db::open_memory().unwrap();
        for i in 0..MAX_NOTES {
            add(&conn, KEY, &Note::new(format!("note {i}"))).unwrap();
        }
        assert!(add(&conn, KEY, &Note::new("one too many")).is_err());
        assert_eq!(count(&conn, KEY).unwrap(), MAX_NOTES);
    }

    #[test]
    fn add_rejects_invalid_message() {
        let conn = db::open_memory().unwrap();
        assert!(add(&conn, KEY, &Note::new("")).is_err());
        assert!(add(&conn, KEY, &Note::new("x".repeat(256))).is_err());
        assert_eq!(count(&conn, KEY).unwrap(), 0);
    }

    #[test]
    fn delete_renumbers_and_preserves_order() {
        let conn = db::open_memory().unwrap();
        for m in ["a", "b", "c", "d"] {
            add(&conn, KEY, &Note::new(m)).unwrap();
        }
        let removed = delete(&conn, KEY, 2).unwrap().unwrap();
        assert_eq!(removed.message, "b");
        assert_eq!(messages(&load(&conn, KEY).unwrap()), vec!["a", "c", "d"]);

        // Appends land after the renumbered tail.
        add(&conn, KEY, &Note::new("e")).unwrap();
        delete(&conn, KEY, 1).unwrap();
        assert_eq!(messages(&load(&conn, KEY).unwrap()), vec!["c", "d", "e"]);
    }

    #[test]
    fn delete_out_of_range_is_noop() {
        let conn = db::open_memory().unwrap();
        add(&conn, KEY, &Note::new("only")).unwrap();
        assert!(delete(&conn, KEY, 0).unwrap().is_none());
        assert!(delete(&conn, KEY, 2).unwrap().is_none());
        assert_eq!(messages(&load(&conn, KEY).unwrap()), vec!["only"]);
    }

    #[test]
    fn remove_index_every_position() {
        let base: Vec<Note> = ["a", "b", "c"].into_iter().map(Note::new).collect();
        for i in 1..=base.len() {
            let mut notes = base.clone();
            let removed = remove_index(&mut notes, i).unwrap();
            assert_eq!(removed, base[i - 1]);
            let mut expected = base.clone();
            expected.remove(i - 1);
            assert_eq!(notes, expected);
        }
        let mut notes = base.clone();
        assert!(remove_index(&mut notes, 4).is_none());
        assert_eq!(notes, base);
    }

    #[test]
    fn save_persists_last_fired_updates() {
        let conn = db::open_memory().unwrap();
        add(&conn, KEY, &Note::new("tick").every(1)).unwrap();
        let mut notes = load(&conn, KEY).unwrap();
        notes[0].last_fired = 42;
        save(&conn, KEY, &notes).unwrap();
        assert_eq!(load(&conn, KEY).unwrap()[0].last_fired, 42);
    }
}
