use anyhow::{bail, Result};

use crate::model::MAX_MESSAGE_LEN;

/// Validate a note or reminder message: non-empty and at most
/// `MAX_MESSAGE_LEN` characters.
pub fn validate_message(message: &str) -> Result<()> {
    if message.trim().is_empty() {
        bail!("message must not be empty");
    }
    let len = message.chars().count();
    if len > MAX_MESSAGE_LEN {
        bail!("message is {len} characters long; the limit is {MAX_MESSAGE_LEN}");
    }
    Ok(())
}

/// Validate a 1-based note index given on the command line.
pub fn validate_index(index: usize, count: usize) -> Result<()> {
    if index == 0 || index > count {
        match count {
            0 => bail!("no note at index {index}: this directory has no notes"),
            1 => bail!("no note at index {index}: the only index is 1"),
            _ => bail!("no note at index {index}: valid indexes are 1-{count}"),
        }
    }
    Ok(())
}
