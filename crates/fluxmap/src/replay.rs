//! Replay-offset input validation and clock formatting.
//!
//! Input timestamps are interpreted as UTC; embedders with a local-zone
//! UI convert before handing text to the engine.

use std::error::Error;
use std::fmt;

use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplayInputError {
    InvalidDate { input: String },
    InFuture { input: String },
    BeyondLimit { max_offset_ms: u64 },
}

impl fmt::Display for ReplayInputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplayInputError::InvalidDate { input } => {
                write!(f, "unparseable replay time: {input}")
            }
            ReplayInputError::InFuture { input } => {
                write!(f, "replay time is in the future: {input}")
            }
            ReplayInputError::BeyondLimit { max_offset_ms } => {
                write!(
                    f,
                    "replay time is beyond the configured maximum offset ({})",
                    format_offset(*max_offset_ms)
                )
            }
        }
    }
}

impl Error for ReplayInputError {}

/// Turn a wall-clock input like `2017/08/08 12:00:00` into a replay
/// offset in milliseconds. Errors block the offset update locally;
/// nothing is ever dispatched for invalid input.
pub fn parse_replay_input(
    input: &str,
    now_ms: u64,
    max_offset_ms: u64,
) -> Result<u64, ReplayInputError> {
    let trimmed = input.trim();
    let parsed = parse_clock(trimmed).ok_or_else(|| ReplayInputError::InvalidDate {
        input: trimmed.to_string(),
    })?;
    let target_ms = (parsed.assume_utc().unix_timestamp_nanos() / 1_000_000) as i128;
    let now = now_ms as i128;
    if target_ms > now {
        return Err(ReplayInputError::InFuture {
            input: trimmed.to_string(),
        });
    }
    let offset_ms = (now - target_ms) as u64;
    if offset_ms > max_offset_ms {
        return Err(ReplayInputError::BeyondLimit { max_offset_ms });
    }
    Ok(offset_ms)
}

fn parse_clock(text: &str) -> Option<PrimitiveDateTime> {
    let slashed = format_description!(
        "[year]/[month padding:none]/[day padding:none] [hour padding:none]:[minute padding:none]:[second padding:none]"
    );
    if let Ok(parsed) = PrimitiveDateTime::parse(text, slashed) {
        return Some(parsed);
    }
    let dashed = format_description!(
        "[year]-[month padding:none]-[day padding:none] [hour padding:none]:[minute padding:none]:[second padding:none]"
    );
    PrimitiveDateTime::parse(text, dashed).ok()
}

/// `YYYY/MM/DD HH:MM:SS` rendering of a millisecond unix timestamp.
pub fn format_clock(unix_ms: u64) -> String {
    let format = format_description!("[year]/[month]/[day] [hour]:[minute]:[second]");
    OffsetDateTime::from_unix_timestamp_nanos(unix_ms as i128 * 1_000_000)
        .ok()
        .and_then(|moment| moment.format(format).ok())
        .unwrap_or_default()
}

/// `3h 25m 10s` rendering of a replay offset.
pub fn format_offset(offset_ms: u64) -> String {
    let hours = offset_ms / 3_600_000;
    let minutes = (offset_ms % 3_600_000) / 60_000;
    let seconds = (offset_ms % 60_000) / 1_000;
    format!("{hours}h {minutes}m {seconds}s")
}

/// Compact elapsed-time rendering for the freshness indicator: leading
/// zero units are dropped (`1h:3m:20s`, `3m:20s`, `20s`).
pub fn format_time_ago(elapsed_ms: u64) -> String {
    let hours = elapsed_ms / 3_600_000;
    let minutes = (elapsed_ms % 3_600_000) / 60_000;
    let seconds = (elapsed_ms % 60_000) / 1_000;
    if hours > 0 {
        format!("{hours}h:{minutes}m:{seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m:{seconds}s")
    } else {
        format!("{seconds}s")
    }
}
