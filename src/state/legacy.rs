//! Conversion of the flat `upload_log.json` into [`NicheState`]
//!
//! The legacy log is a single object:
//!
//! ```text
//! {
//!   "video_number": 12,
//!   "last_video_number_youtube": 7,
//!   "last_schedule_time_youtube": "2024-01-01T13:30:00",
//!   "last_video_number_tiktok": 0,
//!   "last_schedule_time_tiktok": "N/A"
//! }
//! ```
//!
//! Keys without a platform suffix predate multi-platform support and belong
//! to `youtube`. A number of 0 and non-timestamp strings mean "unset".

use chrono::{DateTime, NaiveDateTime};
use serde_json::{Map, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use super::{NicheState, StateError};

const NUMBER_PREFIX: &str = "last_video_number";
const TIME_PREFIX: &str = "last_schedule_time";
const UNSUFFIXED_PLATFORM: &str = "youtube";

/// Read a legacy log and convert it
pub(super) fn migrate(path: &Path) -> Result<NicheState, StateError> {
    let file = File::open(path).map_err(|e| StateError::io("open", path, e))?;
    let value: Value =
        serde_json::from_reader(BufReader::new(file)).map_err(|source| StateError::Corrupt {
            path: path.to_path_buf(),
            source,
        })?;

    let empty = Map::new();
    Ok(convert(value.as_object().unwrap_or(&empty)))
}

fn convert(log: &Map<String, Value>) -> NicheState {
    let mut state = NicheState::default();

    if let Some(cursor) = log.get("video_number").and_then(as_number) {
        state.generation_cursor = cursor;
    }

    for (key, value) in log {
        if let Some(platform) = platform_of(key, NUMBER_PREFIX) {
            let number = as_number(value).filter(|&n| n > 0);
            if number.is_some() {
                state.cursor_mut(platform).last_published_number = number;
            }
        } else if let Some(platform) = platform_of(key, TIME_PREFIX) {
            let time = value.as_str().and_then(parse_timestamp);
            if time.is_some() {
                state.cursor_mut(platform).last_schedule_time = time;
            }
        }
    }

    state
}

fn platform_of<'a>(key: &'a str, prefix: &str) -> Option<&'a str> {
    let rest = key.strip_prefix(prefix)?;
    if rest.is_empty() {
        return Some(UNSUFFIXED_PLATFORM);
    }
    rest.strip_prefix('_').filter(|p| !p.is_empty())
}

fn as_number(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Accepts `T` or space separators, optional fractional seconds and an
/// optional offset (dropped; times are local wall-clock)
pub(crate) fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|dt| dt.naive_local())
        })
}
