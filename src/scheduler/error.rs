//! Error types for the scheduler module

use std::fmt;

/// Result type for scheduler operations
pub type SchedulerResult<T> = Result<T, SchedulerError>;

/// Scheduler-specific errors
///
/// These are all configuration problems; a scheduler that was built
/// successfully never fails at call time. The "no slot" outcome is
/// [`NoSlotFound`](super::NoSlotFound), not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    /// Hour or minute out of range
    InvalidSlot { hour: u32, minute: u32 },

    /// Slot string is not `HH:MM`
    InvalidSlotFormat { value: String },

    /// Jitter bounds are inverted, entirely negative or wider than a day
    InvalidJitter { min_minutes: i64, max_minutes: i64 },

    /// Minimum gap is negative or too large to represent
    InvalidGap { minutes: i64 },

    /// Referenced slot set is not defined
    UnknownSlotSet {
        name: String,
        available: Vec<String>,
    },
}

impl fmt::Display for SchedulerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSlot { hour, minute } => {
                write!(
                    f,
                    "Invalid slot {:02}:{:02}. Hour must be 0-23 and minute 0-59",
                    hour, minute
                )
            }
            Self::InvalidSlotFormat { value } => {
                write!(f, "Invalid slot '{}'. Expected HH:MM", value)
            }
            Self::InvalidJitter {
                min_minutes,
                max_minutes,
            } => {
                write!(
                    f,
                    "Invalid jitter bounds [{}, {}] minutes. Need min <= max, max >= 0 and both within a day",
                    min_minutes, max_minutes
                )
            }
            Self::InvalidGap { minutes } => {
                write!(f, "Invalid minimum gap of {} minutes", minutes)
            }
            Self::UnknownSlotSet { name, available } => {
                write!(
                    f,
                    "Unknown slot set '{}'. Available: {}",
                    name,
                    available.join(", ")
                )
            }
        }
    }
}

impl std::error::Error for SchedulerError {}

impl SchedulerError {
    /// Create an invalid slot error
    pub fn invalid_slot(hour: u32, minute: u32) -> Self {
        Self::InvalidSlot { hour, minute }
    }

    /// Create an invalid slot format error
    pub fn invalid_slot_format(value: impl Into<String>) -> Self {
        Self::InvalidSlotFormat {
            value: value.into(),
        }
    }

    /// Create an invalid jitter error
    pub fn invalid_jitter(min_minutes: i64, max_minutes: i64) -> Self {
        Self::InvalidJitter {
            min_minutes,
            max_minutes,
        }
    }

    /// Create an unknown slot set error
    pub fn unknown_slot_set<I, S>(name: impl Into<String>, available: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::UnknownSlotSet {
            name: name.into(),
            available: available.into_iter().map(Into::into).collect(),
        }
    }
}
