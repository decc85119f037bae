//! Time-of-day slots and slot sets
//!
//! A slot is an (hour, minute) pair in local wall-clock time. Slot sets are
//! ordered: the scheduler tries slots in the configured order for each day.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::{SchedulerError, SchedulerResult};

// ============================================================================
// Time Slot
// ============================================================================

/// An allowed publication time of day
///
/// Serialized as an `"HH:MM"` string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeSlot {
    hour: u8,
    minute: u8,
}

impl TimeSlot {
    /// Create a new slot, validating the ranges
    pub fn new(hour: u32, minute: u32) -> SchedulerResult<Self> {
        if hour > 23 || minute > 59 {
            return Err(SchedulerError::invalid_slot(hour, minute));
        }
        Ok(Self {
            hour: hour as u8,
            minute: minute as u8,
        })
    }

    /// Hour of the day (0-23)
    pub fn hour(&self) -> u32 {
        u32::from(self.hour)
    }

    /// Minute of the hour (0-59)
    pub fn minute(&self) -> u32 {
        u32::from(self.minute)
    }

    /// Combine with a date; seconds and sub-seconds are zero
    pub fn on(&self, date: NaiveDate) -> Option<NaiveDateTime> {
        date.and_hms_opt(self.hour(), self.minute(), 0)
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl FromStr for TimeSlot {
    type Err = SchedulerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let time = NaiveTime::parse_from_str(s.trim(), "%H:%M")
            .map_err(|_| SchedulerError::invalid_slot_format(s))?;
        Self::new(time.hour(), time.minute())
    }
}

impl TryFrom<String> for TimeSlot {
    type Error = SchedulerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TimeSlot> for String {
    fn from(slot: TimeSlot) -> Self {
        slot.to_string()
    }
}

// ============================================================================
// Slot Set
// ============================================================================

/// Ordered list of allowed publication times for a platform
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlotSet {
    slots: Vec<TimeSlot>,
}

impl SlotSet {
    /// Create a slot set, keeping the given order
    pub fn new(slots: Vec<TimeSlot>) -> Self {
        Self { slots }
    }

    /// Parse a list of `HH:MM` strings
    pub fn parse<I, S>(values: I) -> SchedulerResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let slots = values
            .into_iter()
            .map(|v| v.as_ref().parse())
            .collect::<SchedulerResult<Vec<TimeSlot>>>()?;
        Ok(Self::new(slots))
    }

    /// Built-in slot sets
    ///
    /// `set1` is the original three-a-day rhythm; `set2` and `set3` are the
    /// afternoon and evening variants.
    pub fn presets() -> Vec<(&'static str, SlotSet)> {
        let make = |pairs: &[(u8, u8)]| SlotSet {
            slots: pairs
                .iter()
                .map(|&(hour, minute)| TimeSlot { hour, minute })
                .collect(),
        };
        vec![
            ("set1", make(&[(0, 30), (13, 30), (21, 0)])),
            ("set2", make(&[(13, 0), (16, 0), (19, 0)])),
            ("set3", make(&[(16, 0), (20, 0)])),
        ]
    }

    /// Look up a built-in slot set by name
    pub fn preset(name: &str) -> Option<SlotSet> {
        Self::presets()
            .into_iter()
            .find(|(preset, _)| preset.eq_ignore_ascii_case(name))
            .map(|(_, set)| set)
    }

    /// Iterate slots in configured order
    pub fn iter(&self) -> impl Iterator<Item = &TimeSlot> {
        self.slots.iter()
    }

    /// Number of slots
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Check if there are no slots at all
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl fmt::Display for SlotSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let labels: Vec<String> = self.slots.iter().map(ToString::to_string).collect();
        write!(f, "{}", labels.join(", "))
    }
}

impl FromIterator<TimeSlot> for SlotSet {
    fn from_iter<T: IntoIterator<Item = TimeSlot>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

// ============================================================================
// Tests
// ============================================================================
