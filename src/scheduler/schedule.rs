//! Next-publication-time computation
//!
//! The scheduler walks days starting from today and, within each day, the
//! configured slots in order. The first slot that is strictly in the future
//! and at least `min_gap` after the anchor wins. The anchor is the canonical
//! (un-jittered) time of the previous schedule, so jitter never accumulates
//! into the spacing guarantee.

use chrono::{Days, Duration, NaiveDateTime};
use rand::Rng;
use std::fmt;

use super::error::{SchedulerError, SchedulerResult};
use super::slots::SlotSet;
use crate::state::PlatformCursor;

/// Default look-ahead in days
pub const DEFAULT_HORIZON_DAYS: u32 = 7;

// ============================================================================
// Outcomes
// ============================================================================

/// No slot satisfies the constraints within the horizon
///
/// This is a legitimate end of the batch, not a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoSlotFound;

impl fmt::Display for NoSlotFound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no schedule slot available within the horizon")
    }
}

impl std::error::Error for NoSlotFound {}

/// A computed publication time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledSlot {
    /// Time handed to the uploader
    pub jittered: NaiveDateTime,

    /// Slot time stored as the next anchor
    pub canonical: NaiveDateTime,
}

impl ScheduledSlot {
    /// Jitter applied on top of the canonical time
    pub fn offset(&self) -> Duration {
        self.jittered - self.canonical
    }

    /// Format as display string
    pub fn display(&self) -> String {
        format!(
            "{} (slot {})",
            self.jittered.format("%Y-%m-%d %H:%M"),
            self.canonical.format("%H:%M")
        )
    }
}

// ============================================================================
// Jitter
// ============================================================================

/// Largest jitter magnitude accepted, one day
pub const MAX_JITTER_MINUTES: i64 = 24 * 60;

/// Inclusive bounds, in whole minutes, for the random scheduling offset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JitterBounds {
    min_minutes: i64,
    max_minutes: i64,
}

impl JitterBounds {
    /// Create bounds; requires `min <= max`, `max >= 0` and both within a day
    pub fn new(min_minutes: i64, max_minutes: i64) -> SchedulerResult<Self> {
        let range = -MAX_JITTER_MINUTES..=MAX_JITTER_MINUTES;
        if min_minutes > max_minutes
            || max_minutes < 0
            || !range.contains(&min_minutes)
            || !range.contains(&max_minutes)
        {
            return Err(SchedulerError::invalid_jitter(min_minutes, max_minutes));
        }
        Ok(Self {
            min_minutes,
            max_minutes,
        })
    }

    /// `[-minutes, +minutes]`, capped at [`MAX_JITTER_MINUTES`]
    pub fn symmetric(minutes: u32) -> Self {
        let m = i64::from(minutes).min(MAX_JITTER_MINUTES);
        Self {
            min_minutes: -m,
            max_minutes: m,
        }
    }

    /// No jitter at all
    pub fn none() -> Self {
        Self {
            min_minutes: 0,
            max_minutes: 0,
        }
    }

    pub fn min(&self) -> Duration {
        Duration::minutes(self.min_minutes)
    }

    pub fn max(&self) -> Duration {
        Duration::minutes(self.max_minutes)
    }

    /// Check whether an offset lies within the bounds
    pub fn contains(&self, offset: Duration) -> bool {
        offset >= self.min() && offset <= self.max()
    }

    /// Draw an offset for `canonical`, keeping `canonical + offset > now`
    ///
    /// `canonical` must already be after `now`. The lower bound is raised to
    /// the smallest whole-minute offset that stays in the future, which is
    /// never above zero, so the draw range is never empty.
    fn draw<R: Rng>(
        &self,
        canonical: NaiveDateTime,
        now: NaiveDateTime,
        rng: &mut R,
    ) -> Duration {
        let lead_secs = (now - canonical).num_seconds();
        let earliest = lead_secs.div_euclid(60) + 1;
        let lower = self.min_minutes.max(earliest);
        let upper = self.max_minutes;
        let minutes = if lower >= upper {
            upper
        } else {
            rng.gen_range(lower..=upper)
        };
        Duration::minutes(minutes)
    }
}

impl Default for JitterBounds {
    fn default() -> Self {
        Self::symmetric(10)
    }
}

// ============================================================================
// Core Algorithm
// ============================================================================

/// Find the first slot time satisfying both constraints
///
/// Returns the canonical time only; see [`next_schedule_time`] for jitter.
pub fn next_canonical_time(
    anchor: Option<NaiveDateTime>,
    slots: &SlotSet,
    min_gap: Duration,
    now: NaiveDateTime,
    horizon_days: u32,
) -> Option<NaiveDateTime> {
    if slots.is_empty() {
        return None;
    }

    let anchor = anchor.unwrap_or_else(|| now - Duration::days(1));
    let today = now.date();

    for day_offset in 0..=horizon_days {
        let Some(day) = today.checked_add_days(Days::new(u64::from(day_offset))) else {
            break;
        };
        for slot in slots.iter() {
            let Some(candidate) = slot.on(day) else {
                continue;
            };
            if candidate > now && candidate - anchor >= min_gap {
                return Some(candidate);
            }
        }
    }

    None
}

/// Compute the next publication time for a platform cursor
///
/// The jittered time is what the uploader receives; the canonical time is
/// what gets persisted as `last_schedule_time` after a successful upload.
pub fn next_schedule_time<R: Rng>(
    cursor: &PlatformCursor,
    slots: &SlotSet,
    min_gap: Duration,
    now: NaiveDateTime,
    jitter: JitterBounds,
    horizon_days: u32,
    rng: &mut R,
) -> Result<ScheduledSlot, NoSlotFound> {
    let canonical = next_canonical_time(cursor.last_schedule_time, slots, min_gap, now, horizon_days)
        .ok_or(NoSlotFound)?;
    let offset = jitter.draw(canonical, now, rng);

    Ok(ScheduledSlot {
        jittered: canonical + offset,
        canonical,
    })
}

// ============================================================================
// Upload Scheduler
// ============================================================================

/// Scheduling policy for one platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadScheduler {
    slots: SlotSet,
    min_gap: Duration,
    jitter: JitterBounds,
    horizon_days: u32,
}

impl UploadScheduler {
    /// Create a scheduler with default jitter (±10 min) and horizon (7 days)
    pub fn new(slots: SlotSet, min_gap: Duration) -> SchedulerResult<Self> {
        if min_gap < Duration::zero() {
            return Err(SchedulerError::InvalidGap {
                minutes: min_gap.num_minutes(),
            });
        }
        Ok(Self {
            slots,
            min_gap,
            jitter: JitterBounds::default(),
            horizon_days: DEFAULT_HORIZON_DAYS,
        })
    }

    /// Set jitter bounds
    pub fn with_jitter(mut self, jitter: JitterBounds) -> Self {
        self.jitter = jitter;
        self
    }

    /// Set look-ahead horizon
    pub fn with_horizon_days(mut self, days: u32) -> Self {
        self.horizon_days = days;
        self
    }

    pub fn slots(&self) -> &SlotSet {
        &self.slots
    }

    pub fn min_gap(&self) -> Duration {
        self.min_gap
    }

    pub fn jitter(&self) -> JitterBounds {
        self.jitter
    }

    pub fn horizon_days(&self) -> u32 {
        self.horizon_days
    }

    /// Compute the next publication time for `cursor`
    pub fn next<R: Rng>(
        &self,
        cursor: &PlatformCursor,
        now: NaiveDateTime,
        rng: &mut R,
    ) -> Result<ScheduledSlot, NoSlotFound> {
        next_schedule_time(
            cursor,
            &self.slots,
            self.min_gap,
            now,
            self.jitter,
            self.horizon_days,
            rng,
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
