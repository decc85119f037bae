//! Slot-based upload scheduling
//!
//! This module decides *when* a platform may publish its next artifact.
//!
//! # Overview
//!
//! Each platform is configured with a [`SlotSet`] (allowed times of day), a
//! minimum gap between publications and jitter bounds. Given the platform's
//! cursor, the scheduler walks forward day by day and slot by slot from
//! today and returns the first slot that is
//!
//! - strictly after `now`, and
//! - at least `min_gap` after the last *canonical* schedule time.
//!
//! The returned [`ScheduledSlot`] carries both the jittered time (handed to
//! the uploader) and the canonical slot time (persisted as the next anchor).
//!
//! ```text
//!   anchor            now                          canonical   jittered
//!     │                │                               │  ±jitter │
//! ────┼────────────────┼───────── slots ───────────────┼──────────┼────▶
//!     └──────────── >= min_gap ────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`slots`] - Time-of-day slots and ordered slot sets
//! - [`schedule`] - The next-time algorithm and [`UploadScheduler`]
//! - [`clock`] - Wall-clock abstraction
//! - [`error`] - Configuration errors
//!
//! # Quick Start
//!
//! ```
//! use chrono::{Duration, NaiveDate};
//! use nichecast::scheduler::{JitterBounds, SlotSet, UploadScheduler};
//! use nichecast::state::PlatformCursor;
//! use rand::SeedableRng;
//!
//! let scheduler = UploadScheduler::new(SlotSet::preset("set1").unwrap(), Duration::hours(2))
//!     .unwrap()
//!     .with_jitter(JitterBounds::symmetric(10));
//!
//! let now = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(10, 0, 0).unwrap();
//! let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(1);
//! let slot = scheduler.next(&PlatformCursor::default(), now, &mut rng).unwrap();
//! assert_eq!(slot.canonical.format("%H:%M").to_string(), "13:30");
//! ```
//!
//! # Configuration
//!
//! | Setting | Default | Description |
//! |---------|---------|-------------|
//! | `slot_set` | `set1` | Named slot set (`00:30, 13:30, 21:00`) |
//! | `min_gap_minutes` | 120 | Minimum spacing between canonical times |
//! | `jitter_min_minutes` | -10 | Lower jitter bound |
//! | `jitter_max_minutes` | 10 | Upper jitter bound |
//! | `horizon_days` | 7 | Days to look ahead (inclusive) |

pub mod clock;
pub mod error;
pub mod schedule;
pub mod slots;

// Re-export main types
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{SchedulerError, SchedulerResult};
pub use schedule::{
    next_canonical_time, next_schedule_time, JitterBounds, NoSlotFound, ScheduledSlot,
    UploadScheduler, DEFAULT_HORIZON_DAYS, MAX_JITTER_MINUTES,
};
pub use slots::{SlotSet, TimeSlot};
