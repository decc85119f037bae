//! Wall-clock source
//!
//! Scheduling works on naive local time. The orchestrator asks the clock
//! once per iteration, so tests swap in a fixed clock.

use chrono::{Local, NaiveDateTime};

/// Source of the current local time
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// Local system clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Clock frozen at a given instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}
