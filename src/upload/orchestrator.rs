//! Per-platform upload batches
//!
//! Every iteration re-reads the niche state and the output directory, picks
//! the smallest artifact number above the platform cursor, asks the
//! scheduler for a slot and hands both to the uploader. The cursor moves
//! only after the uploader confirms, and is persisted before the next
//! iteration starts, so an interrupted batch resumes exactly where it
//! stopped.
//!
//! ```text
//!   UNSET ──upload ok──▶ ADVANCING ──upload ok──▶ ADVANCING ...
//!     │                      │
//!     └──failure: stays──────┴──failure: stays
//! ```

use chrono::NaiveDateTime;
use rand::Rng;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use super::{PlatformTarget, UploadRequest, Uploader};
use crate::error::Result;
use crate::ledger;
use crate::niche::{Credentials, Niche};
use crate::scheduler::Clock;

// ============================================================================
// Report Types
// ============================================================================

/// One confirmed publication
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedItem {
    pub number: u32,
    pub path: PathBuf,
    pub jittered: NaiveDateTime,
    pub canonical: NaiveDateTime,
}

/// One failed attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFailure {
    pub number: u32,
    pub reason: String,
}

/// Why a batch ended before reaching the requested count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// No artifact above the cursor is left
    Exhausted,
    /// The scheduler found no slot within the horizon
    NoSlotFound,
    /// An upload failed and the batch does not continue on failure
    UploadFailed { number: u32 },
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exhausted => write!(f, "no more artifacts to upload"),
            Self::NoSlotFound => write!(f, "no schedule slot within the horizon"),
            Self::UploadFailed { number } => write!(f, "upload of #{number} failed"),
        }
    }
}

/// Outcome of one platform batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReport {
    pub platform: String,
    pub requested: usize,
    pub published: Vec<PublishedItem>,
    pub failures: Vec<UploadFailure>,
    pub stop: Option<StopReason>,
}

impl UploadReport {
    fn new(platform: &str, requested: usize) -> Self {
        Self {
            platform: platform.to_string(),
            requested,
            published: Vec::new(),
            failures: Vec::new(),
            stop: None,
        }
    }

    /// Number of confirmed publications
    pub fn succeeded(&self) -> usize {
        self.published.len()
    }

    /// Format as display string
    pub fn display(&self) -> String {
        let mut lines = vec![format!(
            "{}: {}/{} uploaded",
            self.platform,
            self.succeeded(),
            self.requested
        )];
        for item in &self.published {
            let name = item
                .path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| item.path.display().to_string());
            lines.push(format!(
                "  #{:<5} {} @ {} (slot {})",
                item.number,
                name,
                item.jittered.format("%Y-%m-%d %H:%M"),
                item.canonical.format("%H:%M")
            ));
        }
        for failure in &self.failures {
            lines.push(format!("  #{:<5} failed: {}", failure.number, failure.reason));
        }
        if let Some(stop) = self.stop {
            lines.push(format!("  stopped: {stop}"));
        }
        lines.join("\n")
    }
}

// ============================================================================
// Candidate Selection
// ============================================================================

/// Smallest available number above `last`, or the smallest at all if unset
pub fn next_candidate(available: impl IntoIterator<Item = u32>, last: Option<u32>) -> Option<u32> {
    available
        .into_iter()
        .filter(|&n| last.map_or(true, |l| n > l))
        .min()
}

// ============================================================================
// Orchestrator
// ============================================================================

/// Runs upload batches against an [`Uploader`]
pub struct UploadOrchestrator {
    uploader: Arc<dyn Uploader>,
    clock: Arc<dyn Clock>,
    continue_on_failure: bool,
}

impl UploadOrchestrator {
    pub fn new(uploader: Arc<dyn Uploader>, clock: Arc<dyn Clock>) -> Self {
        Self {
            uploader,
            clock,
            continue_on_failure: false,
        }
    }

    /// Keep iterating after a failed upload; the same artifact is retried
    pub fn with_continue_on_failure(mut self, enabled: bool) -> Self {
        self.continue_on_failure = enabled;
        self
    }

    /// Upload up to `count` artifacts to one platform
    ///
    /// Loads credentials and takes the niche lock before anything else.
    pub async fn run<R: Rng>(
        &self,
        niche: &Niche,
        target: &PlatformTarget,
        count: usize,
        rng: &mut R,
    ) -> Result<UploadReport> {
        let credentials = niche.credentials()?;
        let _lock = niche.lock()?;
        self.run_locked(niche, target, &credentials, count, rng).await
    }

    /// Run several platforms one after another under a single lock
    ///
    /// Each platform has its own cursor; a failure on one does not affect
    /// the others.
    pub async fn run_platforms<R: Rng>(
        &self,
        niche: &Niche,
        targets: &[PlatformTarget],
        count: usize,
        rng: &mut R,
    ) -> Result<Vec<UploadReport>> {
        let credentials = niche.credentials()?;
        let _lock = niche.lock()?;

        let mut reports = Vec::with_capacity(targets.len());
        for target in targets {
            reports.push(
                self.run_locked(niche, target, &credentials, count, rng)
                    .await?,
            );
        }
        Ok(reports)
    }

    /// Batch loop; the caller must hold the niche lock
    pub async fn run_locked<R: Rng>(
        &self,
        niche: &Niche,
        target: &PlatformTarget,
        credentials: &Credentials,
        count: usize,
        rng: &mut R,
    ) -> Result<UploadReport> {
        let start = Instant::now();
        let platform = target.id();
        let mut report = UploadReport::new(platform, count);

        tracing::info!(niche = niche.display_name(), platform, count, "Starting upload batch");

        for _ in 0..count {
            let mut state = niche.load_state()?;
            let cursor = state.cursor(platform);
            let available = ledger::scan_artifacts(niche.output_dir(), target.pattern())?;

            let Some(number) =
                next_candidate(available.keys().copied(), cursor.last_published_number)
            else {
                tracing::info!(
                    niche = niche.display_name(),
                    platform,
                    last = ?cursor.last_published_number,
                    "No more artifacts to upload"
                );
                report.stop = Some(StopReason::Exhausted);
                break;
            };
            let path = available[&number].clone();

            let now = self.clock.now();
            let slot = match target.scheduler().next(&cursor, now, rng) {
                Ok(slot) => slot,
                Err(no_slot) => {
                    tracing::warn!(
                        niche = niche.display_name(),
                        platform,
                        number,
                        anchor = ?cursor.last_schedule_time,
                        "{no_slot}"
                    );
                    report.stop = Some(StopReason::NoSlotFound);
                    break;
                }
            };

            tracing::info!(
                niche = niche.display_name(),
                platform,
                number,
                schedule = %slot.jittered,
                canonical = %slot.canonical,
                "Scheduling upload"
            );

            let outcome = self
                .uploader
                .upload(UploadRequest {
                    platform,
                    artifact: &path,
                    schedule: slot.jittered,
                    credentials,
                })
                .await;

            let reason = match outcome {
                Ok(true) => {
                    state.record_publication(platform, number, slot.canonical)?;
                    niche.save_state(&state)?;
                    tracing::info!(niche = niche.display_name(), platform, number, "Upload confirmed");
                    report.published.push(PublishedItem {
                        number,
                        path,
                        jittered: slot.jittered,
                        canonical: slot.canonical,
                    });
                    continue;
                }
                Ok(false) => "platform rejected the upload".to_string(),
                Err(e) => e.to_string(),
            };

            tracing::warn!(
                niche = niche.display_name(),
                platform,
                number,
                error = %reason,
                "Upload failed"
            );
            report.failures.push(UploadFailure { number, reason });
            if !self.continue_on_failure {
                report.stop = Some(StopReason::UploadFailed { number });
                break;
            }
        }

        tracing::info!(
            niche = niche.display_name(),
            platform,
            uploaded = report.succeeded(),
            requested = count,
            failed = report.failures.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Upload batch finished"
        );
        Ok(report)
    }
}
