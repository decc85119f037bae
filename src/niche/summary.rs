//! Read-only status of a niche

use chrono::NaiveDateTime;

use super::Niche;
use crate::error::Result;
use crate::ledger::{self, ArtifactPattern};
use crate::state::PlatformCursor;

/// Progress of one platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformSummary {
    pub platform: String,
    pub last_published_number: Option<u32>,
    pub last_schedule_time: Option<NaiveDateTime>,
    /// Artifacts present on disk that this platform has not published yet
    pub pending: usize,
}

/// Snapshot of a niche for the status command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NicheSummary {
    pub name: String,
    pub last_generated: Option<u32>,
    pub generation_cursor: u32,
    pub platforms: Vec<PlatformSummary>,
}

impl NicheSummary {
    /// Collect the summary; `platforms` pairs each id with its artifact pattern
    pub fn collect(
        niche: &Niche,
        generated: &ArtifactPattern,
        platforms: &[(String, ArtifactPattern)],
    ) -> Result<Self> {
        let state = niche.load_state()?;
        let last_generated = ledger::last_number(niche.output_dir(), generated)?;

        let mut summaries = Vec::with_capacity(platforms.len());
        for (platform, pattern) in platforms {
            let cursor: PlatformCursor = state.cursor(platform);
            let available = ledger::scan_numbers(niche.output_dir(), pattern)?;
            let pending = match cursor.last_published_number {
                Some(last) => available.range(last.saturating_add(1)..).count(),
                None => available.len(),
            };
            summaries.push(PlatformSummary {
                platform: platform.clone(),
                last_published_number: cursor.last_published_number,
                last_schedule_time: cursor.last_schedule_time,
                pending,
            });
        }

        Ok(Self {
            name: niche.display_name().to_string(),
            last_generated,
            generation_cursor: state.generation_cursor,
            platforms: summaries,
        })
    }

    /// Format as display string
    pub fn display(&self, pattern: &ArtifactPattern) -> String {
        let mut lines = vec![format!("Niche {}:", self.name)];

        let last = self
            .last_generated
            .map(|n| pattern.file_name(n))
            .unwrap_or_else(|| "none".to_string());
        lines.push(format!("  Last generated:    {last}"));
        lines.push(format!("  Next part:         {}", self.generation_cursor));

        for platform in &self.platforms {
            let number = platform
                .last_published_number
                .map(|n| pattern.file_name(n))
                .unwrap_or_else(|| "none".to_string());
            let time = platform
                .last_schedule_time
                .map(|t| t.format("%H:%M (%d %b %Y)").to_string())
                .unwrap_or_else(|| "N/A".to_string());
            lines.push(format!(
                "  {:<18} {number} @ {time}, {} pending",
                format!("{}:", platform.platform),
                platform.pending
            ));
        }

        lines.join("\n")
    }
}
