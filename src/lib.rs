//! nichecast - resumable artifact numbering and slot-based upload scheduling
//!
//! Coordinates generated short-form media across independent content niches:
//! every niche numbers its artifacts deterministically from what is on disk,
//! and every platform publishes them at spaced-out, configurable times of day
//! while surviving process restarts.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - Configuration management and settings
//! - [`niche`] - Niche context: directory layout, credentials, discovery
//! - [`ledger`] - Artifact numbering derived from the filesystem
//! - [`state`] - Persisted per-niche cursors with atomic writes and locking
//! - [`selector`] - Random selection of assets, captions and audio tracks
//! - [`render`] - Renderer seam and the external-command renderer
//! - [`pipeline`] - Batch generation of new artifacts
//! - [`scheduler`] - Slot-based publication time computation
//! - [`upload`] - Uploader seam and the per-platform upload orchestrator
//! - [`external`] - Shared runner for external programs
//!
//! # Example
//!
//! ```no_run
//! use nichecast::config::Config;
//! use nichecast::niche::Niche;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Config::load(None)?;
//!     let niche = Niche::open(config.paths.niches_dir.join("Cats"), &config.layout)?;
//!     let state = niche.load_state()?;
//!     println!("next part: {}", state.generation_cursor);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod external;
pub mod ledger;
pub mod niche;
pub mod pipeline;
pub mod render;
pub mod scheduler;
pub mod selector;
pub mod state;
pub mod upload;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::{Error, ErrorCategory, NichecastErrorTrait, Result};
    pub use crate::ledger::ArtifactPattern;
    pub use crate::niche::{Credentials, Niche, NicheCatalog};
    pub use crate::pipeline::{GenerationPipeline, GenerationReport};
    pub use crate::render::{RenderRequest, Renderer};
    pub use crate::scheduler::{
        Clock, JitterBounds, NoSlotFound, ScheduledSlot, SlotSet, SystemClock, TimeSlot,
        UploadScheduler,
    };
    pub use crate::state::{NicheState, PlatformCursor, StateStore};
    pub use crate::upload::{PlatformTarget, UploadOrchestrator, UploadReport, Uploader};
}

// Direct re-exports for convenience
pub use state::{NicheState, PlatformCursor};
pub use error::{Error, Result};
