//! Uploading artifacts to platforms
//!
//! # Modules
//!
//! - [`command`] - Uploader backed by configured external programs
//! - [`orchestrator`] - Per-platform batch loop with durable cursor updates
//!
//! The orchestrator talks to platforms only through the [`Uploader`] trait.
//! An uploader returns `Ok(true)` when the platform accepted the artifact;
//! `Ok(false)` and `Err(_)` both count as a failed attempt and never move
//! the platform cursor.

pub mod command;
pub mod orchestrator;

pub use command::CommandUploader;
pub use orchestrator::{
    next_candidate, PublishedItem, StopReason, UploadFailure, UploadOrchestrator, UploadReport,
};

use async_trait::async_trait;
use chrono::NaiveDateTime;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::external::CommandError;
use crate::ledger::ArtifactPattern;
use crate::niche::Credentials;
use crate::scheduler::UploadScheduler;

// ============================================================================
// Uploader Seam
// ============================================================================

/// One upload attempt
#[derive(Debug, Clone, Copy)]
pub struct UploadRequest<'a> {
    /// Platform id, e.g. `youtube`
    pub platform: &'a str,

    /// Artifact file to publish
    pub artifact: &'a Path,

    /// Jittered publication time
    pub schedule: NaiveDateTime,

    /// Niche credentials
    pub credentials: &'a Credentials,
}

/// Failure of one upload attempt
#[derive(Error, Debug)]
pub enum UploadError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("Artifact {} does not exist", path.display())]
    MissingArtifact { path: PathBuf },

    #[error("No uploader configured for platform '{platform}'")]
    NoCommandForPlatform { platform: String },

    #[error("{0}")]
    Failed(String),
}

/// Publishes artifacts to a platform
#[async_trait]
pub trait Uploader: Send + Sync {
    /// Upload one artifact; `Ok(false)` means the platform refused it
    async fn upload(&self, request: UploadRequest<'_>) -> Result<bool, UploadError>;
}

// ============================================================================
// Platform Target
// ============================================================================

/// A platform id with its scheduling policy and artifact naming
#[derive(Debug, Clone)]
pub struct PlatformTarget {
    id: String,
    scheduler: UploadScheduler,
    pattern: ArtifactPattern,
}

impl PlatformTarget {
    pub fn new(id: impl Into<String>, scheduler: UploadScheduler, pattern: ArtifactPattern) -> Self {
        Self {
            id: id.into(),
            scheduler,
            pattern,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn scheduler(&self) -> &UploadScheduler {
        &self.scheduler
    }

    /// Naming of the files this platform uploads
    pub fn pattern(&self) -> &ArtifactPattern {
        &self.pattern
    }
}
