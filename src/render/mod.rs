//! Renderer seam
//!
//! The renderer turns a source asset, a caption and an audio track into
//! one artifact file. The pipeline only depends on the [`Renderer`] trait;
//! [`CommandRenderer`] delegates to a configured external program.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;

use crate::external::{run_command, CommandConfig, CommandError};

/// Everything the renderer needs for one artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRequest {
    /// Source image
    pub asset: PathBuf,

    /// Caption text burned into the artifact
    pub caption: String,

    /// Background audio track
    pub audio: PathBuf,

    /// Sequence number from the ledger
    pub number: u32,

    /// "Part N" label from the generation cursor
    pub part: u32,

    /// Where the artifact must be written
    pub output: PathBuf,
}

/// Rendering failed for one artifact
#[derive(Error, Debug)]
pub enum RenderError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("Renderer reported success but {} was not written", path.display())]
    MissingOutput { path: PathBuf },

    #[error("{0}")]
    Failed(String),
}

/// Produces artifacts
///
/// Implementations must write the artifact to `request.output` (or another
/// path they return) before returning `Ok`.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Render one artifact and return its path
    async fn render(&self, request: &RenderRequest) -> Result<PathBuf, RenderError>;
}

// ============================================================================
// Command Renderer
// ============================================================================

/// Renderer backed by an external program
///
/// Argument placeholders: `{asset}`, `{caption}`, `{audio}`, `{number}`,
/// `{part}`, `{output}`.
#[derive(Debug, Clone)]
pub struct CommandRenderer {
    command: CommandConfig,
}

impl CommandRenderer {
    pub fn new(command: CommandConfig) -> Self {
        Self { command }
    }

    fn vars(request: &RenderRequest) -> BTreeMap<&'static str, String> {
        BTreeMap::from([
            ("asset", request.asset.display().to_string()),
            ("caption", request.caption.clone()),
            ("audio", request.audio.display().to_string()),
            ("number", request.number.to_string()),
            ("part", request.part.to_string()),
            ("output", request.output.display().to_string()),
        ])
    }
}

#[async_trait]
impl Renderer for CommandRenderer {
    fn name(&self) -> &str {
        &self.command.program
    }

    async fn render(&self, request: &RenderRequest) -> Result<PathBuf, RenderError> {
        run_command(&self.command, &Self::vars(request)).await?;

        if !request.output.exists() {
            return Err(RenderError::MissingOutput {
                path: request.output.clone(),
            });
        }
        Ok(request.output.clone())
    }
}
