//! Batch generation of new artifacts
//!
//! Each iteration numbers the artifact from the output directory, draws
//! content, renders, and on success advances and persists the generation
//! cursor before the next iteration starts. Failed or skipped iterations
//! leave the state untouched, so rerunning a partially completed batch
//! never renumbers anything.
//!
//! # Example
//!
//! ```no_run
//! use nichecast::config::Config;
//! use nichecast::niche::NicheCatalog;
//! use nichecast::pipeline::GenerationPipeline;
//! use nichecast::render::CommandRenderer;
//! use std::sync::Arc;
//!
//! # async fn example() -> nichecast::error::Result<()> {
//! let config = Config::default();
//! let catalog = NicheCatalog::new(&config.paths.niches_dir, config.layout.clone());
//! let niche = catalog.open("Cats")?;
//!
//! let renderer = Arc::new(CommandRenderer::new(config.renderer.clone()));
//! let pipeline = GenerationPipeline::new(renderer, config.generation.clone());
//! let report = pipeline.generate(&niche, 3, &mut rand::thread_rng()).await?;
//! println!("{}", report.display());
//! # Ok(())
//! # }
//! ```

use rand::Rng;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::GenerationConfig;
use crate::error::Result;
use crate::ledger;
use crate::niche::Niche;
use crate::render::{RenderRequest, Renderer};
use crate::selector::{CaptionPool, ContentSelector, FilePool, PoolKind};

// ============================================================================
// Report
// ============================================================================

/// Outcome of a generation batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationReport {
    pub requested: usize,
    /// Numbers of the artifacts written, in order
    pub created: Vec<u32>,
    /// Iterations where the renderer failed
    pub failed: usize,
    /// Iterations skipped because a pool was empty
    pub skipped: usize,
    pub elapsed: Duration,
}

impl GenerationReport {
    fn new(requested: usize) -> Self {
        Self {
            requested,
            created: Vec::new(),
            failed: 0,
            skipped: 0,
            elapsed: Duration::ZERO,
        }
    }

    /// Format as display string
    pub fn display(&self) -> String {
        let mut line = format!(
            "Created {}/{} artifacts in {:.1}s",
            self.created.len(),
            self.requested,
            self.elapsed.as_secs_f64()
        );
        if !self.created.is_empty() {
            let numbers: Vec<String> = self.created.iter().map(|n| format!("#{n}")).collect();
            line.push_str(&format!(" ({})", numbers.join(", ")));
        }
        if self.failed > 0 {
            line.push_str(&format!(", {} failed", self.failed));
        }
        if self.skipped > 0 {
            line.push_str(&format!(", {} skipped", self.skipped));
        }
        line
    }
}

#[derive(Serialize)]
struct DescriptionFile<'a> {
    description: &'a str,
}

// ============================================================================
// Pipeline
// ============================================================================

/// Generates artifacts for a niche through a [`Renderer`]
pub struct GenerationPipeline {
    renderer: Arc<dyn Renderer>,
    generation: GenerationConfig,
}

impl GenerationPipeline {
    pub fn new(renderer: Arc<dyn Renderer>, generation: GenerationConfig) -> Self {
        Self {
            renderer,
            generation,
        }
    }

    /// Scan the three content pools of `niche`
    pub fn load_selector(&self, niche: &Niche) -> Result<ContentSelector> {
        let assets = FilePool::scan(
            PoolKind::Asset,
            niche.assets_dir(),
            self.generation.asset_extensions.as_slice(),
        )?;
        let captions = CaptionPool::load(niche.captions_file())?;
        let audio = FilePool::scan(
            PoolKind::Audio,
            niche.audio_dir(),
            self.generation.audio_extensions.as_slice(),
        )?;
        Ok(ContentSelector::new(assets, captions, audio))
    }

    /// Try to produce `count` artifacts
    ///
    /// Takes the niche lock for the whole batch. Only state and filesystem
    /// errors abort; empty pools and render failures are counted per
    /// iteration.
    pub async fn generate<R: Rng>(
        &self,
        niche: &Niche,
        count: usize,
        rng: &mut R,
    ) -> Result<GenerationReport> {
        let start = Instant::now();
        let _lock = niche.lock()?;

        fs::create_dir_all(niche.output_dir())?;
        let hashtags = niche
            .credentials_opt()?
            .and_then(|c| c.hashtags().map(str::to_string));
        let selector = self.load_selector(niche)?;

        let family = self.generation.family_pattern();
        let artifacts = self.generation.artifact_pattern();
        let descriptions = self.generation.description_pattern();
        let mut report = GenerationReport::new(count);

        tracing::info!(
            niche = niche.display_name(),
            count,
            assets = selector.assets().len(),
            captions = selector.captions().len(),
            audio = selector.audio().len(),
            "Starting generation batch"
        );

        for iteration in 1..=count {
            let mut state = niche.load_state()?;
            let number = ledger::next_number(niche.output_dir(), &family)?;
            if state.ensure_generation_at_least(number) {
                tracing::debug!(
                    niche = niche.display_name(),
                    cursor = state.generation_cursor,
                    "Raised generation cursor to match output directory"
                );
            }

            let selection = match selector.select(rng) {
                Ok(selection) => selection,
                Err(e) => {
                    tracing::warn!(
                        niche = niche.display_name(),
                        iteration,
                        error = %e,
                        "Skipping iteration"
                    );
                    report.skipped += 1;
                    continue;
                }
            };

            let request = RenderRequest {
                asset: selection.asset,
                caption: selection.caption.text.clone(),
                audio: selection.audio,
                number,
                part: state.generation_cursor,
                output: niche.output_dir().join(artifacts.file_name(number)),
            };

            tracing::info!(
                niche = niche.display_name(),
                iteration,
                number,
                part = request.part,
                asset = %request.asset.display(),
                "Rendering artifact"
            );

            let path = match self.renderer.render(&request).await {
                Ok(path) => path,
                Err(e) => {
                    tracing::warn!(
                        niche = niche.display_name(),
                        number,
                        renderer = self.renderer.name(),
                        error = %e,
                        "Render failed"
                    );
                    report.failed += 1;
                    continue;
                }
            };

            let description_path = niche.descriptions_dir().join(descriptions.file_name(number));
            let description = compose_description(&selection.caption.description, hashtags.as_deref());
            if let Err(e) = write_description(&description_path, &description) {
                tracing::warn!(
                    niche = niche.display_name(),
                    number,
                    path = %description_path.display(),
                    error = %e,
                    "Failed to write description"
                );
            }

            state.advance_generation();
            niche.save_state(&state)?;

            tracing::info!(
                niche = niche.display_name(),
                number,
                path = %path.display(),
                "Artifact created"
            );
            report.created.push(number);
        }

        report.elapsed = start.elapsed();
        tracing::info!(
            niche = niche.display_name(),
            created = report.created.len(),
            requested = count,
            failed = report.failed,
            skipped = report.skipped,
            "Generation batch finished"
        );
        Ok(report)
    }
}

/// `"<description> <hashtags>"`, skipping empty parts
fn compose_description(description: &str, hashtags: Option<&str>) -> String {
    [description.trim(), hashtags.unwrap_or_default()]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn write_description(path: &Path, description: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, &DescriptionFile { description })?;
    writer.flush()
}
