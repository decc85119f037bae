//! Common test utilities

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::{HashSet, VecDeque};
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use tempfile::TempDir;

use nichecast::config::Config;
use nichecast::niche::{Niche, NicheCatalog};
use nichecast::render::{RenderError, RenderRequest, Renderer};
use nichecast::upload::{UploadError, UploadRequest, Uploader};

/// Local date-time on a January 2024 day
pub fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, day)
        .unwrap()
        .and_hms_opt(hour, minute, 0)
        .unwrap()
}

// ============================================================================
// Niche Fixture
// ============================================================================

/// A niche named `Cats` inside a temporary niches directory
pub struct NicheFixture {
    pub dir: TempDir,
    pub config: Config,
    pub niche: Niche,
}

impl NicheFixture {
    /// Niche with three assets, three captions, two audio tracks and credentials
    pub fn new() -> Self {
        let fixture = Self::empty();
        let niche = &fixture.niche;

        for name in ["cat1.jpg", "cat2.png", "cat3.jpeg"] {
            fs::write(niche.assets_dir().join(name), b"img").unwrap();
        }
        for name in ["beat.mp3", "lofi.mp3"] {
            fs::write(niche.audio_dir().join(name), b"mp3").unwrap();
        }
        fs::write(
            niche.captions_file(),
            "When the cat wins\n- Gravity check\n\nMonday again\n- Coffee first\n\nNap time\n",
        )
        .unwrap();
        fixture.write_credentials(r##"{"hashtags": "#cats #memes"}"##);

        fixture
    }

    /// Niche with the directory structure but no content and no credentials
    pub fn empty() -> Self {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.paths.niches_dir = dir.path().to_path_buf();

        let niche = NicheCatalog::new(dir.path(), config.layout.clone())
            .init("Cats")
            .unwrap();

        Self { dir, config, niche }
    }

    pub fn write_credentials(&self, json: &str) {
        fs::write(self.niche.root().join("credentials.json"), json).unwrap();
    }

    /// Reopen the niche so newly created files are resolved
    pub fn reopen(&self) -> Niche {
        Niche::open(self.niche.root(), &self.config.layout).unwrap()
    }

    /// Drop an artifact into the output directory
    pub fn add_artifact(&self, number: u32) -> PathBuf {
        let path = self
            .niche
            .output_dir()
            .join(self.config.generation.artifact_pattern().file_name(number));
        fs::write(&path, b"video").unwrap();
        path
    }

    /// Sorted file names in the output directory
    pub fn output_files(&self) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(self.niche.output_dir())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}

// ============================================================================
// Fake Renderer
// ============================================================================

/// Writes a small file per request; selected calls fail
#[derive(Default)]
pub struct FakeRenderer {
    failing_calls: HashSet<usize>,
    requests: Mutex<Vec<RenderRequest>>,
}

impl FakeRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the given calls (1-based)
    pub fn failing_calls(calls: impl IntoIterator<Item = usize>) -> Self {
        Self {
            failing_calls: calls.into_iter().collect(),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<RenderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Renderer for FakeRenderer {
    fn name(&self) -> &str {
        "fake"
    }

    async fn render(&self, request: &RenderRequest) -> Result<PathBuf, RenderError> {
        let call = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request.clone());
            requests.len()
        };

        if self.failing_calls.contains(&call) {
            return Err(RenderError::Failed(format!("call {call} failed")));
        }

        fs::write(&request.output, format!("part {}", request.part))
            .map_err(|e| RenderError::Failed(e.to_string()))?;
        Ok(request.output.clone())
    }
}

// ============================================================================
// Fake Uploader
// ============================================================================

/// Scripted answer of one upload call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Accept,
    Reject,
    Error,
}

/// Recorded upload call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadCall {
    pub platform: String,
    pub artifact: PathBuf,
    pub schedule: NaiveDateTime,
}

/// Answers from a script (then accepts); some platforms always fail
#[derive(Default)]
pub struct FakeUploader {
    script: Mutex<VecDeque<Outcome>>,
    failing_platforms: HashSet<String>,
    calls: Mutex<Vec<UploadCall>>,
}

impl FakeUploader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scripted(outcomes: impl IntoIterator<Item = Outcome>) -> Self {
        Self {
            script: Mutex::new(outcomes.into_iter().collect()),
            ..Self::default()
        }
    }

    pub fn failing_platform(mut self, platform: &str) -> Self {
        self.failing_platforms.insert(platform.to_string());
        self
    }

    pub fn calls(&self) -> Vec<UploadCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Uploader for FakeUploader {
    async fn upload(&self, request: UploadRequest<'_>) -> Result<bool, UploadError> {
        self.calls.lock().unwrap().push(UploadCall {
            platform: request.platform.to_string(),
            artifact: request.artifact.to_path_buf(),
            schedule: request.schedule,
        });

        if self.failing_platforms.contains(request.platform) {
            return Err(UploadError::Failed("platform down".to_string()));
        }

        let outcome = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Outcome::Accept);
        match outcome {
            Outcome::Accept => Ok(true),
            Outcome::Reject => Ok(false),
            Outcome::Error => Err(UploadError::Failed("quota exceeded".to_string())),
        }
    }
}
