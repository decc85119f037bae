//! Random selection of source assets, captions and audio tracks
//!
//! Pools are scanned once and then sampled uniformly. The RNG is always
//! injected so that a seeded generator reproduces a run exactly; pool
//! contents are sorted for the same reason.
//!
//! # Caption file format
//!
//! Entries are separated by a blank line. The first line of an entry is the
//! caption; an optional second line is the description:
//!
//! ```text
//! When the cat knocks the glass off the table
//! - Gravity check complete
//!
//! Monday again
//! ```

use rand::seq::SliceRandom;
use rand::Rng;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File extensions accepted as source assets by default
pub const DEFAULT_ASSET_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// File extensions accepted as audio tracks by default
pub const DEFAULT_AUDIO_EXTENSIONS: &[&str] = &["mp3"];

// ============================================================================
// Errors
// ============================================================================

/// Which pool came up empty
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolKind {
    Asset,
    Caption,
    Audio,
}

impl fmt::Display for PoolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Asset => "asset",
            Self::Caption => "caption",
            Self::Audio => "audio",
        };
        write!(f, "{name}")
    }
}

/// A pool had zero eligible entries
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("No {kind} entries in {}", location.display())]
pub struct EmptyPoolError {
    pub kind: PoolKind,
    pub location: PathBuf,
}

impl EmptyPoolError {
    pub fn new(kind: PoolKind, location: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            location: location.into(),
        }
    }
}

// ============================================================================
// File Pools
// ============================================================================

/// Files of one kind inside a directory
#[derive(Debug, Clone)]
pub struct FilePool {
    kind: PoolKind,
    location: PathBuf,
    files: Vec<PathBuf>,
}

impl FilePool {
    /// Scan `dir` for non-hidden files with one of `extensions`
    ///
    /// Extensions are compared case-insensitively and without the dot. A
    /// missing directory is an empty pool.
    pub fn scan<S: AsRef<str>>(
        kind: PoolKind,
        dir: impl AsRef<Path>,
        extensions: &[S],
    ) -> io::Result<Self> {
        let dir = dir.as_ref();
        let mut files = Vec::new();

        match fs::read_dir(dir) {
            Ok(entries) => {
                for entry in entries {
                    let path = entry?.path();
                    if path.is_file() && is_eligible(&path, extensions) {
                        files.push(path);
                    }
                }
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }

        files.sort();
        tracing::debug!(kind = %kind, dir = %dir.display(), count = files.len(), "Scanned pool");

        Ok(Self {
            kind,
            location: dir.to_path_buf(),
            files,
        })
    }

    /// Build a pool from explicit paths
    pub fn from_files(kind: PoolKind, location: impl Into<PathBuf>, mut files: Vec<PathBuf>) -> Self {
        files.sort();
        Self {
            kind,
            location: location.into(),
            files,
        }
    }

    pub fn kind(&self) -> PoolKind {
        self.kind
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Pick one file uniformly at random
    pub fn pick<R: Rng>(&self, rng: &mut R) -> Result<&Path, EmptyPoolError> {
        self.files
            .choose(rng)
            .map(PathBuf::as_path)
            .ok_or_else(|| EmptyPoolError::new(self.kind, &self.location))
    }
}

fn is_eligible<S: AsRef<str>>(path: &Path, extensions: &[S]) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    if name.starts_with('.') {
        return false;
    }
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            extensions
                .iter()
                .any(|allowed| allowed.as_ref().trim_start_matches('.').eq_ignore_ascii_case(ext))
        })
}

// ============================================================================
// Captions
// ============================================================================

/// One caption entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caption {
    /// Text burned into the artifact
    pub text: String,

    /// Description used in the upload metadata; may be empty
    pub description: String,
}

/// Parsed caption file
#[derive(Debug, Clone)]
pub struct CaptionPool {
    location: PathBuf,
    entries: Vec<Caption>,
}

impl CaptionPool {
    /// Load and parse a caption file; a missing file is an empty pool
    pub fn load(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e),
        };

        let pool = Self::parse(path, &content);
        tracing::debug!(path = %path.display(), count = pool.len(), "Loaded captions");
        Ok(pool)
    }

    /// Parse caption blocks from text
    pub fn parse(location: impl Into<PathBuf>, content: &str) -> Self {
        let normalized = content.replace("\r\n", "\n");
        let entries = normalized
            .split("\n\n")
            .map(str::trim)
            .filter(|block| !block.is_empty())
            .map(parse_block)
            .collect();

        Self {
            location: location.into(),
            entries,
        }
    }

    pub fn entries(&self) -> &[Caption] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Pick one caption uniformly at random
    pub fn pick<R: Rng>(&self, rng: &mut R) -> Result<&Caption, EmptyPoolError> {
        self.entries
            .choose(rng)
            .ok_or_else(|| EmptyPoolError::new(PoolKind::Caption, &self.location))
    }
}

fn parse_block(block: &str) -> Caption {
    let mut lines = block.lines();
    let text = lines.next().unwrap_or_default().trim().to_string();
    let description = lines
        .next()
        .map(|line| line.trim_matches(|c: char| c == '-' || c.is_whitespace()))
        .unwrap_or_default()
        .to_string();
    Caption { text, description }
}

// ============================================================================
// Content Selector
// ============================================================================

/// Everything needed to render one artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub asset: PathBuf,
    pub caption: Caption,
    pub audio: PathBuf,
}

/// The three pools of a niche
#[derive(Debug, Clone)]
pub struct ContentSelector {
    assets: FilePool,
    captions: CaptionPool,
    audio: FilePool,
}

impl ContentSelector {
    pub fn new(assets: FilePool, captions: CaptionPool, audio: FilePool) -> Self {
        Self {
            assets,
            captions,
            audio,
        }
    }

    pub fn assets(&self) -> &FilePool {
        &self.assets
    }

    pub fn captions(&self) -> &CaptionPool {
        &self.captions
    }

    pub fn audio(&self) -> &FilePool {
        &self.audio
    }

    pub fn pick_asset<R: Rng>(&self, rng: &mut R) -> Result<PathBuf, EmptyPoolError> {
        self.assets.pick(rng).map(Path::to_path_buf)
    }

    pub fn pick_caption<R: Rng>(&self, rng: &mut R) -> Result<Caption, EmptyPoolError> {
        self.captions.pick(rng).cloned()
    }

    pub fn pick_audio<R: Rng>(&self, rng: &mut R) -> Result<PathBuf, EmptyPoolError> {
        self.audio.pick(rng).map(Path::to_path_buf)
    }

    /// Draw asset, caption and audio in that order
    pub fn select<R: Rng>(&self, rng: &mut R) -> Result<Selection, EmptyPoolError> {
        Ok(Selection {
            asset: self.pick_asset(rng)?,
            caption: self.pick_caption(rng)?,
            audio: self.pick_audio(rng)?,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
