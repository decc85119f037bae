//! Artifact numbering derived from the filesystem
//!
//! The output directory is the only source of truth for artifact numbers.
//! Nothing is cached: every call rescans, so an artifact that is half
//! written still counts and externally deleted artifacts leave gaps that
//! are never refilled.
//!
//! # Example
//!
//! ```no_run
//! use nichecast::ledger::{next_number, ArtifactPattern};
//!
//! let pattern = ArtifactPattern::new("meme", ".mp4", 4);
//! let next = next_number("./niches/Cats/final_videos", &pattern)?;
//! println!("next artifact: {}", pattern.file_name(next));
//! # Ok::<(), std::io::Error>(())
//! ```

use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static DIGIT_RUN_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").unwrap());

// ============================================================================
// Artifact Pattern
// ============================================================================

/// Naming scheme `<prefix>_<number><suffix>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPattern {
    prefix: String,
    suffix: String,
    width: usize,
}

impl ArtifactPattern {
    /// Create a pattern; `width` is the zero-padding of rendered names
    pub fn new(prefix: impl Into<String>, suffix: impl Into<String>, width: usize) -> Self {
        Self {
            prefix: prefix.into(),
            suffix: suffix.into(),
            width,
        }
    }

    /// Same prefix and width, different suffix
    pub fn with_suffix(&self, suffix: impl Into<String>) -> Self {
        Self {
            prefix: self.prefix.clone(),
            suffix: suffix.into(),
            width: self.width,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Extract the sequence number if `file_name` follows the pattern
    ///
    /// The number is the first digit run after `"<prefix>_"`.
    pub fn matches(&self, file_name: &str) -> Option<u32> {
        let rest = file_name
            .strip_prefix(self.prefix.as_str())?
            .strip_prefix('_')?;
        let stem = rest.strip_suffix(self.suffix.as_str())?;
        let digits = DIGIT_RUN_REGEX.find(stem)?;
        digits.as_str().parse().ok()
    }

    /// Render the file name of artifact `number`
    pub fn file_name(&self, number: u32) -> String {
        format!(
            "{}_{:0width$}{}",
            self.prefix,
            number,
            self.suffix,
            width = self.width
        )
    }
}

// ============================================================================
// Scanning
// ============================================================================

/// Map every matching artifact in `dir` to its number
///
/// A missing directory is empty. When several files share a number (an
/// artifact family), the lexicographically first path is kept.
pub fn scan_artifacts(
    dir: impl AsRef<Path>,
    pattern: &ArtifactPattern,
) -> io::Result<BTreeMap<u32, PathBuf>> {
    let dir = dir.as_ref();
    let mut found = BTreeMap::new();

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::debug!(dir = %dir.display(), "Artifact directory missing, treating as empty");
            return Ok(found);
        }
        Err(e) => return Err(e),
    };

    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if let Some(number) = pattern.matches(name) {
            found
                .entry(number)
                .and_modify(|existing: &mut PathBuf| {
                    if path < *existing {
                        *existing = path.clone();
                    }
                })
                .or_insert_with(|| path.clone());
        }
    }

    tracing::debug!(dir = %dir.display(), count = found.len(), "Scanned artifacts");
    Ok(found)
}

/// Sorted set of artifact numbers present in `dir`
pub fn scan_numbers(dir: impl AsRef<Path>, pattern: &ArtifactPattern) -> io::Result<BTreeSet<u32>> {
    Ok(scan_artifacts(dir, pattern)?.into_keys().collect())
}

/// Highest artifact number present, if any
pub fn last_number(dir: impl AsRef<Path>, pattern: &ArtifactPattern) -> io::Result<Option<u32>> {
    Ok(scan_numbers(dir, pattern)?.last().copied())
}

/// `max(numbers) + 1`, or 1 when nothing matches
pub fn next_number(dir: impl AsRef<Path>, pattern: &ArtifactPattern) -> io::Result<u32> {
    Ok(last_number(dir, pattern)?.map_or(1, |n| n.saturating_add(1)))
}

// ============================================================================
// Tests
// ============================================================================
