//! Configuration management for nichecast
//!
//! Configuration is read from a TOML file (every section optional), then
//! overridden from `NICHECAST_*` environment variables, then validated.
//!
//! ```toml
//! [paths]
//! niches_dir = "data/niches"
//!
//! [generation]
//! prefix = "meme"
//! number_width = 4
//!
//! [renderer]
//! program = "render-meme"
//! args = ["{asset}", "{caption}", "{audio}", "{output}", "--part", "{part}"]
//!
//! [upload.slot_sets]
//! weekend = ["11:00", "18:30"]
//!
//! [upload.platforms.youtube]
//! slot_set = "set1"
//! min_gap_minutes = 120
//! artifact_suffix = "_short.mp4"
//! uploader = { program = "yt-upload", args = ["{artifact}", "{schedule}", "{credentials}"] }
//! ```

use anyhow::{Context, Result};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::external::CommandConfig;
use crate::ledger::ArtifactPattern;
use crate::scheduler::{
    JitterBounds, SchedulerError, SchedulerResult, SlotSet, UploadScheduler, DEFAULT_HORIZON_DAYS,
};
use crate::selector::{DEFAULT_ASSET_EXTENSIONS, DEFAULT_AUDIO_EXTENSIONS};
use crate::upload::PlatformTarget;

/// Config file looked up in the working directory when none is given
pub const DEFAULT_CONFIG_FILE: &str = "nichecast.toml";

/// Slot set used by platforms that name none
pub const DEFAULT_SLOT_SET: &str = "set1";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Filesystem roots
    pub paths: PathsConfig,

    /// Names of the entries inside a niche directory
    pub layout: LayoutConfig,

    /// Artifact naming and pool filters
    pub generation: GenerationConfig,

    /// External renderer
    pub renderer: CommandConfig,

    /// Platforms and scheduling
    pub upload: UploadConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Filesystem roots
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory containing one subdirectory per niche
    pub niches_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            niches_dir: PathBuf::from("data/niches"),
        }
    }
}

/// Entry names inside a niche directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub assets_dir: String,
    pub captions_file: String,
    pub audio_dir: String,
    pub output_dir: String,
    pub descriptions_dir: String,
    pub state_file: String,
    pub credentials_file: String,

    /// Fall back to the capitalized legacy names when the defaults are absent
    pub legacy_fallback: bool,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            assets_dir: "raw_images".to_string(),
            captions_file: "quotes.txt".to_string(),
            audio_dir: "sounds".to_string(),
            output_dir: "final_videos".to_string(),
            descriptions_dir: "descriptions".to_string(),
            state_file: "state.json".to_string(),
            credentials_file: "credentials.json".to_string(),
            legacy_fallback: true,
        }
    }
}

/// Artifact naming and pool filters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// File name prefix; must not contain digits
    pub prefix: String,

    /// Zero-padding of the sequence number
    pub number_width: usize,

    /// Extension of the rendered artifact, including the dot
    pub artifact_extension: String,

    pub asset_extensions: Vec<String>,
    pub audio_extensions: Vec<String>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            prefix: "meme".to_string(),
            number_width: 4,
            artifact_extension: ".mp4".to_string(),
            asset_extensions: DEFAULT_ASSET_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            audio_extensions: DEFAULT_AUDIO_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl GenerationConfig {
    /// Pattern of rendered artifacts (`meme_0007.mp4`)
    pub fn artifact_pattern(&self) -> ArtifactPattern {
        ArtifactPattern::new(&self.prefix, &self.artifact_extension, self.number_width)
    }

    /// Pattern matching every file of an artifact family
    ///
    /// Used for numbering, so a half-written or differently-suffixed member
    /// still reserves its number.
    pub fn family_pattern(&self) -> ArtifactPattern {
        ArtifactPattern::new(&self.prefix, "", self.number_width)
    }

    /// Pattern of description sidecars (`meme_0007.json`)
    pub fn description_pattern(&self) -> ArtifactPattern {
        ArtifactPattern::new(&self.prefix, ".json", self.number_width)
    }
}

/// Platforms and scheduling
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Platform id to settings
    pub platforms: BTreeMap<String, PlatformConfig>,

    /// Named slot sets, in addition to the built-in presets
    pub slot_sets: BTreeMap<String, SlotSet>,

    /// Days the scheduler looks ahead (inclusive)
    pub horizon_days: u32,

    /// Keep going after a failed upload instead of ending the batch
    pub continue_on_failure: bool,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            platforms: BTreeMap::from([
                ("youtube".to_string(), PlatformConfig::default()),
                ("tiktok".to_string(), PlatformConfig::default()),
            ]),
            slot_sets: BTreeMap::new(),
            horizon_days: DEFAULT_HORIZON_DAYS,
            continue_on_failure: false,
        }
    }
}

/// Settings of one upload platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    /// Named slot set (preset or `[upload.slot_sets]`)
    pub slot_set: String,

    /// Inline slots; take precedence over `slot_set`
    pub slots: Option<SlotSet>,

    pub min_gap_minutes: i64,
    pub jitter_min_minutes: i64,
    pub jitter_max_minutes: i64,

    /// Suffix of the files this platform uploads; defaults to the artifact extension
    pub artifact_suffix: Option<String>,

    /// External uploader
    pub uploader: CommandConfig,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            slot_set: DEFAULT_SLOT_SET.to_string(),
            slots: None,
            min_gap_minutes: 120,
            jitter_min_minutes: -10,
            jitter_max_minutes: 10,
            artifact_suffix: None,
            uploader: CommandConfig::default(),
        }
    }
}

impl PlatformConfig {
    pub fn min_gap(&self) -> SchedulerResult<Duration> {
        Duration::try_minutes(self.min_gap_minutes).ok_or(SchedulerError::InvalidGap {
            minutes: self.min_gap_minutes,
        })
    }

    pub fn jitter(&self) -> SchedulerResult<JitterBounds> {
        JitterBounds::new(self.jitter_min_minutes, self.jitter_max_minutes)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

impl Config {
    /// Load from `path`, or from `nichecast.toml` if present, or defaults
    ///
    /// Environment overrides are applied and the result is validated.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };

        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults plus environment overrides
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        Ok(config)
    }

    /// Apply `NICHECAST_*` environment overrides
    pub fn apply_env(&mut self) -> Result<()> {
        if let Ok(dir) = std::env::var("NICHECAST_NICHES_DIR") {
            self.paths.niches_dir = PathBuf::from(dir);
        }

        if let Ok(level) = std::env::var("NICHECAST_LOG_LEVEL") {
            self.logging.level = level;
        }

        if let Ok(format) = std::env::var("NICHECAST_LOG_FORMAT") {
            self.logging.format = format;
        }

        if let Ok(days) = std::env::var("NICHECAST_HORIZON_DAYS") {
            self.upload.horizon_days = days
                .trim()
                .parse()
                .with_context(|| format!("NICHECAST_HORIZON_DAYS is not a number: {days}"))?;
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let prefix = &self.generation.prefix;
        if prefix.is_empty() {
            anyhow::bail!("generation.prefix must not be empty");
        }
        if prefix.chars().any(|c| c.is_ascii_digit() || c == '/' || c == '\\') {
            anyhow::bail!("generation.prefix '{prefix}' must not contain digits or path separators");
        }

        if !(1..=10).contains(&self.generation.number_width) {
            anyhow::bail!("generation.number_width must be between 1 and 10");
        }

        if !matches!(self.logging.format.as_str(), "text" | "json") {
            anyhow::bail!(
                "logging.format must be 'text' or 'json', got '{}'",
                self.logging.format
            );
        }

        for (id, platform) in &self.upload.platforms {
            if id.trim().is_empty() {
                anyhow::bail!("platform ids must not be empty");
            }
            self.scheduler_for(platform, None)
                .with_context(|| format!("Invalid settings for platform '{id}'"))?;
        }

        Ok(())
    }

    /// Resolve a slot set by name: configured sets first, then presets
    pub fn slot_set(&self, name: &str) -> SchedulerResult<SlotSet> {
        if let Some(set) = self.upload.slot_sets.get(name) {
            return Ok(set.clone());
        }
        SlotSet::preset(name).ok_or_else(|| {
            let mut available: Vec<String> = self.upload.slot_sets.keys().cloned().collect();
            available.extend(SlotSet::presets().into_iter().map(|(n, _)| n.to_string()));
            SchedulerError::unknown_slot_set(name, available)
        })
    }

    /// Build the scheduler of a platform, optionally forcing a slot set
    pub fn scheduler_for(
        &self,
        platform: &PlatformConfig,
        slot_override: Option<&str>,
    ) -> SchedulerResult<UploadScheduler> {
        let slots = match (slot_override, &platform.slots) {
            (Some(name), _) => self.slot_set(name)?,
            (None, Some(inline)) => inline.clone(),
            (None, None) => self.slot_set(&platform.slot_set)?,
        };

        Ok(UploadScheduler::new(slots, platform.min_gap()?)?
            .with_jitter(platform.jitter()?)
            .with_horizon_days(self.upload.horizon_days))
    }

    /// Everything the orchestrator needs to publish to `id`
    pub fn platform_target(
        &self,
        id: &str,
        slot_override: Option<&str>,
    ) -> crate::Result<PlatformTarget> {
        let platform = self.upload.platforms.get(id).ok_or_else(|| {
            let known: Vec<&str> = self.upload.platforms.keys().map(String::as_str).collect();
            crate::Error::config(format!(
                "Unknown platform '{id}'. Configured: {}",
                known.join(", ")
            ))
        })?;

        let scheduler = self.scheduler_for(platform, slot_override)?;
        let suffix = platform
            .artifact_suffix
            .clone()
            .unwrap_or_else(|| self.generation.artifact_extension.clone());
        let pattern = self.generation.artifact_pattern().with_suffix(suffix);

        Ok(PlatformTarget::new(id, scheduler, pattern))
    }

    /// Ids of all configured platforms, sorted
    pub fn platform_ids(&self) -> Vec<String> {
        self.upload.platforms.keys().cloned().collect()
    }
}
