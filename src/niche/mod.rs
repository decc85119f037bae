//! Niche context
//!
//! A niche is one directory under the niches root. It owns its pools, its
//! output directory and its state record; nothing is shared between niches.
//! [`Niche`] resolves every path once so that the pipeline and the upload
//! orchestrator receive an explicit context instead of reading globals.
//!
//! Directories created by older tooling use capitalized names
//! (`Raw-Images`, `Meme-Final`, ...). When [`LayoutConfig::legacy_fallback`]
//! is set, a legacy entry is used whenever the configured one is absent.

mod credentials;
mod summary;

pub use credentials::Credentials;
pub use summary::{NicheSummary, PlatformSummary};

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::LayoutConfig;
use crate::error::{Error, Result};
use crate::state::{NicheLock, NicheState, StateError, StateStore};

/// Prefix marking niches created by older tooling
pub const LEGACY_MARKER: char = '!';

const LEGACY_ASSETS_DIR: &str = "Raw-Images";
const LEGACY_CAPTIONS_FILE: &str = "Quotes.txt";
const LEGACY_AUDIO_DIR: &str = "TikTok-Sounds";
const LEGACY_OUTPUT_DIR: &str = "Meme-Final";
const LEGACY_DESCRIPTIONS_DIR: &str = "Meme-Description";
const LEGACY_CREDENTIALS_FILE: &str = "Credentials.json";
const LEGACY_STATE_FILE: &str = "upload_log.json";

// ============================================================================
// Niche
// ============================================================================

/// Resolved paths of one niche
#[derive(Debug, Clone)]
pub struct Niche {
    name: String,
    root: PathBuf,
    assets_dir: PathBuf,
    captions_file: PathBuf,
    audio_dir: PathBuf,
    output_dir: PathBuf,
    descriptions_dir: PathBuf,
    credentials_file: PathBuf,
    state: StateStore,
}

impl Niche {
    /// Open an existing niche directory
    pub fn open(root: impl Into<PathBuf>, layout: &LayoutConfig) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(Error::NicheNotFound { path: root });
        }

        let name = root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| root.display().to_string());

        let resolve = |primary: &str, legacy: &str| -> PathBuf {
            let preferred = root.join(primary);
            if layout.legacy_fallback && !preferred.exists() {
                let fallback = root.join(legacy);
                if fallback.exists() {
                    return fallback;
                }
            }
            preferred
        };

        let mut state = StateStore::new(root.join(&layout.state_file));
        if layout.legacy_fallback {
            state = state.with_legacy(root.join(LEGACY_STATE_FILE));
        }

        let assets_dir = resolve(&layout.assets_dir, LEGACY_ASSETS_DIR);
        let captions_file = resolve(&layout.captions_file, LEGACY_CAPTIONS_FILE);
        let audio_dir = resolve(&layout.audio_dir, LEGACY_AUDIO_DIR);
        let output_dir = resolve(&layout.output_dir, LEGACY_OUTPUT_DIR);
        let descriptions_dir = resolve(&layout.descriptions_dir, LEGACY_DESCRIPTIONS_DIR);
        let credentials_file = resolve(&layout.credentials_file, LEGACY_CREDENTIALS_FILE);

        Ok(Self {
            name,
            root,
            assets_dir,
            captions_file,
            audio_dir,
            output_dir,
            descriptions_dir,
            credentials_file,
            state,
        })
    }

    /// Create the directory structure of a new niche and open it
    ///
    /// Existing entries (including legacy-named ones) are left alone.
    pub fn init(root: impl Into<PathBuf>, layout: &LayoutConfig) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;

        let dirs = [
            (&layout.assets_dir, LEGACY_ASSETS_DIR),
            (&layout.audio_dir, LEGACY_AUDIO_DIR),
            (&layout.output_dir, LEGACY_OUTPUT_DIR),
            (&layout.descriptions_dir, LEGACY_DESCRIPTIONS_DIR),
        ];
        for (primary, legacy) in dirs {
            let has_legacy = layout.legacy_fallback && root.join(legacy).exists();
            if !has_legacy {
                fs::create_dir_all(root.join(primary))?;
            }
        }

        let captions = root.join(&layout.captions_file);
        let has_legacy_captions =
            layout.legacy_fallback && root.join(LEGACY_CAPTIONS_FILE).exists();
        if !captions.exists() && !has_legacy_captions {
            fs::write(&captions, "")?;
        }

        tracing::info!(niche = %root.display(), "Initialized niche structure");
        Self::open(root, layout)
    }

    /// Directory name as found on disk
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name without the legacy marker
    pub fn display_name(&self) -> &str {
        self.name.strip_prefix(LEGACY_MARKER).unwrap_or(&self.name)
    }

    pub fn is_legacy(&self) -> bool {
        self.name.starts_with(LEGACY_MARKER)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn assets_dir(&self) -> &Path {
        &self.assets_dir
    }

    pub fn captions_file(&self) -> &Path {
        &self.captions_file
    }

    pub fn audio_dir(&self) -> &Path {
        &self.audio_dir
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn descriptions_dir(&self) -> &Path {
        &self.descriptions_dir
    }

    pub fn credentials_file(&self) -> &Path {
        &self.credentials_file
    }

    pub fn state_store(&self) -> &StateStore {
        &self.state
    }

    /// Take the exclusive lock of this niche
    pub fn lock(&self) -> std::result::Result<NicheLock, StateError> {
        self.state.lock()
    }

    pub fn load_state(&self) -> std::result::Result<NicheState, StateError> {
        self.state.load()
    }

    pub fn save_state(&self, state: &NicheState) -> std::result::Result<(), StateError> {
        self.state.save(state)
    }

    /// Load credentials; a missing file is a configuration error
    pub fn credentials(&self) -> Result<Credentials> {
        if !self.credentials_file.exists() {
            return Err(Error::config(format!(
                "Credentials file not found for niche '{}'. Please create: {}",
                self.display_name(),
                self.credentials_file.display()
            )));
        }
        Credentials::load(&self.credentials_file)
    }

    /// Load credentials if the file exists
    pub fn credentials_opt(&self) -> Result<Option<Credentials>> {
        if self.credentials_file.exists() {
            Credentials::load(&self.credentials_file).map(Some)
        } else {
            Ok(None)
        }
    }
}

// ============================================================================
// Catalog
// ============================================================================

/// The directory holding all niches
#[derive(Debug, Clone)]
pub struct NicheCatalog {
    base: PathBuf,
    layout: LayoutConfig,
}

impl NicheCatalog {
    pub fn new(base: impl Into<PathBuf>, layout: LayoutConfig) -> Self {
        Self {
            base: base.into(),
            layout,
        }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Directory names of all niches, sorted
    ///
    /// Hidden directories are skipped; a missing base directory has no
    /// niches.
    pub fn list(&self) -> Result<Vec<String>> {
        let entries = match fs::read_dir(&self.base) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.starts_with('.') {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    /// Open a niche by directory name or display name
    ///
    /// `Cats` also finds a legacy `!Cats` directory.
    pub fn open(&self, name: &str) -> Result<Niche> {
        let direct = self.base.join(name);
        if direct.is_dir() {
            return Niche::open(direct, &self.layout);
        }
        let legacy = self.base.join(format!("{LEGACY_MARKER}{name}"));
        if legacy.is_dir() {
            return Niche::open(legacy, &self.layout);
        }
        Err(Error::NicheNotFound { path: direct })
    }

    /// Create a new niche
    pub fn init(&self, name: &str) -> Result<Niche> {
        if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
            return Err(Error::config(format!("Invalid niche name '{name}'")));
        }
        Niche::init(self.base.join(name), &self.layout)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_open_missing_niche() {
        let dir = TempDir::new().unwrap();
        let err = Niche::open(dir.path().join("Cats"), &LayoutConfig::default()).unwrap_err();
        assert!(matches!(err, Error::NicheNotFound { .. }));
    }

    #[test]
    fn test_init_creates_default_layout() {
        let dir = TempDir::new().unwrap();
        let niche = Niche::init(dir.path().join("Cats"), &LayoutConfig::default()).unwrap();

        assert_eq!(niche.name(), "Cats");
        assert!(niche.assets_dir().ends_with("raw_images"));
        assert!(niche.assets_dir().is_dir());
        assert!(niche.audio_dir().is_dir());
        assert!(niche.output_dir().is_dir());
        assert!(niche.descriptions_dir().is_dir());
        assert!(niche.captions_file().is_file());
        assert_eq!(niche.load_state().unwrap(), NicheState::default());
    }

    #[test]
    fn test_legacy_names_are_used_when_present() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("!Dogs");
        fs::create_dir_all(root.join("Raw-Images")).unwrap();
        fs::create_dir_all(root.join("Meme-Final")).unwrap();
        fs::write(root.join("Quotes.txt"), "woof").unwrap();

        let niche = Niche::open(&root, &LayoutConfig::default()).unwrap();
        assert!(niche.is_legacy());
        assert_eq!(niche.display_name(), "Dogs");
        assert!(niche.assets_dir().ends_with("Raw-Images"));
        assert!(niche.output_dir().ends_with("Meme-Final"));
        assert!(niche.captions_file().ends_with("Quotes.txt"));
        assert!(niche.audio_dir().ends_with("sounds"));

        let strict = LayoutConfig {
            legacy_fallback: false,
            ..LayoutConfig::default()
        };
        let niche = Niche::open(&root, &strict).unwrap();
        assert!(niche.assets_dir().ends_with("raw_images"));
    }

    #[test]
    fn test_credentials_required() {
        let dir = TempDir::new().unwrap();
        let niche = Niche::init(dir.path().join("Cats"), &LayoutConfig::default()).unwrap();

        let err = niche.credentials().unwrap_err();
        assert!(err.to_string().contains("Credentials file not found"));
        assert!(niche.credentials_opt().unwrap().is_none());

        fs::write(niche.root().join("Credentials.json"), r##"{"hashtags": "#cats"}"##).unwrap();
        let niche = Niche::open(niche.root(), &LayoutConfig::default()).unwrap();
        assert_eq!(niche.credentials().unwrap().hashtags(), Some("#cats"));
    }

    #[test]
    fn test_catalog_list_and_open() {
        let dir = TempDir::new().unwrap();
        let catalog = NicheCatalog::new(dir.path(), LayoutConfig::default());
        assert!(catalog.list().unwrap().is_empty());

        catalog.init("Cats").unwrap();
        fs::create_dir_all(dir.path().join("!Dogs")).unwrap();
        fs::create_dir_all(dir.path().join(".cache")).unwrap();
        fs::write(dir.path().join("readme.txt"), "").unwrap();

        assert_eq!(catalog.list().unwrap(), vec!["!Dogs", "Cats"]);
        assert_eq!(catalog.open("Dogs").unwrap().name(), "!Dogs");
        assert!(catalog.open("Birds").is_err());
        assert!(catalog.init("../escape").is_err());
    }

    #[test]
    fn test_missing_base_directory() {
        let dir = TempDir::new().unwrap();
        let catalog = NicheCatalog::new(dir.path().join("nope"), LayoutConfig::default());
        assert!(catalog.list().unwrap().is_empty());
    }
}
