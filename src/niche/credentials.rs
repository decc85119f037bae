//! Niche credentials file
//!
//! An arbitrary JSON object handed through to uploaders. The only key the
//! crate itself reads is `hashtags`, appended to generated descriptions.

use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Parsed credentials of one niche
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Credentials {
    values: Map<String, Value>,
    source: Option<PathBuf>,
}

impl Credentials {
    /// Read a credentials file; it must contain a JSON object
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::with_source(
                format!("Failed to read credentials file {}", path.display()),
                e,
            )
        })?;
        let value: Value = serde_json::from_str(&content).map_err(|e| {
            Error::config(format!(
                "Credentials file {} is not valid JSON: {e}",
                path.display()
            ))
        })?;

        match value {
            Value::Object(values) => Ok(Self {
                values,
                source: Some(path.to_path_buf()),
            }),
            _ => Err(Error::config(format!(
                "Credentials file {} must contain a JSON object",
                path.display()
            ))),
        }
    }

    /// Build credentials in memory
    pub fn from_values(values: Map<String, Value>) -> Self {
        Self {
            values,
            source: None,
        }
    }

    /// File the credentials were read from
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Hashtag string appended to descriptions, if set and non-empty
    pub fn hashtags(&self) -> Option<&str> {
        self.values
            .get("hashtags")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}
