//! Uploader backed by external programs
//!
//! Each platform maps to its own program. Argument placeholders:
//! `{artifact}`, `{schedule}` (ISO-8601 local time), `{platform}` and
//! `{credentials}` (path of the niche credentials file).

use async_trait::async_trait;
use std::collections::BTreeMap;

use super::{UploadError, UploadRequest, Uploader};
use crate::config::Config;
use crate::external::{run_command, CommandConfig};

/// Format of `{schedule}`
pub const SCHEDULE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Runs the configured program of the request's platform
#[derive(Debug, Clone, Default)]
pub struct CommandUploader {
    commands: BTreeMap<String, CommandConfig>,
}

impl CommandUploader {
    pub fn new(commands: BTreeMap<String, CommandConfig>) -> Self {
        Self { commands }
    }

    /// Collect the uploader of every configured platform
    pub fn from_config(config: &Config) -> Self {
        let commands = config
            .upload
            .platforms
            .iter()
            .map(|(id, platform)| (id.clone(), platform.uploader.clone()))
            .collect();
        Self::new(commands)
    }

    /// Register or replace the program of one platform
    pub fn with_platform(mut self, platform: impl Into<String>, command: CommandConfig) -> Self {
        self.commands.insert(platform.into(), command);
        self
    }

    fn vars(request: &UploadRequest<'_>) -> BTreeMap<&'static str, String> {
        let credentials = request
            .credentials
            .source()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        BTreeMap::from([
            ("artifact", request.artifact.display().to_string()),
            ("schedule", request.schedule.format(SCHEDULE_FORMAT).to_string()),
            ("platform", request.platform.to_string()),
            ("credentials", credentials),
        ])
    }
}

#[async_trait]
impl Uploader for CommandUploader {
    async fn upload(&self, request: UploadRequest<'_>) -> Result<bool, UploadError> {
        let command = self
            .commands
            .get(request.platform)
            .filter(|c| c.is_configured())
            .ok_or_else(|| UploadError::NoCommandForPlatform {
                platform: request.platform.to_string(),
            })?;

        if !request.artifact.exists() {
            return Err(UploadError::MissingArtifact {
                path: request.artifact.to_path_buf(),
            });
        }

        run_command(command, &Self::vars(&request)).await?;
        Ok(true)
    }
}
