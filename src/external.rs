//! Runner for configured external programs
//!
//! Rendering and uploading are delegated to whatever program the operator
//! configures. Arguments are templates: `{name}` placeholders are replaced
//! by per-call values before the program is spawned. Arguments are passed
//! directly, never through a shell.

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::process::{ExitStatus, Stdio};
use std::sync::LazyLock;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

/// Default timeout for one external call
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 600;

/// Bytes of stderr kept in error messages
const STDERR_TAIL: usize = 2000;

static PLACEHOLDER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").unwrap());

// ============================================================================
// Configuration
// ============================================================================

/// Program plus argument templates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandConfig {
    /// Executable name or path; empty means "not configured"
    pub program: String,

    /// Argument templates
    pub args: Vec<String>,

    /// Kill the program after this many seconds
    pub timeout_secs: u64,
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            program: String::new(),
            args: Vec::new(),
            timeout_secs: DEFAULT_COMMAND_TIMEOUT_SECS,
        }
    }
}

impl CommandConfig {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn is_configured(&self) -> bool {
        !self.program.trim().is_empty()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Failure to run an external program
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("No program configured")]
    NotConfigured,

    #[error("Failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{program}' timed out after {secs}s")]
    TimedOut { program: String, secs: u64 },

    #[error("'{program}' exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: ExitStatus,
        stderr: String,
    },
}

// ============================================================================
// Execution
// ============================================================================

/// Replace `{key}` placeholders in `template`
///
/// One left-to-right pass: substituted values are copied literally, so a
/// caption or path containing `{number}` reaches the program unchanged.
/// Unknown placeholders are left as they are.
pub fn expand_template(template: &str, vars: &BTreeMap<&str, String>) -> String {
    PLACEHOLDER_REGEX
        .replace_all(template, |caps: &Captures| match vars.get(&caps[1]) {
            Some(value) => value.clone(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Run `config` with placeholders expanded, returning captured stdout
pub async fn run_command(
    config: &CommandConfig,
    vars: &BTreeMap<&str, String>,
) -> Result<String, CommandError> {
    if !config.is_configured() {
        return Err(CommandError::NotConfigured);
    }

    let program = expand_template(&config.program, vars);
    let args: Vec<String> = config
        .args
        .iter()
        .map(|arg| expand_template(arg, vars))
        .collect();

    tracing::debug!(program = %program, args = ?args, "Running external command");

    let mut command = Command::new(&program);
    command
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let output = match tokio::time::timeout(config.timeout(), command.output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(source)) => return Err(CommandError::Spawn { program, source }),
        Err(_) => {
            return Err(CommandError::TimedOut {
                program,
                secs: config.timeout_secs,
            })
        }
    };

    if !output.status.success() {
        return Err(CommandError::Failed {
            program,
            status: output.status,
            stderr: tail(&String::from_utf8_lossy(&output.stderr)),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

fn tail(text: &str) -> String {
    let text = text.trim();
    if text.len() <= STDERR_TAIL {
        return text.to_string();
    }
    let mut start = text.len() - STDERR_TAIL;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    format!("...{}", &text[start..])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars() -> BTreeMap<&'static str, String> {
        BTreeMap::from([
            ("number", "7".to_string()),
            ("output", "/tmp/meme_0007.mp4".to_string()),
        ])
    }

    #[test]
    fn test_expand_template() {
        assert_eq!(expand_template("--out={output}", &vars()), "--out=/tmp/meme_0007.mp4");
        assert_eq!(expand_template("{number}-{number}", &vars()), "7-7");
        assert_eq!(expand_template("{unknown}", &vars()), "{unknown}");
    }

    #[test]
    fn test_expand_template_copies_values_literally() {
        let mut vars = vars();
        vars.insert("caption", "Top {number} cats of {output}".to_string());
        vars.insert("asset", "/srv/{audio}/cat.jpg".to_string());

        assert_eq!(
            expand_template("{caption}", &vars),
            "Top {number} cats of {output}"
        );
        assert_eq!(
            expand_template("{asset} -> {output}", &vars),
            "/srv/{audio}/cat.jpg -> /tmp/meme_0007.mp4"
        );
    }

    #[test]
    fn test_default_is_not_configured() {
        let config = CommandConfig::default();
        assert!(!config.is_configured());
        assert_eq!(config.timeout(), Duration::from_secs(DEFAULT_COMMAND_TIMEOUT_SECS));
    }

    #[tokio::test]
    async fn test_unconfigured_command() {
        let err = run_command(&CommandConfig::default(), &vars())
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::NotConfigured));
    }

    #[tokio::test]
    async fn test_missing_program() {
        let config = CommandConfig::new("nichecast-definitely-missing-binary", ["x"]);
        let err = run_command(&config, &vars()).await.unwrap_err();
        assert!(matches!(err, CommandError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_runs_and_captures_stdout() {
        let config = CommandConfig::new("echo", ["part", "{number}"]);
        let out = run_command(&config, &vars()).await.unwrap();
        assert_eq!(out.trim(), "part 7");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_zero_exit() {
        let config = CommandConfig::new("sh", ["-c", "echo boom >&2; exit 3"]);
        let err = run_command(&config, &vars()).await.unwrap_err();
        match err {
            CommandError::Failed { stderr, status, .. } => {
                assert_eq!(stderr, "boom");
                assert_eq!(status.code(), Some(3));
            }
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout() {
        let config = CommandConfig::new("sleep", ["5"]).with_timeout_secs(1);
        let err = run_command(&config, &vars()).await.unwrap_err();
        assert!(matches!(err, CommandError::TimedOut { secs: 1, .. }));
    }
}
