//! Unified error handling for the nichecast crate
//!
//! This module provides a unified error type for everything that aborts a
//! run, while the domain-specific errors stay usable on their own.
//!
//! # Architecture
//!
//! - [`NichecastErrorTrait`] - Common interface implemented by the unified error
//! - [`ErrorCategory`] - Classification used by the binary for exit codes
//! - [`Error`] - Unified error enum wrapping the domain-specific errors
//!
//! Empty pools, render failures and upload failures never reach this type:
//! the pipeline and the orchestrator count them per iteration.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

// Re-export domain-specific errors for convenience
pub use crate::scheduler::error::SchedulerError;
pub use crate::state::StateError;

/// Common trait for nichecast error types
pub trait NichecastErrorTrait: std::error::Error {
    /// Check if retrying the same run later can succeed
    fn is_recoverable(&self) -> bool;

    /// Get the error category for handling strategies
    fn category(&self) -> ErrorCategory;
}

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Configuration, credentials and niche lookup errors
    Config,
    /// State file, lock and other filesystem errors
    Storage,
    /// Slot and schedule configuration errors
    Scheduler,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    /// Short label used in log lines
    pub fn label(&self) -> &'static str {
        match self {
            Self::Config => "config",
            Self::Storage => "storage",
            Self::Scheduler => "scheduler",
            Self::Other => "other",
        }
    }
}

/// Unified error type for the nichecast crate
#[derive(Error, Debug)]
pub enum Error {
    /// Niche state persistence errors
    #[error("State error: {0}")]
    State(#[from] StateError),

    /// Slot and scheduler configuration errors
    #[error("Scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Niche directory does not exist
    #[error("Niche not found: {}", path.display())]
    NicheNotFound { path: PathBuf },

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),

    /// Generic error with context
    #[error("{context}")]
    Other {
        context: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl NichecastErrorTrait for Error {
    fn is_recoverable(&self) -> bool {
        // A live lock goes away once the other run finishes
        matches!(self, Self::State(StateError::Locked { .. }))
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::State(_) | Self::Io(_) => ErrorCategory::Storage,
            Self::Scheduler(_) => ErrorCategory::Scheduler,
            Self::NicheNotFound { .. } | Self::Config(_) => ErrorCategory::Config,
            Self::Other { .. } => ErrorCategory::Other,
        }
    }
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a generic error with context and source
    pub fn with_source(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Other {
            context: context.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_category() {
        let err = Error::config("missing credentials");
        assert_eq!(err.category(), ErrorCategory::Config);

        let err = Error::State(StateError::Regression { from: 4, to: 3 });
        assert_eq!(err.category(), ErrorCategory::Storage);

        let err = Error::Scheduler(SchedulerError::invalid_slot(25, 0));
        assert_eq!(err.category(), ErrorCategory::Scheduler);
    }

    #[test]
    fn test_only_locked_is_recoverable() {
        let locked = Error::State(StateError::Locked {
            path: PathBuf::from(".nichecast.lock"),
            holder: Some(42),
        });
        assert!(locked.is_recoverable());

        let config_err = Error::config("bad slot");
        assert!(!config_err.is_recoverable());

        let io_err = Error::Io(io::Error::new(io::ErrorKind::PermissionDenied, "denied"));
        assert!(!io_err.is_recoverable());
    }

    #[test]
    fn test_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "gone");
        let unified: Error = io_err.into();
        assert!(matches!(unified, Error::Io(_)));
        assert_eq!(unified.category(), ErrorCategory::Storage);
    }

    #[test]
    fn test_niche_not_found_message() {
        let err = Error::NicheNotFound {
            path: PathBuf::from("/data/niches/Cats"),
        };
        assert!(err.to_string().contains("/data/niches/Cats"));
        assert_eq!(err.category().label(), "config");
    }

    #[test]
    fn test_with_source_keeps_cause() {
        let err = Error::with_source(
            "Failed to read credentials",
            io::Error::new(io::ErrorKind::NotFound, "gone"),
        );
        assert_eq!(err.category(), ErrorCategory::Other);
        assert!(std::error::Error::source(&err).is_some());
    }
}
