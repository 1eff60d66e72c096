//! Error types for the launcher and its update pipeline.
//!
//! The error taxonomy mirrors the failure modes of the update pipeline:
//! network fetches, archive extraction, filesystem mutation, the staged
//! launcher swap, and game-process supervision. Variants carry enough
//! structure for the pipeline to decide restore-vs-propagate per kind, and
//! [`user_friendly_error`] turns any of them into a colored CLI message with
//! an actionable suggestion.

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// Errors that can occur while installing, updating, or launching.
///
/// Variants are grouped by failure domain. The update pipeline
/// pattern-matches on these to decide whether a backup restore is worth
/// attempting before the error is re-raised to the CLI layer.
#[derive(Error, Debug)]
pub enum LauncherError {
    /// A remote artifact download returned a non-success HTTP status.
    ///
    /// Downloads are attempted exactly once; there is no retry policy.
    #[error("Download failed for {url}: HTTP status {status}")]
    FetchFailure {
        /// The URL that was requested
        url: String,
        /// The HTTP status code returned by the server
        status: u16,
    },

    /// An artifact archive could not be read as a zip file.
    #[error("Corrupt archive: {reason}")]
    CorruptArchive {
        /// Why the archive could not be parsed
        reason: String,
    },

    /// An expected file was missing on disk.
    ///
    /// Raised by the self-replacement coordinator when the staged launcher
    /// is absent, and by any operation whose precondition file is gone.
    #[error("Not found: {path}")]
    NotFound {
        /// Path that was expected to exist
        path: String,
    },

    /// A bounded wait elapsed without its condition becoming true.
    #[error("Timed out after {seconds}s waiting for {operation}")]
    Timeout {
        /// What the wait was for (e.g. "launcher binary to unlock")
        operation: String,
        /// The configured bound in seconds
        seconds: u64,
    },

    /// The OS rejected an operation for lack of permissions.
    #[error("Permission denied: {operation}")]
    PermissionDenied {
        /// The operation that was denied
        operation: String,
    },

    /// A requested mod name has no entry in the mod catalog.
    #[error("Mod '{name}' is not in the catalog")]
    UnknownMod {
        /// The unrecognized mod name
        name: String,
    },

    /// Settings document or pointer file problem.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of what is wrong with the configuration
        message: String,
    },

    /// Underlying filesystem error (permissions, disk space, bad path).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Zip structure error while writing or reading an archive we own.
    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Transport-level HTTP error (connection, TLS, body read).
    #[error("Network error: {0}")]
    Http(#[from] reqwest::Error),

    /// Settings document could not be parsed or serialized.
    #[error("Settings error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl LauncherError {
    /// Whether the failing operation itself could not have written anything.
    ///
    /// Fetch failures abort before their own payload reaches disk;
    /// extraction and IO failures can leave the root partially written.
    /// This classifies only the failing operation: earlier operations in the
    /// same run may still have written, so the pipeline combines this with
    /// [`crate::pipeline::PipelineReport::any_writes`] before skipping a
    /// restore.
    pub const fn is_pre_write(&self) -> bool {
        matches!(self, Self::FetchFailure { .. } | Self::Http(_) | Self::UnknownMod { .. })
    }
}

/// User-facing error wrapper with optional suggestion and details.
///
/// The CLI entry point converts any error into this form before display so
/// that users see an actionable message instead of a raw error chain.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying launcher error
    pub error: LauncherError,
    /// Optional actionable step for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional context about why the error occurred
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a context with no suggestion or details.
    #[must_use]
    pub const fn new(error: LauncherError) -> Self {
        Self { error, suggestion: None, details: None }
    }

    /// Add an actionable suggestion, displayed in green.
    #[must_use]
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add explanatory details, displayed in yellow.
    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error, details, and suggestion to stderr with colors.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Attach a suggestion and details appropriate to the error variant.
fn create_error_context(error: LauncherError) -> ErrorContext {
    match &error {
        LauncherError::FetchFailure { url, .. } => {
            let details = format!("The server at {url} did not return a success status");
            ErrorContext::new(error)
                .with_suggestion("Check your network connection and that the download URL is still valid")
                .with_details(details)
        }
        LauncherError::CorruptArchive { .. } => ErrorContext::new(error)
            .with_suggestion("Re-run the update to download the archive again")
            .with_details("The downloaded archive could not be read as a zip file"),
        LauncherError::NotFound { .. } => ErrorContext::new(error)
            .with_suggestion("Check that the path exists and has not been moved or deleted"),
        LauncherError::Timeout { .. } => ErrorContext::new(error)
            .with_suggestion("Close the running launcher and run the update again")
            .with_details("The launcher binary stayed locked for the whole wait period"),
        LauncherError::PermissionDenied { .. } => ErrorContext::new(error)
            .with_suggestion("Try running with elevated permissions or check file ownership"),
        LauncherError::UnknownMod { .. } => ErrorContext::new(error)
            .with_suggestion("Run 'modlauncher sync --list' to see the available mod names"),
        LauncherError::Config { .. } => ErrorContext::new(error)
            .with_suggestion("Check the settings file syntax, or delete it to start fresh"),
        _ => ErrorContext::new(error),
    }
}

/// Convert any error into a user-friendly [`ErrorContext`] for CLI display.
///
/// Downcasts to [`LauncherError`] or [`std::io::Error`] when possible to pick
/// variant-specific suggestions; anything else is wrapped as a configuration
/// error carrying the original message.
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    let error = match error.downcast::<LauncherError>() {
        Ok(launcher_error) => return create_error_context(launcher_error),
        Err(other) => other,
    };

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        match io_error.kind() {
            std::io::ErrorKind::PermissionDenied => {
                return ErrorContext::new(LauncherError::PermissionDenied {
                    operation: "file access".to_string(),
                })
                .with_suggestion("Try running with elevated permissions or check file ownership");
            }
            std::io::ErrorKind::NotFound => {
                return ErrorContext::new(LauncherError::NotFound {
                    path: "unknown".to_string(),
                })
                .with_suggestion("Check that the file or directory exists and the path is correct");
            }
            _ => {}
        }
    }

    ErrorContext::new(LauncherError::Config { message: format!("{error:#}") })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_failure_display_includes_url_and_status() {
        let err = LauncherError::FetchFailure {
            url: "https://example.com/mod.dll".to_string(),
            status: 404,
        };
        let msg = err.to_string();
        assert!(msg.contains("https://example.com/mod.dll"));
        assert!(msg.contains("404"));
    }

    #[test]
    fn pre_write_classification() {
        let fetch = LauncherError::FetchFailure { url: "u".into(), status: 500 };
        assert!(fetch.is_pre_write());

        let io = LauncherError::Io(std::io::Error::other("disk full"));
        assert!(!io.is_pre_write());

        let corrupt = LauncherError::CorruptArchive { reason: "bad header".into() };
        assert!(!corrupt.is_pre_write());
    }

    #[test]
    fn user_friendly_error_downcasts_launcher_error() {
        let err = anyhow::Error::new(LauncherError::Timeout {
            operation: "launcher binary to unlock".to_string(),
            seconds: 30,
        });
        let ctx = user_friendly_error(err);
        assert!(matches!(ctx.error, LauncherError::Timeout { seconds: 30, .. }));
        assert!(ctx.suggestion.is_some());
    }

    #[test]
    fn error_context_display_format() {
        let ctx = ErrorContext::new(LauncherError::NotFound { path: "staged".into() })
            .with_suggestion("stage it first")
            .with_details("nothing to swap");
        let formatted = format!("{ctx}");
        assert!(formatted.contains("Not found: staged"));
        assert!(formatted.contains("Suggestion: stage it first"));
        assert!(formatted.contains("Details: nothing to swap"));
    }
}
