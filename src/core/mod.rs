//! Core types shared across the launcher.
//!
//! This module is the foundation of the crate's type system. It currently
//! contains the error taxonomy used by every other module:
//!
//! - [`LauncherError`] - strongly-typed errors for precise handling in code
//! - [`ErrorContext`] - user-friendly wrapper with suggestions for CLI users
//! - [`user_friendly_error`] - convert any error into the display form
//!
//! # Error First Design
//!
//! Every fallible operation in the update pipeline returns a `Result` carrying
//! a [`LauncherError`] (or an `anyhow::Error` wrapping one at the CLI layer).
//! The pipeline orchestrator pattern-matches on error variants to decide
//! whether to restore a backup before re-raising, so errors double as the
//! recovery-decision input and must stay structured rather than stringly.

pub mod error;

pub use error::{ErrorContext, LauncherError, user_friendly_error};
