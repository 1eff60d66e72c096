//! Self-updating installer and launcher for third-party game modifications.
//!
//! The hardest problem this crate solves is not argument parsing or the
//! settings document; it is the update-and-recovery pipeline: fetching remote
//! artifacts (installer binary, game build, mod-loader build, individual mod
//! files), applying them to a live installation directory, guaranteeing that
//! a failed update rolls back to a known-good state, and atomically replacing
//! the currently-running launcher binary without corrupting the install.
//!
//! # Architecture
//!
//! Components, leaves first:
//!
//! - [`archive`] - zip extraction with double-wrap detection
//! - [`backup`] - snapshot/restore of the installation root
//! - [`fetch`] - remote artifact retrieval (buffered or streamed)
//! - [`pipeline`] - fetch -> backup -> apply -> recover, one envelope
//! - [`mods`] - mod catalog and installed-mod reconciliation
//! - [`swap`] - out-of-process replacement of the running launcher binary
//! - [`game`] - supervision of the external game process
//! - [`config`] - settings document and per-user pointer file
//! - [`cli`] - the `modlauncher` command-line surface
//! - [`core`] - error taxonomy shared by everything above
//!
//! Two binaries are built from this library: `modlauncher` (the CLI) and
//! `modlauncher-swap`, the short-lived coordinator that swaps the launcher
//! binary while the launcher itself is not running. The split exists because
//! an executable cannot reliably overwrite itself while it is running.
//!
//! # Concurrency model
//!
//! The pipeline is strictly sequential: one artifact at a time, each step
//! blocking until its network and disk work completes. The installation root
//! is exclusively owned by whichever pipeline invocation is running; callers
//! serialize externally. Cancellation mid-step is not supported; recovery is
//! the post-hoc backup restore, never rollback-in-place.

pub mod archive;
pub mod backup;
pub mod cli;
pub mod config;
pub mod core;
pub mod fetch;
pub mod game;
pub mod mods;
pub mod pipeline;
pub mod swap;
