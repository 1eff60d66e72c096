//! `modlauncher-swap`: the out-of-process self-replacement coordinator.
//!
//! Invoked by the exiting launcher with exactly one argument, the
//! installation directory. Waits for the launcher binary to unlock, swaps in
//! the staged replacement, relaunches, and exits. See
//! [`modlauncher::swap`] for the state machine.
//!
//! This is deliberately not a subcommand of the main CLI: the whole point is
//! to run while the main binary is being replaced.

use modlauncher::core::user_friendly_error;
use modlauncher::swap::SwapCoordinator;
use std::path::PathBuf;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args: Vec<String> = std::env::args().collect();
    if args.len() != 2 {
        eprintln!("Usage: {} <install_folder>", args[0]);
        std::process::exit(1);
    }

    let install_dir = match std::fs::canonicalize(PathBuf::from(&args[1])) {
        Ok(dir) => dir,
        Err(e) => {
            eprintln!("Invalid install folder {}: {e}", args[1]);
            std::process::exit(1);
        }
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .try_init();

    let coordinator = SwapCoordinator::new(install_dir);
    if let Err(e) = coordinator.run().await {
        // Fatal and unrecovered: no second coordinator exists to retry
        user_friendly_error(e.into()).display();
        std::process::exit(1);
    }
}
