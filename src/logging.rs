//! Diagnostic logging setup.
//!
//! User-facing output goes through [`crate::ui::Ui`]; `tracing` events carry
//! the details (candidate checks, copy steps, per-file counts) and are
//! written to stderr.

use std::io::{self, IsTerminal};
use std::sync::OnceLock;

use anyhow::{Result, anyhow};
use tracing_subscriber::EnvFilter;

/// Environment variable overriding the log filter
pub const LOG_ENV: &str = "LMS_MIRROR_LOG";

static INSTALLED: OnceLock<()> = OnceLock::new();

/// Filter directive for a `-v` count
pub fn default_filter(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    }
}

/// Install the global subscriber. Later calls are no-ops.
///
/// `LMS_MIRROR_LOG` takes precedence over the verbosity flag.
pub fn init(verbosity: u8) -> Result<()> {
    if INSTALLED.get().is_some() {
        return Ok(());
    }

    let filter = match std::env::var(LOG_ENV) {
        Ok(directives) => EnvFilter::try_new(&directives)
            .map_err(|e| anyhow!("invalid {} filter '{}': {}", LOG_ENV, directives, e))?,
        Err(_) => EnvFilter::new(default_filter(verbosity)),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .try_init()
        .map_err(|e| anyhow!("failed to install log subscriber: {}", e))?;

    let _ = INSTALLED.set(());
    Ok(())
}
