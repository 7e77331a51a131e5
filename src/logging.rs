// src/logging.rs

//! `tracing` subscriber setup.
//!
//! The filter comes from, in order:
//! 1. `--log-level` (applies to every target)
//! 2. `LAUNCHER_LOG`, any `EnvFilter` directive string such as
//!    `launcher::cache=debug,info`
//! 3. `info`
//!
//! Output goes to stderr. Stdout is reserved for status lines and the
//! dry-run plan.

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;

use crate::cli::LogLevel;

pub const LOG_ENV: &str = "LAUNCHER_LOG";

/// Install the global subscriber. Call once, before any work.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let filter = build_filter(cli_level, std::env::var(LOG_ENV).ok().as_deref())?;

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!(e))
        .context("installing tracing subscriber")
}

fn build_filter(cli_level: Option<LogLevel>, env: Option<&str>) -> Result<EnvFilter> {
    if let Some(level) = cli_level {
        return Ok(EnvFilter::new(level.as_directive()));
    }
    match env.map(str::trim).filter(|s| !s.is_empty()) {
        Some(directives) => EnvFilter::try_new(directives)
            .with_context(|| format!("invalid {LOG_ENV} value '{directives}'")),
        None => Ok(EnvFilter::new("info")),
    }
}

impl LogLevel {
    fn as_directive(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_level_wins_over_environment() {
        let filter = build_filter(Some(LogLevel::Trace), Some("error")).unwrap();
        assert_eq!(filter.to_string(), "trace");
    }

    #[test]
    fn environment_directives_are_used_verbatim() {
        let filter = build_filter(None, Some(" launcher::cache=debug,warn ")).unwrap();
        let rendered = filter.to_string();
        assert!(rendered.contains("launcher::cache=debug"));
        assert!(rendered.contains("warn"));
    }

    #[test]
    fn defaults_to_info() {
        assert_eq!(build_filter(None, None).unwrap().to_string(), "info");
        assert_eq!(build_filter(None, Some("  ")).unwrap().to_string(), "info");
    }
}
