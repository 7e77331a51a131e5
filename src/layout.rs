// src/layout.rs

//! Deterministic on-disk layout under the launcher home.
//!
//! ```text
//! <home>/launcher.toml
//! <home>/profiles/<profile>/conf/config.properties
//! <home>/profiles/<profile>/commands/<command>
//! <home>/profiles/<profile>/commands/<command>.properties
//! <home>/commands/<profile>/<command>/{run/process.pid, log/, work/, args}
//! <home>/cache/<resource-relative-path>/
//! ```

use std::ffi::OsString;
use std::path::{Path, PathBuf};

pub const SETTINGS_FILE: &str = "launcher.toml";

#[derive(Debug, Clone)]
pub struct Layout {
    home: PathBuf,
}

impl Layout {
    pub fn new(home: impl Into<PathBuf>) -> Self {
        Self { home: home.into() }
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    pub fn settings_file(&self) -> PathBuf {
        self.home.join(SETTINGS_FILE)
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.home.join("cache")
    }

    pub fn profile_config(&self, profile: &str) -> PathBuf {
        self.home
            .join("profiles")
            .join(profile)
            .join("conf")
            .join("config.properties")
    }

    fn profile_commands(&self, profile: &str) -> PathBuf {
        self.home.join("profiles").join(profile).join("commands")
    }

    /// File holding the metadata archive reference for a command.
    pub fn command_reference(&self, profile: &str, command: &str) -> PathBuf {
        self.profile_commands(profile).join(command)
    }

    /// Optional command-scoped property overrides.
    pub fn command_overrides(&self, profile: &str, command: &str) -> PathBuf {
        self.profile_commands(profile)
            .join(format!("{command}.properties"))
    }

    pub fn command_dir(&self, profile: &str, command: &str) -> PathBuf {
        self.home.join("commands").join(profile).join(command)
    }

    pub fn run_dir(&self, profile: &str, command: &str) -> PathBuf {
        self.command_dir(profile, command).join("run")
    }

    pub fn pid_file(&self, profile: &str, command: &str) -> PathBuf {
        self.run_dir(profile, command).join("process.pid")
    }

    pub fn log_dir(&self, profile: &str, command: &str) -> PathBuf {
        self.command_dir(profile, command).join("log")
    }

    pub fn log_file(&self, profile: &str, command: &str, time: &str) -> PathBuf {
        self.log_dir(profile, command)
            .join(format!("output.{time}.log"))
    }

    pub fn work_dir(&self, profile: &str, command: &str) -> PathBuf {
        self.command_dir(profile, command).join("work")
    }

    /// Fallback argument file used when `/dev/fd` is not available.
    pub fn args_file(&self, profile: &str, command: &str) -> PathBuf {
        self.command_dir(profile, command).join("args")
    }
}

/// Sibling staging path for `path`: `<name>.<tag>.tmp`.
pub fn staging_path(path: &Path, tag: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(OsString::new);
    name.push(format!(".{tag}.tmp"));
    path.with_file_name(name)
}
