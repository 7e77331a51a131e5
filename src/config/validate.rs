// src/config/validate.rs

use crate::config::model::{ConfigurationSet, LauncherSettings, RawLauncherSettings};
use crate::errors::{LauncherError, Result};

/// Names the planner synthesizes itself.
pub const RESERVED_KEYS: [&str; 4] = ["systemProperties", "classpath", "time.fileName", "arguments"];

/// Prefix routed to the OS environment during resolution.
pub const ENV_PREFIX: &str = "env.";

impl TryFrom<RawLauncherSettings> for LauncherSettings {
    type Error = LauncherError;

    fn try_from(raw: RawLauncherSettings) -> std::result::Result<Self, Self::Error> {
        if raw.repository.as_os_str().is_empty() {
            return Err(LauncherError::ConfigError(
                "`repository` must not be empty".to_string(),
            ));
        }
        let extension = raw.default_extension.trim().trim_start_matches('.');
        if extension.is_empty() {
            return Err(LauncherError::ConfigError(
                "`default_extension` must not be empty".to_string(),
            ));
        }
        Ok(LauncherSettings::new_unchecked(
            raw.repository,
            extension.to_string(),
        ))
    }
}

pub fn is_reserved(name: &str) -> bool {
    RESERVED_KEYS.contains(&name) || name.starts_with(ENV_PREFIX)
}

/// Reject user-authored names that collide with synthesized ones.
///
/// `origin` names the source for the error message (file or archive entry).
pub fn ensure_no_reserved(set: &ConfigurationSet, origin: &str) -> Result<()> {
    match set.names().find(|name| is_reserved(name)) {
        Some(key) => Err(LauncherError::ReservedKey {
            key: key.to_string(),
            origin: origin.to_string(),
        }),
        None => Ok(()),
    }
}

/// Attachment declarations share the configuration namespace.
pub fn ensure_disjoint(config: &ConfigurationSet, attachments: &ConfigurationSet) -> Result<()> {
    match attachments.names().find(|name| config.contains(name)) {
        Some(dup) => Err(LauncherError::DuplicateKey(dup.to_string())),
        None => Ok(()),
    }
}
