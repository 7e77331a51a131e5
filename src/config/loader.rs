// src/config/loader.rs

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::config::model::{ConfigurationSet, LauncherSettings, RawLauncherSettings};
use crate::config::validate::ensure_no_reserved;
use crate::errors::{LauncherError, Result};
use crate::layout::Layout;

/// Parse `.properties` text (ISO-8859-1, Java escapes) into a set.
pub fn parse_properties(bytes: &[u8]) -> Result<ConfigurationSet> {
    let map = java_properties::read(bytes)?;
    Ok(map.into_iter().collect())
}

/// Load a properties file that must exist as a regular file.
pub fn load_properties(path: impl AsRef<Path>) -> Result<ConfigurationSet> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(LauncherError::ConfigError(format!(
            "configuration file {} is missing or not a regular file",
            path.display()
        )));
    }
    let bytes = fs::read(path)?;
    parse_properties(&bytes)
}

/// Base profile configuration merged with optional command-scoped
/// overrides, checked for reserved names.
pub fn load_command_configuration(
    layout: &Layout,
    profile: &str,
    command: &str,
) -> Result<ConfigurationSet> {
    let base_path = layout.profile_config(profile);
    let base = load_properties(&base_path)?;
    ensure_no_reserved(&base, &base_path.display().to_string())?;
    debug!(path = %base_path.display(), properties = base.len(), "loaded profile configuration");

    let overrides_path = layout.command_overrides(profile, command);
    if !overrides_path.exists() {
        return Ok(base);
    }
    let overrides = load_properties(&overrides_path)?;
    ensure_no_reserved(&overrides, &overrides_path.display().to_string())?;
    debug!(
        path = %overrides_path.display(),
        properties = overrides.len(),
        "loaded command overrides"
    );
    base.merge(overrides)
}

/// Read the metadata archive reference a command points to.
pub fn load_command_reference(layout: &Layout, profile: &str, command: &str) -> Result<String> {
    let path = layout.command_reference(profile, command);
    let reference = fs::read_to_string(&path).map_err(|e| {
        LauncherError::ConfigError(format!(
            "cannot read command reference {}: {e}",
            path.display()
        ))
    })?;
    let reference = reference.trim();
    if reference.is_empty() {
        return Err(LauncherError::ConfigError(format!(
            "command reference {} is empty",
            path.display()
        )));
    }
    Ok(reference.to_string())
}

/// Load `launcher.toml` from the home; absent file means defaults.
pub fn load_settings(layout: &Layout) -> Result<LauncherSettings> {
    let path = layout.settings_file();
    let raw = if path.exists() {
        let contents = fs::read_to_string(&path)?;
        toml::from_str::<RawLauncherSettings>(&contents)?
    } else {
        RawLauncherSettings::default()
    };
    Ok(LauncherSettings::try_from(raw)?.anchored_at(layout.home()))
}
