// src/config/model.rs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::errors::{LauncherError, Result};

/// Name → raw template string, as read from one or more `.properties` files.
///
/// Ordered by name so every pass over it (resolution, rendering) is
/// deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigurationSet {
    values: BTreeMap<String, String>,
}

impl ConfigurationSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Merge command-scoped overrides into the base set.
    ///
    /// A name present in both is fatal: overrides may only add names.
    pub fn merge(mut self, overrides: ConfigurationSet) -> Result<ConfigurationSet> {
        if let Some(dup) = overrides.names().find(|name| self.contains(name)) {
            return Err(LauncherError::DuplicateKey(dup.to_string()));
        }
        self.values.extend(overrides.values);
        Ok(self)
    }
}

impl FromIterator<(String, String)> for ConfigurationSet {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// `launcher.toml` exactly as deserialized.
///
/// ```toml
/// repository = "repository"
/// default_extension = "tar.gz"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawLauncherSettings {
    /// Local artifact repository, relative paths are taken from the home.
    #[serde(default = "default_repository")]
    pub repository: PathBuf,

    /// Extension assumed for `group:artifact:version` coordinates.
    #[serde(default = "default_extension")]
    pub default_extension: String,
}

fn default_repository() -> PathBuf {
    PathBuf::from("repository")
}

fn default_extension() -> String {
    "tar.gz".to_string()
}

impl Default for RawLauncherSettings {
    fn default() -> Self {
        Self {
            repository: default_repository(),
            default_extension: default_extension(),
        }
    }
}

/// Validated settings with the repository path anchored at the home.
#[derive(Debug, Clone)]
pub struct LauncherSettings {
    repository: PathBuf,
    default_extension: String,
}

impl LauncherSettings {
    /// Construct without validation; used by the `TryFrom` impl.
    pub(crate) fn new_unchecked(repository: PathBuf, default_extension: String) -> Self {
        Self {
            repository,
            default_extension,
        }
    }

    pub fn repository(&self) -> &Path {
        &self.repository
    }

    pub fn default_extension(&self) -> &str {
        &self.default_extension
    }

    /// Anchor a relative repository path at `home`.
    pub fn anchored_at(mut self, home: &Path) -> Self {
        if self.repository.is_relative() {
            self.repository = home.join(&self.repository);
        }
        self
    }
}
