// src/template/ambient.rs

//! Ambient values visible to templates: a snapshot of the OS environment
//! (`${env.NAME}`) and a small set of host properties (`${user.home}`,
//! `${os.name}`, ...), captured once per launch.

use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Default)]
pub struct Ambient {
    env: BTreeMap<String, String>,
    properties: BTreeMap<String, String>,
}

impl Ambient {
    /// Snapshot the current process environment and host properties.
    ///
    /// Variables whose name or value is not valid Unicode are skipped.
    pub fn capture(home: &Path) -> Self {
        let env = std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect();

        let mut properties = BTreeMap::new();
        if let Some(dir) = dirs::home_dir() {
            properties.insert("user.home".to_string(), dir.display().to_string());
        }
        if let Ok(dir) = std::env::current_dir() {
            properties.insert("user.dir".to_string(), dir.display().to_string());
        }
        if let Some(user) = std::env::var("USER")
            .ok()
            .or_else(|| std::env::var("USERNAME").ok())
        {
            properties.insert("user.name".to_string(), user);
        }
        properties.insert("os.name".to_string(), std::env::consts::OS.to_string());
        properties.insert("os.arch".to_string(), std::env::consts::ARCH.to_string());
        properties.insert(
            "file.separator".to_string(),
            std::path::MAIN_SEPARATOR.to_string(),
        );
        properties.insert("path.separator".to_string(), path_separator().to_string());
        properties.insert(
            "line.separator".to_string(),
            if cfg!(windows) { "\r\n" } else { "\n" }.to_string(),
        );
        properties.insert(
            "java.io.tmpdir".to_string(),
            std::env::temp_dir().display().to_string(),
        );
        properties.insert("launcher.home".to_string(), home.display().to_string());

        Self { env, properties }
    }

    pub fn with_env(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(name.into(), value.into());
        self
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// Environment variable, or empty when unset.
    pub fn env_or_empty(&self, name: &str) -> &str {
        self.env.get(name).map(String::as_str).unwrap_or("")
    }

    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(String::as_str)
    }
}

/// Separator between entries of a search path.
pub fn path_separator() -> char {
    if cfg!(windows) { ';' } else { ':' }
}
