// src/errors.rs

//! Crate-wide error type and result alias.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LauncherError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Duplicate config property: {0}")]
    DuplicateKey(String),

    #[error("Reserved property name '{key}' defined in {origin}")]
    ReservedKey { key: String, origin: String },

    #[error("Parameter \"{0}\" not defined")]
    UndefinedParameter(String),

    #[error("Template reference cycle detected: [{}]", .0.join(", "))]
    ReferenceCycle(Vec<String>),

    #[error("Template syntax error in '{source_text}': {reason}")]
    TemplateSyntax { source_text: String, reason: String },

    #[error("Failed to parse property name={name}")]
    PropertyResolution {
        name: String,
        #[source]
        source: Box<LauncherError>,
    },

    #[error("Unsupported control character U+{0:04X} in value")]
    UnsupportedControlCharacter(u32),

    #[error("Metadata archive error: {0}")]
    MetadataFormat(String),

    #[error("Archive error: {0}")]
    ArchiveFormat(String),

    #[error("Archive entry '{0}' escapes the destination directory")]
    PathEscape(String),

    #[error("Unsupported archive type: {0}")]
    UnsupportedArchive(String),

    #[error("Resource error: {0}")]
    Resource(String),

    #[error("Process is already running with PID={0}")]
    AlreadyRunning(u32),

    #[error("Invalid PID file {}: {content:?}", path.display())]
    InvalidPidFile { path: PathBuf, content: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Properties parsing error: {0}")]
    PropertiesError(#[from] java_properties::PropertiesError),

    #[error("ZIP error: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, LauncherError>;
