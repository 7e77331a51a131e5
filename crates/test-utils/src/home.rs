#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use launcher::archive::{ArchiveKind, Compression};
use launcher::cache::ResourceCache;
use launcher::launch::metadata::{
    ATTACHMENTS, COMMAND_ARGUMENTS, DEPENDENCIES, ENVIRONMENT, SYSTEM_PROPERTIES,
};
use launcher::layout::Layout;
use launcher::repository::LocalRepository;
use tempfile::TempDir;

use crate::archives::ArchiveBuilder;

/// Repository directory inside a test home.
pub const REPOSITORY_DIR: &str = "repository";

/// Temporary launcher home with helpers to populate profiles, commands and
/// the local repository.
pub struct LauncherHome {
    dir: TempDir,
}

impl LauncherHome {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("create launcher home"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn layout(&self) -> Layout {
        Layout::new(self.dir.path())
    }

    pub fn repository_dir(&self) -> PathBuf {
        self.dir.path().join(REPOSITORY_DIR)
    }

    pub fn repository(&self) -> LocalRepository {
        LocalRepository::new(self.repository_dir(), "tar.gz")
    }

    pub fn cache(&self) -> ResourceCache {
        ResourceCache::new(self.layout().cache_dir())
    }

    /// Write `contents` to `relative` under the home.
    pub fn write(self, relative: impl AsRef<Path>, contents: impl AsRef<[u8]>) -> Self {
        let path = self.dir.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dir");
        }
        fs::write(&path, contents).expect("write home file");
        self
    }

    pub fn with_profile_config(self, profile: &str, properties: &[(&str, &str)]) -> Self {
        let path = self.layout().profile_config(profile);
        self.write(path, render_properties(properties))
    }

    pub fn with_command(self, profile: &str, command: &str, reference: &str) -> Self {
        let path = self.layout().command_reference(profile, command);
        self.write(path, format!("{reference}\n"))
    }

    pub fn with_command_overrides(
        self,
        profile: &str,
        command: &str,
        properties: &[(&str, &str)],
    ) -> Self {
        let path = self.layout().command_overrides(profile, command);
        self.write(path, render_properties(properties))
    }

    /// Publish `archive` into the repository at `relative`, choosing the
    /// format from the suffix. Unknown suffixes are written as plain tar.
    pub fn with_artifact(self, relative: &str, archive: &ArchiveBuilder) -> Self {
        let path = self.repository_dir().join(relative);
        match ArchiveKind::from_file_name(relative) {
            Some(ArchiveKind::Zip) => archive.write_zip(&path),
            Some(ArchiveKind::TarGz) => archive.write_tar(&path, Compression::Gzip),
            Some(ArchiveKind::TarXz) => archive.write_tar(&path, Compression::Xz),
            Some(ArchiveKind::TarBz2) => archive.write_tar(&path, Compression::Bzip2),
            None => archive.write_tar(&path, Compression::from_tar_name(relative)),
        }
        self
    }

    /// Put a plain file (for instance a jar) into the repository.
    pub fn with_repository_file(self, relative: &str, contents: impl AsRef<[u8]>) -> Self {
        let path = Path::new(REPOSITORY_DIR).join(relative);
        self.write(path, contents)
    }

    pub fn with_metadata(self, relative: &str, metadata: &MetadataBuilder) -> Self {
        self.with_artifact(relative, &metadata.archive())
    }
}

impl Default for LauncherHome {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for the five-entry command metadata archive.
#[derive(Debug, Clone, Default)]
pub struct MetadataBuilder {
    dependencies: Vec<String>,
    arguments: String,
    environment: Vec<(String, String)>,
    system_properties: Vec<(String, String)>,
    attachments: Vec<(String, String)>,
}

impl MetadataBuilder {
    pub fn new(arguments: &str) -> Self {
        Self {
            arguments: arguments.to_string(),
            ..Self::default()
        }
    }

    pub fn with_dependency(mut self, reference: &str) -> Self {
        self.dependencies.push(reference.to_string());
        self
    }

    pub fn with_env(mut self, name: &str, template: &str) -> Self {
        self.environment.push((name.to_string(), template.to_string()));
        self
    }

    pub fn with_system_property(mut self, name: &str, template: &str) -> Self {
        self.system_properties
            .push((name.to_string(), template.to_string()));
        self
    }

    pub fn with_attachment(mut self, name: &str, reference: &str) -> Self {
        self.attachments.push((name.to_string(), reference.to_string()));
        self
    }

    pub fn archive(&self) -> ArchiveBuilder {
        ArchiveBuilder::new()
            .file(DEPENDENCIES, self.dependencies.join("\n"))
            .file(COMMAND_ARGUMENTS, &self.arguments)
            .file(ENVIRONMENT, render_owned(&self.environment))
            .file(SYSTEM_PROPERTIES, render_owned(&self.system_properties))
            .file(ATTACHMENTS, render_owned(&self.attachments))
    }
}

/// `key=value` lines; `\` and leading spaces in values are not escaped.
pub fn render_properties(properties: &[(&str, &str)]) -> String {
    properties
        .iter()
        .map(|(k, v)| format!("{k}={v}\n"))
        .collect()
}

fn render_owned(properties: &[(String, String)]) -> String {
    properties
        .iter()
        .map(|(k, v)| format!("{k}={v}\n"))
        .collect()
}
