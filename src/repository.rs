// src/repository.rs

//! Artifact repository boundary.
//!
//! A [`Repository`] turns a reference string into a [`Resource`]: a handle
//! with a stable repository-relative identity, a byte stream, and a shared
//! future that completes with the artifact's local path once it has been
//! fetched. The launcher only awaits that future where a materialized file is
//! required.

use std::fmt;
use std::fs::File;
use std::future::Future;
use std::io::Read;
use std::path::{Component, Path, PathBuf};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use tracing::trace;

use crate::errors::{LauncherError, Result};

/// Optional scheme accepted in front of references.
const SCHEME: &str = "repo:";

type LocalPath = Shared<BoxFuture<'static, std::result::Result<PathBuf, String>>>;

/// Handle to one artifact.
#[derive(Clone)]
pub struct Resource {
    id: PathBuf,
    location: PathBuf,
    local: LocalPath,
}

impl Resource {
    /// `id` is the repository-relative identity, `location` the file the byte
    /// stream reads from, `fetch` completes once `location` is usable.
    pub fn new<F>(id: PathBuf, location: PathBuf, fetch: F) -> Self
    where
        F: Future<Output = std::result::Result<PathBuf, String>> + Send + 'static,
    {
        Self {
            id,
            location,
            local: fetch.boxed().shared(),
        }
    }

    pub fn id(&self) -> &Path {
        &self.id
    }

    pub fn file_name(&self) -> String {
        self.id
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Readable byte stream of the artifact.
    pub fn open(&self) -> Result<Box<dyn Read + Send>> {
        let file = File::open(&self.location).map_err(|e| {
            LauncherError::Resource(format!("cannot open {}: {e}", self.id.display()))
        })?;
        Ok(Box::new(file))
    }

    /// Wait for the artifact and return its canonical local path.
    ///
    /// The underlying fetch runs at most once per handle, however many
    /// clones await it.
    pub async fn local_path(&self) -> Result<PathBuf> {
        self.local.clone().await.map_err(LauncherError::Resource)
    }
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("id", &self.id)
            .field("location", &self.location)
            .finish_non_exhaustive()
    }
}

pub trait Repository: Send + Sync {
    fn resolve(&self, reference: &str) -> Result<Resource>;
}

/// Repository backed by a local directory tree.
///
/// References are either `group:artifact:version[:extension]` coordinates,
/// laid out as `<group/as/dirs>/<artifact>/<version>/<artifact>-<version>.<ext>`,
/// or plain relative paths. A leading `repo:` is ignored.
#[derive(Debug, Clone)]
pub struct LocalRepository {
    root: PathBuf,
    default_extension: String,
}

impl LocalRepository {
    pub fn new(root: impl Into<PathBuf>, default_extension: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            default_extension: default_extension.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Repository-relative path a reference points at.
    pub fn relative_path(&self, reference: &str) -> Result<PathBuf> {
        let reference = reference.trim();
        let reference = reference.strip_prefix(SCHEME).unwrap_or(reference);

        let path = if reference.contains(':') {
            self.coordinate_path(reference)?
        } else {
            PathBuf::from(reference)
        };

        let plain = path
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if !plain || path.as_os_str().is_empty() {
            return Err(LauncherError::Resource(format!(
                "invalid artifact reference '{reference}'"
            )));
        }
        Ok(path)
    }

    fn coordinate_path(&self, reference: &str) -> Result<PathBuf> {
        let parts: Vec<&str> = reference.split(':').collect();
        let (group, artifact, version, extension) = match parts.as_slice() {
            [g, a, v] => (*g, *a, *v, self.default_extension.as_str()),
            [g, a, v, e] => (*g, *a, *v, *e),
            _ => {
                return Err(LauncherError::Resource(format!(
                    "invalid artifact coordinate '{reference}', expected group:artifact:version[:extension]"
                )));
            }
        };
        if [group, artifact, version, extension].iter().any(|p| p.is_empty()) {
            return Err(LauncherError::Resource(format!(
                "invalid artifact coordinate '{reference}'"
            )));
        }

        let mut path: PathBuf = group.split('.').collect();
        path.push(artifact);
        path.push(version);
        path.push(format!("{artifact}-{version}.{extension}"));
        Ok(path)
    }
}

impl Repository for LocalRepository {
    fn resolve(&self, reference: &str) -> Result<Resource> {
        let id = self.relative_path(reference)?;
        let location = self.root.join(&id);
        trace!(reference, path = %location.display(), "resolved artifact reference");

        let fetch_path = location.clone();
        let fetch = async move {
            tokio::fs::canonicalize(&fetch_path)
                .await
                .map_err(|e| format!("artifact {} is not available: {e}", fetch_path.display()))
        };
        Ok(Resource::new(id, location, fetch))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn repo() -> LocalRepository {
        LocalRepository::new("/repo", "tar.gz")
    }

    #[test]
    fn coordinates_map_to_maven_style_paths() {
        assert_eq!(
            repo().relative_path("repo:org.example:foo:1.0").unwrap(),
            PathBuf::from("org/example/foo/1.0/foo-1.0.tar.gz")
        );
        assert_eq!(
            repo().relative_path("org.example:foo:1.0:zip").unwrap(),
            PathBuf::from("org/example/foo/1.0/foo-1.0.zip")
        );
    }

    #[test]
    fn plain_paths_pass_through() {
        assert_eq!(
            repo().relative_path("tools/jdk-21.tar.xz").unwrap(),
            PathBuf::from("tools/jdk-21.tar.xz")
        );
    }

    #[test]
    fn escaping_or_malformed_references_are_rejected() {
        for bad in ["../x.tar.gz", "/abs.tar.gz", "a:b", "a::1", "a:b:c:d:e", ""] {
            assert!(repo().relative_path(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[tokio::test]
    async fn local_path_resolves_existing_artifacts_only() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("present.tar.gz"), b"x").unwrap();
        let repository = LocalRepository::new(dir.path(), "tar.gz");

        let present = repository.resolve("present.tar.gz").unwrap();
        assert_eq!(
            present.local_path().await.unwrap(),
            dir.path().join("present.tar.gz").canonicalize().unwrap()
        );

        let missing = repository.resolve("missing.tar.gz").unwrap();
        assert!(matches!(missing.local_path().await, Err(LauncherError::Resource(_))));
        assert!(missing.open().is_err());
    }
}
