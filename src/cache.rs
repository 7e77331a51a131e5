// src/cache.rs

//! Staging cache for extracted artifacts.
//!
//! Every resource is extracted into `<root>/<resource id>/`. Extraction goes
//! into a sibling staging directory that is renamed into place once
//! complete, so an existing cache path is always a finished extraction.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::archive::{ArchiveKind, extract};
use crate::errors::Result;
use crate::layout::staging_path;
use crate::repository::Resource;

#[derive(Debug, Clone)]
pub struct ResourceCache {
    root: PathBuf,
    tag: String,
}

impl ResourceCache {
    /// Cache rooted at `root`, tagging staging directories with this
    /// process's id.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_tag(root, std::process::id().to_string())
    }

    pub fn with_tag(root: impl Into<PathBuf>, tag: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            tag: tag.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where `resource` is (or will be) published.
    pub fn cache_path(&self, resource: &Resource) -> PathBuf {
        self.root.join(resource.id())
    }

    /// Make sure `resource` is extracted and return its cache path.
    pub async fn stage(&self, resource: &Resource) -> Result<PathBuf> {
        let target = self.cache_path(resource);
        if tokio::fs::try_exists(&target).await? {
            debug!(resource = %resource.id().display(), "already staged");
            return Ok(target);
        }

        let kind = ArchiveKind::for_path(resource.id())?;
        let archive = resource.local_path().await?;
        let staging = staging_path(&target, &self.tag);

        debug!(
            resource = %resource.id().display(),
            archive = %archive.display(),
            staging = %staging.display(),
            "staging resource"
        );

        let published = target.clone();
        tokio::task::spawn_blocking(move || publish(kind, &archive, &staging, &published))
            .await
            .map_err(anyhow::Error::from)??;

        Ok(target)
    }
}

fn publish(kind: ArchiveKind, archive: &Path, staging: &Path, target: &Path) -> Result<()> {
    remove_stale(staging)?;
    fs::create_dir_all(staging)?;

    if let Err(err) = extract(kind, archive, staging) {
        let _ = fs::remove_dir_all(staging);
        return Err(err);
    }

    match fs::rename(staging, target) {
        Ok(()) => {
            debug!(path = %target.display(), "published");
            Ok(())
        }
        Err(err) if target.is_dir() => {
            debug!(path = %target.display(), error = %err, "published concurrently, discarding staged copy");
            fs::remove_dir_all(staging)?;
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}

fn remove_stale(staging: &Path) -> io::Result<()> {
    match fs::symlink_metadata(staging) {
        Ok(meta) if meta.is_dir() => {
            debug!(path = %staging.display(), "clearing stale staging directory");
            fs::remove_dir_all(staging)
        }
        Ok(_) => fs::remove_file(staging),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err),
    }
}
