// src/archive/mod.rs

//! Archive extraction.
//!
//! - [`tree`] holds the shared materialization logic: path-escape checks,
//!   memoized parent creation, permission decoding and the deferred
//!   directory/symlink post-pass.
//! - [`tarball`] streams tar entries through a decompression stream chosen
//!   by [`Compression`].
//! - [`zipfile`] walks a zip central directory.

pub mod tarball;
pub mod tree;
pub mod zipfile;

use std::fs::File;
use std::path::Path;

use tracing::debug;

use crate::errors::{LauncherError, Result};

pub use tarball::{Compression, extract_tar};
pub use tree::{Permission, PermissionSet};
pub use zipfile::extract_zip;

/// Archive formats accepted for staged resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    TarGz,
    TarXz,
    TarBz2,
    Zip,
}

impl ArchiveKind {
    pub fn from_file_name(name: &str) -> Option<Self> {
        if name.ends_with(".tar.gz") {
            Some(ArchiveKind::TarGz)
        } else if name.ends_with(".tar.xz") {
            Some(ArchiveKind::TarXz)
        } else if name.ends_with(".tar.bz2") {
            Some(ArchiveKind::TarBz2)
        } else if name.ends_with(".zip") {
            Some(ArchiveKind::Zip)
        } else {
            None
        }
    }

    /// Like [`ArchiveKind::from_file_name`], as an error for unknown suffixes.
    pub fn for_path(path: &Path) -> Result<Self> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::from_file_name(&name).ok_or(LauncherError::UnsupportedArchive(name))
    }
}

/// Extract `archive` into the existing directory `destination`.
pub fn extract(kind: ArchiveKind, archive: &Path, destination: &Path) -> Result<()> {
    debug!(?kind, archive = %archive.display(), destination = %destination.display(), "extracting");
    match kind {
        ArchiveKind::TarGz => extract_tar(File::open(archive)?, Compression::Gzip, destination),
        ArchiveKind::TarXz => extract_tar(File::open(archive)?, Compression::Xz, destination),
        ArchiveKind::TarBz2 => extract_tar(File::open(archive)?, Compression::Bzip2, destination),
        ArchiveKind::Zip => extract_zip(archive, destination),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_chosen_by_suffix() {
        assert_eq!(ArchiveKind::from_file_name("a-1.0.tar.gz"), Some(ArchiveKind::TarGz));
        assert_eq!(ArchiveKind::from_file_name("a-1.0.tar.xz"), Some(ArchiveKind::TarXz));
        assert_eq!(ArchiveKind::from_file_name("a-1.0.tar.bz2"), Some(ArchiveKind::TarBz2));
        assert_eq!(ArchiveKind::from_file_name("a-1.0.zip"), Some(ArchiveKind::Zip));
        assert_eq!(ArchiveKind::from_file_name("a-1.0.jar"), None);
        assert_eq!(ArchiveKind::from_file_name("a-1.0.tgz"), None);
    }

    #[test]
    fn unknown_suffix_is_an_error() {
        match ArchiveKind::for_path(Path::new("/repo/a-1.0.rar")) {
            Err(LauncherError::UnsupportedArchive(name)) => assert_eq!(name, "a-1.0.rar"),
            other => panic!("expected UnsupportedArchive, got {other:?}"),
        }
    }
}
