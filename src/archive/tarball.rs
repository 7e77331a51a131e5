// src/archive/tarball.rs

//! Streaming tar extraction over a pluggable decompression stream.

use std::io::Read;
use std::path::Path;

use bzip2::read::MultiBzDecoder;
use filetime::FileTime;
use flate2::read::MultiGzDecoder;
use tar::{Archive, EntryType};
use tracing::debug;
use xz2::read::XzDecoder;

use super::tree::{EntryAttributes, TreeWriter};
use crate::errors::{LauncherError, Result};

/// Decompression applied in front of the tar stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip,
    Xz,
    Bzip2,
}

impl Compression {
    /// Wrap `reader` in the matching decoder.
    ///
    /// Gzip and bzip2 accept concatenated members/streams.
    pub fn decoder<'a, R: Read + 'a>(self, reader: R) -> Box<dyn Read + 'a> {
        match self {
            Compression::None => Box::new(reader),
            Compression::Gzip => Box::new(MultiGzDecoder::new(reader)),
            Compression::Xz => Box::new(XzDecoder::new(reader)),
            Compression::Bzip2 => Box::new(MultiBzDecoder::new(reader)),
        }
    }

    /// Compression of a tar file name; unknown suffixes fall back to xz.
    pub fn from_tar_name(name: &str) -> Self {
        if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Compression::Gzip
        } else if name.ends_with(".tar.bz2") {
            Compression::Bzip2
        } else if name.ends_with(".tar") {
            Compression::None
        } else {
            Compression::Xz
        }
    }
}

/// Extract a (possibly compressed) tar stream under `destination`.
pub fn extract_tar<R: Read>(reader: R, compression: Compression, destination: &Path) -> Result<()> {
    let mut tree = TreeWriter::new(destination)?;
    let mut archive = Archive::new(compression.decoder(reader));
    let mut count = 0usize;

    for entry in archive.entries()? {
        let mut entry = entry?;
        let name = entry.path()?.into_owned();
        let (kind, mtime, mode) = {
            let header = entry.header();
            (header.entry_type(), header.mtime()?, header.mode()?)
        };

        // Global pax headers carry archive-wide defaults, not tree entries.
        if kind == EntryType::XGlobalHeader {
            continue;
        }

        let path = tree.entry_path(&name)?;
        let attributes = EntryAttributes::new(FileTime::from_unix_time(mtime as i64, 0), mode);

        if kind.is_file() {
            let size = entry.size();
            tree.write_file(path, &mut entry, size, attributes)?;
        } else if kind.is_dir() {
            tree.add_directory(path, attributes)?;
        } else if kind.is_symlink() {
            let target = entry.link_name()?.ok_or_else(|| {
                LauncherError::ArchiveFormat(format!("symlink '{}' has no target", name.display()))
            })?;
            tree.add_symlink(path, target.into_owned(), attributes)?;
        } else {
            return Err(LauncherError::ArchiveFormat(format!(
                "unsupported entry type {kind:?} for '{}'",
                name.display()
            )));
        }
        count += 1;
    }

    debug!(entries = count, root = %tree.root().display(), "tar entries written");
    tree.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tar_names_map_to_compression() {
        assert_eq!(Compression::from_tar_name("meta-1.0.tar.gz"), Compression::Gzip);
        assert_eq!(Compression::from_tar_name("meta.tgz"), Compression::Gzip);
        assert_eq!(Compression::from_tar_name("meta.tar.bz2"), Compression::Bzip2);
        assert_eq!(Compression::from_tar_name("meta.tar"), Compression::None);
        assert_eq!(Compression::from_tar_name("meta.tar.xz"), Compression::Xz);
        assert_eq!(Compression::from_tar_name("meta"), Compression::Xz);
    }
}
