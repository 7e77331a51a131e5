// src/archive/tree.rs

//! Format-independent half of extraction.
//!
//! Every archive format feeds its entries into a [`TreeWriter`], which owns
//! path safety, lazy parent creation and the two-pass attribute discipline:
//! files get their attributes right after they are written, while directory
//! attributes and symlink creation are deferred to [`TreeWriter::finish`].

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Component, Path, PathBuf};

use filetime::FileTime;
use tracing::{debug, trace};

use crate::errors::{LauncherError, Result};

/// One copy buffer of this size is allocated per extraction.
pub const COPY_BUFFER_SIZE: usize = 0x100_0000;

/// POSIX permission flags, declared in mode-bit order (bit 0 first).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Permission {
    OthersExecute,
    OthersWrite,
    OthersRead,
    GroupExecute,
    GroupWrite,
    GroupRead,
    OwnerExecute,
    OwnerWrite,
    OwnerRead,
}

const PERMISSIONS: [Permission; 9] = [
    Permission::OthersExecute,
    Permission::OthersWrite,
    Permission::OthersRead,
    Permission::GroupExecute,
    Permission::GroupWrite,
    Permission::GroupRead,
    Permission::OwnerExecute,
    Permission::OwnerWrite,
    Permission::OwnerRead,
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionSet(BTreeSet<Permission>);

impl PermissionSet {
    /// Decode the low 9 bits of `mode`, least significant bit first.
    pub fn from_mode(mode: u32) -> Self {
        let mut set = BTreeSet::new();
        for (bit, permission) in PERMISSIONS.iter().enumerate() {
            if mode & (1 << bit) != 0 {
                set.insert(*permission);
            }
        }
        Self(set)
    }

    pub fn contains(&self, permission: Permission) -> bool {
        self.0.contains(&permission)
    }

    pub fn mode(&self) -> u32 {
        PERMISSIONS
            .iter()
            .enumerate()
            .filter(|(_, p)| self.0.contains(p))
            .fold(0, |mode, (bit, _)| mode | (1 << bit))
    }
}

/// Timestamp and permissions carried by an archive entry.
#[derive(Debug, Clone)]
pub struct EntryAttributes {
    pub time: FileTime,
    pub permissions: PermissionSet,
}

impl EntryAttributes {
    pub fn new(time: FileTime, mode: u32) -> Self {
        Self {
            time,
            permissions: PermissionSet::from_mode(mode),
        }
    }
}

/// Deferred directory attributes.
pub type DirInfo = EntryAttributes;

/// Deferred symlink creation.
#[derive(Debug, Clone)]
pub struct SymlinkInfo {
    pub target: PathBuf,
    pub attributes: EntryAttributes,
}

/// Materializes entries under one destination root.
pub struct TreeWriter {
    root: PathBuf,
    posix: bool,
    created_dirs: HashSet<PathBuf>,
    dirs: BTreeMap<PathBuf, DirInfo>,
    symlinks: BTreeMap<PathBuf, SymlinkInfo>,
    buffer: Vec<u8>,
}

impl TreeWriter {
    /// The destination must already exist; it is canonicalized so that the
    /// escape check compares real paths.
    pub fn new(destination: &Path) -> Result<Self> {
        let root = destination.canonicalize()?;
        let mut created_dirs = HashSet::new();
        created_dirs.insert(root.clone());
        Ok(Self {
            root,
            posix: cfg!(unix),
            created_dirs,
            dirs: BTreeMap::new(),
            symlinks: BTreeMap::new(),
            buffer: vec![0; COPY_BUFFER_SIZE],
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Destination path of an entry, rejecting names that leave the root.
    pub fn entry_path(&self, name: &Path) -> Result<PathBuf> {
        let path = normalize(&self.root.join(name));
        if path == self.root {
            return Ok(path);
        }
        match path.parent() {
            Some(parent) if parent.starts_with(&self.root) => Ok(path),
            _ => Err(LauncherError::PathEscape(name.display().to_string())),
        }
    }

    pub fn write_file(
        &mut self,
        path: PathBuf,
        reader: &mut dyn Read,
        size: u64,
        attributes: EntryAttributes,
    ) -> Result<()> {
        self.reject_root(&path)?;
        if let Some(parent) = path.parent() {
            self.ensure_dir(parent)?;
        }

        let mut out = File::create(&path)?;
        copy_exact(reader, &mut out, size, &mut self.buffer).map_err(|e| match e {
            LauncherError::ArchiveFormat(reason) => {
                LauncherError::ArchiveFormat(format!("{}: {reason}", path.display()))
            }
            other => other,
        })?;
        out.flush()?;
        drop(out);

        self.apply_mode(&path, &attributes.permissions)?;
        filetime::set_file_mtime(&path, attributes.time)?;
        trace!(path = %path.display(), size, "extracted file");
        Ok(())
    }

    pub fn add_directory(&mut self, path: PathBuf, attributes: DirInfo) -> Result<()> {
        fs::create_dir_all(&path)?;
        if let Some(parent) = path.parent() {
            self.created_dirs.insert(parent.to_path_buf());
        }
        self.created_dirs.insert(path.clone());
        self.dirs.insert(path, attributes);
        Ok(())
    }

    pub fn add_symlink(
        &mut self,
        path: PathBuf,
        target: PathBuf,
        attributes: EntryAttributes,
    ) -> Result<()> {
        self.reject_root(&path)?;
        self.symlinks
            .insert(path, SymlinkInfo { target, attributes });
        Ok(())
    }

    /// Second pass, deepest paths first.
    ///
    /// Symlinks are created before directory attributes are applied so that
    /// creating a link neither bumps an already-restored directory mtime nor
    /// hits a directory that has just been made read-only.
    pub fn finish(mut self) -> Result<()> {
        let symlinks = std::mem::take(&mut self.symlinks);
        for (path, info) in symlinks.iter().rev() {
            if let Some(parent) = path.parent() {
                self.ensure_dir(parent)?;
            }
            create_symlink(&info.target, path)?;
            // Link modes are not settable on Linux; only the link's own mtime.
            filetime::set_symlink_file_times(path, info.attributes.time, info.attributes.time)?;
        }

        let dirs = std::mem::take(&mut self.dirs);
        for (path, info) in dirs.iter().rev() {
            self.apply_mode(path, &info.permissions)?;
            filetime::set_file_mtime(path, info.time)?;
        }
        Ok(())
    }

    fn apply_mode(&mut self, path: &Path, permissions: &PermissionSet) -> Result<()> {
        if !self.posix {
            return Ok(());
        }
        let outcome = apply_permissions(path, permissions);
        self.absorb_unsupported(path, outcome)
    }

    /// Filesystems without POSIX modes (vfat, exFAT) refuse chmod; modes are
    /// then skipped for the rest of the extraction.
    fn absorb_unsupported(&mut self, path: &Path, outcome: io::Result<()>) -> Result<()> {
        match outcome {
            Err(err) if lacks_posix_support(&err) => {
                debug!(path = %path.display(), error = %err, "permission bits not supported, skipping them");
                self.posix = false;
                Ok(())
            }
            other => other.map_err(LauncherError::from),
        }
    }

    fn ensure_dir(&mut self, dir: &Path) -> Result<()> {
        if self.created_dirs.insert(dir.to_path_buf()) {
            fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    fn reject_root(&self, path: &Path) -> Result<()> {
        if path == self.root {
            return Err(LauncherError::ArchiveFormat(
                "non-directory entry resolves to the destination root".to_string(),
            ));
        }
        Ok(())
    }
}

/// Copy exactly `size` bytes; a short source is a format error.
pub fn copy_exact(
    reader: &mut dyn Read,
    writer: &mut dyn Write,
    size: u64,
    buffer: &mut [u8],
) -> Result<()> {
    let mut remaining = size;
    while remaining != 0 {
        let chunk = remaining.min(buffer.len() as u64) as usize;
        let read = reader.read(&mut buffer[..chunk])?;
        if read == 0 {
            return Err(LauncherError::ArchiveFormat(format!(
                "entry truncated, {remaining} of {size} bytes missing"
            )));
        }
        writer.write_all(&buffer[..read])?;
        remaining -= read as u64;
    }
    Ok(())
}

/// Lexical normalization: drop `.`, let `..` pop a component.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(unix)]
fn apply_permissions(path: &Path, permissions: &PermissionSet) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(permissions.mode()))
}

#[cfg(not(unix))]
fn apply_permissions(_path: &Path, _permissions: &PermissionSet) -> io::Result<()> {
    Ok(())
}

fn lacks_posix_support(err: &io::Error) -> bool {
    if err.kind() == io::ErrorKind::Unsupported {
        return true;
    }
    #[cfg(unix)]
    {
        use nix::errno::Errno;
        if let Some(code) = err.raw_os_error() {
            return matches!(Errno::from_raw(code), Errno::EPERM | Errno::EOPNOTSUPP);
        }
    }
    false
}

#[cfg(unix)]
fn create_symlink(target: &Path, link: &Path) -> Result<()> {
    std::os::unix::fs::symlink(target, link)?;
    Ok(())
}

#[cfg(not(unix))]
fn create_symlink(target: &Path, link: &Path) -> Result<()> {
    Err(LauncherError::ArchiveFormat(format!(
        "symlink {} -> {} is not supported on this platform",
        link.display(),
        target.display()
    )))
}
