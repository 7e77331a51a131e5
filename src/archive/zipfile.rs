// src/archive/zipfile.rs

//! Random-access zip extraction driven by the central directory.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate, TimeZone};
use filetime::FileTime;
use tracing::debug;
use zip::ZipArchive;
use zip::extra_fields::ExtraField;
use zip::read::ZipFile;

use super::tree::{EntryAttributes, TreeWriter};
use crate::errors::Result;

const S_IFMT: u32 = 0o170_000;
const S_IFLNK: u32 = 0o120_000;

/// Modes assumed for entries written without Unix attributes.
const DEFAULT_DIR_MODE: u32 = 0o755;
const DEFAULT_FILE_MODE: u32 = 0o644;

pub fn extract_zip(archive_path: &Path, destination: &Path) -> Result<()> {
    let mut tree = TreeWriter::new(destination)?;
    let mut archive = ZipArchive::new(File::open(archive_path)?)?;

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        let name = PathBuf::from(entry.name());
        let path = tree.entry_path(&name)?;
        let is_dir = entry.is_dir();
        let mode = entry.unix_mode().unwrap_or(if is_dir {
            DEFAULT_DIR_MODE
        } else {
            DEFAULT_FILE_MODE
        });
        let time = extended_mtime(&entry).unwrap_or_else(|| dos_time(entry.last_modified()));
        let attributes = EntryAttributes::new(time, mode);

        if is_dir {
            tree.add_directory(path, attributes)?;
        } else if mode & S_IFMT == S_IFLNK {
            let mut target = String::new();
            entry.read_to_string(&mut target)?;
            tree.add_symlink(path, PathBuf::from(target), attributes)?;
        } else {
            let size = entry.size();
            tree.write_file(path, &mut entry, size, attributes)?;
        }
    }

    debug!(entries = archive.len(), root = %tree.root().display(), "zip entries written");
    tree.finish()
}

/// Info-ZIP extended timestamp (`UT`, 0x5455): exact UTC seconds.
fn extended_mtime(entry: &ZipFile<'_>) -> Option<FileTime> {
    entry
        .extra_data_fields()
        .find_map(|field| match field {
            ExtraField::ExtendedTimestamp(ts) => ts.mod_time(),
            _ => None,
        })
        .map(|seconds| FileTime::from_unix_time(seconds.into(), 0))
}

/// DOS fallback: local wall-clock time without a zone, 2 second steps.
fn dos_time(time: Option<zip::DateTime>) -> FileTime {
    time.and_then(|t| {
        let naive = NaiveDate::from_ymd_opt(t.year().into(), t.month().into(), t.day().into())?
            .and_hms_opt(t.hour().into(), t.minute().into(), t.second().into())?;
        Local.from_local_datetime(&naive).earliest()
    })
    .map(|local| FileTime::from_unix_time(local.timestamp(), 0))
    .unwrap_or_else(FileTime::now)
}
