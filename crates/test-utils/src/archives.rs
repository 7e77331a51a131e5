#![allow(dead_code)]

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use bzip2::write::BzEncoder;
use flate2::write::GzEncoder;
use launcher::archive::Compression;
use tar::{EntryType, Header};
use xz2::write::XzEncoder;
use zip::write::FullFileOptions;

/// Modification time given to entries that don't set one.
pub const DEFAULT_MTIME: u64 = 1_700_000_000;

/// DOS timestamp stamped on every zip entry: 2024-01-02 03:04:06 local time.
pub const ZIP_TIME: (u16, u8, u8, u8, u8, u8) = (2024, 1, 2, 3, 4, 6);

#[derive(Debug, Clone)]
enum Entry {
    File { name: String, data: Vec<u8>, mode: u32, mtime: u64 },
    Dir { name: String, mode: u32, mtime: u64 },
    Symlink { name: String, target: String, mtime: u64 },
    Fifo { name: String },
}

/// In-memory description of an archive, written as tar (any compression)
/// or zip.
///
/// Entry names are stored byte for byte, so hostile names like `../evil`
/// can be produced.
#[derive(Debug, Clone, Default)]
pub struct ArchiveBuilder {
    entries: Vec<Entry>,
    extended_times: bool,
}

impl ArchiveBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file(self, name: &str, data: impl AsRef<[u8]>) -> Self {
        self.file_with(name, data, 0o644, DEFAULT_MTIME)
    }

    pub fn file_with(mut self, name: &str, data: impl AsRef<[u8]>, mode: u32, mtime: u64) -> Self {
        self.entries.push(Entry::File {
            name: name.to_string(),
            data: data.as_ref().to_vec(),
            mode,
            mtime,
        });
        self
    }

    pub fn dir(self, name: &str) -> Self {
        self.dir_with(name, 0o755, DEFAULT_MTIME)
    }

    pub fn dir_with(mut self, name: &str, mode: u32, mtime: u64) -> Self {
        self.entries.push(Entry::Dir {
            name: name.to_string(),
            mode,
            mtime,
        });
        self
    }

    pub fn symlink(self, name: &str, target: &str) -> Self {
        self.symlink_with(name, target, DEFAULT_MTIME)
    }

    pub fn symlink_with(mut self, name: &str, target: &str, mtime: u64) -> Self {
        self.entries.push(Entry::Symlink {
            name: name.to_string(),
            target: target.to_string(),
            mtime,
        });
        self
    }

    /// Zip only: give every entry an Info-ZIP `UT` extra field carrying its
    /// exact mtime next to the 2-second DOS stamp.
    pub fn with_extended_times(mut self) -> Self {
        self.extended_times = true;
        self
    }

    /// A named pipe; extractors refuse these.
    pub fn fifo(mut self, name: &str) -> Self {
        self.entries.push(Entry::Fifo {
            name: name.to_string(),
        });
        self
    }

    /// Uncompressed tar stream.
    pub fn tar_bytes(&self) -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());
        for entry in &self.entries {
            let mut header = Header::new_gnu();
            let data: &[u8] = match entry {
                Entry::File { name, data, mode, mtime } => {
                    set_name(&mut header, name);
                    header.set_entry_type(EntryType::Regular);
                    header.set_mode(*mode);
                    header.set_mtime(*mtime);
                    data
                }
                Entry::Dir { name, mode, mtime } => {
                    set_name(&mut header, name);
                    header.set_entry_type(EntryType::Directory);
                    header.set_mode(*mode);
                    header.set_mtime(*mtime);
                    &[]
                }
                Entry::Symlink { name, target, mtime } => {
                    set_name(&mut header, name);
                    set_link_name(&mut header, target);
                    header.set_entry_type(EntryType::Symlink);
                    header.set_mode(0o777);
                    header.set_mtime(*mtime);
                    &[]
                }
                Entry::Fifo { name } => {
                    set_name(&mut header, name);
                    header.set_entry_type(EntryType::Fifo);
                    header.set_mode(0o644);
                    header.set_mtime(DEFAULT_MTIME);
                    &[]
                }
            };
            header.set_size(data.len() as u64);
            header.set_cksum();
            builder.append(&header, data).expect("append tar entry");
        }
        builder.into_inner().expect("finish tar stream")
    }

    pub fn write_tar(&self, path: &Path, compression: Compression) {
        let bytes = compress(&self.tar_bytes(), compression);
        create_parent(path);
        fs::write(path, bytes).expect("write tar archive");
    }

    pub fn write_zip(&self, path: &Path) {
        create_parent(path);
        let (y, mo, d, h, mi, s) = ZIP_TIME;
        let time = zip::DateTime::from_date_and_time(y, mo, d, h, mi, s).expect("valid DOS time");
        let mut zip = zip::ZipWriter::new(File::create(path).expect("create zip"));

        for entry in &self.entries {
            match entry {
                Entry::File { name, data, mode, mtime } => {
                    let options = self.zip_options(time, *mtime).unix_permissions(*mode);
                    zip.start_file(name.as_str(), options).expect("start zip file");
                    zip.write_all(data).expect("write zip file");
                }
                Entry::Dir { name, mode, mtime } => {
                    let options = self.zip_options(time, *mtime).unix_permissions(*mode);
                    zip.add_directory(name.as_str(), options).expect("add zip directory");
                }
                Entry::Symlink { name, target, mtime } => {
                    let options = self.zip_options(time, *mtime);
                    zip.add_symlink(name.as_str(), target.as_str(), options)
                        .expect("add zip symlink");
                }
                Entry::Fifo { .. } => panic!("zip archives cannot hold named pipes"),
            }
        }
        zip.finish().expect("finish zip");
    }

    fn zip_options(&self, time: zip::DateTime, mtime: u64) -> FullFileOptions<'static> {
        let mut options = FullFileOptions::default().last_modified_time(time);
        if self.extended_times {
            let mut field = vec![0x01];
            field.extend_from_slice(&(mtime as u32).to_le_bytes());
            options
                .add_extra_data(0x5455, field.into_boxed_slice(), false)
                .expect("add extended timestamp");
        }
        options
    }
}

/// Compress a tar stream the way the extractor expects for `compression`.
pub fn compress(tar: &[u8], compression: Compression) -> Vec<u8> {
    match compression {
        Compression::None => tar.to_vec(),
        Compression::Gzip => {
            let mut enc = GzEncoder::new(Vec::new(), flate2::Compression::default());
            enc.write_all(tar).expect("gzip");
            enc.finish().expect("gzip finish")
        }
        Compression::Xz => {
            let mut enc = XzEncoder::new(Vec::new(), 6);
            enc.write_all(tar).expect("xz");
            enc.finish().expect("xz finish")
        }
        Compression::Bzip2 => {
            let mut enc = BzEncoder::new(Vec::new(), bzip2::Compression::default());
            enc.write_all(tar).expect("bzip2");
            enc.finish().expect("bzip2 finish")
        }
    }
}

fn create_parent(path: &Path) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create archive parent dir");
    }
}

fn set_name(header: &mut Header, name: &str) {
    let field = &mut header.as_old_mut().name;
    assert!(name.len() < field.len(), "entry name too long: {name}");
    field.fill(0);
    field[..name.len()].copy_from_slice(name.as_bytes());
}

fn set_link_name(header: &mut Header, target: &str) {
    let field = &mut header.as_old_mut().linkname;
    assert!(target.len() < field.len(), "link target too long: {target}");
    field.fill(0);
    field[..target.len()].copy_from_slice(target.as_bytes());
}
