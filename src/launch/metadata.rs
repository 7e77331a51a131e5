// src/launch/metadata.rs

//! Command metadata archive.
//!
//! A tar archive with exactly five regular files:
//!
//! | entry                    | content                                  |
//! |--------------------------|------------------------------------------|
//! | `dependencies`           | one resource reference per line          |
//! | `commandArguments`       | argument blob template                   |
//! | `environment.properties` | environment variable templates           |
//! | `system.properties`      | system property templates                |
//! | `attachments.properties` | attachment declarations                  |

use std::io::Read;

use tar::Archive;
use tracing::debug;

use crate::archive::Compression;
use crate::archive::tree::copy_exact;
use crate::config::{ConfigurationSet, ensure_no_reserved, parse_properties};
use crate::errors::{LauncherError, Result};
use crate::repository::Resource;

pub const DEPENDENCIES: &str = "dependencies";
pub const COMMAND_ARGUMENTS: &str = "commandArguments";
pub const ENVIRONMENT: &str = "environment.properties";
pub const SYSTEM_PROPERTIES: &str = "system.properties";
pub const ATTACHMENTS: &str = "attachments.properties";

#[derive(Debug, Clone, Default)]
pub struct CommandMetadata {
    pub dependencies: Vec<String>,
    pub arguments: String,
    pub environment: ConfigurationSet,
    pub system_properties: ConfigurationSet,
    pub attachments: ConfigurationSet,
}

#[derive(Default)]
struct Entries {
    dependencies: Option<Vec<u8>>,
    arguments: Option<Vec<u8>>,
    environment: Option<Vec<u8>>,
    system_properties: Option<Vec<u8>>,
    attachments: Option<Vec<u8>>,
}

impl Entries {
    fn slot(&mut self, name: &str) -> Result<&mut Option<Vec<u8>>> {
        match name {
            DEPENDENCIES => Ok(&mut self.dependencies),
            COMMAND_ARGUMENTS => Ok(&mut self.arguments),
            ENVIRONMENT => Ok(&mut self.environment),
            SYSTEM_PROPERTIES => Ok(&mut self.system_properties),
            ATTACHMENTS => Ok(&mut self.attachments),
            other => Err(LauncherError::MetadataFormat(format!(
                "unexpected entry '{other}'"
            ))),
        }
    }
}

impl CommandMetadata {
    /// Read the metadata archive behind `resource`, picking the compression
    /// from its file name.
    pub fn read(resource: &Resource) -> Result<Self> {
        let compression = Compression::from_tar_name(&resource.file_name());
        debug!(resource = %resource.id().display(), ?compression, "reading command metadata");
        Self::parse(resource.open()?, compression)
    }

    pub fn parse<R: Read>(reader: R, compression: Compression) -> Result<Self> {
        let mut entries = Entries::default();
        let mut archive = Archive::new(compression.decoder(reader));
        let mut buffer = vec![0u8; 64 * 1024];

        for entry in archive.entries()? {
            let mut entry = entry?;
            if !entry.header().entry_type().is_file() {
                continue;
            }
            let name = entry.path()?.to_string_lossy().into_owned();
            let slot = entries.slot(&name)?;
            if slot.is_some() {
                return Err(LauncherError::MetadataFormat(format!(
                    "duplicate entry '{name}'"
                )));
            }

            // The declared size is untrusted; the buffer grows with what is read.
            let size = entry.size();
            let mut content = Vec::with_capacity(size.min(buffer.len() as u64) as usize);
            copy_exact(&mut entry, &mut content, size, &mut buffer)
                .map_err(|e| LauncherError::MetadataFormat(format!("entry '{name}': {e}")))?;
            *slot = Some(content);
        }

        let dependencies = String::from_utf8(required(entries.dependencies, DEPENDENCIES)?)
            .map_err(|_| invalid_utf8(DEPENDENCIES))?
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        let arguments = String::from_utf8(required(entries.arguments, COMMAND_ARGUMENTS)?)
            .map_err(|_| invalid_utf8(COMMAND_ARGUMENTS))?;
        let environment = parse_properties(&required(entries.environment, ENVIRONMENT)?)?;
        let system_properties =
            parse_properties(&required(entries.system_properties, SYSTEM_PROPERTIES)?)?;
        let attachments = parse_properties(&required(entries.attachments, ATTACHMENTS)?)?;
        ensure_no_reserved(&attachments, ATTACHMENTS)?;

        Ok(Self {
            dependencies,
            arguments,
            environment,
            system_properties,
            attachments,
        })
    }
}

fn required(content: Option<Vec<u8>>, name: &str) -> Result<Vec<u8>> {
    content.ok_or_else(|| LauncherError::MetadataFormat(format!("missing entry '{name}'")))
}

fn invalid_utf8(name: &str) -> LauncherError {
    LauncherError::MetadataFormat(format!("entry '{name}' is not valid UTF-8"))
}
