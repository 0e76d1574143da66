use std::path::Path;

use anyhow::{Context, Result};
use log::debug;

use crate::io::{FileSource, LocalFileSystem};

use super::compress::compress;
use super::structures::{
    CompressionMethod, DosDateTime, EXTERNAL_ATTR_DIRECTORY, FLAG_UTF8, LocalFileHeader,
    VERSION_NEEDED,
};

/// Name suffix of compiled Java classes.
pub const CLASS_FILE_SUFFIX: &str = ".class";

/// What an entry represents, decided once when the entry is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    File,
    /// A regular file whose name ends in [`CLASS_FILE_SUFFIX`]
    ClassFile,
    /// Directory placeholder: name ends with `/`, never carries data
    Directory,
}

impl EntryKind {
    fn for_file_name(name: &str) -> Self {
        if name.ends_with(CLASS_FILE_SUFFIX) {
            EntryKind::ClassFile
        } else {
            EntryKind::File
        }
    }

    pub fn is_directory(&self) -> bool {
        matches!(self, EntryKind::Directory)
    }
}

/// One archive member.
///
/// Built either from in-memory bytes ([`Entry::file`], [`Entry::directory`]) or from
/// the filesystem ([`Entry::from_path`]). Once built, the name never changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    name: String,
    data: Vec<u8>,
    kind: EntryKind,
    compression_method: Option<CompressionMethod>,
    timestamp: DosDateTime,
    extra: Vec<u8>,
    comment: Option<String>,
    /// External file attributes; only directories read from a [`FileSource`] set any
    attributes: u32,
}

/// An entry serialized as local header, name, extra field and payload.
#[derive(Debug, Clone)]
pub(crate) struct EncodedEntry {
    pub header: LocalFileHeader,
    pub bytes: Vec<u8>,
}

impl Entry {
    /// A file entry holding `data`, timestamped now.
    pub fn file(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        let name = name.into();
        Self {
            kind: EntryKind::for_file_name(&name),
            name,
            data: data.into(),
            compression_method: None,
            timestamp: DosDateTime::now(),
            extra: Vec::new(),
            comment: None,
            attributes: 0,
        }
    }

    /// A directory placeholder. A trailing `/` is appended if missing.
    ///
    /// Placeholders carry no directory attribute; see [`Entry::from_source`].
    pub fn directory(name: impl Into<String>) -> Self {
        let mut name = name.into();
        if !name.ends_with('/') {
            name.push('/');
        }
        Self {
            name,
            data: Vec::new(),
            kind: EntryKind::Directory,
            compression_method: Some(CompressionMethod::Stored),
            timestamp: DosDateTime::now(),
            extra: Vec::new(),
            comment: None,
            attributes: 0,
        }
    }

    /// Build an entry from a path on the local filesystem, named after the path.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_source(&LocalFileSystem, path.as_ref(), None)
    }

    /// Build an entry from `path` as seen through `source`.
    ///
    /// Directories become entries with no payload and the DOS directory
    /// attribute; files are read in full.
    /// The entry is named `name`, or after `path` with `/` separators and no
    /// leading `/` when `name` is `None`. Either way the modification time of
    /// the path becomes the entry timestamp.
    pub fn from_source(source: &dyn FileSource, path: &Path, name: Option<&str>) -> Result<Self> {
        let stat = source.stat(path)?;
        let name = name
            .map(str::to_owned)
            .unwrap_or_else(|| archive_name_for(path));
        let timestamp = stat
            .modified
            .map(DosDateTime::from_system_time)
            .unwrap_or_else(DosDateTime::now);

        let entry = if stat.is_dir {
            Entry {
                attributes: EXTERNAL_ATTR_DIRECTORY,
                ..Entry::directory(name)
            }
        } else {
            let data = source
                .read(path)
                .with_context(|| format!("no such entry: {}", path.display()))?;
            Entry::file(name, data)
        };

        debug!("loaded {} from {}", entry.name, path.display());
        Ok(entry.with_timestamp(timestamp))
    }

    /// Override the archive's default compression. Ignored for directories.
    pub fn with_compression(mut self, method: CompressionMethod) -> Self {
        if !self.kind.is_directory() {
            self.compression_method = Some(method);
        }
        self
    }

    pub fn with_timestamp(mut self, timestamp: DosDateTime) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Attach an extra field. The bytes are written verbatim.
    pub fn with_extra(mut self, extra: impl Into<Vec<u8>>) -> Self {
        self.extra = extra.into();
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    pub fn is_directory(&self) -> bool {
        self.kind.is_directory()
    }

    /// Effective compression method; entries never added to an archive fall back to the default.
    pub fn compression_method(&self) -> CompressionMethod {
        self.compression_method.unwrap_or_default()
    }

    pub fn timestamp(&self) -> DosDateTime {
        self.timestamp
    }

    pub fn extra(&self) -> &[u8] {
        &self.extra
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    /// External file attributes as written to the central directory.
    pub fn external_attributes(&self) -> u32 {
        self.attributes
    }

    /// General purpose flags shared by the local and central headers.
    pub fn flags(&self) -> u16 {
        let ascii = self.name.is_ascii() && self.comment.as_deref().is_none_or(str::is_ascii);
        if ascii { 0 } else { FLAG_UTF8 }
    }

    pub(crate) fn apply_default_compression(&mut self, method: CompressionMethod) {
        self.compression_method.get_or_insert(method);
    }

    /// Replace the payload of a file entry.
    pub(crate) fn set_data(&mut self, data: impl Into<Vec<u8>>) {
        debug_assert!(!self.kind.is_directory(), "directory entries carry no data");
        self.data = data.into();
    }

    /// Compress the payload and serialize the local section of this entry.
    pub(crate) fn encode(&self) -> Result<EncodedEntry> {
        let compressed = compress(&self.data, self.compression_method())
            .with_context(|| format!("cannot compress {}", self.name))?;

        let header = LocalFileHeader {
            version_needed: VERSION_NEEDED,
            flags: self.flags(),
            compression_method: self.compression_method().as_u16(),
            last_modified: self.timestamp,
            crc32: compressed.crc32,
            compressed_size: u32::try_from(compressed.compressed_size)
                .with_context(|| format!("{} is too large for a ZIP archive", self.name))?,
            uncompressed_size: u32::try_from(compressed.uncompressed_size)
                .with_context(|| format!("{} is too large for a ZIP archive", self.name))?,
            file_name_length: u16::try_from(self.name.len())
                .with_context(|| format!("entry name too long: {}", self.name))?,
            extra_field_length: u16::try_from(self.extra.len())
                .with_context(|| format!("extra field too long on {}", self.name))?,
        };

        let mut bytes = Vec::with_capacity(
            LocalFileHeader::SIZE + self.name.len() + self.extra.len() + compressed.data.len(),
        );
        header.write_to(&mut bytes)?;
        bytes.extend_from_slice(self.name.as_bytes());
        bytes.extend_from_slice(&self.extra);
        bytes.extend_from_slice(&compressed.data);

        Ok(EncodedEntry { header, bytes })
    }
}

/// Archive name for a filesystem path: `/` separators, no leading `/`.
fn archive_name_for(path: &Path) -> String {
    let name = path.to_string_lossy();
    let name = if std::path::MAIN_SEPARATOR == '/' {
        name.into_owned()
    } else {
        name.replace(std::path::MAIN_SEPARATOR, "/")
    };
    name.trim_start_matches('/').to_owned()
}
