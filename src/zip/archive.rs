use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use log::{debug, trace, warn};

use crate::io::{FileSource, LocalFileSystem};

use super::entry::Entry;
use super::records::{CentralDirectoryRecord, EndOfCentralDirectoryRecord};
use super::structures::{CompressionMethod, EndOfCentralDirectory, LocalFileHeader};

/// An in-memory ZIP archive.
///
/// Entries are kept in insertion order, which is also their order on disk and in
/// the central directory. Nothing is serialized until [`Archive::pack`].
///
/// ## Example
///
/// ```
/// use zipjar::{Archive, CompressionMethod, Entry};
///
/// let mut archive = Archive::with_compression(CompressionMethod::Stored);
/// archive.add_directory("docs/");
/// archive.add_file("docs/a.txt", "hi");
/// archive.add_entry(Entry::file("notes.txt", "...").with_comment("scratch"));
/// archive.set_comment("example");
///
/// let bytes = archive.pack()?;
/// assert_eq!(&bytes[0..4], b"PK\x03\x04");
/// # Ok::<(), anyhow::Error>(())
/// ```
pub struct Archive {
    compression_method: CompressionMethod,
    entries: Vec<Entry>,
    /// First index of each entry name
    names: HashMap<String, usize>,
    comment: Option<String>,
    source: Box<dyn FileSource>,
}

impl Archive {
    /// Create an empty archive that deflates new entries.
    pub fn new() -> Self {
        Self::with_compression(CompressionMethod::default())
    }

    /// Create an empty archive whose entries default to `method`.
    pub fn with_compression(method: CompressionMethod) -> Self {
        Self {
            compression_method: method,
            entries: Vec::new(),
            names: HashMap::new(),
            comment: None,
            source: Box::new(LocalFileSystem),
        }
    }

    /// Replace the filesystem used by the path-based add operations.
    pub fn with_source(mut self, source: impl FileSource + 'static) -> Self {
        self.source = Box::new(source);
        self
    }

    pub fn source(&self) -> &dyn FileSource {
        self.source.as_ref()
    }

    pub fn compression_method(&self) -> CompressionMethod {
        self.compression_method
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First entry named `name`
    pub fn get(&self, name: &str) -> Option<&Entry> {
        self.names.get(name).map(|&idx| &self.entries[idx])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    pub fn set_comment(&mut self, comment: impl Into<String>) {
        self.comment = Some(comment.into());
    }

    /// Append `entry`. It takes the archive's compression method unless it set its own.
    pub fn add_entry(&mut self, mut entry: Entry) -> &mut Entry {
        entry.apply_default_compression(self.compression_method);

        let idx = self.entries.len();
        self.names.entry(entry.name().to_owned()).or_insert(idx);
        debug!("adding {} ({} bytes)", entry.name(), entry.data().len());
        self.entries.push(entry);
        &mut self.entries[idx]
    }

    /// Append a file entry holding `data`.
    pub fn add_file(&mut self, name: impl Into<String>, data: impl Into<Vec<u8>>) -> &mut Entry {
        self.add_entry(Entry::file(name, data))
    }

    /// Append a directory placeholder.
    pub fn add_directory(&mut self, name: impl Into<String>) -> &mut Entry {
        self.add_entry(Entry::directory(name))
    }

    /// Append an entry read from `path`, named after the path.
    ///
    /// If the path cannot be stat'ed or read, nothing is added and the error is returned.
    pub fn add_path(&mut self, path: impl AsRef<Path>) -> Result<&mut Entry> {
        self.load_and_add(path.as_ref(), None)
    }

    /// Like [`Archive::add_path`], but stores the entry under `name`.
    pub fn add_path_as(&mut self, path: impl AsRef<Path>, name: &str) -> Result<&mut Entry> {
        self.load_and_add(path.as_ref(), Some(name))
    }

    fn load_and_add(&mut self, path: &Path, name: Option<&str>) -> Result<&mut Entry> {
        match Entry::from_source(self.source.as_ref(), path, name) {
            Ok(entry) => Ok(self.add_entry(entry)),
            Err(e) => {
                warn!("not adding {}: {:#}", path.display(), e);
                Err(e)
            }
        }
    }

    /// Return the entry named `name`, appending the one built by `make` if there is none.
    pub fn find_or_insert_with<F>(&mut self, name: &str, make: F) -> &mut Entry
    where
        F: FnOnce() -> Entry,
    {
        match self.names.get(name).copied() {
            Some(idx) => &mut self.entries[idx],
            None => {
                let entry = make();
                debug_assert_eq!(entry.name(), name);
                self.add_entry(entry)
            }
        }
    }

    /// Return the directory entry `name` (with trailing `/`), adding it if missing.
    pub fn ensure_directory(&mut self, name: &str) -> &mut Entry {
        let entry = Entry::directory(name);
        let name = entry.name().to_owned();
        self.find_or_insert_with(&name, || entry)
    }

    /// Serialize the archive.
    ///
    /// The first pass writes every local section and records where it starts; the
    /// second writes the central directory from those offsets; the trailer follows.
    ///
    /// # Errors
    ///
    /// Returns an error if the archive exceeds what a non-ZIP64 archive can
    /// describe (65535 entries, 4 GiB offsets, 65535-byte names or comments).
    pub fn pack(&self) -> Result<Vec<u8>> {
        let entry_count = u16::try_from(self.entries.len())
            .with_context(|| format!("{} entries do not fit a ZIP archive", self.entries.len()))?;

        let mut out = Vec::new();
        let mut locals: Vec<(u32, LocalFileHeader)> = Vec::with_capacity(self.entries.len());

        // Pass 1: local headers and payloads
        for entry in &self.entries {
            let offset = u32::try_from(out.len()).context("archive exceeds 4 GiB")?;
            let encoded = entry.encode()?;
            trace!("{} at offset {}", entry.name(), offset);
            out.extend_from_slice(&encoded.bytes);
            locals.push((offset, encoded.header));
        }

        let cd_offset = u32::try_from(out.len()).context("archive exceeds 4 GiB")?;

        // Pass 2: central directory, same order
        for (entry, &(offset, local)) in self.entries.iter().zip(&locals) {
            CentralDirectoryRecord::new(entry, local, offset).write_to(&mut out)?;
        }

        let cd_size =
            u32::try_from(out.len() - cd_offset as usize).context("central directory exceeds 4 GiB")?;

        EndOfCentralDirectoryRecord {
            entry_count,
            cd_size,
            cd_offset,
            comment: self.comment.as_deref(),
        }
        .write_to(&mut out)?;

        debug!(
            "packed {} entries: {} bytes, central directory {} bytes at {}",
            entry_count,
            out.len(),
            cd_size,
            cd_offset
        );
        Ok(out)
    }

    /// Size of the packed archive in bytes.
    pub fn packed_len(&self) -> Result<usize> {
        Ok(self.pack()?.len())
    }

    /// Pack the archive and write it to `w`.
    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_all(&self.pack()?)?;
        Ok(())
    }

    /// Pack the archive and write it to a file at `path`, replacing any existing file.
    ///
    /// The archive is packed before the file is created, so a packing error leaves
    /// `path` untouched. The file handle is closed on every return path.
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let bytes = self.pack()?;

        let mut file =
            File::create(path).with_context(|| format!("cannot create {}", path.display()))?;
        file.write_all(&bytes)
            .with_context(|| format!("cannot write {}", path.display()))?;
        file.flush()?;

        debug!("saved {} bytes to {}", bytes.len(), path.display());
        Ok(())
    }
}

impl Default for Archive {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Archive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.entries.iter().map(Entry::name).collect();
        f.debug_struct("Archive")
            .field("compression_method", &self.compression_method)
            .field("entries", &names)
            .field("comment", &self.comment)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::FileStat;
    use crate::zip::structures::CentralDirectoryFileHeader;
    use anyhow::bail;
    use byteorder::{LittleEndian, ReadBytesExt};
    use std::io::Cursor;

    fn u32_at(buf: &[u8], pos: usize) -> u32 {
        Cursor::new(&buf[pos..]).read_u32::<LittleEndian>().unwrap()
    }

    fn u16_at(buf: &[u8], pos: usize) -> u16 {
        Cursor::new(&buf[pos..]).read_u16::<LittleEndian>().unwrap()
    }

    #[test]
    fn empty_archive_is_just_the_trailer() -> Result<()> {
        let bytes = Archive::new().pack()?;
        assert_eq!(bytes.len(), EndOfCentralDirectory::SIZE);
        assert_eq!(&bytes[0..4], EndOfCentralDirectory::SIGNATURE);
        assert_eq!(u16_at(&bytes, 10), 0);
        assert_eq!(u32_at(&bytes, 12), 0);
        assert_eq!(u32_at(&bytes, 16), 0);
        Ok(())
    }

    #[test]
    fn central_offsets_point_at_local_headers() -> Result<()> {
        let mut archive = Archive::new();
        archive.add_directory("a/");
        archive.add_file("a/one.txt", "first entry");
        archive.add_file("a/two.txt", "second".repeat(50));
        let bytes = archive.pack()?;

        let eocd = bytes.len() - EndOfCentralDirectory::SIZE;
        assert_eq!(u16_at(&bytes, eocd + 10), 3);
        let cd_size = u32_at(&bytes, eocd + 12) as usize;
        let cd_offset = u32_at(&bytes, eocd + 16) as usize;
        assert_eq!(cd_offset + cd_size, eocd);

        let mut pos = cd_offset;
        for entry in archive.entries() {
            let lfh = u32_at(&bytes, pos + 42) as usize;
            assert_eq!(&bytes[lfh..lfh + 4], LocalFileHeader::SIGNATURE);
            let name_len = u16_at(&bytes, lfh + 26) as usize;
            let name = &bytes[lfh + LocalFileHeader::SIZE..][..name_len];
            assert_eq!(name, entry.name().as_bytes());

            pos += CentralDirectoryFileHeader::SIZE
                + u16_at(&bytes, pos + 28) as usize
                + u16_at(&bytes, pos + 30) as usize
                + u16_at(&bytes, pos + 32) as usize;
        }
        assert_eq!(pos, eocd);
        Ok(())
    }

    #[test]
    fn pack_is_idempotent() -> Result<()> {
        let mut archive = Archive::new();
        archive.add_file("x.bin", vec![7u8; 4096]);
        archive.set_comment("same every time");
        assert_eq!(archive.pack()?, archive.pack()?);
        assert_eq!(archive.packed_len()?, archive.pack()?.len());
        Ok(())
    }

    #[test]
    fn write_to_emits_the_packed_image() -> Result<()> {
        let mut archive = Archive::new();
        archive.add_directory("d");
        archive.add_file("d/x.txt", "streamed");

        let mut out = Vec::new();
        archive.write_to(&mut out)?;
        assert_eq!(out, archive.pack()?);
        Ok(())
    }

    #[test]
    fn archive_default_compression_applies_to_unset_entries() {
        let mut archive = Archive::with_compression(CompressionMethod::Stored);
        assert_eq!(
            archive.add_file("a", "").compression_method(),
            CompressionMethod::Stored
        );
        let entry = Entry::file("b", "").with_compression(CompressionMethod::Deflate);
        assert_eq!(
            archive.add_entry(entry).compression_method(),
            CompressionMethod::Deflate
        );
    }

    #[test]
    fn find_or_insert_keeps_position() {
        let mut archive = Archive::new();
        archive.add_file("first", "1");
        archive.add_file("second", "2");

        archive
            .find_or_insert_with("first", || Entry::file("first", "new"))
            .set_data("replaced");
        assert_eq!(archive.len(), 2);
        assert_eq!(archive.entries()[0].data(), b"replaced");

        archive.find_or_insert_with("third", || Entry::file("third", "3"));
        assert_eq!(archive.len(), 3);
        assert_eq!(archive.entries()[2].name(), "third");
    }

    #[test]
    fn ensure_directory_does_not_duplicate() {
        let mut archive = Archive::new();
        archive.ensure_directory("lib");
        archive.ensure_directory("lib/");
        assert_eq!(archive.len(), 1);
        assert!(archive.contains("lib/"));
        assert!(archive.get("lib/").is_some_and(Entry::is_directory));
    }

    struct Unreadable;

    impl FileSource for Unreadable {
        fn stat(&self, _path: &Path) -> Result<FileStat> {
            Ok(FileStat {
                is_dir: false,
                size: 3,
                modified: None,
            })
        }

        fn read(&self, path: &Path) -> Result<Vec<u8>> {
            bail!("permission denied: {}", path.display())
        }
    }

    #[test]
    fn failed_path_add_leaves_entries_untouched() {
        let mut archive = Archive::new();
        archive.add_file("kept", "k");

        assert!(archive.add_path("/no/such/path").is_err());
        assert_eq!(archive.len(), 1);

        let mut archive = archive.with_source(Unreadable);
        assert!(archive.add_path_as("whatever", "name").is_err());
        assert_eq!(archive.len(), 1);
        assert!(!archive.contains("name"));
    }

    #[test]
    fn add_path_sets_directory_flag_only_on_directories() -> Result<()> {
        let dir = tempfile::TempDir::new()?;
        let file = dir.path().join("f.txt");
        std::fs::write(&file, "contents")?;

        let mut archive = Archive::new();
        let entry = archive.add_path_as(dir.path(), "d")?;
        assert_eq!(entry.name(), "d/");
        assert_eq!(entry.external_attributes(), 0x10);

        let entry = archive.add_path_as(&file, "d/f.txt")?;
        assert!(!entry.is_directory());
        assert_eq!(entry.external_attributes(), 0);
        assert_eq!(entry.data(), b"contents");
        Ok(())
    }

    #[test]
    fn save_to_writes_packed_bytes() -> Result<()> {
        let dir = tempfile::TempDir::new()?;
        let target = dir.path().join("out.zip");

        let mut archive = Archive::new();
        archive.add_file("hello.txt", "hello");
        archive.save_to(&target)?;
        assert_eq!(std::fs::read(&target)?, archive.pack()?);

        let missing_dir = dir.path().join("missing").join("out.zip");
        assert!(archive.save_to(&missing_dir).is_err());
        Ok(())
    }

    #[test]
    fn too_many_entries_fail_to_pack() {
        let mut archive = Archive::with_compression(CompressionMethod::Stored);
        for i in 0..=u16::MAX as usize {
            archive.add_file(i.to_string(), Vec::new());
        }
        assert!(archive.pack().is_err());
    }

    #[test]
    fn debug_lists_entry_names() {
        let mut archive = Archive::new();
        archive.add_file("a.txt", "");
        archive.add_directory("b");
        let shown = format!("{:?}", archive);
        assert!(shown.contains("[\"a.txt\", \"b/\"]"));
    }
}
