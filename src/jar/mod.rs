//! JAR/WAR archives.
//!
//! [`ManifestArchive`] is an [`Archive`] that can synthesize
//! `META-INF/MANIFEST.MF` from its class entries and import file trees while
//! creating the directory entries they live in.
//!
//! ## Example
//!
//! ```no_run
//! use zipjar::{ManifestArchive, ManifestOptions};
//!
//! let mut war = ManifestArchive::new();
//! war.add_directory("WEB-INF/");
//! war.add_file("WEB-INF/web.xml", "<web-app/>");
//! war.add_directory("WEB-INF/classes/");
//!
//! let files = [
//!     vec!["servlet", "examples", "HelloWorld.class"],
//!     vec!["Foo.class"],
//!     vec!["servlet", "Bar.class"],
//! ];
//! war.add_files(&files, "./class_files/", "WEB-INF/classes/")?;
//! war.build_manifest(&ManifestOptions::new());
//! war.save_to("app.war")?;
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! The resulting tree, in archive order:
//!
//! ```text
//! WEB-INF/
//! WEB-INF/web.xml
//! WEB-INF/classes/
//! WEB-INF/classes/servlet/
//! WEB-INF/classes/servlet/examples/
//! WEB-INF/classes/servlet/examples/HelloWorld.class
//! WEB-INF/classes/Foo.class
//! WEB-INF/classes/servlet/Bar.class
//! META-INF/
//! META-INF/MANIFEST.MF
//! ```

mod manifest;

pub use manifest::{MANIFEST_DIR, MANIFEST_PATH, MANIFEST_VERSION, ManifestOptions};

use std::ops::{Deref, DerefMut};
use std::path::Path;

use anyhow::{Context, Result, bail};
use log::debug;

use crate::zip::{Archive, CompressionMethod, DosDateTime, Entry, EntryKind};

/// An archive with a JAR-style manifest.
///
/// Every [`Archive`] operation is available through `Deref`.
#[derive(Debug, Default)]
pub struct ManifestArchive {
    archive: Archive,
    manifest: Option<String>,
}

impl ManifestArchive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_compression(method: CompressionMethod) -> Self {
        Self::from(Archive::with_compression(method))
    }

    /// Text of the last manifest built, if any.
    pub fn manifest(&self) -> Option<&str> {
        self.manifest.as_deref()
    }

    /// The plain archive, dropping the manifest text.
    pub fn into_inner(self) -> Archive {
        self.archive
    }

    /// Synthesize the manifest from the current class entries.
    ///
    /// An existing [`MANIFEST_PATH`] entry has its payload replaced in place.
    /// Otherwise the [`MANIFEST_DIR`] directory (if missing) and the manifest are
    /// appended after every existing entry.
    pub fn build_manifest(&mut self, options: &ManifestOptions) -> &Entry {
        let text = manifest::render(
            options,
            self.archive
                .entries()
                .iter()
                .filter(|e| e.kind() == EntryKind::ClassFile)
                .map(Entry::name),
        );

        if !self.archive.contains(MANIFEST_PATH) {
            self.archive.ensure_directory(MANIFEST_DIR);
        }
        let entry = self
            .archive
            .find_or_insert_with(MANIFEST_PATH, || Entry::file(MANIFEST_PATH, Vec::new()));
        entry.set_data(text.as_bytes());

        debug!("built manifest ({} bytes)", text.len());
        self.manifest = Some(text);
        entry
    }

    /// Import files from `source_root`.
    ///
    /// Each item of `files` is a path given as segments, e.g. `["servlet", "Bar.class"]`.
    /// The file is read from `source_root` joined with the segments and stored as
    /// `base_dir` + segments joined by `/`. Every intermediate directory under
    /// `base_dir` is added first, shallowest first, unless an entry with that name
    /// already exists. `base_dir` itself is not added.
    ///
    /// Stops at the first file that cannot be read, including a path that names a
    /// directory. Files imported before it stay in the archive; nothing is added
    /// for the failing file.
    pub fn add_files<P, S>(
        &mut self,
        files: &[P],
        source_root: impl AsRef<Path>,
        base_dir: &str,
    ) -> Result<()>
    where
        P: AsRef<[S]>,
        S: AsRef<str>,
    {
        let source_root = source_root.as_ref();
        let base_dir = normalize_base_dir(base_dir);

        for file in files {
            let segments: Vec<&str> = file.as_ref().iter().map(|s| s.as_ref()).collect();
            if segments.is_empty() {
                bail!("empty path in file list");
            }

            let name = format!("{base_dir}{}", segments.join("/"));
            let path = segments
                .iter()
                .fold(source_root.to_path_buf(), |path, segment| path.join(segment));

            // Read before touching the archive so a failure adds nothing
            let source = self.archive.source();
            let stat = source.stat(&path)?;
            if stat.is_dir {
                bail!("{} is a directory, not a file", path.display());
            }
            let data = source
                .read(&path)
                .with_context(|| format!("cannot import {}", path.display()))?;
            let timestamp = stat
                .modified
                .map(DosDateTime::from_system_time)
                .unwrap_or_else(DosDateTime::now);
            let entry = Entry::file(name, data).with_timestamp(timestamp);

            for depth in 1..segments.len() {
                let dir = format!("{base_dir}{}/", segments[..depth].join("/"));
                self.archive.ensure_directory(&dir);
            }
            self.archive.add_entry(entry);
        }
        Ok(())
    }
}

/// `""` stays empty; anything else gets a trailing `/`.
fn normalize_base_dir(base_dir: &str) -> String {
    if base_dir.is_empty() || base_dir.ends_with('/') {
        base_dir.to_owned()
    } else {
        format!("{base_dir}/")
    }
}

impl From<Archive> for ManifestArchive {
    fn from(archive: Archive) -> Self {
        Self {
            archive,
            manifest: None,
        }
    }
}

impl Deref for ManifestArchive {
    type Target = Archive;

    fn deref(&self) -> &Archive {
        &self.archive
    }
}

impl DerefMut for ManifestArchive {
    fn deref_mut(&mut self) -> &mut Archive {
        &mut self.archive
    }
}
