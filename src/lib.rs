//! # zipjar
//!
//! An in-memory ZIP archive writer with JAR/WAR manifest support.
//!
//! Entries are collected in memory, either from byte buffers or from the
//! filesystem, and the whole archive image is produced in one call. The
//! output follows the standard ZIP layout (local headers, central directory,
//! end-of-central-directory record) and opens in any standard archive tool.
//!
//! ## Features
//!
//! - STORED and DEFLATE entries, with a per-archive default and per-entry override
//! - Directory entries, extra fields, entry and archive comments
//! - Adding files and directories straight from disk
//! - JAR/WAR archives: `META-INF/MANIFEST.MF` synthesis and bulk import of
//!   file trees with automatic directory entries
//!
//! ## Example
//!
//! ```no_run
//! use zipjar::{Archive, ManifestArchive, ManifestOptions};
//!
//! let mut archive = Archive::new();
//! archive.add_file("hello.txt", "Hello, world!");
//! archive.add_path("Cargo.toml")?;
//! archive.save_to("hello.zip")?;
//!
//! let mut jar = ManifestArchive::new();
//! jar.add_files(&[["com", "example", "Main.class"]], "target/classes", "")?;
//! jar.build_manifest(&ManifestOptions::new().main_class("com.example.Main"));
//! jar.save_to("app.jar")?;
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod io;
pub mod jar;
pub mod zip;

pub use io::{FileSource, FileStat, LocalFileSystem};
pub use jar::{ManifestArchive, ManifestOptions};
pub use zip::{Archive, CompressionMethod, DosDateTime, Entry, EntryKind};
