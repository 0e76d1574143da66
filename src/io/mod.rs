mod local;

pub use local::LocalFileSystem;

use anyhow::Result;
use std::path::Path;
use std::time::SystemTime;

/// Metadata returned by [`FileSource::stat`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    pub is_dir: bool,
    pub size: u64,
    pub modified: Option<SystemTime>,
}

/// Trait for the filesystem primitives an archive consumes when adding entries by path
pub trait FileSource: Send + Sync {
    /// Stat the path: existence, directory-ness, size and modification time
    fn stat(&self, path: &Path) -> Result<FileStat>;

    /// Open the path and read its full contents
    fn read(&self, path: &Path) -> Result<Vec<u8>>;
}
