use super::{FileSource, FileStat};
use anyhow::{Context, Result};
use std::io::Read;
use std::path::Path;

/// Local filesystem access through `std::fs`
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileSystem;

impl FileSource for LocalFileSystem {
    fn stat(&self, path: &Path) -> Result<FileStat> {
        let metadata = std::fs::metadata(path)
            .with_context(|| format!("cannot stat {}", path.display()))?;
        Ok(FileStat {
            is_dir: metadata.is_dir(),
            size: metadata.len(),
            modified: metadata.modified().ok(),
        })
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let mut file = std::fs::File::open(path)
            .with_context(|| format!("cannot open {}", path.display()))?;
        let size = file.metadata()?.len();

        // Size hint only; the file may change between stat and read
        let mut buf = Vec::with_capacity(size as usize);
        file.read_to_end(&mut buf)
            .with_context(|| format!("cannot read {}", path.display()))?;
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stat_and_read_regular_file() -> Result<()> {
        let dir = tempfile::TempDir::new()?;
        let file = dir.path().join("hello.txt");
        std::fs::write(&file, b"hello")?;

        let fs = LocalFileSystem;
        let stat = fs.stat(&file)?;
        assert!(!stat.is_dir);
        assert_eq!(stat.size, 5);
        assert!(stat.modified.is_some());
        assert_eq!(fs.read(&file)?, b"hello");

        assert!(fs.stat(dir.path())?.is_dir);
        Ok(())
    }

    #[test]
    fn missing_path_is_an_error() {
        let fs = LocalFileSystem;
        let missing = Path::new("/definitely/not/here.bin");
        assert!(fs.stat(missing).is_err());
        assert!(fs.read(missing).is_err());
    }
}
