//! Central directory and end-of-central-directory records.
//!
//! Both are built during the second pack pass, once every local header has a
//! known position in the output.

use std::io::Write;

use anyhow::{Context, Result};

use super::entry::Entry;
use super::structures::{
    CentralDirectoryFileHeader, EndOfCentralDirectory, LocalFileHeader, VERSION_MADE_BY,
};

/// Central directory record for one entry whose local header starts at `offset`.
///
/// `local` is the header the entry was encoded with in the first pass, so sizes
/// and CRC match what a reader finds at `offset`.
#[derive(Debug, Clone, Copy)]
pub struct CentralDirectoryRecord<'a> {
    entry: &'a Entry,
    local: LocalFileHeader,
    offset: u32,
}

impl<'a> CentralDirectoryRecord<'a> {
    pub fn new(entry: &'a Entry, local: LocalFileHeader, offset: u32) -> Self {
        Self {
            entry,
            local,
            offset,
        }
    }

    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<()> {
        let comment = self.entry.comment().unwrap_or_default();
        let header = CentralDirectoryFileHeader {
            version_made_by: VERSION_MADE_BY,
            local: self.local,
            file_comment_length: u16::try_from(comment.len())
                .with_context(|| format!("comment too long on {}", self.entry.name()))?,
            disk_number_start: 0,
            internal_attrs: 0,
            external_attrs: self.entry.external_attributes(),
            lfh_offset: self.offset,
        };

        header.write_to(w)?;
        w.write_all(self.entry.name().as_bytes())?;
        w.write_all(self.entry.extra())?;
        w.write_all(comment.as_bytes())?;
        Ok(())
    }

    pub fn pack(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(
            CentralDirectoryFileHeader::SIZE + self.entry.name().len() + self.entry.extra().len(),
        );
        self.write_to(&mut buf)?;
        Ok(buf)
    }
}

/// Archive trailer locating the central directory.
#[derive(Debug, Clone, Copy)]
pub struct EndOfCentralDirectoryRecord<'a> {
    pub entry_count: u16,
    pub cd_size: u32,
    pub cd_offset: u32,
    pub comment: Option<&'a str>,
}

impl EndOfCentralDirectoryRecord<'_> {
    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<()> {
        let comment = self.comment.unwrap_or_default();
        let eocd = EndOfCentralDirectory {
            disk_number: 0,
            disk_with_cd: 0,
            disk_entries: self.entry_count,
            total_entries: self.entry_count,
            cd_size: self.cd_size,
            cd_offset: self.cd_offset,
            comment_len: u16::try_from(comment.len()).context("archive comment too long")?,
        };

        eocd.write_to(w)?;
        w.write_all(comment.as_bytes())?;
        Ok(())
    }

    pub fn pack(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(EndOfCentralDirectory::SIZE);
        self.write_to(&mut buf)?;
        Ok(buf)
    }
}
