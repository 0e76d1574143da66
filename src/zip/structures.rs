use byteorder::{LittleEndian, WriteBytesExt};
use std::io::Write;
use std::time::SystemTime;
use time::{OffsetDateTime, UtcOffset};

use anyhow::Result;

/// ZIP compression methods
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum CompressionMethod {
    Stored,
    #[default]
    Deflate,
}

impl CompressionMethod {
    pub fn as_u16(&self) -> u16 {
        match self {
            CompressionMethod::Stored => 0,
            CompressionMethod::Deflate => 8,
        }
    }
}

/// Version 2.0: needed for DEFLATE and directory entries.
pub const VERSION_NEEDED: u16 = 20;

/// Version made by: host 0 (MS-DOS, so external attributes are DOS bits), version 2.0.
pub const VERSION_MADE_BY: u16 = 20;

/// General purpose flag bit 11: name and comment are UTF-8.
pub const FLAG_UTF8: u16 = 1 << 11;

/// MS-DOS directory attribute, stored in the low byte of the external attributes.
pub const EXTERNAL_ATTR_DIRECTORY: u32 = 0x10;

/// Timestamp in the MS-DOS format used by ZIP: 2-second resolution, 1980..=2107.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DosDateTime {
    pub time: u16,
    pub date: u16,
}

impl DosDateTime {
    /// 1980-01-01 00:00:00, the earliest representable instant.
    pub const MIN: DosDateTime = DosDateTime {
        time: 0,
        date: (1 << 5) | 1,
    };

    /// 2107-12-31 23:59:58, the latest representable instant.
    pub const MAX: DosDateTime = DosDateTime {
        time: (23 << 11) | (59 << 5) | 29,
        date: (127 << 9) | (12 << 5) | 31,
    };

    /// Encode a date-time, converted to UTC and clamped to the DOS range.
    /// Odd seconds round down.
    pub fn from_datetime(datetime: OffsetDateTime) -> Self {
        let datetime = datetime.to_offset(UtcOffset::UTC);
        let year = datetime.year();
        if year < 1980 {
            return Self::MIN;
        }
        if year > 2107 {
            return Self::MAX;
        }

        let date = (((year - 1980) as u16) << 9)
            | ((u8::from(datetime.month()) as u16) << 5)
            | datetime.day() as u16;
        let time = ((datetime.hour() as u16) << 11)
            | ((datetime.minute() as u16) << 5)
            | (datetime.second() as u16 / 2);
        Self { time, date }
    }

    pub fn from_system_time(time: SystemTime) -> Self {
        Self::from_datetime(OffsetDateTime::from(time))
    }

    pub fn now() -> Self {
        Self::from_datetime(OffsetDateTime::now_utc())
    }

    /// Parse date to (year, month, day)
    pub fn date_parts(&self) -> (u16, u8, u8) {
        let day = (self.date & 0x1F) as u8;
        let month = ((self.date >> 5) & 0x0F) as u8;
        let year = ((self.date >> 9) & 0x7F) + 1980;
        (year, month, day)
    }

    /// Parse time to (hour, minute, second)
    pub fn time_parts(&self) -> (u8, u8, u8) {
        let second = ((self.time & 0x1F) * 2) as u8;
        let minute = ((self.time >> 5) & 0x3F) as u8;
        let hour = ((self.time >> 11) & 0x1F) as u8;
        (hour, minute, second)
    }
}

impl Default for DosDateTime {
    fn default() -> Self {
        Self::MIN
    }
}

/// Local File Header (LFH) - 30 bytes
///
/// Written in front of every entry's name, extra field and payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalFileHeader {
    pub version_needed: u16,
    pub flags: u16,
    pub compression_method: u16,
    pub last_modified: DosDateTime,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub file_name_length: u16,
    pub extra_field_length: u16,
}

impl LocalFileHeader {
    pub const SIGNATURE: &'static [u8] = b"PK\x03\x04";
    pub const SIZE: usize = 30;

    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_all(Self::SIGNATURE)?;
        w.write_u16::<LittleEndian>(self.version_needed)?;
        w.write_u16::<LittleEndian>(self.flags)?;
        w.write_u16::<LittleEndian>(self.compression_method)?;
        w.write_u16::<LittleEndian>(self.last_modified.time)?;
        w.write_u16::<LittleEndian>(self.last_modified.date)?;
        w.write_u32::<LittleEndian>(self.crc32)?;
        w.write_u32::<LittleEndian>(self.compressed_size)?;
        w.write_u32::<LittleEndian>(self.uncompressed_size)?;
        w.write_u16::<LittleEndian>(self.file_name_length)?;
        w.write_u16::<LittleEndian>(self.extra_field_length)?;
        Ok(())
    }
}

/// Central Directory File Header (CDFH) - 46 bytes minimum
///
/// Mirrors the local header and adds comment, attributes and the local header offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CentralDirectoryFileHeader {
    pub version_made_by: u16,
    pub local: LocalFileHeader,
    pub file_comment_length: u16,
    pub disk_number_start: u16,
    pub internal_attrs: u16,
    pub external_attrs: u32,
    pub lfh_offset: u32,
}

impl CentralDirectoryFileHeader {
    pub const SIGNATURE: &'static [u8] = b"PK\x01\x02";
    pub const SIZE: usize = 46;

    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<()> {
        let local = &self.local;
        w.write_all(Self::SIGNATURE)?;
        w.write_u16::<LittleEndian>(self.version_made_by)?;
        w.write_u16::<LittleEndian>(local.version_needed)?;
        w.write_u16::<LittleEndian>(local.flags)?;
        w.write_u16::<LittleEndian>(local.compression_method)?;
        w.write_u16::<LittleEndian>(local.last_modified.time)?;
        w.write_u16::<LittleEndian>(local.last_modified.date)?;
        w.write_u32::<LittleEndian>(local.crc32)?;
        w.write_u32::<LittleEndian>(local.compressed_size)?;
        w.write_u32::<LittleEndian>(local.uncompressed_size)?;
        w.write_u16::<LittleEndian>(local.file_name_length)?;
        w.write_u16::<LittleEndian>(local.extra_field_length)?;
        w.write_u16::<LittleEndian>(self.file_comment_length)?;
        w.write_u16::<LittleEndian>(self.disk_number_start)?;
        w.write_u16::<LittleEndian>(self.internal_attrs)?;
        w.write_u32::<LittleEndian>(self.external_attrs)?;
        w.write_u32::<LittleEndian>(self.lfh_offset)?;
        Ok(())
    }
}

/// End of Central Directory (EOCD) - 22 bytes minimum
pub struct EndOfCentralDirectory {
    pub disk_number: u16,
    pub disk_with_cd: u16,
    pub disk_entries: u16,
    pub total_entries: u16,
    pub cd_size: u32,
    pub cd_offset: u32,
    pub comment_len: u16,
}

impl EndOfCentralDirectory {
    pub const SIGNATURE: &'static [u8] = b"PK\x05\x06";
    pub const SIZE: usize = 22;

    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_all(Self::SIGNATURE)?;
        w.write_u16::<LittleEndian>(self.disk_number)?;
        w.write_u16::<LittleEndian>(self.disk_with_cd)?;
        w.write_u16::<LittleEndian>(self.disk_entries)?;
        w.write_u16::<LittleEndian>(self.total_entries)?;
        w.write_u32::<LittleEndian>(self.cd_size)?;
        w.write_u32::<LittleEndian>(self.cd_offset)?;
        w.write_u16::<LittleEndian>(self.comment_len)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn dos_datetime_encodes_and_decodes() {
        let dos = DosDateTime::from_datetime(datetime!(2010-11-30 07:10:57 UTC));
        assert_eq!(dos.date_parts(), (2010, 11, 30));
        // 2-second granularity rounds down
        assert_eq!(dos.time_parts(), (7, 10, 56));
    }

    #[test]
    fn dos_datetime_clamps_out_of_range() {
        assert_eq!(
            DosDateTime::from_datetime(datetime!(1970-01-01 00:00:00 UTC)),
            DosDateTime::MIN
        );
        assert_eq!(DosDateTime::MIN.date_parts(), (1980, 1, 1));
        assert_eq!(
            DosDateTime::from_datetime(datetime!(2200-06-01 12:00:00 UTC)),
            DosDateTime::MAX
        );
        assert_eq!(DosDateTime::MAX.date_parts(), (2107, 12, 31));
        assert_eq!(DosDateTime::MAX.time_parts(), (23, 59, 58));
    }

    #[test]
    fn dos_datetime_converts_offsets_to_utc() {
        let dos = DosDateTime::from_datetime(datetime!(2024-03-01 01:30:00 +02:00));
        assert_eq!(dos.date_parts(), (2024, 2, 29));
        assert_eq!(dos.time_parts(), (23, 30, 0));
    }

    #[test]
    fn record_sizes_match_layout() -> Result<()> {
        let local = LocalFileHeader {
            version_needed: VERSION_NEEDED,
            flags: 0,
            compression_method: CompressionMethod::Stored.as_u16(),
            last_modified: DosDateTime::MIN,
            crc32: 0xDEADBEEF,
            compressed_size: 2,
            uncompressed_size: 2,
            file_name_length: 5,
            extra_field_length: 0,
        };
        let mut buf = Vec::new();
        local.write_to(&mut buf)?;
        assert_eq!(buf.len(), LocalFileHeader::SIZE);
        assert_eq!(&buf[0..4], LocalFileHeader::SIGNATURE);
        assert_eq!(&buf[14..18], &0xDEADBEEFu32.to_le_bytes());

        let central = CentralDirectoryFileHeader {
            version_made_by: VERSION_MADE_BY,
            local,
            file_comment_length: 0,
            disk_number_start: 0,
            internal_attrs: 0,
            external_attrs: EXTERNAL_ATTR_DIRECTORY,
            lfh_offset: 1234,
        };
        let mut buf = Vec::new();
        central.write_to(&mut buf)?;
        assert_eq!(buf.len(), CentralDirectoryFileHeader::SIZE);
        assert_eq!(&buf[38..42], &EXTERNAL_ATTR_DIRECTORY.to_le_bytes());
        assert_eq!(&buf[42..46], &1234u32.to_le_bytes());

        let eocd = EndOfCentralDirectory {
            disk_number: 0,
            disk_with_cd: 0,
            disk_entries: 3,
            total_entries: 3,
            cd_size: 100,
            cd_offset: 200,
            comment_len: 0,
        };
        let mut buf = Vec::new();
        eocd.write_to(&mut buf)?;
        assert_eq!(buf.len(), EndOfCentralDirectory::SIZE);
        assert_eq!(&buf[0..4], EndOfCentralDirectory::SIGNATURE);
        assert_eq!(&buf[16..20], &200u32.to_le_bytes());
        Ok(())
    }
}
