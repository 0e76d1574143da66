//! ZIP archive construction.
//!
//! This module assembles named payloads into a complete ZIP archive image in
//! memory, ready to be written out in one go.
//!
//! ## Architecture
//!
//! - [`structures`]: Fixed-layout ZIP records (local header, central directory header, EOCD)
//! - [`compress`]: Payload codec producing compressed bytes, sizes and CRC-32
//! - [`entry`]: A single archive member and its local serialization
//! - [`records`]: Central directory and trailer records built from packed entries
//! - [`archive`]: The entry collection and the two-pass pack algorithm
//!
//! ## ZIP Format Overview
//!
//! A ZIP file consists of:
//! 1. Local file headers and compressed data for each file
//! 2. Central Directory with metadata for all files
//! 3. End of Central Directory (EOCD) record at the end
//!
//! Central directory records carry the offset of their local header, so they can
//! only be written once every local section has been laid out.
//!
//! ## Limitations
//!
//! - No ZIP64: at most 65535 entries and 4 GiB of output
//! - No encryption, no data descriptors, no multi-disk archives
//! - STORED and DEFLATE only

pub mod archive;
pub mod compress;
pub mod entry;
pub mod records;
pub mod structures;

pub use archive::Archive;
pub use compress::{Compressed, compress};
pub use entry::{CLASS_FILE_SUFFIX, Entry, EntryKind};
pub use records::{CentralDirectoryRecord, EndOfCentralDirectoryRecord};
pub use structures::*;
