//! Payload codec.
//!
//! Turns an entry's raw bytes into the payload stored after its local header,
//! together with the CRC-32 and sizes both headers must carry.

use flate2::Compression;
use flate2::write::DeflateEncoder;
use std::io::Write;

use anyhow::{Context, Result};

use super::structures::CompressionMethod;

/// Result of compressing one payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compressed {
    /// Bytes written to the archive after the local header
    pub data: Vec<u8>,
    /// CRC-32 of the uncompressed bytes
    pub crc32: u32,
    pub uncompressed_size: u64,
    pub compressed_size: u64,
}

/// Compress `data` with `method`.
///
/// DEFLATE output is a raw stream (no zlib header), which is what ZIP readers expect.
pub fn compress(data: &[u8], method: CompressionMethod) -> Result<Compressed> {
    let crc32 = crc32fast::hash(data);

    let out = match method {
        CompressionMethod::Stored => data.to_vec(),
        CompressionMethod::Deflate => {
            let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
            encoder
                .write_all(data)
                .context("deflate failed")?;
            encoder.finish().context("deflate finish failed")?
        }
    };

    Ok(Compressed {
        crc32,
        uncompressed_size: data.len() as u64,
        compressed_size: out.len() as u64,
        data: out,
    })
}
