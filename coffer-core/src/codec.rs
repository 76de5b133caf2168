//! Lossless compression codec
//!
//! Payloads are gzip-compressed before encryption so that ciphertext and
//! shards stay as small as the data allows. Decompression distinguishes
//! corrupt input (truncation, checksum mismatch) from plain I/O faults.

use crate::error::{CofferError, Result};
use bytes::Bytes;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::{ErrorKind, Read, Write};

/// Compress a payload with gzip at the default level.
pub fn compress(data: &[u8]) -> Result<Bytes> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    let compressed = encoder.finish()?;
    Ok(Bytes::from(compressed))
}

/// Decompress a gzip stream produced by [`compress`].
///
/// Truncated streams and checksum/header mismatches surface as
/// [`CofferError::CorruptInput`]; any other I/O failure is passed through.
pub fn decompress(data: &[u8]) -> Result<Bytes> {
    let mut decoder = GzDecoder::new(data);
    let mut out = Vec::new();
    match decoder.read_to_end(&mut out) {
        Ok(_) => Ok(Bytes::from(out)),
        Err(e) => match e.kind() {
            ErrorKind::UnexpectedEof => {
                Err(CofferError::CorruptInput("unexpected end of gzip stream".to_string()))
            }
            ErrorKind::InvalidData | ErrorKind::InvalidInput => {
                Err(CofferError::CorruptInput(e.to_string()))
            }
            _ => Err(CofferError::Io(e)),
        },
    }
}
