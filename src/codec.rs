//! Subtype payload codec
//!
//! Subtypes are short, highly repetitive strings; they are stored as zlib
//! streams in `Codes.subtype_compressed`.

use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::{Error, Result};

/// Compress `text` into a zlib stream.
///
/// Deterministic for a given input: same bytes in, same bytes out.
pub fn encode(text: &str) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::with_capacity(text.len() + 8), Compression::default());
    encoder.write_all(text.as_bytes())?;
    Ok(encoder.finish()?)
}

/// Decompress a zlib stream produced by [`encode`].
pub fn decode(bytes: &[u8]) -> Result<String> {
    let mut decoder = ZlibDecoder::new(bytes);
    let mut raw = Vec::new();
    decoder
        .read_to_end(&mut raw)
        .map_err(|e| Error::CorruptPayload(format!("zlib stream: {}", e)))?;

    String::from_utf8(raw).map_err(|e| Error::CorruptPayload(format!("not text: {}", e)))
}
