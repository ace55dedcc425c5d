//! Deflate support for compressed numeric payloads.
//!
//! Payloads use zlib framing. Unlike general-purpose block compression the
//! caller always knows the expected decoded size (it is stored in the payload
//! header), so [`inflate`] checks it.

use std::io::{Read, Write};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::util::{Error, Result};

/// Compress data using zlib.
///
/// `level` is clamped to 0-9; 0 still produces a valid (stored) zlib stream.
pub fn deflate(data: &[u8], level: u32) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::new(level.min(9)));
    encoder
        .write_all(data)
        .map_err(|e| Error::Compression(e.to_string()))?;
    encoder.finish().map_err(|e| Error::Compression(e.to_string()))
}

/// Upper bound of the deflate expansion ratio.
const MAX_DEFLATE_RATIO: usize = 1032;

/// Decompress a zlib stream that must expand to exactly `expected_len` bytes.
///
/// The declared size comes from untrusted payload headers: the buffer grows
/// with the actual output and reading stops one byte past `expected_len`.
pub fn inflate(data: &[u8], expected_len: usize) -> Result<Vec<u8>> {
    if !is_zlib(data) {
        return Err(Error::Compression("payload has no zlib header".into()));
    }
    let limit = u64::try_from(expected_len).unwrap_or(u64::MAX).saturating_add(1);
    let mut decoder = ZlibDecoder::new(data).take(limit);
    let mut out = Vec::with_capacity(expected_len.min(data.len().saturating_mul(MAX_DEFLATE_RATIO)));
    decoder
        .read_to_end(&mut out)
        .map_err(|e| Error::Compression(e.to_string()))?;

    if out.len() != expected_len {
        return Err(Error::Compression(format!(
            "expected {} bytes after inflate, got {}",
            expected_len,
            out.len()
        )));
    }
    Ok(out)
}

/// Check if data starts with a zlib header.
pub fn is_zlib(data: &[u8]) -> bool {
    if data.len() < 2 {
        return false;
    }
    // zlib header: 0x78 followed by 0x01, 0x5E, 0x9C, or 0xDA
    data[0] == 0x78 && matches!(data[1], 0x01 | 0x5E | 0x9C | 0xDA)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deflate_inflate() {
        let original = b"0 1 2 3 0 1 2 3 0 1 2 3 ".repeat(100);

        let compressed = deflate(&original, 9).unwrap();
        assert!(compressed.len() < original.len());
        assert!(is_zlib(&compressed));

        let decompressed = inflate(&compressed, original.len()).unwrap();
        assert_eq!(decompressed, original);
    }

    #[test]
    fn test_inflate_length_mismatch() {
        let compressed = deflate(b"abcdef", 6).unwrap();
        assert!(matches!(inflate(&compressed, 5), Err(Error::Compression(_))));
    }

    #[test]
    fn test_inflate_oversized_declared_len() {
        let compressed = deflate(b"", 6).unwrap();
        let err = inflate(&compressed, u32::MAX as usize * 4).unwrap_err();
        assert!(matches!(err, Error::Compression(_)));
    }

    #[test]
    fn test_inflate_stops_past_declared_len() {
        let original = vec![0u8; 1 << 20];
        let compressed = deflate(&original, 9).unwrap();
        assert!(matches!(inflate(&compressed, 16), Err(Error::Compression(_))));
    }

    #[test]
    fn test_inflate_garbage() {
        assert!(inflate(b"not zlib at all", 4).is_err());
        assert!(!is_zlib(b"x"));
    }
}
