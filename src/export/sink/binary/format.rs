//! Binary infoset format constants.
//!
//! Layout:
//! - magic `E0 00 00 01`, then a big-endian u16 format version
//! - algorithm table: u8 count, then per entry an algorithm id (u8) and URI
//! - a token stream; each token starts with one of the tags below
//!
//! Names are written literally on first use and by table index afterwards;
//! the table grows in first-use order. Strings and payloads carry a varint
//! length prefix (7 bits per byte, low group first, high bit = more).

/// Stream magic.
pub const MAGIC: [u8; 4] = [0xE0, 0x00, 0x00, 0x01];

/// Current binary format version.
pub const FORMAT_VERSION: u16 = 1;

/// Token: element start followed by a name.
pub const START_ELEMENT: u8 = 0x01;
/// Token: end of the innermost open element.
pub const END_ELEMENT: u8 = 0x02;
/// Token: attribute name and value.
pub const ATTRIBUTE: u8 = 0x03;
/// Token: comment string.
pub const COMMENT: u8 = 0x04;
/// Token: end of document.
pub const END_DOCUMENT: u8 = 0xFF;

/// Name marker: a literal string that also enters the name table.
pub const NAME_LITERAL: u8 = 0;
/// Name marker: varint index into the name table.
pub const NAME_INDEXED: u8 = 1;

/// Value marker: literal UTF-8 text.
pub const VALUE_LITERAL: u8 = 0;
/// Value marker: algorithm id, then a varint-prefixed payload.
pub const VALUE_ENCODED: u8 = 1;

/// Append `value` as a varint.
pub fn put_varint(out: &mut Vec<u8>, mut value: u64) {
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

/// Number of bytes [`put_varint`] writes for `value`.
#[inline]
pub const fn varint_size(mut value: u64) -> usize {
    let mut n = 1;
    while value >= 0x80 {
        value >>= 7;
        n += 1;
    }
    n
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_varint_sizes() {
        for v in [0u64, 1, 127, 128, 300, 16_383, 16_384, u32::MAX as u64] {
            let mut buf = Vec::new();
            put_varint(&mut buf, v);
            assert_eq!(buf.len(), varint_size(v), "{v}");
        }
        let mut buf = Vec::new();
        put_varint(&mut buf, 300);
        assert_eq!(buf, vec![0xAC, 0x02]);
    }
}
