//! Binary numeric payloads.
//!
//! Fixed-width encodings are big-endian arrays of the primitive. The two
//! application encoders carry a small header so a decoder can size its
//! buffers before inflating:
//!
//! ```text
//! DeltazlibInt        u32 count | u8 span | zlib(i32 deltas)
//! QuantizedzlibFloat  u8 mode = 0 | u32 count | u8 span | zlib(byte planes)
//!                     u8 mode = 1 | u32 count | u8 span | f64 step | zlib(i32 deltas)
//! ```
//!
//! Deltas are taken per tuple component: element `i` is stored as
//! `v[i] - v[i - span]`, so coherent vertex or index runs compress well.

use std::io::{Cursor, Read};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::core::{deflate, inflate};
use crate::util::{Error, FieldValue, Result};

use super::Algorithm;

/// Mode byte of a lossless float payload.
pub const FLOAT_MODE_LOSSLESS: u8 = 0;
/// Mode byte of a quantized float payload.
pub const FLOAT_MODE_QUANTIZED: u8 = 1;

// ============================================================================
// Fixed width
// ============================================================================

pub fn encode_ints(values: &[i32]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(values.len() * 4);
    for &v in values {
        buf.extend_from_slice(&v.to_be_bytes());
    }
    buf
}

pub fn encode_longs(values: &[i64]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(values.len() * 8);
    for &v in values {
        buf.extend_from_slice(&v.to_be_bytes());
    }
    buf
}

pub fn encode_floats(values: &[f32]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(values.len() * 4);
    for &v in values {
        buf.extend_from_slice(&v.to_be_bytes());
    }
    buf
}

pub fn encode_doubles(values: &[f64]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(values.len() * 8);
    for &v in values {
        buf.extend_from_slice(&v.to_be_bytes());
    }
    buf
}

/// First byte: number of unused bits in the last byte. Bits are packed MSB first.
pub fn encode_bools(values: &[bool]) -> Vec<u8> {
    let bytes = values.len().div_ceil(8);
    let unused = (bytes * 8 - values.len()) as u8;
    let mut buf = vec![0u8; bytes + 1];
    buf[0] = unused;
    for (i, &v) in values.iter().enumerate() {
        if v {
            buf[1 + i / 8] |= 0x80 >> (i % 8);
        }
    }
    buf
}

// ============================================================================
// Application encoders
// ============================================================================

fn span_byte(span: usize) -> Result<u8> {
    u8::try_from(span.max(1)).map_err(|_| Error::Compression(format!("tuple span {span} too wide")))
}

fn count_u32(count: usize) -> Result<u32> {
    u32::try_from(count).map_err(|_| Error::Compression(format!("array of {count} values too long")))
}

fn deltas(values: &[i32], span: usize) -> Vec<u8> {
    let mut raw = Vec::with_capacity(values.len() * 4);
    for (i, &v) in values.iter().enumerate() {
        let d = if i >= span { v.wrapping_sub(values[i - span]) } else { v };
        raw.extend_from_slice(&d.to_be_bytes());
    }
    raw
}

fn undelta(raw: &[u8], span: usize) -> Vec<i32> {
    let mut out: Vec<i32> = Vec::with_capacity(raw.len() / 4);
    for (i, chunk) in raw.chunks_exact(4).enumerate() {
        let d = i32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        let v = if i >= span { out[i - span].wrapping_add(d) } else { d };
        out.push(v);
    }
    out
}

/// Delta + deflate integer array.
pub fn encode_delta_ints(values: &[i32], span: usize, level: u32) -> Result<Vec<u8>> {
    let span = span.max(1);
    let mut buf = Vec::new();
    buf.write_u32::<BigEndian>(count_u32(values.len())?)?;
    buf.write_u8(span_byte(span)?)?;
    buf.extend_from_slice(&deflate(&deltas(values, span), level)?);
    Ok(buf)
}

/// Lossless float compression: the big-endian bit patterns are split into
/// four byte planes (all high bytes, then all second bytes, ...) before
/// deflating, which groups the slowly varying sign/exponent bytes together.
pub fn encode_floats_lossless(values: &[f32], span: usize, level: u32) -> Result<Vec<u8>> {
    let bits: &[u32] = bytemuck::cast_slice(values);
    let n = bits.len();
    let mut planes = vec![0u8; n * 4];
    for (i, b) in bits.iter().enumerate() {
        for (plane, byte) in b.to_be_bytes().into_iter().enumerate() {
            planes[plane * n + i] = byte;
        }
    }

    let mut buf = Vec::new();
    buf.write_u8(FLOAT_MODE_LOSSLESS)?;
    buf.write_u32::<BigEndian>(count_u32(n)?)?;
    buf.write_u8(span_byte(span)?)?;
    buf.extend_from_slice(&deflate(&planes, level)?);
    Ok(buf)
}

/// Quantize floats to multiples of `step`, delta-encode and deflate.
///
/// Every decoded value is within `step / 2` of its source (plus `f32`
/// rounding of the result). Returns `None` when the step is unusable or a
/// value does not fit the quantized range; callers fall back to fixed width.
pub fn encode_floats_quantized(values: &[f32], span: usize, step: f32, level: u32) -> Result<Option<Vec<u8>>> {
    let step = f64::from(step);
    if !(step.is_finite() && step > 0.0) {
        return Ok(None);
    }
    let mut quantized = Vec::with_capacity(values.len());
    for &v in values {
        let q = (f64::from(v) / step).round();
        if !q.is_finite() || q < f64::from(i32::MIN) || q > f64::from(i32::MAX) {
            return Ok(None);
        }
        quantized.push(q as i32);
    }

    let span = span.max(1);
    let mut buf = Vec::new();
    buf.write_u8(FLOAT_MODE_QUANTIZED)?;
    buf.write_u32::<BigEndian>(count_u32(values.len())?)?;
    buf.write_u8(span_byte(span)?)?;
    buf.write_f64::<BigEndian>(step)?;
    buf.extend_from_slice(&deflate(&deltas(&quantized, span), level)?);
    Ok(Some(buf))
}

// ============================================================================
// Decoders
// ============================================================================

fn fixed<const N: usize>(payload: &[u8]) -> Result<impl Iterator<Item = [u8; N]> + '_> {
    if payload.len() % N != 0 {
        return Err(Error::invalid(format!(
            "fixed-width payload of {} bytes is not a multiple of {N}",
            payload.len()
        )));
    }
    Ok(payload.chunks_exact(N).map(|c| {
        let mut a = [0u8; N];
        a.copy_from_slice(c);
        a
    }))
}

pub fn decode_ints(payload: &[u8]) -> Result<Vec<i32>> {
    Ok(fixed::<4>(payload)?.map(i32::from_be_bytes).collect())
}

pub fn decode_longs(payload: &[u8]) -> Result<Vec<i64>> {
    Ok(fixed::<8>(payload)?.map(i64::from_be_bytes).collect())
}

pub fn decode_floats(payload: &[u8]) -> Result<Vec<f32>> {
    Ok(fixed::<4>(payload)?.map(f32::from_be_bytes).collect())
}

pub fn decode_doubles(payload: &[u8]) -> Result<Vec<f64>> {
    Ok(fixed::<8>(payload)?.map(f64::from_be_bytes).collect())
}

pub fn decode_bools(payload: &[u8]) -> Result<Vec<bool>> {
    let (&unused, bits) = payload
        .split_first()
        .ok_or_else(|| Error::invalid("empty boolean payload"))?;
    let total = (bits.len() * 8)
        .checked_sub(unused as usize)
        .filter(|_| unused < 8)
        .ok_or_else(|| Error::invalid("bad unused-bit count in boolean payload"))?;
    Ok((0..total).map(|i| bits[i / 8] & (0x80 >> (i % 8)) != 0).collect())
}

/// Short reads inside a payload are malformed input, not sink failures.
fn truncated(e: std::io::Error) -> Error {
    Error::invalid(format!("truncated payload: {e}"))
}

fn read_header(cursor: &mut Cursor<&[u8]>) -> Result<(usize, usize)> {
    let count = cursor.read_u32::<BigEndian>().map_err(truncated)? as usize;
    let span = cursor.read_u8().map_err(truncated)? as usize;
    if span == 0 {
        return Err(Error::invalid("zero tuple span"));
    }
    Ok((count, span))
}

fn rest(cursor: &mut Cursor<&[u8]>) -> Result<Vec<u8>> {
    let mut data = Vec::new();
    cursor.read_to_end(&mut data).map_err(truncated)?;
    Ok(data)
}

/// Decoded byte length of `count` 32-bit values.
fn word_bytes(count: usize) -> Result<usize> {
    count
        .checked_mul(4)
        .ok_or_else(|| Error::invalid(format!("element count {count} overflows")))
}

pub fn decode_delta_ints(payload: &[u8]) -> Result<Vec<i32>> {
    let mut cursor = Cursor::new(payload);
    let (count, span) = read_header(&mut cursor)?;
    let raw = inflate(&rest(&mut cursor)?, word_bytes(count)?)?;
    Ok(undelta(&raw, span))
}

pub fn decode_quantized_floats(payload: &[u8]) -> Result<Vec<f32>> {
    let mut cursor = Cursor::new(payload);
    let mode = cursor.read_u8().map_err(truncated)?;
    let (count, span) = read_header(&mut cursor)?;
    match mode {
        FLOAT_MODE_LOSSLESS => {
            let planes = inflate(&rest(&mut cursor)?, word_bytes(count)?)?;
            Ok((0..count)
                .map(|i| {
                    let b = [planes[i], planes[count + i], planes[2 * count + i], planes[3 * count + i]];
                    f32::from_bits(u32::from_be_bytes(b))
                })
                .collect())
        }
        FLOAT_MODE_QUANTIZED => {
            let step = cursor.read_f64::<BigEndian>().map_err(truncated)?;
            let raw = inflate(&rest(&mut cursor)?, word_bytes(count)?)?;
            Ok(undelta(&raw, span)
                .into_iter()
                .map(|q| (f64::from(q) * step) as f32)
                .collect())
        }
        other => Err(Error::invalid(format!("unknown float payload mode {other}"))),
    }
}

/// Decode any algorithm payload into a flat value.
pub fn decode(algorithm: Algorithm, payload: &[u8]) -> Result<FieldValue> {
    Ok(match algorithm {
        Algorithm::Int => FieldValue::Int32s(decode_ints(payload)?),
        Algorithm::Long => FieldValue::Int64s(decode_longs(payload)?),
        Algorithm::Boolean => FieldValue::Bools(decode_bools(payload)?),
        Algorithm::Float => FieldValue::Floats(decode_floats(payload)?),
        Algorithm::Double => FieldValue::Doubles(decode_doubles(payload)?),
        Algorithm::DeltazlibInt => FieldValue::Int32s(decode_delta_ints(payload)?),
        Algorithm::QuantizedZlibFloat => FieldValue::Floats(decode_quantized_floats(payload)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bool_packing() {
        let values = [true, false, true, true, false, false, false, false, true];
        let payload = encode_bools(&values);
        assert_eq!(payload, vec![7, 0b1011_0000, 0b1000_0000]);
        assert_eq!(decode_bools(&payload).unwrap(), values);
        assert_eq!(decode_bools(&encode_bools(&[])).unwrap(), Vec::<bool>::new());
    }

    #[test]
    fn test_delta_ints_exact() {
        let index: Vec<i32> = (0..300).flat_map(|i| [i, i + 1, i + 2, -1]).collect();
        let payload = encode_delta_ints(&index, 1, 9).unwrap();
        assert!(payload.len() < index.len() * 4);
        assert_eq!(decode_delta_ints(&payload).unwrap(), index);

        let extremes = vec![i32::MIN, i32::MAX, 0, i32::MIN];
        let payload = encode_delta_ints(&extremes, 2, 6).unwrap();
        assert_eq!(decode_delta_ints(&payload).unwrap(), extremes);
    }

    #[test]
    fn test_lossless_floats_exact() {
        let values: Vec<f32> = (0..64).map(|i| (i as f32 * 0.37).sin()).chain([f32::MIN_POSITIVE, -0.0]).collect();
        let payload = encode_floats_lossless(&values, 3, 9).unwrap();
        let decoded = decode_quantized_floats(&payload).unwrap();
        let same = values.iter().zip(&decoded).all(|(a, b)| a.to_bits() == b.to_bits());
        assert!(same);
    }

    #[test]
    fn test_quantized_bound() {
        let values: Vec<f32> = (0..30).map(|i| i as f32 * 0.1234 - 1.5).collect();
        let payload = encode_floats_quantized(&values, 3, 0.001, 9).unwrap().unwrap();
        let decoded = decode_quantized_floats(&payload).unwrap();
        assert_eq!(decoded.len(), values.len());
        for (a, b) in values.iter().zip(&decoded) {
            assert!((a - b).abs() <= 0.001, "{a} vs {b}");
        }
    }

    #[test]
    fn test_quantized_overflow_falls_back() {
        assert!(encode_floats_quantized(&[1.0e12], 1, 0.001, 9).unwrap().is_none());
        assert!(encode_floats_quantized(&[1.0], 1, 0.0, 9).unwrap().is_none());
        assert!(encode_floats_quantized(&[f32::NAN], 1, 0.01, 9).unwrap().is_none());
    }

    #[test]
    fn test_short_payload_is_invalid_structure() {
        let err = decode(Algorithm::DeltazlibInt, &[0, 0]).unwrap_err();
        assert!(matches!(err, Error::InvalidStructure(_)), "{err:?}");
        assert!(!err.is_sink_failure());

        let err = decode(Algorithm::QuantizedZlibFloat, &[FLOAT_MODE_QUANTIZED, 0, 0, 0, 1, 1, 0x3F]).unwrap_err();
        assert!(matches!(err, Error::InvalidStructure(_)), "{err:?}");
    }

    #[test]
    fn test_oversized_count_is_rejected() {
        let empty = deflate(b"", 6).unwrap();
        let mut payload = vec![0xFF, 0xFF, 0xFF, 0xFF, 1];
        payload.extend_from_slice(&empty);
        assert!(matches!(decode(Algorithm::DeltazlibInt, &payload), Err(Error::Compression(_))));

        let mut payload = vec![FLOAT_MODE_LOSSLESS, 0xFF, 0xFF, 0xFF, 0xFF, 1];
        payload.extend_from_slice(&empty);
        assert!(matches!(decode(Algorithm::QuantizedZlibFloat, &payload), Err(Error::Compression(_))));
    }

    #[test]
    fn test_fixed_width() {
        assert_eq!(encode_ints(&[1, -1]), vec![0, 0, 0, 1, 0xFF, 0xFF, 0xFF, 0xFF]);
        assert_eq!(decode_doubles(&encode_doubles(&[0.5, -2.0])).unwrap(), vec![0.5, -2.0]);
        assert_eq!(decode_longs(&encode_longs(&[i64::MAX])).unwrap(), vec![i64::MAX]);
        assert!(decode_floats(&[0, 1, 2]).is_err());
    }
}
