//! Field value encoding and compression policy.
//!
//! [`FieldCodec::encode`] turns one field value into an [`EncodedForm`]:
//! either text or an algorithm-tagged binary payload. Which form is chosen
//! depends on the [`CompressionMethod`] and, for the size-driven policies,
//! on the would-be byte length of each candidate.

pub mod numeric;
mod text;

pub use text::{format_f32, format_f64, quote, TextValue};

use std::fmt;

use crate::core::{CompressionMethod, ExportOptions};
use crate::util::{Error, FieldType, FieldValue, Result, Storage};

use super::sink::binary::format::varint_size;

/// Binary value encodings, with their stable table identifiers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Algorithm {
    Int,
    Long,
    Boolean,
    Float,
    Double,
    DeltazlibInt,
    QuantizedZlibFloat,
}

impl Algorithm {
    pub const ALL: [Algorithm; 7] = [
        Self::Int,
        Self::Long,
        Self::Boolean,
        Self::Float,
        Self::Double,
        Self::DeltazlibInt,
        Self::QuantizedZlibFloat,
    ];

    /// Identifier written ahead of every encoded value.
    pub const fn id(self) -> u8 {
        match self {
            Self::Int => 4,
            Self::Long => 5,
            Self::Boolean => 6,
            Self::Float => 7,
            Self::Double => 8,
            Self::DeltazlibInt => 33,
            Self::QuantizedZlibFloat => 34,
        }
    }

    pub fn from_id(id: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|a| a.id() == id)
    }

    /// URI of an application algorithm; built-ins have none.
    pub const fn uri(self) -> Option<&'static str> {
        match self {
            Self::DeltazlibInt => Some("encoder://web3d.org/DeltazlibIntArrayEncoder"),
            Self::QuantizedZlibFloat => Some("encoder://web3d.org/QuantizedzlibFloatArrayEncoder"),
            _ => None,
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Int => "int",
            Self::Long => "long",
            Self::Boolean => "boolean",
            Self::Float => "float",
            Self::Double => "double",
            Self::DeltazlibInt => "deltazlib-int",
            Self::QuantizedZlibFloat => "quantizedzlib-float",
        };
        f.write_str(name)
    }
}

/// Sink-agnostic encoded value.
#[derive(Clone, Debug, PartialEq)]
pub enum EncodedForm {
    Text(TextValue),
    Binary { algorithm: Algorithm, payload: Vec<u8> },
}

impl EncodedForm {
    /// Size of this value in the binary stream (marker, id, length, data).
    pub fn encoded_len(&self) -> usize {
        match self {
            Self::Text(text) => {
                let n = text.render_infoset().len();
                1 + varint_size(n as u64) + n
            }
            Self::Binary { payload, .. } => 2 + varint_size(payload.len() as u64) + payload.len(),
        }
    }

    pub fn algorithm(&self) -> Option<Algorithm> {
        match self {
            Self::Binary { algorithm, .. } => Some(*algorithm),
            Self::Text(_) => None,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Self::Text(_))
    }
}

/// Per-field encoder configured from export options.
#[derive(Clone, Debug)]
pub struct FieldCodec {
    method: CompressionMethod,
    quantize_param: f32,
    significant_digits: Option<u32>,
    min_float_array: usize,
    deflate_level: u32,
}

impl FieldCodec {
    /// Text-only sinks always get [`CompressionMethod::Strings`].
    pub fn new(options: &ExportOptions, binary_values: bool) -> Self {
        Self {
            method: if binary_values { options.compression } else { CompressionMethod::Strings },
            quantize_param: options.quantize_param,
            significant_digits: options.significant_digits,
            min_float_array: options.min_float_array_size_to_compress,
            deflate_level: options.deflate_level,
        }
    }

    pub fn method(&self) -> CompressionMethod {
        self.method
    }

    fn text(&self, field_type: FieldType, value: &FieldValue) -> Result<EncodedForm> {
        Ok(EncodedForm::Text(TextValue::from_value(field_type, value, self.significant_digits)?))
    }

    /// Encode one non-node value of `field_type`.
    pub fn encode(&self, field_type: FieldType, value: &FieldValue) -> Result<EncodedForm> {
        use CompressionMethod::*;

        if self.method == Strings || field_type.storage() == Storage::String {
            return self.text(field_type, value);
        }
        let span = field_type.tuple_arity();
        let bin = |algorithm, payload| EncodedForm::Binary { algorithm, payload };

        let form = match value {
            FieldValue::Bools(v) => {
                let fixed = bin(Algorithm::Boolean, numeric::encode_bools(v));
                match self.method {
                    SmallestNonlossy => smallest(fixed, [Some(self.text(field_type, value)?)]),
                    _ => fixed,
                }
            }
            FieldValue::Int32s(v) => {
                let fixed = bin(Algorithm::Int, numeric::encode_ints(v));
                let delta = if v.len() > 1 {
                    let span = if field_type.is_image() { 1 } else { span };
                    Some(bin(Algorithm::DeltazlibInt, numeric::encode_delta_ints(v, span, self.deflate_level)?))
                } else {
                    None
                };
                let text = match self.method {
                    SmallestNonlossy => Some(self.text(field_type, value)?),
                    _ => None,
                };
                smallest(fixed, [delta, text])
            }
            FieldValue::Int64s(v) => {
                let fixed = bin(Algorithm::Long, numeric::encode_longs(v));
                match self.method {
                    SmallestNonlossy => smallest(fixed, [Some(self.text(field_type, value)?)]),
                    _ => fixed,
                }
            }
            FieldValue::Floats(v) => {
                let fixed = bin(Algorithm::Float, numeric::encode_floats(v));
                match self.method {
                    SmallestNonlossy if v.len() < self.min_float_array => fixed,
                    SmallestNonlossy => {
                        let packed = numeric::encode_floats_lossless(v, span, self.deflate_level)?;
                        smallest(
                            fixed,
                            [
                                Some(bin(Algorithm::QuantizedZlibFloat, packed)),
                                Some(self.text(field_type, value)?),
                            ],
                        )
                    }
                    SmallestLossy => {
                        let quantized =
                            numeric::encode_floats_quantized(v, span, self.quantize_param, self.deflate_level)?
                                .map(|p| bin(Algorithm::QuantizedZlibFloat, p));
                        smallest(fixed, [quantized])
                    }
                    _ => fixed,
                }
            }
            FieldValue::Doubles(v) => {
                let fixed = bin(Algorithm::Double, numeric::encode_doubles(v));
                match self.method {
                    SmallestNonlossy => smallest(fixed, [Some(self.text(field_type, value)?)]),
                    _ => fixed,
                }
            }
            FieldValue::Strings(_) => return self.text(field_type, value),
            FieldValue::Node(_) | FieldValue::Nodes(_) => {
                return Err(Error::invalid(format!("{field_type} values are not encoded by the codec")))
            }
        };
        Ok(form)
    }
}

/// Pick the candidate with the strictly smallest encoded length; earlier
/// candidates win ties.
fn smallest<const N: usize>(first: EncodedForm, rest: [Option<EncodedForm>; N]) -> EncodedForm {
    let mut best_len = first.encoded_len();
    let mut best = first;
    for candidate in rest.into_iter().flatten() {
        let len = candidate.encoded_len();
        if len < best_len {
            best_len = len;
            best = candidate;
        }
    }
    best
}
