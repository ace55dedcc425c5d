//! Text rendering of field values.
//!
//! A [`TextValue`] is the sink-neutral text form of a field: numbers already
//! formatted and grouped into tuples. Each syntax then joins it its own way:
//! the infoset encodings (XML attributes, binary literal values) separate
//! tuples with `", "`, the classic encoding wraps multi-values in brackets.

use crate::util::{FieldType, FieldValue, Result, Storage};
use crate::util::Error;

/// Formatted value, grouped into tuples.
#[derive(Clone, Debug, PartialEq)]
pub enum TextValue {
    /// Numeric tuples; each entry is one tuple with components joined by a space.
    Atoms { tuples: Vec<String>, multi: bool },
    Bools { values: Vec<bool>, multi: bool },
    Strings { values: Vec<String>, multi: bool },
}

impl TextValue {
    /// Format `value` as `field_type`.
    pub fn from_value(field_type: FieldType, value: &FieldValue, digits: Option<u32>) -> Result<Self> {
        let multi = field_type.is_multi();
        let arity = field_type.tuple_arity();
        let mismatch = || Error::TypeMismatch {
            field: value.variant_name().to_string(),
            expected: field_type.to_string(),
        };

        Ok(match (field_type.storage(), value) {
            (Storage::Bool, FieldValue::Bools(v)) => Self::Bools { values: v.clone(), multi },
            (Storage::String, FieldValue::Strings(v)) => Self::Strings { values: v.clone(), multi },
            (Storage::Int32, FieldValue::Int32s(v)) if field_type.is_image() => {
                Self::Atoms { tuples: image_tuples(v), multi }
            }
            (Storage::Int32, FieldValue::Int32s(v)) => Self::Atoms { tuples: tuples(v, arity, |x| x.to_string()), multi },
            (Storage::Int64, FieldValue::Int64s(v)) => Self::Atoms { tuples: tuples(v, arity, |x| x.to_string()), multi },
            (Storage::Float, FieldValue::Floats(v)) => {
                Self::Atoms { tuples: tuples(v, arity, |x| format_f32(*x, digits)), multi }
            }
            (Storage::Double, FieldValue::Doubles(v)) => {
                Self::Atoms { tuples: tuples(v, arity, |x| format_f64(*x, digits)), multi }
            }
            _ => return Err(mismatch()),
        })
    }

    pub fn is_multi(&self) -> bool {
        match self {
            Self::Atoms { multi, .. } | Self::Bools { multi, .. } | Self::Strings { multi, .. } => *multi,
        }
    }

    /// Attribute text for the XML and binary encodings (before markup escaping).
    pub fn render_infoset(&self) -> String {
        match self {
            Self::Atoms { tuples, .. } => tuples.join(", "),
            Self::Bools { values, .. } => values
                .iter()
                .map(|&b| if b { "true" } else { "false" })
                .collect::<Vec<_>>()
                .join(", "),
            Self::Strings { values, multi: false } => values.first().cloned().unwrap_or_default(),
            Self::Strings { values, multi: true } => values
                .iter()
                .map(|s| quote(s))
                .collect::<Vec<_>>()
                .join(" "),
        }
    }

    /// Value text for the classic encoding.
    pub fn render_classic(&self) -> String {
        let items: Vec<String> = match self {
            Self::Atoms { tuples, .. } => tuples.clone(),
            Self::Bools { values, .. } => values
                .iter()
                .map(|&b| if b { "TRUE" } else { "FALSE" }.to_string())
                .collect(),
            Self::Strings { values, .. } => values.iter().map(|s| quote(s)).collect(),
        };
        if self.is_multi() {
            if items.is_empty() {
                "[ ]".to_string()
            } else {
                format!("[ {} ]", items.join(", "))
            }
        } else {
            items.into_iter().next().unwrap_or_default()
        }
    }
}

fn tuples<T>(values: &[T], arity: usize, fmt: impl Fn(&T) -> String) -> Vec<String> {
    values
        .chunks(arity.max(1))
        .map(|chunk| chunk.iter().map(&fmt).collect::<Vec<_>>().join(" "))
        .collect()
}

/// `width height components` then pixels in hex; one tuple per image.
fn image_tuples(data: &[i32]) -> Vec<String> {
    let mut out = Vec::new();
    let mut rest = data;
    while rest.len() >= 3 {
        let pixels = (rest[0].max(0) as usize * rest[1].max(0) as usize).min(rest.len() - 3);
        let mut parts = vec![rest[0].to_string(), rest[1].to_string(), rest[2].to_string()];
        parts.extend(rest[3..3 + pixels].iter().map(|&p| format!("0x{:X}", p as u32)));
        out.push(parts.join(" "));
        rest = &rest[3 + pixels..];
    }
    out
}

/// Double-quote a string, escaping `"` and `\`.
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        if matches!(c, '"' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

/// Shortest round-trip decimal, or rounded to `digits` significant digits.
pub fn format_f32(v: f32, digits: Option<u32>) -> String {
    match digits {
        Some(d) if v.is_finite() => {
            let rounded = format!("{:.*e}", d.max(1) as usize - 1, v);
            rounded.parse::<f32>().map_or(rounded, |r| normalize(r.to_string()))
        }
        _ => normalize(v.to_string()),
    }
}

/// `f64` counterpart of [`format_f32`].
pub fn format_f64(v: f64, digits: Option<u32>) -> String {
    match digits {
        Some(d) if v.is_finite() => {
            let rounded = format!("{:.*e}", d.max(1) as usize - 1, v);
            rounded.parse::<f64>().map_or(rounded, |r| normalize(r.to_string()))
        }
        _ => normalize(v.to_string()),
    }
}

fn normalize(s: String) -> String {
    if s == "-0" {
        "0".to_string()
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbers() {
        assert_eq!(format_f32(0.0001, None), "0.0001");
        assert_eq!(format_f32(1.0, None), "1");
        assert_eq!(format_f32(-2.5, None), "-2.5");
        assert_eq!(format_f32(0.123456, Some(3)), "0.123");
        assert_eq!(format_f64(12345.678, Some(2)), "12000");
        assert_eq!(format_f32(-0.0, None), "0");
    }

    #[test]
    fn test_tuple_grouping() {
        let v = FieldValue::Floats(vec![0.0, 1.0, 2.0, 3.0, 4.5, 5.0]);
        let t = TextValue::from_value(FieldType::MFVec3f, &v, None).unwrap();
        assert_eq!(t.render_infoset(), "0 1 2, 3 4.5 5");
        assert_eq!(t.render_classic(), "[ 0 1 2, 3 4.5 5 ]");

        let sf = TextValue::from_value(FieldType::SFVec3f, &FieldValue::vec3f(1.0, 2.0, 3.0), None).unwrap();
        assert_eq!(sf.render_classic(), "1 2 3");
    }

    #[test]
    fn test_strings_and_bools() {
        let v = FieldValue::strings(["a \"b\"", "c\\d"]);
        let t = TextValue::from_value(FieldType::MFString, &v, None).unwrap();
        assert_eq!(t.render_infoset(), r#""a \"b\"" "c\\d""#);

        let s = TextValue::from_value(FieldType::SFString, &FieldValue::string("x"), None).unwrap();
        assert_eq!(s.render_infoset(), "x");
        assert_eq!(s.render_classic(), "\"x\"");

        let b = TextValue::from_value(FieldType::MFBool, &FieldValue::Bools(vec![true, false]), None).unwrap();
        assert_eq!(b.render_infoset(), "true, false");
        assert_eq!(b.render_classic(), "[ TRUE, FALSE ]");

        let empty = TextValue::from_value(FieldType::MFString, &FieldValue::Strings(vec![]), None).unwrap();
        assert_eq!(empty.render_classic(), "[ ]");
    }

    #[test]
    fn test_image() {
        let v = FieldValue::Int32s(vec![2, 1, 3, 0xFF0000, 0x00FF00]);
        let t = TextValue::from_value(FieldType::SFImage, &v, None).unwrap();
        assert_eq!(t.render_infoset(), "2 1 3 0xFF0000 0xFF00");
    }

    #[test]
    fn test_mismatch() {
        assert!(TextValue::from_value(FieldType::SFFloat, &FieldValue::int32(1), None).is_err());
    }
}
