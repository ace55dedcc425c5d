//! Default-value suppression.

use crate::util::{FieldType, FieldValue, Storage};

/// Relative tolerance for floating-point default comparison.
pub const FLOAT_EPSILON: f64 = 1e-6;

/// Decides whether a field value equals its default.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultElider;

impl DefaultElider {
    /// True when `value` matches `default` for a field of `field_type`.
    ///
    /// A missing default never matches. Node-valued fields never match: they
    /// are structure, not values.
    pub fn is_default(field_type: FieldType, value: &FieldValue, default: Option<&FieldValue>) -> bool {
        let Some(default) = default else {
            return false;
        };
        match (field_type.storage(), value, default) {
            (Storage::Node, _, _) => false,
            (_, FieldValue::Bools(a), FieldValue::Bools(b)) => a == b,
            (_, FieldValue::Int32s(a), FieldValue::Int32s(b)) => a == b,
            (_, FieldValue::Int64s(a), FieldValue::Int64s(b)) => a == b,
            (_, FieldValue::Strings(a), FieldValue::Strings(b)) => a == b,
            (_, FieldValue::Floats(a), FieldValue::Floats(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(&x, &y)| close(f64::from(x), f64::from(y)))
            }
            (_, FieldValue::Doubles(a), FieldValue::Doubles(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(&x, &y)| close(x, y))
            }
            _ => false,
        }
    }
}

#[inline]
fn close(a: f64, b: f64) -> bool {
    a == b || (a - b).abs() <= FLOAT_EPSILON * 1f64.max(a.abs()).max(b.abs())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_kinds() {
        let t = FieldType::SFBool;
        assert!(DefaultElider::is_default(t, &FieldValue::bool(true), Some(&FieldValue::bool(true))));
        assert!(!DefaultElider::is_default(t, &FieldValue::bool(false), Some(&FieldValue::bool(true))));
        assert!(DefaultElider::is_default(
            FieldType::MFInt32,
            &FieldValue::Int32s(vec![]),
            Some(&FieldValue::Int32s(vec![]))
        ));
    }

    #[test]
    fn test_missing_default_forces_emission() {
        assert!(!DefaultElider::is_default(FieldType::SFString, &FieldValue::string(""), None));
    }

    #[test]
    fn test_float_tolerance() {
        let d = FieldValue::vec3f(1.0, 1.0, 1.0);
        assert!(DefaultElider::is_default(FieldType::SFVec3f, &FieldValue::vec3f(1.0, 1.0000001, 1.0), Some(&d)));
        assert!(!DefaultElider::is_default(FieldType::SFVec3f, &FieldValue::vec3f(1.0, 1.001, 1.0), Some(&d)));
        assert!(!DefaultElider::is_default(
            FieldType::MFFloat,
            &FieldValue::Floats(vec![1.0]),
            Some(&FieldValue::Floats(vec![1.0, 1.0]))
        ));
        assert!(DefaultElider::is_default(FieldType::SFTime, &FieldValue::double(0.0), Some(&FieldValue::double(1e-9))));
    }

    #[test]
    fn test_nodes_never_default() {
        assert!(!DefaultElider::is_default(FieldType::SFNode, &FieldValue::Node(None), Some(&FieldValue::Node(None))));
    }
}
