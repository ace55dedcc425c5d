//! Owned, flat field values.
//!
//! Every numeric field is stored as a flat component array regardless of its
//! declared tuple shape: an `SFVec3f` is `Floats` of length 3, an `MFVec3f`
//! with two points is `Floats` of length 6. The declared [`FieldType`] gives
//! the meaning; this type only carries data.
//!
//! [`FieldType`]: super::FieldType

use glam::{DVec3, Quat, Vec2, Vec3, Vec4};

use super::ids::NodeId;

/// A field value.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Bools(Vec<bool>),
    Int32s(Vec<i32>),
    Int64s(Vec<i64>),
    Floats(Vec<f32>),
    Doubles(Vec<f64>),
    Strings(Vec<String>),
    /// `SFNode`; `None` is NULL.
    Node(Option<NodeId>),
    /// `MFNode`.
    Nodes(Vec<NodeId>),
}

impl FieldValue {
    /// Raw component count (not the logical element count).
    pub fn len(&self) -> usize {
        match self {
            Self::Bools(v) => v.len(),
            Self::Int32s(v) => v.len(),
            Self::Int64s(v) => v.len(),
            Self::Floats(v) => v.len(),
            Self::Doubles(v) => v.len(),
            Self::Strings(v) => v.len(),
            Self::Node(n) => usize::from(n.is_some()),
            Self::Nodes(v) => v.len(),
        }
    }

    /// True when there are no components (or the node slot is NULL).
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True for node-valued variants.
    pub fn is_node(&self) -> bool {
        matches!(self, Self::Node(_) | Self::Nodes(_))
    }

    /// Child nodes referenced by this value, in order.
    pub fn child_nodes(&self) -> &[NodeId] {
        match self {
            Self::Node(Some(id)) => std::slice::from_ref(id),
            Self::Nodes(ids) => ids,
            _ => &[],
        }
    }

    /// Short variant name for diagnostics.
    pub fn variant_name(&self) -> &'static str {
        match self {
            Self::Bools(_) => "bools",
            Self::Int32s(_) => "int32s",
            Self::Int64s(_) => "int64s",
            Self::Floats(_) => "floats",
            Self::Doubles(_) => "doubles",
            Self::Strings(_) => "strings",
            Self::Node(_) => "node",
            Self::Nodes(_) => "nodes",
        }
    }

    // === Convenience constructors ===

    pub fn bool(v: bool) -> Self {
        Self::Bools(vec![v])
    }

    pub fn int32(v: i32) -> Self {
        Self::Int32s(vec![v])
    }

    pub fn long(v: i64) -> Self {
        Self::Int64s(vec![v])
    }

    pub fn float(v: f32) -> Self {
        Self::Floats(vec![v])
    }

    pub fn double(v: f64) -> Self {
        Self::Doubles(vec![v])
    }

    pub fn string(v: impl Into<String>) -> Self {
        Self::Strings(vec![v.into()])
    }

    pub fn strings<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Strings(values.into_iter().map(Into::into).collect())
    }

    pub fn vec2f(x: f32, y: f32) -> Self {
        Self::Floats(vec![x, y])
    }

    pub fn vec3f(x: f32, y: f32, z: f32) -> Self {
        Self::Floats(vec![x, y, z])
    }

    /// Axis-angle rotation (`x y z angle`).
    pub fn rotation(x: f32, y: f32, z: f32, angle: f32) -> Self {
        Self::Floats(vec![x, y, z, angle])
    }

    pub fn color(r: f32, g: f32, b: f32) -> Self {
        Self::Floats(vec![r, g, b])
    }

    pub fn node(id: NodeId) -> Self {
        Self::Node(Some(id))
    }

    /// Flatten a slice of points into an MF vector value.
    pub fn vec3f_array(points: &[Vec3]) -> Self {
        Self::Floats(points.iter().flat_map(|p| p.to_array()).collect())
    }

    /// Flatten 2D points into an MF vector value.
    pub fn vec2f_array(points: &[Vec2]) -> Self {
        Self::Floats(points.iter().flat_map(|p| p.to_array()).collect())
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        Self::bool(v)
    }
}

impl From<i32> for FieldValue {
    fn from(v: i32) -> Self {
        Self::int32(v)
    }
}

impl From<f32> for FieldValue {
    fn from(v: f32) -> Self {
        Self::float(v)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        Self::double(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        Self::string(v)
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        Self::string(v)
    }
}

impl From<Vec2> for FieldValue {
    fn from(v: Vec2) -> Self {
        Self::Floats(v.to_array().to_vec())
    }
}

impl From<Vec3> for FieldValue {
    fn from(v: Vec3) -> Self {
        Self::Floats(v.to_array().to_vec())
    }
}

impl From<Vec4> for FieldValue {
    fn from(v: Vec4) -> Self {
        Self::Floats(v.to_array().to_vec())
    }
}

impl From<DVec3> for FieldValue {
    fn from(v: DVec3) -> Self {
        Self::Doubles(v.to_array().to_vec())
    }
}

/// Quaternions become axis-angle rotations.
impl From<Quat> for FieldValue {
    fn from(q: Quat) -> Self {
        let (axis, angle) = q.to_axis_angle();
        // Identity yields a zero axis; keep the conventional +Z.
        let axis = if axis.length_squared() > 0.0 { axis } else { Vec3::Z };
        Self::rotation(axis.x, axis.y, axis.z, angle)
    }
}

impl From<glam::Mat4> for FieldValue {
    fn from(m: glam::Mat4) -> Self {
        Self::Floats(m.to_cols_array().to_vec())
    }
}

impl From<NodeId> for FieldValue {
    fn from(id: NodeId) -> Self {
        Self::node(id)
    }
}

impl From<Vec<NodeId>> for FieldValue {
    fn from(ids: Vec<NodeId>) -> Self {
        Self::Nodes(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_len_and_children() {
        assert_eq!(FieldValue::vec3f(1.0, 2.0, 3.0).len(), 3);
        assert!(FieldValue::Node(None).is_empty());
        let ids = vec![NodeId(1), NodeId(4)];
        let v = FieldValue::Nodes(ids.clone());
        assert_eq!(v.child_nodes(), ids.as_slice());
        assert!(FieldValue::float(1.0).child_nodes().is_empty());
    }

    #[test]
    fn test_glam_conversions() {
        let v: FieldValue = Vec3::new(1.0, 2.0, 3.0).into();
        assert_eq!(v, FieldValue::Floats(vec![1.0, 2.0, 3.0]));

        let r: FieldValue = Quat::IDENTITY.into();
        assert_eq!(r, FieldValue::rotation(0.0, 0.0, 1.0, 0.0));

        let pts = FieldValue::vec3f_array(&[Vec3::ZERO, Vec3::ONE]);
        assert_eq!(pts.len(), 6);
    }
}
