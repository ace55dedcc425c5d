//! Field type tags and access categories.
//!
//! The tag numbering is fixed: single-value (`SF*`) types are odd and their
//! multi-value (`MF*`) counterparts are the following even number. Grouping
//! array elements into tuples and choosing a numeric encoder both key off
//! [`FieldType::storage`] and [`FieldType::tuple_arity`].

use std::fmt;

use super::value::FieldValue;

/// Storage class of a field value, i.e. which [`FieldValue`] variant holds it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Storage {
    Bool,
    Int32,
    Int64,
    Float,
    Double,
    String,
    Node,
}

/// Field type tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum FieldType {
    SFInt32 = 1,
    MFInt32 = 2,
    SFFloat = 3,
    MFFloat = 4,
    SFDouble = 5,
    MFDouble = 6,
    SFTime = 7,
    MFTime = 8,
    SFNode = 9,
    MFNode = 10,
    SFBool = 11,
    MFBool = 12,
    SFString = 13,
    MFString = 14,
    SFVec2f = 15,
    MFVec2f = 16,
    SFVec3f = 17,
    MFVec3f = 18,
    SFVec3d = 19,
    MFVec3d = 20,
    SFRotation = 21,
    MFRotation = 22,
    SFColor = 23,
    MFColor = 24,
    SFImage = 25,
    MFImage = 26,
    SFColorRGBA = 27,
    MFColorRGBA = 28,
    SFLong = 29,
    MFLong = 30,
    SFVec4f = 31,
    MFVec4f = 32,
    SFVec4d = 33,
    MFVec4d = 34,
    SFVec2d = 35,
    MFVec2d = 36,
    SFMatrix3f = 37,
    MFMatrix3f = 38,
    SFMatrix4f = 39,
    MFMatrix4f = 40,
    SFMatrix3d = 41,
    MFMatrix3d = 42,
    SFMatrix4d = 43,
    MFMatrix4d = 44,
}

impl FieldType {
    /// Number of field types.
    pub const COUNT: usize = 44;

    /// All tags in numeric order.
    pub const ALL: [FieldType; Self::COUNT] = [
        Self::SFInt32, Self::MFInt32, Self::SFFloat, Self::MFFloat,
        Self::SFDouble, Self::MFDouble, Self::SFTime, Self::MFTime,
        Self::SFNode, Self::MFNode, Self::SFBool, Self::MFBool,
        Self::SFString, Self::MFString, Self::SFVec2f, Self::MFVec2f,
        Self::SFVec3f, Self::MFVec3f, Self::SFVec3d, Self::MFVec3d,
        Self::SFRotation, Self::MFRotation, Self::SFColor, Self::MFColor,
        Self::SFImage, Self::MFImage, Self::SFColorRGBA, Self::MFColorRGBA,
        Self::SFLong, Self::MFLong, Self::SFVec4f, Self::MFVec4f,
        Self::SFVec4d, Self::MFVec4d, Self::SFVec2d, Self::MFVec2d,
        Self::SFMatrix3f, Self::MFMatrix3f, Self::SFMatrix4f, Self::MFMatrix4f,
        Self::SFMatrix3d, Self::MFMatrix3d, Self::SFMatrix4d, Self::MFMatrix4d,
    ];

    /// Numeric tag.
    #[inline]
    pub const fn tag(self) -> u8 {
        self as u8
    }

    /// Look a tag up by number.
    pub fn from_tag(tag: u8) -> Option<Self> {
        if (1..=Self::COUNT as u8).contains(&tag) {
            Some(Self::ALL[tag as usize - 1])
        } else {
            None
        }
    }

    /// Multi-value types carry even tags.
    #[inline]
    pub const fn is_multi(self) -> bool {
        self.tag() % 2 == 0
    }

    /// The SF counterpart of an MF type (identity for SF types).
    pub fn single(self) -> Self {
        if self.is_multi() {
            Self::ALL[self.tag() as usize - 2]
        } else {
            self
        }
    }

    /// True for `SFNode` / `MFNode`.
    #[inline]
    pub const fn is_node(self) -> bool {
        matches!(self, Self::SFNode | Self::MFNode)
    }

    /// True for `SFImage` / `MFImage`, whose tuples are variable length.
    #[inline]
    pub const fn is_image(self) -> bool {
        matches!(self, Self::SFImage | Self::MFImage)
    }

    /// Components per logical element.
    pub const fn tuple_arity(self) -> usize {
        match self {
            Self::SFVec2f | Self::MFVec2f | Self::SFVec2d | Self::MFVec2d => 2,
            Self::SFVec3f | Self::MFVec3f | Self::SFVec3d | Self::MFVec3d => 3,
            Self::SFColor | Self::MFColor => 3,
            Self::SFRotation | Self::MFRotation => 4,
            Self::SFColorRGBA | Self::MFColorRGBA => 4,
            Self::SFVec4f | Self::MFVec4f | Self::SFVec4d | Self::MFVec4d => 4,
            Self::SFMatrix3f | Self::MFMatrix3f | Self::SFMatrix3d | Self::MFMatrix3d => 9,
            Self::SFMatrix4f | Self::MFMatrix4f | Self::SFMatrix4d | Self::MFMatrix4d => 16,
            _ => 1,
        }
    }

    /// Which value variant stores this type.
    pub const fn storage(self) -> Storage {
        match self {
            Self::SFInt32 | Self::MFInt32 | Self::SFImage | Self::MFImage => Storage::Int32,
            Self::SFLong | Self::MFLong => Storage::Int64,
            Self::SFBool | Self::MFBool => Storage::Bool,
            Self::SFString | Self::MFString => Storage::String,
            Self::SFNode | Self::MFNode => Storage::Node,
            Self::SFDouble | Self::MFDouble | Self::SFTime | Self::MFTime
            | Self::SFVec2d | Self::MFVec2d | Self::SFVec3d | Self::MFVec3d
            | Self::SFVec4d | Self::MFVec4d | Self::SFMatrix3d | Self::MFMatrix3d
            | Self::SFMatrix4d | Self::MFMatrix4d => Storage::Double,
            _ => Storage::Float,
        }
    }

    /// Returns the type name as written in declarations.
    pub const fn name(self) -> &'static str {
        match self {
            Self::SFInt32 => "SFInt32",
            Self::MFInt32 => "MFInt32",
            Self::SFFloat => "SFFloat",
            Self::MFFloat => "MFFloat",
            Self::SFDouble => "SFDouble",
            Self::MFDouble => "MFDouble",
            Self::SFTime => "SFTime",
            Self::MFTime => "MFTime",
            Self::SFNode => "SFNode",
            Self::MFNode => "MFNode",
            Self::SFBool => "SFBool",
            Self::MFBool => "MFBool",
            Self::SFString => "SFString",
            Self::MFString => "MFString",
            Self::SFVec2f => "SFVec2f",
            Self::MFVec2f => "MFVec2f",
            Self::SFVec3f => "SFVec3f",
            Self::MFVec3f => "MFVec3f",
            Self::SFVec3d => "SFVec3d",
            Self::MFVec3d => "MFVec3d",
            Self::SFRotation => "SFRotation",
            Self::MFRotation => "MFRotation",
            Self::SFColor => "SFColor",
            Self::MFColor => "MFColor",
            Self::SFImage => "SFImage",
            Self::MFImage => "MFImage",
            Self::SFColorRGBA => "SFColorRGBA",
            Self::MFColorRGBA => "MFColorRGBA",
            Self::SFLong => "SFLong",
            Self::MFLong => "MFLong",
            Self::SFVec4f => "SFVec4f",
            Self::MFVec4f => "MFVec4f",
            Self::SFVec4d => "SFVec4d",
            Self::MFVec4d => "MFVec4d",
            Self::SFVec2d => "SFVec2d",
            Self::MFVec2d => "MFVec2d",
            Self::SFMatrix3f => "SFMatrix3f",
            Self::MFMatrix3f => "MFMatrix3f",
            Self::SFMatrix4f => "SFMatrix4f",
            Self::MFMatrix4f => "MFMatrix4f",
            Self::SFMatrix3d => "SFMatrix3d",
            Self::MFMatrix3d => "MFMatrix3d",
            Self::SFMatrix4d => "SFMatrix4d",
            Self::MFMatrix4d => "MFMatrix4d",
        }
    }

    /// Parse a type from its declaration name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.name() == name)
    }

    /// Logical element count of a flat value, if the value fits this type.
    ///
    /// `span = raw length / element count` is the tuple width used when text
    /// output is grouped.
    pub fn element_count(self, value: &FieldValue) -> Option<usize> {
        if !self.accepts(value) {
            return None;
        }
        if let (true, FieldValue::Int32s(data)) = (self.is_image(), value) {
            return image_count(data);
        }
        Some(value.len() / self.tuple_arity())
    }

    /// Does `value` have the right variant and shape for this type?
    pub fn accepts(self, value: &FieldValue) -> bool {
        let storage_ok = match (self.storage(), value) {
            (Storage::Bool, FieldValue::Bools(_))
            | (Storage::Int32, FieldValue::Int32s(_))
            | (Storage::Int64, FieldValue::Int64s(_))
            | (Storage::Float, FieldValue::Floats(_))
            | (Storage::Double, FieldValue::Doubles(_))
            | (Storage::String, FieldValue::Strings(_)) => true,
            (Storage::Node, FieldValue::Node(_)) => self == Self::SFNode,
            (Storage::Node, FieldValue::Nodes(_)) => self == Self::MFNode,
            _ => false,
        };
        if !storage_ok || self.is_node() {
            return storage_ok;
        }

        let len = value.len();
        if let (true, FieldValue::Int32s(data)) = (self.is_image(), value) {
            return match image_count(data) {
                Some(n) => self.is_multi() || n == 1,
                None => false,
            };
        }
        let arity = self.tuple_arity();
        if self.is_multi() {
            len % arity == 0
        } else {
            len == arity
        }
    }

    /// Value used for a declaration that must carry a value but has none.
    pub fn zero_value(self) -> FieldValue {
        let n = if self.is_multi() { 0 } else { self.tuple_arity() };
        match self.storage() {
            Storage::Bool => FieldValue::Bools(vec![false; n]),
            Storage::Int32 if self == Self::SFImage => FieldValue::Int32s(vec![0, 0, 0]),
            Storage::Int32 => FieldValue::Int32s(vec![0; n]),
            Storage::Int64 => FieldValue::Int64s(vec![0; n]),
            Storage::Float => FieldValue::Floats(vec![0.0; n]),
            Storage::Double => FieldValue::Doubles(vec![0.0; n]),
            Storage::String => FieldValue::Strings(vec![String::new(); n]),
            Storage::Node if self.is_multi() => FieldValue::Nodes(Vec::new()),
            Storage::Node => FieldValue::Node(None),
        }
    }
}

/// SFImage is `width height components` followed by `width * height` pixels;
/// MFImage is a concatenation of such records. Returns the record count.
pub(crate) fn image_count(data: &[i32]) -> Option<usize> {
    let mut rest = data;
    let mut images = 0;
    while !rest.is_empty() {
        if rest.len() < 3 || rest[0] < 0 || rest[1] < 0 {
            return None;
        }
        let pixels = rest[0] as usize * rest[1] as usize;
        if rest.len() < 3 + pixels {
            return None;
        }
        rest = &rest[3 + pixels..];
        images += 1;
    }
    Some(images)
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Access category of a field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Access {
    InitializeOnly,
    InputOutput,
    InputOnly,
    OutputOnly,
}

impl Access {
    /// Fields of these categories carry a persistent value token.
    #[inline]
    pub const fn carries_value(self) -> bool {
        matches!(self, Self::InitializeOnly | Self::InputOutput)
    }

    /// X3D name (`accessType` attribute / classic X3D keyword).
    pub const fn name(self) -> &'static str {
        match self {
            Self::InitializeOnly => "initializeOnly",
            Self::InputOutput => "inputOutput",
            Self::InputOnly => "inputOnly",
            Self::OutputOnly => "outputOnly",
        }
    }

    /// VRML97 keyword.
    pub const fn vrml97_name(self) -> &'static str {
        match self {
            Self::InitializeOnly => "field",
            Self::InputOutput => "exposedField",
            Self::InputOnly => "eventIn",
            Self::OutputOnly => "eventOut",
        }
    }

    /// Parse either naming scheme.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "initializeOnly" | "field" => Some(Self::InitializeOnly),
            "inputOutput" | "exposedField" => Some(Self::InputOutput),
            "inputOnly" | "eventIn" => Some(Self::InputOnly),
            "outputOnly" | "eventOut" => Some(Self::OutputOnly),
            _ => None,
        }
    }
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
