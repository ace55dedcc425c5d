//! Stable identities for scene arena entries.

use std::fmt;

/// Identity of a node inside a [`crate::scene::Scene`].
///
/// Ids are arena indices: they stay valid for the lifetime of the scene and
/// are what DEF/USE bookkeeping keys on.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Identity of a prototype (PROTO or EXTERNPROTO) declaration.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct ProtoId(pub(crate) u32);

impl ProtoId {
    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}
