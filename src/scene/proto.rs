//! Prototype declarations.

use std::collections::{BTreeMap, HashMap};

use smallvec::SmallVec;

use crate::util::NodeId;

use super::catalog::FieldDecl;
use super::scene::{def_map_from_labels, Route};

/// Inside a prototype body, `node.field IS proto_field`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IsConnection {
    pub node: NodeId,
    pub field: usize,
    pub proto_field: String,
}

/// Per-node IS connections of one body: `(field index, interface field name)`.
pub type IsMap = HashMap<NodeId, SmallVec<[(usize, String); 2]>>;

/// Body of a local PROTO.
#[derive(Clone, Debug, Default)]
pub struct ProtoBody {
    /// Top-level body nodes, in order. The first one determines the kind the
    /// instance behaves as.
    pub nodes: Vec<NodeId>,
    /// DEF labels scoped to the body.
    pub labels: BTreeMap<String, NodeId>,
    pub is_connections: Vec<IsConnection>,
    pub routes: Vec<Route>,
}

impl ProtoBody {
    /// Reverse index of the body's DEF labels.
    pub fn def_map(&self) -> HashMap<NodeId, String> {
        def_map_from_labels(&self.labels)
    }

    /// IS connections grouped by node, in declaration order.
    pub fn is_map(&self) -> IsMap {
        let mut map = IsMap::new();
        for c in &self.is_connections {
            map.entry(c.node).or_default().push((c.field, c.proto_field.clone()));
        }
        map
    }
}

/// Local body or external reference.
#[derive(Clone, Debug)]
pub enum ProtoKind {
    Local(ProtoBody),
    Extern { urls: Vec<String> },
}

/// A PROTO or EXTERNPROTO declaration.
#[derive(Clone, Debug)]
pub struct Prototype {
    pub name: String,
    pub interface: Vec<FieldDecl>,
    pub kind: ProtoKind,
}

impl Prototype {
    pub fn is_extern(&self) -> bool {
        matches!(self.kind, ProtoKind::Extern { .. })
    }

    pub fn body(&self) -> Option<&ProtoBody> {
        match &self.kind {
            ProtoKind::Local(body) => Some(body),
            ProtoKind::Extern { .. } => None,
        }
    }

    pub(crate) fn body_mut(&mut self) -> Option<&mut ProtoBody> {
        match &mut self.kind {
            ProtoKind::Local(body) => Some(body),
            ProtoKind::Extern { .. } => None,
        }
    }

    /// Interface index of a field.
    pub fn interface_index(&self, name: &str) -> Option<usize> {
        self.interface.iter().position(|f| f.name == name)
    }
}
