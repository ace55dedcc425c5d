//! Node storage and the read-only node view.
//!
//! A [`Node`] is a sparse, index-keyed value store. What the indices mean
//! comes from the node's kind: a catalog schema (plus per-instance dynamic
//! declarations for Script-like kinds), a prototype interface, or nothing at
//! all for opaque kinds. [`NodeRef`] joins the two and is the only surface
//! the exporter reads nodes through.

use std::collections::BTreeMap;

use smallvec::SmallVec;

use crate::util::{FieldValue, NodeId, ProtoId};

use super::catalog::{FieldDecl, NodeSchema};
use super::proto::Prototype;
use super::scene::Scene;

/// Where a node's field declarations come from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    /// Catalog schema index.
    Schema(usize),
    /// Instance of a PROTO or EXTERNPROTO.
    ProtoInstance(ProtoId),
    /// A kind with no schema; carried through by name only.
    Opaque(String),
}

/// One node in the scene arena.
#[derive(Clone, Debug)]
pub struct Node {
    pub kind: NodeKind,
    /// Explicitly set values, keyed by field index.
    pub values: BTreeMap<usize, FieldValue>,
    /// Per-instance declarations appended after the schema fields.
    pub dynamic_fields: Vec<FieldDecl>,
}

impl Node {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            values: BTreeMap::new(),
            dynamic_fields: Vec::new(),
        }
    }
}

/// Indices of node-valued fields; most kinds have only a handful.
pub type NodeFieldIndices = SmallVec<[usize; 8]>;

/// Borrowed view of a node together with its declarations.
#[derive(Clone, Copy)]
pub struct NodeRef<'a> {
    id: NodeId,
    node: &'a Node,
    schema: Option<&'a NodeSchema>,
    proto: Option<&'a Prototype>,
}

impl<'a> NodeRef<'a> {
    pub(crate) fn new(scene: &'a Scene, id: NodeId, node: &'a Node) -> Self {
        let (schema, proto) = match &node.kind {
            NodeKind::Schema(index) => (scene.catalog().schema(*index), None),
            NodeKind::ProtoInstance(proto) => (None, scene.prototype(*proto)),
            NodeKind::Opaque(_) => (None, None),
        };
        Self { id, node, schema, proto }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn node(&self) -> &'a Node {
        self.node
    }

    /// Kind name as written in output (`Transform`, a proto name, ...).
    pub fn kind_name(&self) -> &'a str {
        match (&self.node.kind, self.schema, self.proto) {
            (_, Some(schema), _) => &schema.name,
            (_, _, Some(proto)) => &proto.name,
            (NodeKind::Opaque(name), _, _) => name,
            _ => "",
        }
    }

    pub fn is_proto_instance(&self) -> bool {
        matches!(self.node.kind, NodeKind::ProtoInstance(_))
    }

    pub fn proto_id(&self) -> Option<ProtoId> {
        match self.node.kind {
            NodeKind::ProtoInstance(id) => Some(id),
            _ => None,
        }
    }

    pub fn is_opaque(&self) -> bool {
        matches!(self.node.kind, NodeKind::Opaque(_))
    }

    /// Kinds that echo every declared field (Script).
    pub fn is_dynamic(&self) -> bool {
        self.schema.is_some_and(|s| s.dynamic)
    }

    /// Total number of declared fields, dynamic ones included.
    pub fn field_count(&self) -> usize {
        match (self.schema, self.proto) {
            (Some(schema), _) => schema.fields.len() + self.node.dynamic_fields.len(),
            (_, Some(proto)) => proto.interface.len(),
            _ => 0,
        }
    }

    /// Index where per-instance declarations start, for dynamic kinds.
    pub fn dynamic_start(&self) -> Option<usize> {
        self.schema.filter(|s| s.dynamic).map(|s| s.fields.len())
    }

    /// Declaration at `index`.
    pub fn field_declaration(&self, index: usize) -> Option<&'a FieldDecl> {
        match (self.schema, self.proto) {
            (Some(schema), _) => schema
                .fields
                .get(index)
                .or_else(|| {
                    index
                        .checked_sub(schema.fields.len())
                        .and_then(|i| self.node.dynamic_fields.get(i))
                }),
            (_, Some(proto)) => proto.interface.get(index),
            _ => None,
        }
    }

    /// Index of a field by name.
    pub fn field_index(&self, name: &str) -> Option<usize> {
        (0..self.field_count()).find(|&i| self.field_declaration(i).is_some_and(|d| d.name == name))
    }

    /// Explicitly set value, if any.
    pub fn set_value(&self, index: usize) -> Option<&'a FieldValue> {
        self.node.values.get(&index)
    }

    /// Current value: the set value, else the declared default.
    pub fn field_value(&self, index: usize) -> Option<&'a FieldValue> {
        self.set_value(index)
            .or_else(|| self.field_declaration(index).and_then(|d| d.default.as_ref()))
    }

    /// Indices of declared node-valued fields, in index order.
    pub fn node_field_indices(&self) -> NodeFieldIndices {
        (0..self.field_count())
            .filter(|&i| self.field_declaration(i).is_some_and(|d| d.field_type.is_node()))
            .collect()
    }

    /// Set values whose index the kind does not declare.
    pub fn stray_value_indices(&self) -> impl Iterator<Item = usize> + 'a {
        let count = self.field_count();
        self.node.values.range(count..).map(|(&i, _)| i)
    }

    /// Slot this node occupies in a parent when none is given explicitly.
    pub fn default_container_field(&self) -> &'a str {
        match self.schema {
            Some(schema) => &schema.container_field,
            None => "children",
        }
    }

    /// Child nodes in field index order.
    pub fn children(&self) -> impl Iterator<Item = NodeId> + 'a {
        let node = self.node;
        self.node_field_indices()
            .into_iter()
            .filter_map(move |i| node.values.get(&i))
            .flat_map(|v| v.child_nodes().iter().copied())
    }
}

impl std::fmt::Debug for NodeRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeRef")
            .field("id", &self.id)
            .field("kind", &self.kind_name())
            .field("values", &self.node.values.len())
            .finish()
    }
}
