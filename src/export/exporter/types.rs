//! State and result types of one export pass.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::core::Diagnostic;
use crate::scene::{IsMap, NodeRef};
use crate::util::{Error, FieldValue, NodeId, Result};

/// DEF labels and IS connections visible at the current point of traversal.
///
/// The scene has one scope, every prototype body another. Scopes are swapped
/// wholesale when entering a body, never merged.
#[derive(Clone, Debug, Default)]
pub(super) struct Scope {
    pub(super) def_map: HashMap<NodeId, String>,
    pub(super) is_map: IsMap,
}

impl Scope {
    /// Label a ROUTE, EXPORT or USE can refer to `node` by.
    pub(super) fn route_label(&self, node: &NodeRef<'_>) -> Result<&str> {
        self.def_map
            .get(&node.id())
            .map(String::as_str)
            .ok_or_else(|| Error::MissingRouteLabel { kind: node.kind_name().to_string() })
    }
}

/// How a node's fields are filtered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum NodePolicy {
    /// Defaults come from the catalog and are elided.
    Ordinary,
    /// Script-like kinds echo every field.
    Dynamic,
    /// Values are compared against the prototype's default instance.
    ProtoInstance,
}

impl NodePolicy {
    pub(super) fn of(node: &NodeRef<'_>) -> Self {
        if node.is_proto_instance() {
            Self::ProtoInstance
        } else if node.is_dynamic() {
            Self::Dynamic
        } else {
            Self::Ordinary
        }
    }
}

/// A prototype instantiated with every interface field at its default.
///
/// Built once per prototype and export; it is the baseline literal
/// instances of the prototype are compared against. Only the interface
/// defaults are kept: body fields bound through IS are written as IS links,
/// never as literal values, so they have nothing to be compared with.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DefaultInstance {
    pub name: String,
    /// Interface defaults by interface index; `None` where none is declared.
    pub field_defaults: Vec<Option<FieldValue>>,
}

impl DefaultInstance {
    /// Default of interface field `index`.
    pub fn field_default(&self, index: usize) -> Option<&FieldValue> {
        self.field_defaults.get(index).and_then(Option::as_ref)
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub(super) struct PassStats {
    pub(super) nodes: usize,
    pub(super) uses: usize,
    pub(super) fields: usize,
    pub(super) protos: usize,
    pub(super) routes: usize,
}

/// Summary of a finished export.
#[derive(Clone, Debug, Default)]
pub struct ExportReport {
    /// Nodes written in full.
    pub nodes: usize,
    /// USE references written.
    pub uses: usize,
    /// Field values and declarations written.
    pub fields: usize,
    /// Fields left out because they equal their default.
    pub elided: usize,
    /// PROTO and EXTERNPROTO declarations written.
    pub protos: usize,
    pub routes: usize,
    pub diagnostics: Vec<Diagnostic>,
    pub default_instances: BTreeMap<String, Arc<DefaultInstance>>,
}

impl ExportReport {
    pub fn has_diagnostics(&self) -> bool {
        !self.diagnostics.is_empty()
    }
}
