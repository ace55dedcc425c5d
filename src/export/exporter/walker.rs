//! Graph traversal: DEF/USE, field order and per-field policy.
//!
//! Fields of a node go out in four groups:
//! 1. value fields in index order (elided when default, skipped when IS-linked)
//! 2. the IS block (ahead of the values on prototype instances)
//! 3. per-instance declarations of dynamic kinds
//! 4. node-valued fields in index order
//!
//! Value fields ahead of children keeps XML attributes before child elements
//! and satisfies the classic "fields before nodes" layout.

use std::borrow::Cow;

use smallvec::SmallVec;
use tracing::trace;

use crate::core::{Diagnostic, Encoding};
use crate::export::elider::DefaultElider;
use crate::export::sink::{is_xml_char, FieldHeader, FieldRole, IsLink, NodeStart, UseRef};
use crate::scene::{FieldDecl, NodeRef};
use crate::util::{Error, FieldValue, NodeId, Result, Storage};

use super::types::NodePolicy;
use super::ExportPass;

impl<'a> ExportPass<'a> {
    /// Write `id` in full the first time, as a USE reference afterwards.
    ///
    /// `slot` is the parent field holding the node: `None` at the top level,
    /// directly in a prototype body, and under declarations or instance
    /// values, where the enclosing element already names the field.
    pub(super) fn visit(&mut self, id: NodeId, slot: Option<&str>) -> Result<()> {
        let scene = self.scene;
        let node = scene.node_ref(id)?;
        let kind = node.kind_name();
        let proto_instance = node.is_proto_instance();
        let container_field = slot.filter(|&s| s != node.default_container_field());

        if !self.used.insert(id) {
            let label = self
                .scope
                .def_map
                .get(&id)
                .ok_or_else(|| Error::UnlabeledSharedNode { kind: kind.to_string() })?;
            trace!("USE {} ({})", label, kind);
            self.sink.emit_use(&UseRef { kind, proto_instance, label, container_field })?;
            self.stats.uses += 1;
            return Ok(());
        }

        let def = self.scope.def_map.get(&id).map(String::as_str);
        trace!("Node {} def={:?} slot={:?}", kind, def, container_field);
        self.sink.start_node(&NodeStart { kind, proto_instance, def, container_field })?;
        self.stats.nodes += 1;
        self.emit_fields(node)?;
        self.sink.end_node()
    }

    fn emit_fields(&mut self, node: NodeRef<'a>) -> Result<()> {
        let policy = NodePolicy::of(&node);
        for index in node.stray_value_indices() {
            self.diagnostics.report(Diagnostic::UnknownField { kind: node.kind_name().to_string(), index });
        }

        let links = self.scope.is_map.get(&node.id()).cloned().unwrap_or_default();
        let is_linked = |index: usize| links.iter().any(|(field, _)| *field == index);
        let count = node.field_count();
        let dynamic_start = node.dynamic_start().unwrap_or(count);

        let is: SmallVec<[IsLink<'_>; 2]> = links
            .iter()
            .filter_map(|(index, proto_field)| {
                let decl = node.field_declaration(*index)?;
                Some(IsLink { node_field: &decl.name, proto_field: proto_field.as_str() })
            })
            .collect();
        // Instance values are elements themselves and follow the IS block.
        let is_first = policy == NodePolicy::ProtoInstance;
        if is_first && !is.is_empty() {
            self.sink.emit_is(&is)?;
        }

        for index in 0..dynamic_start {
            let Some(decl) = node.field_declaration(index) else { continue };
            if decl.field_type.is_node() || !decl.access.carries_value() || is_linked(index) {
                continue;
            }
            self.emit_value_field(node, index, decl, policy)?;
        }

        if !is_first && !is.is_empty() {
            self.sink.emit_is(&is)?;
        }

        for index in dynamic_start..count {
            let Some(decl) = node.field_declaration(index) else { continue };
            self.emit_declaration(node, index, decl, is_linked(index))?;
        }

        for index in node.node_field_indices() {
            if index >= dynamic_start || is_linked(index) {
                continue;
            }
            if let Some(decl) = node.field_declaration(index) {
                self.emit_node_field(node, index, decl, policy)?;
            }
        }
        Ok(())
    }

    fn mismatch(&mut self, node: &NodeRef<'_>, decl: &FieldDecl) {
        self.diagnostics.report(Diagnostic::ValueMismatch {
            kind: node.kind_name().to_string(),
            field: decl.name.clone(),
            expected: decl.field_type.to_string(),
        });
    }

    /// Strings holding characters the XML encoding cannot carry.
    fn unrepresentable(&mut self, node: &NodeRef<'_>, decl: &FieldDecl, value: &FieldValue) -> bool {
        let FieldValue::Strings(strings) = value else {
            return false;
        };
        if self.sink.encoding() != Encoding::Xml || strings.iter().all(|s| s.chars().all(is_xml_char)) {
            return false;
        }
        self.diagnostics.report(Diagnostic::ValueMismatch {
            kind: node.kind_name().to_string(),
            field: decl.name.clone(),
            expected: "XML 1.0 text".to_string(),
        });
        true
    }

    fn emit_value_field(
        &mut self,
        node: NodeRef<'a>,
        index: usize,
        decl: &'a FieldDecl,
        policy: NodePolicy,
    ) -> Result<()> {
        // Instances only carry what was set; the rest is the interface default.
        let value = match policy {
            NodePolicy::ProtoInstance => node.set_value(index),
            _ => node.field_value(index),
        };
        let Some(value) = value else {
            return Ok(());
        };
        if !decl.field_type.accepts(value) {
            self.mismatch(&node, decl);
            return Ok(());
        }
        if self.unrepresentable(&node, decl, value) {
            return Ok(());
        }

        if self.options.remove_defaults && policy != NodePolicy::Dynamic {
            let baseline = match node.proto_id() {
                Some(proto) => Some(self.default_instance(proto)?),
                None => None,
            };
            let default = match &baseline {
                Some(instance) => instance.field_default(index),
                None => decl.default.as_ref(),
            };
            if DefaultElider::is_default(decl.field_type, value, default) {
                trace!("Elided {}.{}", node.kind_name(), decl.name);
                self.diagnostics.count_elided();
                return Ok(());
            }
        }

        let value = self.rewrite_urls(decl, value);
        let form = self.codec.encode(decl.field_type, &value)?;
        let role = match policy {
            NodePolicy::ProtoInstance => FieldRole::InstanceValue,
            _ => FieldRole::Attribute,
        };
        let header = FieldHeader { name: &decl.name, field_type: decl.field_type, access: decl.access, role };
        self.sink.emit_field(&header, Some(&form))?;
        self.stats.fields += 1;
        Ok(())
    }

    /// Declaration of a per-instance field (Script `field` entries).
    fn emit_declaration(&mut self, node: NodeRef<'a>, index: usize, decl: &'a FieldDecl, linked: bool) -> Result<()> {
        let header = FieldHeader {
            name: &decl.name,
            field_type: decl.field_type,
            access: decl.access,
            role: FieldRole::Declaration,
        };
        self.stats.fields += 1;
        if linked || !decl.access.carries_value() {
            return self.sink.emit_field(&header, None);
        }

        if decl.field_type.is_node() {
            let children = node.field_value(index).map(FieldValue::child_nodes).unwrap_or(&[]);
            self.sink.start_node_field(&header, children.len())?;
            for &child in children {
                self.visit(child, None)?;
            }
            return self.sink.end_node_field();
        }

        let value = match node.field_value(index) {
            Some(value) if !decl.field_type.accepts(value) => {
                self.mismatch(&node, decl);
                Cow::Owned(decl.field_type.zero_value())
            }
            Some(value) if self.unrepresentable(&node, decl, value) => Cow::Owned(decl.field_type.zero_value()),
            Some(value) => Cow::Borrowed(value),
            None => Cow::Owned(decl.field_type.zero_value()),
        };
        let form = self.codec.encode(decl.field_type, &value)?;
        self.sink.emit_field(&header, Some(&form))
    }

    fn emit_node_field(
        &mut self,
        node: NodeRef<'a>,
        index: usize,
        decl: &'a FieldDecl,
        policy: NodePolicy,
    ) -> Result<()> {
        let value = match policy {
            NodePolicy::ProtoInstance => node.set_value(index),
            _ => node.field_value(index),
        };
        if value.is_some_and(|v| !decl.field_type.accepts(v)) {
            self.mismatch(&node, decl);
            return Ok(());
        }
        let children = value.map(FieldValue::child_nodes).unwrap_or(&[]);
        // Dynamic kinds echo empty node fields too, except a null metadata.
        if children.is_empty() && !(policy == NodePolicy::Dynamic && decl.name != "metadata") {
            return Ok(());
        }

        let role = match policy {
            NodePolicy::ProtoInstance => FieldRole::InstanceValue,
            _ => FieldRole::Attribute,
        };
        let header = FieldHeader { name: &decl.name, field_type: decl.field_type, access: decl.access, role };
        self.sink.start_node_field(&header, children.len())?;
        let slot = (role == FieldRole::Attribute).then_some(decl.name.as_str());
        for &child in children {
            self.visit(child, slot)?;
        }
        self.stats.fields += 1;
        self.sink.end_node_field()
    }

    /// Copy of a URL field with the base prefix stripped and legacy
    /// extensions upgraded. The scene itself is never modified.
    fn rewrite_urls<'v>(&self, decl: &FieldDecl, value: &'v FieldValue) -> Cow<'v, FieldValue> {
        let active = self.options.base_url.is_some() || self.options.upgrade_legacy_urls;
        let is_url = decl.field_type.storage() == Storage::String
            && (decl.name == "url" || decl.name.ends_with("Url"));
        match value {
            FieldValue::Strings(urls) if active && is_url => {
                Cow::Owned(FieldValue::Strings(urls.iter().map(|u| self.rewrite_url(u)).collect()))
            }
            _ => Cow::Borrowed(value),
        }
    }

    fn rewrite_url(&self, url: &str) -> String {
        let url = match self.options.base_url.as_deref() {
            Some(base) if !base.is_empty() => url.strip_prefix(base).unwrap_or(url),
            _ => url,
        };
        if !self.options.upgrade_legacy_urls {
            return url.to_string();
        }
        let (path, fragment) = url.split_at(url.find('#').unwrap_or(url.len()));
        let stem = path
            .len()
            .checked_sub(4)
            .filter(|&cut| path.is_char_boundary(cut) && path[cut..].eq_ignore_ascii_case(".wrl"))
            .map(|cut| &path[..cut]);
        match stem {
            Some(stem) => {
                let ext = self.sink.encoding().extension(self.options.version);
                format!("{stem}.{ext}{fragment}")
            }
            None => url.to_string(),
        }
    }
}
