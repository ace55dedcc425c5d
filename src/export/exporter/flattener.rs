//! Prototype declarations: discovery, ordering, default instances.
//!
//! Every declaration is preceded by the declarations its body uses, since no
//! encoding allows forward references. Prototypes that are only declared
//! inside other bodies (not listed at the top level) are picked up by the
//! same pre-scan, from the bodies and from the main graph.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::core::Diagnostic;
use crate::export::sink::{FieldHeader, FieldRole};
use crate::scene::{ProtoKind, Prototype};
use crate::util::{Error, NodeId, ProtoId, Result};

use super::types::{DefaultInstance, Scope};
use super::ExportPass;

impl<'a> ExportPass<'a> {
    pub(super) fn declare_prototypes(&mut self) -> Result<()> {
        let scene = self.scene;
        debug!("Declaring {} top-level prototypes", scene.top_level_prototypes().len());
        for &proto in scene.top_level_prototypes() {
            self.declare(proto)?;
        }
        for proto in self.undeclared_uses(scene.root_nodes())? {
            self.declare(proto)?;
        }
        Ok(())
    }

    /// Prototypes instantiated at or below `roots` and not declared yet, in
    /// first-use order.
    fn undeclared_uses(&self, roots: &[NodeId]) -> Result<Vec<ProtoId>> {
        let scene = self.scene;
        let mut seen = HashSet::new();
        let mut found = Vec::new();
        let mut stack: Vec<NodeId> = roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            let node = scene.node_ref(id)?;
            if let Some(proto) = node.proto_id() {
                if !self.declared.contains(&proto) && !found.contains(&proto) {
                    found.push(proto);
                }
            }
            let children: Vec<NodeId> = node.children().collect();
            stack.extend(children.into_iter().rev());
        }
        Ok(found)
    }

    fn declare(&mut self, id: ProtoId) -> Result<()> {
        if self.declared.contains(&id) {
            return Ok(());
        }
        let scene = self.scene;
        let proto = scene
            .prototype(id)
            .ok_or_else(|| Error::invalid(format!("no prototype {id:?}")))?;
        if !self.in_progress.insert(id) {
            self.diagnostics.report(Diagnostic::Unsupported {
                what: format!("recursive use of prototype {}", proto.name),
            });
            return Ok(());
        }

        if let Some(body) = proto.body() {
            for dependency in self.undeclared_uses(&body.nodes)? {
                trace!("{} depends on {:?}", proto.name, dependency);
                self.declare(dependency)?;
            }
        }

        self.default_instance(id)?;
        debug!("Declaring prototype {}", proto.name);
        self.write_declaration(proto)?;
        self.in_progress.remove(&id);
        self.declared.insert(id);
        self.stats.protos += 1;
        Ok(())
    }

    fn write_declaration(&mut self, proto: &'a Prototype) -> Result<()> {
        match &proto.kind {
            ProtoKind::Local(body) => {
                self.sink.start_proto_declare(&proto.name)?;
                self.sink.start_proto_interface()?;
                self.write_interface(proto, true)?;
                self.sink.end_proto_interface()?;

                self.sink.start_proto_body()?;
                let scope = Scope { def_map: body.def_map(), is_map: body.is_map() };
                self.with_scope(scope, |pass| {
                    for &node in &body.nodes {
                        pass.visit(node, None)?;
                    }
                    pass.emit_routes(&body.routes)
                })?;
                self.sink.end_proto_body()?;
                self.sink.end_proto_declare()
            }
            ProtoKind::Extern { urls } => {
                self.sink.start_extern_proto(&proto.name, urls)?;
                self.sink.start_proto_interface()?;
                self.write_interface(proto, false)?;
                self.sink.end_proto_interface()?;
                self.sink.end_extern_proto()
            }
        }
    }

    /// Interface declarations. Fields that carry a value always get one in a
    /// local declaration: the default, or the type's zero value.
    fn write_interface(&mut self, proto: &'a Prototype, with_values: bool) -> Result<()> {
        for decl in &proto.interface {
            let header = FieldHeader {
                name: &decl.name,
                field_type: decl.field_type,
                access: decl.access,
                role: FieldRole::Declaration,
            };
            let valued = with_values && decl.access.carries_value();
            self.stats.fields += 1;

            if decl.field_type.is_node() {
                if valued {
                    self.sink.start_node_field(&header, 0)?;
                    self.sink.end_node_field()?;
                } else {
                    self.sink.emit_field(&header, None)?;
                }
                continue;
            }

            let form = if valued {
                let zero;
                let value = match &decl.default {
                    Some(value) => value,
                    None => {
                        zero = decl.field_type.zero_value();
                        &zero
                    }
                };
                Some(self.codec.encode(decl.field_type, value)?)
            } else {
                None
            };
            self.sink.emit_field(&header, form.as_ref())?;
        }
        Ok(())
    }

    /// Cached default instance of a prototype, synthesized on first request.
    pub(super) fn default_instance(&mut self, id: ProtoId) -> Result<Arc<DefaultInstance>> {
        let scene = self.scene;
        let proto = scene
            .prototype(id)
            .ok_or_else(|| Error::invalid(format!("no prototype {id:?}")))?;
        if let Some(instance) = self.defaults.get(&proto.name) {
            return Ok(Arc::clone(instance));
        }
        let instance = Arc::new(self.synthesize(proto)?);
        self.defaults.insert(proto.name.clone(), Arc::clone(&instance));
        Ok(instance)
    }

    fn synthesize(&mut self, proto: &'a Prototype) -> Result<DefaultInstance> {
        let scene = self.scene;
        let instance = DefaultInstance {
            name: proto.name.clone(),
            field_defaults: proto.interface.iter().map(|d| d.default.clone()).collect(),
        };
        let Some(body) = proto.body() else {
            return Ok(instance);
        };

        let mut seen = HashSet::new();
        let mut stack: Vec<NodeId> = body.nodes.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            let node = scene.node_ref(id)?;
            if node.is_opaque() {
                self.diagnostics.report(Diagnostic::UnsupportedNodeKind {
                    kind: node.kind_name().to_string(),
                    proto: proto.name.clone(),
                });
                continue;
            }
            let children: Vec<NodeId> = node.children().collect();
            stack.extend(children.into_iter().rev());
        }
        trace!("Default instance of {}: {} interface fields", proto.name, instance.field_defaults.len());
        Ok(instance)
    }
}
