//! The scene: node arena, labels, prototypes and document-level statements.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::util::{Access, Error, FieldType, FieldValue, NodeId, ProtoId, Result};

use super::builtin::WORLD_ROOT;
use super::catalog::{Catalog, FieldDecl, SchemaBuilder};
use super::node::{Node, NodeKind, NodeRef};
use super::proto::{IsConnection, ProtoBody, ProtoKind, Prototype};

/// `from_node.from_field TO to_node.to_field`, by field index.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Route {
    pub from_node: NodeId,
    pub from_field: usize,
    pub to_node: NodeId,
    pub to_field: usize,
}

/// `IMPORT inline_def.exported_name AS local_name`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Import {
    pub inline_def: String,
    pub exported_name: String,
    pub local_name: Option<String>,
}

/// `EXPORT <node label> AS exported_name`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Export {
    pub node: NodeId,
    pub exported_name: Option<String>,
}

/// Component requirement in the document head.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Component {
    pub name: String,
    pub level: u32,
}

/// Reverse a label registry. A node with several labels keeps the first in
/// label order.
pub(crate) fn def_map_from_labels(labels: &BTreeMap<String, NodeId>) -> HashMap<NodeId, String> {
    let mut map = HashMap::with_capacity(labels.len());
    for (label, &node) in labels {
        map.entry(node).or_insert_with(|| label.clone());
    }
    map
}

/// An in-memory scene graph.
///
/// Nodes live in an arena owned by the scene; graph edges are node ids stored
/// in node-valued fields, so sharing and back-references are plain data.
#[derive(Clone, Debug)]
pub struct Scene {
    catalog: Arc<Catalog>,
    nodes: Vec<Node>,
    root: NodeId,
    root_children: usize,
    labels: BTreeMap<String, NodeId>,
    protos: Vec<Prototype>,
    top_level_protos: Vec<ProtoId>,
    routes: Vec<Route>,
    imports: Vec<Import>,
    exports: Vec<Export>,
    profile: String,
    components: Vec<Component>,
    meta: Vec<(String, String)>,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    /// Empty scene over the built-in catalog.
    pub fn new() -> Self {
        Self::with_catalog(Catalog::builtin())
    }

    /// Empty scene over a custom catalog. The root kind is added if missing.
    pub fn with_catalog(mut catalog: Arc<Catalog>) -> Self {
        if catalog.lookup(WORLD_ROOT).is_none() {
            Arc::make_mut(&mut catalog).register(
                SchemaBuilder::new(WORLD_ROOT, "children")
                    .io("children", FieldType::MFNode, FieldValue::Nodes(Vec::new()))
                    .build(),
            );
        }
        let (root_kind, root_children) = catalog
            .lookup(WORLD_ROOT)
            .and_then(|i| Some((i, catalog.schema(i)?.field_index("children")?)))
            .map(|(i, c)| (NodeKind::Schema(i), c))
            .unwrap_or((NodeKind::Opaque(WORLD_ROOT.into()), 1));

        Self {
            catalog,
            nodes: vec![Node::new(root_kind)],
            root: NodeId(0),
            root_children,
            labels: BTreeMap::new(),
            protos: Vec::new(),
            top_level_protos: Vec::new(),
            routes: Vec::new(),
            imports: Vec::new(),
            exports: Vec::new(),
            profile: "Immersive".into(),
            components: Vec::new(),
            meta: Vec::new(),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// The implicit root whose `children` are the top-level nodes.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Top-level nodes, in order.
    pub fn root_nodes(&self) -> &[NodeId] {
        self.nodes[self.root.index()]
            .values
            .get(&self.root_children)
            .map(FieldValue::child_nodes)
            .unwrap_or(&[])
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    /// Read-only view of a node with its declarations.
    pub fn node_ref(&self, id: NodeId) -> Result<NodeRef<'_>> {
        let node = self.node(id).ok_or(Error::InvalidNode(id))?;
        Ok(NodeRef::new(self, id, node))
    }

    /// Number of nodes in the arena, root included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn push_node(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.nodes.get_mut(id.index()).ok_or(Error::InvalidNode(id))
    }

    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    /// Create a node of a catalog kind.
    pub fn create_node(&mut self, kind: &str) -> Result<NodeId> {
        let index = self
            .catalog
            .lookup(kind)
            .ok_or_else(|| Error::UnknownNodeKind(kind.to_string()))?;
        Ok(self.push_node(Node::new(NodeKind::Schema(index))))
    }

    /// Create a node of a kind the catalog does not know.
    pub fn create_opaque_node(&mut self, kind: &str) -> NodeId {
        self.push_node(Node::new(NodeKind::Opaque(kind.to_string())))
    }

    /// Create an instance of a declared prototype.
    pub fn create_proto_instance(&mut self, proto: ProtoId) -> Result<NodeId> {
        if self.prototype(proto).is_none() {
            return Err(Error::invalid(format!("no prototype {proto:?}")));
        }
        Ok(self.push_node(Node::new(NodeKind::ProtoInstance(proto))))
    }

    /// Create a Script node.
    pub fn create_script(&mut self) -> Result<NodeId> {
        self.create_node("Script")
    }

    /// Declare a per-instance field on a dynamic node. Returns its index.
    pub fn add_dynamic_field(
        &mut self,
        node: NodeId,
        name: &str,
        field_type: FieldType,
        access: Access,
        default: Option<FieldValue>,
    ) -> Result<usize> {
        let (count, known) = {
            let r = self.node_ref(node)?;
            if r.dynamic_start().is_none() {
                return Err(Error::invalid(format!("{} has no dynamic fields", r.kind_name())));
            }
            (r.field_count(), r.field_index(name).is_some())
        };
        if known {
            return Err(Error::invalid(format!("field {name} already declared")));
        }
        if let Some(value) = &default {
            check_type(name, field_type, value)?;
        }
        let mut decl = FieldDecl::new(name, field_type, access);
        decl.default = default;
        self.node_mut(node)?.dynamic_fields.push(decl);
        Ok(count)
    }

    /// Set a field by name, checking that the value fits the declaration.
    pub fn set_field(&mut self, node: NodeId, name: &str, value: FieldValue) -> Result<()> {
        let (index, field_type) = {
            let r = self.node_ref(node)?;
            let index = r.field_index(name).ok_or_else(|| Error::UnknownField {
                kind: r.kind_name().to_string(),
                field: name.to_string(),
            })?;
            let decl = r
                .field_declaration(index)
                .ok_or_else(|| Error::invalid("declaration vanished"))?;
            (index, decl.field_type)
        };
        check_type(name, field_type, &value)?;
        for child in value.child_nodes() {
            if self.node(*child).is_none() {
                return Err(Error::InvalidNode(*child));
            }
        }
        self.node_mut(node)?.values.insert(index, value);
        Ok(())
    }

    /// Store a value at a raw index without any checks.
    pub fn set_field_value(&mut self, node: NodeId, index: usize, value: FieldValue) -> Result<()> {
        self.node_mut(node)?.values.insert(index, value);
        Ok(())
    }

    /// Append a node to the top level.
    pub fn add_root_child(&mut self, node: NodeId) -> Result<()> {
        if self.node(node).is_none() {
            return Err(Error::InvalidNode(node));
        }
        let slot = self.root_children;
        let root = self.root;
        let values = &mut self.node_mut(root)?.values;
        match values.entry(slot).or_insert_with(|| FieldValue::Nodes(Vec::new())) {
            FieldValue::Nodes(children) => children.push(node),
            _ => return Err(Error::invalid("root children slot holds a non-node value")),
        }
        Ok(())
    }

    /// Append `child` to a node-valued field of `parent` (SFNode is replaced).
    pub fn add_child(&mut self, parent: NodeId, field: &str, child: NodeId) -> Result<()> {
        if self.node(child).is_none() {
            return Err(Error::InvalidNode(child));
        }
        let (index, field_type) = {
            let r = self.node_ref(parent)?;
            let index = r.field_index(field).ok_or_else(|| Error::UnknownField {
                kind: r.kind_name().to_string(),
                field: field.to_string(),
            })?;
            let ty = r.field_declaration(index).map(|d| d.field_type);
            (index, ty)
        };
        let node = self.node_mut(parent)?;
        match field_type {
            Some(FieldType::SFNode) => {
                node.values.insert(index, FieldValue::node(child));
            }
            Some(FieldType::MFNode) => {
                match node.values.entry(index).or_insert_with(|| FieldValue::Nodes(Vec::new())) {
                    FieldValue::Nodes(children) => children.push(child),
                    other => *other = FieldValue::Nodes(vec![child]),
                }
            }
            _ => {
                return Err(Error::TypeMismatch {
                    field: field.to_string(),
                    expected: "SFNode or MFNode".into(),
                })
            }
        }
        Ok(())
    }

    /// Register a scene-scope DEF label.
    pub fn set_def(&mut self, label: &str, node: NodeId) -> Result<()> {
        if self.node(node).is_none() {
            return Err(Error::InvalidNode(node));
        }
        self.labels.insert(label.to_string(), node);
        Ok(())
    }

    pub fn labels(&self) -> &BTreeMap<String, NodeId> {
        &self.labels
    }

    pub fn node_by_label(&self, label: &str) -> Option<NodeId> {
        self.labels.get(label).copied()
    }

    /// Node to DEF label map for the scene scope.
    pub fn def_map(&self) -> HashMap<NodeId, String> {
        def_map_from_labels(&self.labels)
    }

    fn resolve_route(&self, from: NodeId, from_field: &str, to: NodeId, to_field: &str) -> Result<Route> {
        let field = |id: NodeId, name: &str| -> Result<usize> {
            let r = self.node_ref(id)?;
            r.field_index(name).ok_or_else(|| Error::UnknownField {
                kind: r.kind_name().to_string(),
                field: name.to_string(),
            })
        };
        Ok(Route {
            from_node: from,
            from_field: field(from, from_field)?,
            to_node: to,
            to_field: field(to, to_field)?,
        })
    }

    /// Add a route between named fields.
    pub fn add_route(&mut self, from: NodeId, from_field: &str, to: NodeId, to_field: &str) -> Result<()> {
        let route = self.resolve_route(from, from_field, to, to_field)?;
        self.routes.push(route);
        Ok(())
    }

    /// Add a route by raw field indices.
    pub fn add_route_by_index(&mut self, route: Route) {
        self.routes.push(route);
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    // ------------------------------------------------------------------
    // Prototypes
    // ------------------------------------------------------------------

    fn push_proto(&mut self, proto: Prototype, top_level: bool) -> Result<ProtoId> {
        if self.prototype_by_name(&proto.name).is_some() {
            return Err(Error::invalid(format!("prototype {} declared twice", proto.name)));
        }
        for decl in &proto.interface {
            if let Some(value) = &decl.default {
                check_type(&decl.name, decl.field_type, value)?;
            }
        }
        let id = ProtoId(self.protos.len() as u32);
        self.protos.push(proto);
        if top_level {
            self.top_level_protos.push(id);
        }
        Ok(id)
    }

    /// Declare a top-level PROTO with an empty body.
    pub fn add_prototype(&mut self, name: &str, interface: Vec<FieldDecl>) -> Result<ProtoId> {
        self.push_proto(
            Prototype { name: name.into(), interface, kind: ProtoKind::Local(ProtoBody::default()) },
            true,
        )
    }

    /// Declare a PROTO that is not listed at the top level; it is emitted
    /// ahead of its first user.
    pub fn add_nested_prototype(&mut self, name: &str, interface: Vec<FieldDecl>) -> Result<ProtoId> {
        self.push_proto(
            Prototype { name: name.into(), interface, kind: ProtoKind::Local(ProtoBody::default()) },
            false,
        )
    }

    /// Declare a top-level EXTERNPROTO.
    pub fn add_extern_prototype(
        &mut self,
        name: &str,
        interface: Vec<FieldDecl>,
        urls: Vec<String>,
    ) -> Result<ProtoId> {
        self.push_proto(
            Prototype { name: name.into(), interface, kind: ProtoKind::Extern { urls } },
            true,
        )
    }

    pub fn prototype(&self, id: ProtoId) -> Option<&Prototype> {
        self.protos.get(id.index())
    }

    pub fn prototype_by_name(&self, name: &str) -> Option<ProtoId> {
        self.protos
            .iter()
            .position(|p| p.name == name)
            .map(|i| ProtoId(i as u32))
    }

    /// Every declared prototype with its id.
    pub fn prototypes(&self) -> impl Iterator<Item = (ProtoId, &Prototype)> {
        self.protos.iter().enumerate().map(|(i, p)| (ProtoId(i as u32), p))
    }

    /// Prototypes declared at the top level, in declaration order.
    pub fn top_level_prototypes(&self) -> &[ProtoId] {
        &self.top_level_protos
    }

    fn body_mut(&mut self, proto: ProtoId) -> Result<&mut ProtoBody> {
        self.protos
            .get_mut(proto.index())
            .ok_or_else(|| Error::invalid(format!("no prototype {proto:?}")))?
            .body_mut()
            .ok_or_else(|| Error::invalid("EXTERNPROTO has no body"))
    }

    /// Append a top-level node to a prototype body.
    pub fn add_proto_body_node(&mut self, proto: ProtoId, node: NodeId) -> Result<()> {
        if self.node(node).is_none() {
            return Err(Error::InvalidNode(node));
        }
        self.body_mut(proto)?.nodes.push(node);
        Ok(())
    }

    /// Register a DEF label in a prototype body's scope.
    pub fn set_proto_def(&mut self, proto: ProtoId, label: &str, node: NodeId) -> Result<()> {
        if self.node(node).is_none() {
            return Err(Error::InvalidNode(node));
        }
        self.body_mut(proto)?.labels.insert(label.to_string(), node);
        Ok(())
    }

    /// Connect `node.field IS proto_field` inside a prototype body.
    pub fn connect_is(&mut self, proto: ProtoId, node: NodeId, field: &str, proto_field: &str) -> Result<()> {
        let (index, node_type) = {
            let r = self.node_ref(node)?;
            let index = r.field_index(field).ok_or_else(|| Error::UnknownField {
                kind: r.kind_name().to_string(),
                field: field.to_string(),
            })?;
            (index, r.field_declaration(index).map(|d| d.field_type))
        };
        let proto_type = {
            let p = self
                .prototype(proto)
                .ok_or_else(|| Error::invalid(format!("no prototype {proto:?}")))?;
            p.interface
                .iter()
                .find(|d| d.name == proto_field)
                .map(|d| d.field_type)
                .ok_or_else(|| Error::UnknownField { kind: p.name.clone(), field: proto_field.to_string() })?
        };
        if node_type != Some(proto_type) {
            return Err(Error::TypeMismatch { field: field.to_string(), expected: proto_type.to_string() });
        }
        self.body_mut(proto)?.is_connections.push(IsConnection {
            node,
            field: index,
            proto_field: proto_field.to_string(),
        });
        Ok(())
    }

    /// Add a route inside a prototype body.
    pub fn add_proto_route(
        &mut self,
        proto: ProtoId,
        from: NodeId,
        from_field: &str,
        to: NodeId,
        to_field: &str,
    ) -> Result<()> {
        let route = self.resolve_route(from, from_field, to, to_field)?;
        self.body_mut(proto)?.routes.push(route);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Document-level statements
    // ------------------------------------------------------------------

    pub fn add_import(&mut self, import: Import) {
        self.imports.push(import);
    }

    pub fn imports(&self) -> &[Import] {
        &self.imports
    }

    pub fn add_export(&mut self, export: Export) -> Result<()> {
        if self.node(export.node).is_none() {
            return Err(Error::InvalidNode(export.node));
        }
        self.exports.push(export);
        Ok(())
    }

    pub fn exports(&self) -> &[Export] {
        &self.exports
    }

    pub fn set_profile(&mut self, profile: &str) {
        self.profile = profile.to_string();
    }

    pub fn profile(&self) -> &str {
        &self.profile
    }

    pub fn add_component(&mut self, name: &str, level: u32) {
        self.components.push(Component { name: name.to_string(), level });
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn add_meta(&mut self, name: &str, content: &str) {
        self.meta.push((name.to_string(), content.to_string()));
    }

    pub fn meta(&self) -> &[(String, String)] {
        &self.meta
    }
}

fn check_type(name: &str, field_type: FieldType, value: &FieldValue) -> Result<()> {
    if field_type.accepts(value) {
        Ok(())
    } else {
        Err(Error::TypeMismatch { field: name.to_string(), expected: field_type.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_graph() {
        let mut scene = Scene::new();
        let t = scene.create_node("Transform").unwrap();
        let s = scene.create_node("Shape").unwrap();
        let b = scene.create_node("Box").unwrap();
        scene.add_child(t, "children", s).unwrap();
        scene.add_child(s, "geometry", b).unwrap();
        scene.add_root_child(t).unwrap();
        scene.set_def("B", b).unwrap();

        assert_eq!(scene.root_nodes(), &[t]);
        assert_eq!(scene.def_map().get(&b).map(String::as_str), Some("B"));
        let children: Vec<_> = scene.node_ref(s).unwrap().children().collect();
        assert_eq!(children, vec![b]);
    }

    #[test]
    fn test_set_field_validation() {
        let mut scene = Scene::new();
        let t = scene.create_node("Transform").unwrap();
        assert!(matches!(
            scene.set_field(t, "translation", FieldValue::float(1.0)),
            Err(Error::TypeMismatch { .. })
        ));
        assert!(matches!(
            scene.set_field(t, "nope", FieldValue::float(1.0)),
            Err(Error::UnknownField { .. })
        ));
        assert!(matches!(scene.create_node("Teapot"), Err(Error::UnknownNodeKind(_))));
        assert!(matches!(scene.node_ref(NodeId(99)), Err(Error::InvalidNode(_))));
    }

    #[test]
    fn test_def_map_prefers_first_label() {
        let mut scene = Scene::new();
        let b = scene.create_node("Box").unwrap();
        scene.set_def("Zed", b).unwrap();
        scene.set_def("Alpha", b).unwrap();
        assert_eq!(scene.def_map()[&b], "Alpha");
    }

    #[test]
    fn test_prototype_body() {
        let mut scene = Scene::new();
        let p = scene
            .add_prototype(
                "Thing",
                vec![FieldDecl::new("size", FieldType::SFVec3f, Access::InputOutput)
                    .with_default(FieldValue::vec3f(1.0, 1.0, 1.0))],
            )
            .unwrap();
        let b = scene.create_node("Box").unwrap();
        scene.add_proto_body_node(p, b).unwrap();
        scene.connect_is(p, b, "size", "size").unwrap();
        assert!(matches!(scene.connect_is(p, b, "solid", "size"), Err(Error::TypeMismatch { .. })));
        assert!(scene.add_prototype("Thing", Vec::new()).is_err());

        let body = scene.prototype(p).unwrap().body().unwrap();
        assert_eq!(body.nodes, vec![b]);
        assert_eq!(body.is_map()[&b].len(), 1);

        let inst = scene.create_proto_instance(p).unwrap();
        let r = scene.node_ref(inst).unwrap();
        assert_eq!(r.kind_name(), "Thing");
        assert_eq!(r.field_value(0), Some(&FieldValue::vec3f(1.0, 1.0, 1.0)));
    }

    #[test]
    fn test_custom_catalog_gets_root() {
        let mut catalog = Catalog::new();
        catalog.register(SchemaBuilder::new("Widget", "children").build());
        let mut scene = Scene::with_catalog(Arc::new(catalog));
        let w = scene.create_node("Widget").unwrap();
        scene.add_root_child(w).unwrap();
        assert_eq!(scene.root_nodes(), &[w]);
    }
}
