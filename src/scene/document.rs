//! JSON scene documents.
//!
//! A small serde format for handing scenes to the CLI:
//!
//! ```json
//! {
//!   "profile": "Interchange",
//!   "protos": [{ "name": "Ball", "interface": [...], "body": [...] }],
//!   "nodes": [
//!     { "kind": "Transform", "def": "T", "fields": {
//!         "translation": [0, 1, 0],
//!         "children": [{ "kind": "Shape", "fields": { "geometry": { "use": "B" } } }]
//!     } }
//!   ],
//!   "routes": [{ "from": "Timer", "from_field": "fraction_changed", "to": "T", "to_field": "set_fraction" }]
//! }
//! ```
//!
//! Field values are plain JSON: numbers or (nested) number arrays, booleans,
//! strings, or node objects for node-valued fields. A node object is either a
//! definition (`kind`, optional `def`, `fields`, `declarations`, `is`) or a
//! reference (`use`). References must follow their definition.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::util::{Access, Error, FieldType, FieldValue, NodeId, ProtoId, Result, Storage};

use super::catalog::FieldDecl;
use super::scene::{Export, Import, Scene};

/// Root of a scene document.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneDocument {
    pub profile: Option<String>,
    pub components: Vec<ComponentDoc>,
    pub meta: Vec<MetaDoc>,
    pub protos: Vec<ProtoDoc>,
    pub nodes: Vec<NodeDoc>,
    pub routes: Vec<RouteDoc>,
    pub imports: Vec<ImportDoc>,
    pub exports: Vec<ExportDoc>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ComponentDoc {
    pub name: String,
    pub level: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MetaDoc {
    pub name: String,
    pub content: String,
}

/// Interface field or script declaration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FieldDoc {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default = "default_access")]
    pub access: String,
    #[serde(default)]
    pub default: Option<Value>,
}

fn default_access() -> String {
    Access::InitializeOnly.name().to_string()
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtoDoc {
    pub name: String,
    pub interface: Vec<FieldDoc>,
    pub body: Vec<NodeDoc>,
    pub routes: Vec<RouteDoc>,
    /// Present for EXTERNPROTO declarations.
    pub extern_urls: Option<Vec<String>>,
    /// Declared inside another prototype rather than at the top level.
    pub nested: bool,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeDoc {
    pub kind: Option<String>,
    pub def: Option<String>,
    #[serde(rename = "use")]
    pub use_label: Option<String>,
    pub fields: BTreeMap<String, Value>,
    pub declarations: Vec<FieldDoc>,
    /// Node field to interface field, inside a prototype body.
    pub is: BTreeMap<String, String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RouteDoc {
    pub from: String,
    pub from_field: String,
    pub to: String,
    pub to_field: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ImportDoc {
    pub inline: String,
    pub exported: String,
    #[serde(default, rename = "as")]
    pub local_name: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExportDoc {
    pub node: String,
    #[serde(default, rename = "as")]
    pub exported_name: Option<String>,
}

impl SceneDocument {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| Error::read(path, e))?;
        Self::from_json(&text)
    }

    /// Build the scene the document describes.
    pub fn build(&self) -> Result<Scene> {
        let mut scene = Scene::new();
        if let Some(profile) = &self.profile {
            scene.set_profile(profile);
        }
        for c in &self.components {
            scene.add_component(&c.name, c.level);
        }
        for m in &self.meta {
            scene.add_meta(&m.name, &m.content);
        }

        // Interfaces first so bodies may instantiate any prototype.
        let mut proto_ids = Vec::with_capacity(self.protos.len());
        for p in &self.protos {
            let interface = p
                .interface
                .iter()
                .map(field_decl)
                .collect::<Result<Vec<_>>>()?;
            let id = match (&p.extern_urls, p.nested) {
                (Some(urls), _) => scene.add_extern_prototype(&p.name, interface, urls.clone())?,
                (None, false) => scene.add_prototype(&p.name, interface)?,
                (None, true) => scene.add_nested_prototype(&p.name, interface)?,
            };
            proto_ids.push(id);
        }

        for (p, &id) in self.protos.iter().zip(&proto_ids) {
            if p.extern_urls.is_some() {
                continue;
            }
            let mut builder = Builder { scene: &mut scene, labels: HashMap::new(), proto: Some(id) };
            for node in &p.body {
                let n = builder.node(node)?;
                builder.scene.add_proto_body_node(id, n)?;
            }
            for r in &p.routes {
                let (from, to) = (builder.label(&r.from)?, builder.label(&r.to)?);
                builder.scene.add_proto_route(id, from, &r.from_field, to, &r.to_field)?;
            }
        }

        let mut builder = Builder { scene: &mut scene, labels: HashMap::new(), proto: None };
        for node in &self.nodes {
            let n = builder.node(node)?;
            builder.scene.add_root_child(n)?;
        }
        for r in &self.routes {
            let (from, to) = (builder.label(&r.from)?, builder.label(&r.to)?);
            builder.scene.add_route(from, &r.from_field, to, &r.to_field)?;
        }
        for e in &self.exports {
            let node = builder.label(&e.node)?;
            builder.scene.add_export(Export { node, exported_name: e.exported_name.clone() })?;
        }
        for i in &self.imports {
            scene.add_import(Import {
                inline_def: i.inline.clone(),
                exported_name: i.exported.clone(),
                local_name: i.local_name.clone(),
            });
        }
        Ok(scene)
    }
}

/// Load and build a scene document from a file.
pub fn load_scene(path: impl AsRef<Path>) -> Result<Scene> {
    SceneDocument::open(path)?.build()
}

/// Build a scene from document text.
pub fn scene_from_json(json: &str) -> Result<Scene> {
    SceneDocument::from_json(json)?.build()
}

fn field_decl(doc: &FieldDoc) -> Result<FieldDecl> {
    let field_type = FieldType::from_name(&doc.field_type)
        .ok_or_else(|| Error::document(format!("unknown field type {}", doc.field_type)))?;
    let access = Access::from_name(&doc.access)
        .ok_or_else(|| Error::document(format!("unknown access type {}", doc.access)))?;
    let mut decl = FieldDecl::new(&doc.name, field_type, access);
    if let Some(value) = &doc.default {
        if field_type.is_node() {
            return Err(Error::document(format!("{}: node defaults are not supported", doc.name)));
        }
        decl.default = Some(value_from_json(&doc.name, field_type, value)?);
    }
    Ok(decl)
}

/// Scope-aware node builder.
struct Builder<'s> {
    scene: &'s mut Scene,
    labels: HashMap<String, NodeId>,
    proto: Option<ProtoId>,
}

impl Builder<'_> {
    fn label(&self, label: &str) -> Result<NodeId> {
        self.labels
            .get(label)
            .copied()
            .ok_or_else(|| Error::document(format!("USE of undefined label {label}")))
    }

    fn node(&mut self, doc: &NodeDoc) -> Result<NodeId> {
        if let Some(label) = &doc.use_label {
            return self.label(label);
        }
        let kind = doc
            .kind
            .as_deref()
            .ok_or_else(|| Error::document("node needs either kind or use"))?;

        let id = if let Some(proto) = self.scene.prototype_by_name(kind) {
            self.scene.create_proto_instance(proto)?
        } else if self.scene.catalog().lookup(kind).is_some() {
            self.scene.create_node(kind)?
        } else {
            tracing::warn!("unknown node kind {kind}, kept as opaque");
            let id = self.scene.create_opaque_node(kind);
            self.define(doc, id)?;
            return Ok(id);
        };
        // Label before children so back-references inside the subtree resolve.
        self.define(doc, id)?;

        for decl in &doc.declarations {
            let d = field_decl(decl)?;
            self.scene.add_dynamic_field(id, &d.name, d.field_type, d.access, d.default)?;
        }

        for (name, value) in &doc.fields {
            let field_type = {
                let r = self.scene.node_ref(id)?;
                let index = r.field_index(name).ok_or_else(|| Error::UnknownField {
                    kind: kind.to_string(),
                    field: name.clone(),
                })?;
                r.field_declaration(index).map(|d| d.field_type)
            };
            let value = match field_type {
                Some(FieldType::SFNode) => match value {
                    Value::Null => FieldValue::Node(None),
                    v => FieldValue::node(self.child(v)?),
                },
                Some(FieldType::MFNode) => {
                    let items = match value {
                        Value::Array(items) => items.as_slice(),
                        v => std::slice::from_ref(v),
                    };
                    let mut ids = Vec::with_capacity(items.len());
                    for item in items {
                        ids.push(self.child(item)?);
                    }
                    FieldValue::Nodes(ids)
                }
                Some(ty) => value_from_json(name, ty, value)?,
                None => continue,
            };
            self.scene.set_field(id, name, value)?;
        }

        for (field, proto_field) in &doc.is {
            let proto = self
                .proto
                .ok_or_else(|| Error::document(format!("IS outside a prototype body on {kind}")))?;
            self.scene.connect_is(proto, id, field, proto_field)?;
        }
        Ok(id)
    }

    fn child(&mut self, value: &Value) -> Result<NodeId> {
        let doc: NodeDoc = serde_json::from_value(value.clone())?;
        self.node(&doc)
    }

    fn define(&mut self, doc: &NodeDoc, id: NodeId) -> Result<()> {
        if let Some(label) = &doc.def {
            self.labels.insert(label.clone(), id);
            match self.proto {
                Some(proto) => self.scene.set_proto_def(proto, label, id)?,
                None => self.scene.set_def(label, id)?,
            }
        }
        Ok(())
    }
}

fn flatten<'v>(value: &'v Value, out: &mut Vec<&'v Value>) {
    match value {
        Value::Array(items) => items.iter().for_each(|v| flatten(v, out)),
        v => out.push(v),
    }
}

/// Convert a JSON value to a non-node field value of `field_type`.
pub fn value_from_json(name: &str, field_type: FieldType, value: &Value) -> Result<FieldValue> {
    let mut items = Vec::new();
    flatten(value, &mut items);
    let bad = || Error::TypeMismatch { field: name.to_string(), expected: field_type.to_string() };

    let out = match field_type.storage() {
        Storage::Bool => FieldValue::Bools(
            items.iter().map(|v| v.as_bool().ok_or_else(bad)).collect::<Result<_>>()?,
        ),
        Storage::Int32 => FieldValue::Int32s(
            items
                .iter()
                .map(|v| v.as_i64().and_then(|i| i32::try_from(i).ok()).ok_or_else(bad))
                .collect::<Result<_>>()?,
        ),
        Storage::Int64 => FieldValue::Int64s(
            items.iter().map(|v| v.as_i64().ok_or_else(bad)).collect::<Result<_>>()?,
        ),
        Storage::Float => FieldValue::Floats(
            items
                .iter()
                .map(|v| v.as_f64().map(|f| f as f32).ok_or_else(bad))
                .collect::<Result<_>>()?,
        ),
        Storage::Double => FieldValue::Doubles(
            items.iter().map(|v| v.as_f64().ok_or_else(bad)).collect::<Result<_>>()?,
        ),
        Storage::String => FieldValue::Strings(
            items
                .iter()
                .map(|v| v.as_str().map(str::to_string).ok_or_else(bad))
                .collect::<Result<_>>()?,
        ),
        Storage::Node => return Err(bad()),
    };
    if !field_type.accepts(&out) {
        return Err(bad());
    }
    Ok(out)
}
