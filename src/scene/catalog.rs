//! Node kind catalog.
//!
//! A catalog is a table from node kind name to its schema: the ordered list
//! of field declarations (name, type, access category, default). Field
//! indices are positions in that list, fixed when the schema is registered.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use crate::util::{Access, FieldType, FieldValue};

use super::builtin;

/// Declaration of one field.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldDecl {
    pub name: String,
    pub field_type: FieldType,
    pub access: Access,
    /// Declared default. `None` means no default is registered.
    pub default: Option<FieldValue>,
}

impl FieldDecl {
    pub fn new(name: impl Into<String>, field_type: FieldType, access: Access) -> Self {
        Self { name: name.into(), field_type, access, default: None }
    }

    pub fn with_default(mut self, value: FieldValue) -> Self {
        self.default = Some(value);
        self
    }
}

/// Schema of one node kind.
#[derive(Clone, Debug)]
pub struct NodeSchema {
    pub name: String,
    /// Slot this kind occupies in its parent when nothing else is said.
    pub container_field: String,
    pub fields: Vec<FieldDecl>,
    /// Kinds that carry per-instance field declarations (Script).
    pub dynamic: bool,
}

impl NodeSchema {
    /// Index of a declared field.
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }
}

/// Builder used to assemble schemas at registration time.
///
/// Every schema starts with `metadata` (SFNode, inputOutput) at index 0.
pub struct SchemaBuilder {
    schema: NodeSchema,
}

impl SchemaBuilder {
    pub fn new(name: &str, container_field: &str) -> Self {
        let metadata = FieldDecl::new("metadata", FieldType::SFNode, Access::InputOutput)
            .with_default(FieldValue::Node(None));
        Self {
            schema: NodeSchema {
                name: name.to_string(),
                container_field: container_field.to_string(),
                fields: vec![metadata],
                dynamic: false,
            },
        }
    }

    /// Mark the kind as carrying per-instance declarations.
    pub fn dynamic(mut self) -> Self {
        self.schema.dynamic = true;
        self
    }

    /// `inputOutput` field with a default.
    pub fn io(self, name: &str, ty: FieldType, default: FieldValue) -> Self {
        self.push(FieldDecl::new(name, ty, Access::InputOutput).with_default(default))
    }

    /// `initializeOnly` field with a default.
    pub fn init(self, name: &str, ty: FieldType, default: FieldValue) -> Self {
        self.push(FieldDecl::new(name, ty, Access::InitializeOnly).with_default(default))
    }

    /// `inputOnly` event sink.
    pub fn input(self, name: &str, ty: FieldType) -> Self {
        self.push(FieldDecl::new(name, ty, Access::InputOnly))
    }

    /// `outputOnly` event source.
    pub fn output(self, name: &str, ty: FieldType) -> Self {
        self.push(FieldDecl::new(name, ty, Access::OutputOnly))
    }

    /// Any pre-built declaration.
    pub fn push(mut self, decl: FieldDecl) -> Self {
        self.schema.fields.push(decl);
        self
    }

    pub fn build(self) -> NodeSchema {
        self.schema
    }
}

/// Table of node schemas.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    schemas: Vec<NodeSchema>,
    by_name: HashMap<String, usize>,
}

impl Catalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// The shared built-in catalog.
    pub fn builtin() -> Arc<Catalog> {
        static BUILTIN: OnceLock<Arc<Catalog>> = OnceLock::new();
        BUILTIN
            .get_or_init(|| {
                let mut catalog = Catalog::new();
                builtin::register_all(&mut catalog);
                Arc::new(catalog)
            })
            .clone()
    }

    /// Register a schema, replacing any schema of the same name. Returns its index.
    pub fn register(&mut self, schema: NodeSchema) -> usize {
        if let Some(&index) = self.by_name.get(&schema.name) {
            self.schemas[index] = schema;
            return index;
        }
        let index = self.schemas.len();
        self.by_name.insert(schema.name.clone(), index);
        self.schemas.push(schema);
        index
    }

    /// Index of a kind.
    pub fn lookup(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    /// Schema by index.
    pub fn schema(&self, index: usize) -> Option<&NodeSchema> {
        self.schemas.get(index)
    }

    /// Schema by name.
    pub fn schema_by_name(&self, name: &str) -> Option<&NodeSchema> {
        self.lookup(name).and_then(|i| self.schema(i))
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Iterate over all schemas in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &NodeSchema> {
        self.schemas.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_adds_metadata() {
        let schema = SchemaBuilder::new("Thing", "children")
            .io("size", FieldType::SFFloat, FieldValue::float(1.0))
            .input("set_size", FieldType::SFFloat)
            .build();
        assert_eq!(schema.fields[0].name, "metadata");
        assert_eq!(schema.field_index("size"), Some(1));
        assert_eq!(schema.fields[2].default, None);
    }

    #[test]
    fn test_register_replaces() {
        let mut c = Catalog::new();
        let a = c.register(SchemaBuilder::new("A", "children").build());
        let b = c.register(SchemaBuilder::new("B", "children").build());
        let a2 = c.register(
            SchemaBuilder::new("A", "geometry")
                .io("x", FieldType::SFInt32, FieldValue::int32(0))
                .build(),
        );
        assert_eq!(a, a2);
        assert_ne!(a, b);
        assert_eq!(c.len(), 2);
        assert_eq!(c.schema_by_name("A").unwrap().container_field, "geometry");
    }

    #[test]
    fn test_builtin_catalog() {
        let c = Catalog::builtin();
        let t = c.schema_by_name("Transform").expect("Transform registered");
        assert_eq!(t.container_field, "children");
        let idx = t.field_index("scale").unwrap();
        assert_eq!(t.fields[idx].default, Some(FieldValue::vec3f(1.0, 1.0, 1.0)));
        assert!(c.schema_by_name("Script").unwrap().dynamic);
        for schema in c.iter() {
            for f in &schema.fields {
                if let Some(d) = &f.default {
                    assert!(f.field_type.accepts(d), "{}.{} default", schema.name, f.name);
                }
            }
        }
    }
}
