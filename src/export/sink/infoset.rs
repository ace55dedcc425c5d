//! Element/attribute mapping shared by the XML and binary encodings.
//!
//! Both encodings carry the same infoset: nodes are elements, fields are
//! attributes, declarations and instance values are `field` / `fieldValue`
//! child elements. [`InfosetSink`] performs that mapping once and drives an
//! [`ElementWriter`] that knows only how to write elements.

use crate::core::{Encoding, SpecVersion};
use crate::export::codec::{quote, Algorithm, EncodedForm};
use crate::scene::Import;
use crate::util::Result;

use super::{DocumentHeader, FieldHeader, FieldRole, IsLink, NodeStart, OutputSink, RouteSpec, UseRef};

/// Attribute value handed to an element writer.
#[derive(Clone, Copy, Debug)]
pub enum AttrValue<'a> {
    Literal(&'a str),
    Encoded { algorithm: Algorithm, payload: &'a [u8] },
}

/// Low-level element stream.
pub trait ElementWriter {
    fn encoding(&self) -> Encoding;
    /// Bytes ahead of the root element.
    fn preamble(&mut self, version: SpecVersion) -> Result<()>;
    fn start_element(&mut self, name: &str) -> Result<()>;
    /// Attributes belong to the most recently started element and must come
    /// before its first child.
    fn attribute(&mut self, name: &str, value: AttrValue<'_>) -> Result<()>;
    fn end_element(&mut self) -> Result<()>;
    fn comment(&mut self, text: &str) -> Result<()>;
    fn finish(&mut self) -> Result<()>;
}

/// [`OutputSink`] over any [`ElementWriter`].
pub struct InfosetSink<E> {
    writer: E,
    annotate_containers: bool,
    /// One entry per open node field: does it have a wrapper element?
    field_wrappers: Vec<bool>,
    /// Inside `ExternProtoDeclare`, whose fields sit directly in the element.
    in_extern: bool,
}

impl<E: ElementWriter> InfosetSink<E> {
    pub fn new(writer: E) -> Self {
        // Binary element order already fixes the slot; XML needs the hint.
        let annotate_containers = writer.encoding() == Encoding::Xml;
        Self { writer, annotate_containers, field_wrappers: Vec::new(), in_extern: false }
    }

    pub fn writer(&self) -> &E {
        &self.writer
    }

    pub fn into_writer(self) -> E {
        self.writer
    }

    fn text(&mut self, name: &str, value: &str) -> Result<()> {
        self.writer.attribute(name, AttrValue::Literal(value))
    }

    fn value(&mut self, name: &str, form: &EncodedForm) -> Result<()> {
        match form {
            EncodedForm::Text(text) => {
                let rendered = text.render_infoset();
                self.writer.attribute(name, AttrValue::Literal(&rendered))
            }
            EncodedForm::Binary { algorithm, payload } => self
                .writer
                .attribute(name, AttrValue::Encoded { algorithm: *algorithm, payload }),
        }
    }

    fn declaration(&mut self, field: &FieldHeader<'_>) -> Result<()> {
        self.writer.start_element("field")?;
        self.text("name", field.name)?;
        self.text("type", field.field_type.name())?;
        self.text("accessType", field.access.name())
    }

    fn instance_value(&mut self, field: &FieldHeader<'_>) -> Result<()> {
        self.writer.start_element("fieldValue")?;
        self.text("name", field.name)
    }

    fn container(&mut self, container_field: Option<&str>) -> Result<()> {
        match container_field {
            Some(slot) if self.annotate_containers => self.text("containerField", slot),
            _ => Ok(()),
        }
    }
}

impl<E: ElementWriter> OutputSink for InfosetSink<E> {
    fn encoding(&self) -> Encoding {
        self.writer.encoding()
    }

    fn start_document(&mut self, header: &DocumentHeader<'_>) -> Result<()> {
        let version = header.version.to_string();
        self.writer.preamble(header.version)?;
        self.writer.start_element("X3D")?;
        self.text("profile", header.profile)?;
        self.text("version", &version)?;
        self.text("xmlns:xsd", "http://www.w3.org/2001/XMLSchema-instance")?;
        self.text(
            "xsd:noNamespaceSchemaLocation",
            &format!("http://www.web3d.org/specifications/x3d-{version}.xsd"),
        )?;

        if !header.components.is_empty() || !header.meta.is_empty() {
            self.writer.start_element("head")?;
            for c in header.components {
                self.writer.start_element("component")?;
                self.text("name", &c.name)?;
                self.text("level", &c.level.to_string())?;
                self.writer.end_element()?;
            }
            for (name, content) in header.meta {
                self.writer.start_element("meta")?;
                self.text("name", name)?;
                self.text("content", content)?;
                self.writer.end_element()?;
            }
            self.writer.end_element()?;
        }
        self.writer.start_element("Scene")
    }

    fn end_document(&mut self) -> Result<()> {
        self.writer.end_element()?; // Scene
        self.writer.end_element()?; // X3D
        self.writer.finish()
    }

    fn start_node(&mut self, node: &NodeStart<'_>) -> Result<()> {
        if node.proto_instance {
            self.writer.start_element("ProtoInstance")?;
            if let Some(def) = node.def {
                self.text("DEF", def)?;
            }
            self.text("name", node.kind)?;
        } else {
            self.writer.start_element(node.kind)?;
            if let Some(def) = node.def {
                self.text("DEF", def)?;
            }
        }
        self.container(node.container_field)
    }

    fn end_node(&mut self) -> Result<()> {
        self.writer.end_element()
    }

    fn emit_use(&mut self, reference: &UseRef<'_>) -> Result<()> {
        let element = if reference.proto_instance { "ProtoInstance" } else { reference.kind };
        self.writer.start_element(element)?;
        self.text("USE", reference.label)?;
        self.container(reference.container_field)?;
        self.writer.end_element()
    }

    fn emit_field(&mut self, field: &FieldHeader<'_>, value: Option<&EncodedForm>) -> Result<()> {
        match field.role {
            FieldRole::Attribute => match value {
                Some(form) => self.value(field.name, form),
                None => Ok(()),
            },
            FieldRole::InstanceValue => {
                self.instance_value(field)?;
                if let Some(form) = value {
                    self.value("value", form)?;
                }
                self.writer.end_element()
            }
            FieldRole::Declaration => {
                self.declaration(field)?;
                if let Some(form) = value {
                    self.value("value", form)?;
                }
                self.writer.end_element()
            }
        }
    }

    fn start_node_field(&mut self, field: &FieldHeader<'_>, _count: usize) -> Result<()> {
        let wrapped = match field.role {
            FieldRole::Attribute => false,
            FieldRole::InstanceValue => {
                self.instance_value(field)?;
                true
            }
            FieldRole::Declaration => {
                self.declaration(field)?;
                true
            }
        };
        self.field_wrappers.push(wrapped);
        Ok(())
    }

    fn end_node_field(&mut self) -> Result<()> {
        match self.field_wrappers.pop() {
            Some(true) => self.writer.end_element(),
            _ => Ok(()),
        }
    }

    fn emit_is(&mut self, links: &[IsLink<'_>]) -> Result<()> {
        self.writer.start_element("IS")?;
        for link in links {
            self.writer.start_element("connect")?;
            self.text("nodeField", link.node_field)?;
            self.text("protoField", link.proto_field)?;
            self.writer.end_element()?;
        }
        self.writer.end_element()
    }

    fn emit_route(&mut self, route: &RouteSpec<'_>) -> Result<()> {
        self.writer.start_element("ROUTE")?;
        self.text("fromNode", route.from_node)?;
        self.text("fromField", route.from_field)?;
        self.text("toNode", route.to_node)?;
        self.text("toField", route.to_field)?;
        self.writer.end_element()
    }

    fn emit_import(&mut self, import: &Import) -> Result<()> {
        self.writer.start_element("IMPORT")?;
        self.text("inlineDEF", &import.inline_def)?;
        self.text("importedDEF", &import.exported_name)?;
        if let Some(local) = &import.local_name {
            self.text("AS", local)?;
        }
        self.writer.end_element()
    }

    fn emit_export(&mut self, label: &str, exported_name: Option<&str>) -> Result<()> {
        self.writer.start_element("EXPORT")?;
        self.text("localDEF", label)?;
        if let Some(name) = exported_name {
            self.text("AS", name)?;
        }
        self.writer.end_element()
    }

    fn start_proto_declare(&mut self, name: &str) -> Result<()> {
        self.writer.start_element("ProtoDeclare")?;
        self.text("name", name)
    }

    fn start_proto_interface(&mut self) -> Result<()> {
        if self.in_extern {
            return Ok(());
        }
        self.writer.start_element("ProtoInterface")
    }

    fn end_proto_interface(&mut self) -> Result<()> {
        if self.in_extern {
            return Ok(());
        }
        self.writer.end_element()
    }

    fn start_proto_body(&mut self) -> Result<()> {
        self.writer.start_element("ProtoBody")
    }

    fn end_proto_body(&mut self) -> Result<()> {
        self.writer.end_element()
    }

    fn end_proto_declare(&mut self) -> Result<()> {
        self.writer.end_element()
    }

    fn start_extern_proto(&mut self, name: &str, urls: &[String]) -> Result<()> {
        self.in_extern = true;
        self.writer.start_element("ExternProtoDeclare")?;
        self.text("name", name)?;
        let url = urls.iter().map(|u| quote(u)).collect::<Vec<_>>().join(" ");
        self.text("url", &url)
    }

    fn end_extern_proto(&mut self) -> Result<()> {
        self.in_extern = false;
        self.writer.end_element()
    }
}
