//! Output sinks.
//!
//! A sink receives the already-decided event stream of one export pass and
//! only turns it into bytes. Every structural decision (DEF/USE, default
//! elision, field order, containerField annotation, value encoding) is made
//! upstream, so the three encodings stay consistent by construction.
//!
//! - [`XmlSink`] - XML markup
//! - [`BinarySink`] - binary infoset stream (see [`binary`])
//! - [`ClassicSink`] - brace-delimited classic text

pub mod binary;
mod classic;
mod infoset;
mod xml;

pub use binary::{BinarySink, BinaryWriter, InfosetDocument, InfosetEvent, InfosetReader, InfosetValue};
pub use classic::ClassicSink;
pub use infoset::{AttrValue, ElementWriter, InfosetSink};
pub use xml::{XmlSink, XmlWriter};
pub(crate) use xml::is_xml_char;

use crate::core::{Encoding, SpecVersion};
use crate::scene::{Component, Import};
use crate::util::{Access, FieldType, Result};

use super::codec::EncodedForm;

/// Head information written at the start of a document.
#[derive(Clone, Copy, Debug)]
pub struct DocumentHeader<'a> {
    pub version: SpecVersion,
    pub profile: &'a str,
    pub components: &'a [Component],
    pub meta: &'a [(String, String)],
}

/// A node about to be expanded.
#[derive(Clone, Copy, Debug)]
pub struct NodeStart<'a> {
    pub kind: &'a str,
    /// Instance of a prototype rather than a built-in kind.
    pub proto_instance: bool,
    pub def: Option<&'a str>,
    /// Explicit slot name, present only when it differs from the kind's default.
    pub container_field: Option<&'a str>,
}

/// A USE reference to an already expanded node.
#[derive(Clone, Copy, Debug)]
pub struct UseRef<'a> {
    pub kind: &'a str,
    pub proto_instance: bool,
    pub label: &'a str,
    pub container_field: Option<&'a str>,
}

/// How a field is being written.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldRole {
    /// Value of a built-in or dynamic field on a node.
    Attribute,
    /// Interface or script field declaration (name, type, access, value).
    Declaration,
    /// Field value on a prototype instance.
    InstanceValue,
}

#[derive(Clone, Copy, Debug)]
pub struct FieldHeader<'a> {
    pub name: &'a str,
    pub field_type: FieldType,
    pub access: Access,
    pub role: FieldRole,
}

/// One `nodeField IS protoField` connection.
#[derive(Clone, Copy, Debug)]
pub struct IsLink<'a> {
    pub node_field: &'a str,
    pub proto_field: &'a str,
}

/// A route with resolved labels and field names.
#[derive(Clone, Copy, Debug)]
pub struct RouteSpec<'a> {
    pub from_node: &'a str,
    pub from_field: &'a str,
    pub to_node: &'a str,
    pub to_field: &'a str,
}

/// Terminal emission primitives shared by every encoding.
pub trait OutputSink {
    /// The encoding this sink produces.
    fn encoding(&self) -> Encoding;

    /// Does this sink accept binary value payloads?
    fn binary_values(&self) -> bool {
        self.encoding() == Encoding::Binary
    }

    fn start_document(&mut self, header: &DocumentHeader<'_>) -> Result<()>;
    fn end_document(&mut self) -> Result<()>;

    fn start_node(&mut self, node: &NodeStart<'_>) -> Result<()>;
    fn end_node(&mut self) -> Result<()>;
    fn emit_use(&mut self, reference: &UseRef<'_>) -> Result<()>;

    /// A value field, or a declaration. Declarations of `inputOnly` /
    /// `outputOnly` fields (and node-typed declarations) have no value.
    fn emit_field(&mut self, field: &FieldHeader<'_>, value: Option<&EncodedForm>) -> Result<()>;

    /// Open a node-valued field holding `count` children.
    fn start_node_field(&mut self, field: &FieldHeader<'_>, count: usize) -> Result<()>;
    fn end_node_field(&mut self) -> Result<()>;

    fn emit_is(&mut self, links: &[IsLink<'_>]) -> Result<()>;
    fn emit_route(&mut self, route: &RouteSpec<'_>) -> Result<()>;
    fn emit_import(&mut self, import: &Import) -> Result<()>;
    fn emit_export(&mut self, label: &str, exported_name: Option<&str>) -> Result<()>;

    fn start_proto_declare(&mut self, name: &str) -> Result<()>;
    fn start_proto_interface(&mut self) -> Result<()>;
    fn end_proto_interface(&mut self) -> Result<()>;
    fn start_proto_body(&mut self) -> Result<()>;
    fn end_proto_body(&mut self) -> Result<()>;
    fn end_proto_declare(&mut self) -> Result<()>;

    fn start_extern_proto(&mut self, name: &str, urls: &[String]) -> Result<()>;
    fn end_extern_proto(&mut self) -> Result<()>;
}
