//! Classic (brace-delimited) text sink.
//!
//! Output is always indented two spaces per level. Node fields are written
//! in place: an `SFNode` child follows its field name on the same line, an
//! `MFNode` field opens a bracketed block. Declarations use the X3D access
//! keywords, or the VRML97 ones (`field`, `exposedField`, ...) for 2.0
//! documents.

use std::io::Write;

use crate::core::{Encoding, SpecVersion};
use crate::export::codec::{quote, EncodedForm};
use crate::scene::Import;
use crate::util::{Error, Result};

use super::{DocumentHeader, FieldHeader, FieldRole, IsLink, NodeStart, OutputSink, RouteSpec, UseRef};

/// Classic-encoding output sink.
pub struct ClassicSink<W: Write> {
    out: W,
    version: SpecVersion,
    indent: usize,
    /// The next node continues the current line (after an SFNode field name).
    inline_next: bool,
    /// Nothing has been written inside the block opened last.
    block_empty: bool,
    /// Closing bracket per open node field, `None` when nothing was opened.
    field_closers: Vec<Option<&'static str>>,
    /// IS links per open node, held until the declaration they belong to.
    pending_is: Vec<Vec<(String, String)>>,
    extern_urls: Vec<String>,
}

impl<W: Write> ClassicSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            version: SpecVersion::default(),
            indent: 0,
            inline_next: false,
            block_empty: false,
            field_closers: Vec::new(),
            pending_is: Vec::new(),
            extern_urls: Vec::new(),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write(&mut self, s: &str) -> Result<()> {
        self.out.write_all(s.as_bytes())?;
        Ok(())
    }

    /// Start a new statement on its own line.
    fn line(&mut self) -> Result<()> {
        self.block_empty = false;
        if self.inline_next {
            self.inline_next = false;
            return Ok(());
        }
        let indent = "  ".repeat(self.indent);
        self.write("\n")?;
        self.write(&indent)
    }

    fn open(&mut self, token: &str) -> Result<()> {
        self.write(token)?;
        self.indent += 1;
        self.block_empty = true;
        Ok(())
    }

    fn close(&mut self, token: &str) -> Result<()> {
        self.indent = self
            .indent
            .checked_sub(1)
            .ok_or_else(|| Error::invalid(format!("unbalanced {token}")))?;
        if self.block_empty {
            self.block_empty = false;
            self.write(" ")?;
        } else {
            self.line()?;
        }
        self.write(token)
    }

    fn access_keyword(&self, field: &FieldHeader<'_>) -> &'static str {
        if self.version.is_vrml97() {
            field.access.vrml97_name()
        } else {
            field.access.name()
        }
    }

    fn value_text(form: &EncodedForm) -> Result<String> {
        match form {
            EncodedForm::Text(text) => Ok(text.render_classic()),
            EncodedForm::Binary { algorithm, .. } => {
                Err(Error::invalid(format!("{algorithm} payload in classic output")))
            }
        }
    }

    /// Take the IS target of `field` if one is waiting in the current node.
    fn take_is(&mut self, field: &str) -> Option<String> {
        let pending = self.pending_is.last_mut()?;
        let pos = pending.iter().position(|(node_field, _)| node_field == field)?;
        Some(pending.remove(pos).1)
    }

    /// Write IS links that did not attach to a declaration.
    fn flush_is(&mut self) -> Result<()> {
        let links = match self.pending_is.last_mut() {
            Some(pending) => std::mem::take(pending),
            None => return Ok(()),
        };
        for (node_field, proto_field) in links {
            self.line()?;
            self.write(&format!("{node_field} IS {proto_field}"))?;
        }
        Ok(())
    }
}

/// Single-line comment text: line breaks would end the comment early.
fn comment_text(s: &str) -> String {
    s.replace(['\r', '\n'], " ")
}

impl<W: Write> OutputSink for ClassicSink<W> {
    fn encoding(&self) -> Encoding {
        Encoding::Classic
    }

    fn start_document(&mut self, header: &DocumentHeader<'_>) -> Result<()> {
        self.version = header.version;
        if header.version.is_vrml97() {
            self.write("#VRML V2.0 utf8\n")?;
            for (name, content) in header.meta {
                self.write(&format!("\n# {}: {}", comment_text(name), comment_text(content)))?;
            }
        } else {
            self.write(&format!("#X3D V{} utf8\n", header.version))?;
            self.write(&format!("\nPROFILE {}", header.profile))?;
            for c in header.components {
                self.write(&format!("\nCOMPONENT {}:{}", c.name, c.level))?;
            }
            for (name, content) in header.meta {
                self.write(&format!("\nMETA {} {}", quote(name), quote(content)))?;
            }
        }
        self.write("\n")
    }

    fn end_document(&mut self) -> Result<()> {
        if self.indent != 0 {
            return Err(Error::invalid(format!("{} blocks left open", self.indent)));
        }
        self.write("\n")?;
        self.out.flush()?;
        Ok(())
    }

    fn start_node(&mut self, node: &NodeStart<'_>) -> Result<()> {
        self.line()?;
        if let Some(def) = node.def {
            self.write(&format!("DEF {def} "))?;
        }
        self.write(node.kind)?;
        self.write(" ")?;
        self.pending_is.push(Vec::new());
        self.open("{")
    }

    fn end_node(&mut self) -> Result<()> {
        self.flush_is()?;
        self.pending_is.pop();
        self.close("}")
    }

    fn emit_use(&mut self, reference: &UseRef<'_>) -> Result<()> {
        self.line()?;
        self.write(&format!("USE {}", reference.label))
    }

    fn emit_field(&mut self, field: &FieldHeader<'_>, value: Option<&EncodedForm>) -> Result<()> {
        match field.role {
            FieldRole::Attribute | FieldRole::InstanceValue => {
                let Some(form) = value else {
                    return Ok(());
                };
                let text = Self::value_text(form)?;
                self.line()?;
                self.write(&format!("{} {}", field.name, text))
            }
            FieldRole::Declaration => {
                let mut text = format!("{} {} {}", self.access_keyword(field), field.field_type, field.name);
                if let Some(proto_field) = self.take_is(field.name) {
                    text.push_str(" IS ");
                    text.push_str(&proto_field);
                } else if let Some(form) = value {
                    text.push(' ');
                    text.push_str(&Self::value_text(form)?);
                }
                self.line()?;
                self.write(&text)
            }
        }
    }

    fn start_node_field(&mut self, field: &FieldHeader<'_>, count: usize) -> Result<()> {
        self.flush_is()?;
        self.line()?;
        if field.role == FieldRole::Declaration {
            let keyword = self.access_keyword(field);
            self.write(&format!("{keyword} {} ", field.field_type))?;
        }
        self.write(field.name)?;

        let closer = match (field.field_type.is_multi(), count) {
            (true, 0) => {
                self.write(" [ ]")?;
                None
            }
            (true, _) => {
                self.write(" ")?;
                self.open("[")?;
                Some("]")
            }
            (false, 0) => {
                self.write(" NULL")?;
                None
            }
            (false, _) => {
                self.write(" ")?;
                self.inline_next = true;
                None
            }
        };
        self.field_closers.push(closer);
        Ok(())
    }

    fn end_node_field(&mut self) -> Result<()> {
        self.inline_next = false;
        match self.field_closers.pop() {
            Some(Some(closer)) => self.close(closer),
            Some(None) => Ok(()),
            None => Err(Error::invalid("end of node field with none open")),
        }
    }

    fn emit_is(&mut self, links: &[IsLink<'_>]) -> Result<()> {
        match self.pending_is.last_mut() {
            Some(pending) => {
                pending.extend(links.iter().map(|l| (l.node_field.to_string(), l.proto_field.to_string())));
                Ok(())
            }
            None => Err(Error::invalid("IS outside a node")),
        }
    }

    fn emit_route(&mut self, route: &RouteSpec<'_>) -> Result<()> {
        self.line()?;
        self.write(&format!(
            "ROUTE {}.{} TO {}.{}",
            route.from_node, route.from_field, route.to_node, route.to_field
        ))
    }

    fn emit_import(&mut self, import: &Import) -> Result<()> {
        self.line()?;
        self.write(&format!("IMPORT {}.{}", import.inline_def, import.exported_name))?;
        if let Some(local) = &import.local_name {
            self.write(&format!(" AS {local}"))?;
        }
        Ok(())
    }

    fn emit_export(&mut self, label: &str, exported_name: Option<&str>) -> Result<()> {
        self.line()?;
        self.write(&format!("EXPORT {label}"))?;
        if let Some(name) = exported_name {
            self.write(&format!(" AS {name}"))?;
        }
        Ok(())
    }

    fn start_proto_declare(&mut self, name: &str) -> Result<()> {
        self.line()?;
        self.write(&format!("PROTO {name}"))
    }

    fn start_proto_interface(&mut self) -> Result<()> {
        self.write(" ")?;
        self.open("[")
    }

    fn end_proto_interface(&mut self) -> Result<()> {
        self.close("]")
    }

    fn start_proto_body(&mut self) -> Result<()> {
        self.line()?;
        self.open("{")
    }

    fn end_proto_body(&mut self) -> Result<()> {
        self.close("}")
    }

    fn end_proto_declare(&mut self) -> Result<()> {
        Ok(())
    }

    fn start_extern_proto(&mut self, name: &str, urls: &[String]) -> Result<()> {
        self.extern_urls = urls.to_vec();
        self.line()?;
        self.write(&format!("EXTERNPROTO {name}"))
    }

    fn end_extern_proto(&mut self) -> Result<()> {
        let urls = std::mem::take(&mut self.extern_urls);
        let urls: Vec<String> = urls.iter().map(|u| quote(u)).collect();
        if urls.is_empty() {
            self.write(" [ ]")
        } else {
            self.write(&format!(" [ {} ]", urls.join(", ")))
        }
    }
}
