//! XML element writer.

use std::io::Write;

use crate::core::{Encoding, ExportOptions, SpecVersion};
use crate::util::{Error, Result};

use super::infoset::{AttrValue, ElementWriter, InfosetSink};

/// XML output sink.
pub type XmlSink<W> = InfosetSink<XmlWriter<W>>;

impl<W: Write> InfosetSink<XmlWriter<W>> {
    /// XML sink configured from export options.
    pub fn xml(out: W, options: &ExportOptions) -> Self {
        InfosetSink::new(XmlWriter::new(out, options))
    }
}

/// Writes markup with single-quoted attributes.
pub struct XmlWriter<W: Write> {
    out: W,
    strip_whitespace: bool,
    print_doctype: bool,
    print_xml_declaration: bool,
    stack: Vec<String>,
    /// The innermost start tag is still waiting for its `>`.
    tag_open: bool,
    written: bool,
}

impl<W: Write> XmlWriter<W> {
    pub fn new(out: W, options: &ExportOptions) -> Self {
        Self {
            out,
            strip_whitespace: options.strip_whitespace,
            print_doctype: options.print_doctype,
            print_xml_declaration: options.print_xml_declaration,
            stack: Vec::new(),
            tag_open: false,
            written: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write(&mut self, s: &str) -> Result<()> {
        self.out.write_all(s.as_bytes())?;
        self.written = true;
        Ok(())
    }

    fn break_line(&mut self) -> Result<()> {
        if self.strip_whitespace || !self.written {
            return Ok(());
        }
        let indent = "  ".repeat(self.stack.len());
        self.write("\n")?;
        self.write(&indent)
    }

    fn close_tag(&mut self) -> Result<()> {
        if self.tag_open {
            self.tag_open = false;
            self.write(">")?;
        }
        Ok(())
    }
}

/// True for characters an XML 1.0 document may contain.
pub(crate) fn is_xml_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r' | '\u{20}'..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}' | '\u{10000}'..='\u{10FFFF}')
}

/// Escape text for a single-quoted attribute.
///
/// Whitespace other than space goes out as character references so parsers
/// do not normalize it. Characters XML cannot carry become U+FFFD.
pub(crate) fn escape_attr(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\'' => out.push_str("&apos;"),
            '\n' => out.push_str("&#10;"),
            '\t' => out.push_str("&#9;"),
            '\r' => out.push_str("&#13;"),
            c if !is_xml_char(c) => out.push(char::REPLACEMENT_CHARACTER),
            c => out.push(c),
        }
    }
    out
}

impl<W: Write> ElementWriter for XmlWriter<W> {
    fn encoding(&self) -> Encoding {
        Encoding::Xml
    }

    fn preamble(&mut self, version: SpecVersion) -> Result<()> {
        if self.print_xml_declaration {
            self.write("<?xml version=\"1.0\" encoding=\"UTF-8\"?>")?;
        }
        if self.print_doctype {
            self.break_line()?;
            self.write(&format!(
                "<!DOCTYPE X3D PUBLIC \"ISO//Web3D//DTD X3D {version}//EN\" \
                 \"http://www.web3d.org/specifications/x3d-{version}.dtd\">"
            ))?;
        }
        Ok(())
    }

    fn start_element(&mut self, name: &str) -> Result<()> {
        self.close_tag()?;
        self.break_line()?;
        self.write("<")?;
        self.write(name)?;
        self.stack.push(name.to_string());
        self.tag_open = true;
        Ok(())
    }

    fn attribute(&mut self, name: &str, value: AttrValue<'_>) -> Result<()> {
        if !self.tag_open {
            return Err(Error::invalid(format!("attribute {name} outside a start tag")));
        }
        let text = match value {
            AttrValue::Literal(text) => text,
            AttrValue::Encoded { algorithm, .. } => {
                return Err(Error::invalid(format!("{algorithm} payload in XML output")))
            }
        };
        let escaped = escape_attr(text);
        self.write(" ")?;
        self.write(name)?;
        self.write("='")?;
        self.write(&escaped)?;
        self.write("'")
    }

    fn end_element(&mut self) -> Result<()> {
        let name = self
            .stack
            .pop()
            .ok_or_else(|| Error::invalid("end of element with none open"))?;
        if self.tag_open {
            self.tag_open = false;
            return self.write("/>");
        }
        self.break_line()?;
        self.write("</")?;
        self.write(&name)?;
        self.write(">")
    }

    fn comment(&mut self, text: &str) -> Result<()> {
        self.close_tag()?;
        self.break_line()?;
        let text: String = text
            .replace("--", "- -")
            .chars()
            .map(|c| if is_xml_char(c) { c } else { char::REPLACEMENT_CHARACTER })
            .collect();
        self.write(&format!("<!-- {text} -->"))
    }

    fn finish(&mut self) -> Result<()> {
        if !self.stack.is_empty() {
            return Err(Error::invalid(format!("{} elements left open", self.stack.len())));
        }
        if !self.strip_whitespace {
            self.write("\n")?;
        }
        self.out.flush()?;
        Ok(())
    }
}
