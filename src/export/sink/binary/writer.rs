//! Binary infoset writer.

use std::collections::HashMap;
use std::io::Write;

use byteorder::{BigEndian, WriteBytesExt};

use crate::core::{Encoding, SpecVersion};
use crate::export::codec::Algorithm;
use crate::util::{Error, Result};

use super::super::infoset::{AttrValue, ElementWriter, InfosetSink};
use super::format::*;

/// Binary infoset output sink.
pub type BinarySink<W> = InfosetSink<BinaryWriter<W>>;

impl<W: Write> InfosetSink<BinaryWriter<W>> {
    pub fn binary(out: W) -> Self {
        InfosetSink::new(BinaryWriter::new(out))
    }
}

/// Token writer for the binary infoset stream.
pub struct BinaryWriter<W: Write> {
    out: W,
    names: HashMap<String, u64>,
    depth: usize,
    /// Attributes may still be added to the innermost element.
    attributes_open: bool,
    buf: Vec<u8>,
    pos: u64,
}

impl<W: Write> BinaryWriter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            names: HashMap::new(),
            depth: 0,
            attributes_open: false,
            buf: Vec::with_capacity(256),
            pos: 0,
        }
    }

    /// Bytes written so far.
    #[inline]
    pub fn pos(&self) -> u64 {
        self.pos
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Write the staged token.
    fn flush_token(&mut self) -> Result<()> {
        self.out.write_all(&self.buf)?;
        self.pos += self.buf.len() as u64;
        self.buf.clear();
        Ok(())
    }

    fn put_string(&mut self, s: &str) {
        put_varint(&mut self.buf, s.len() as u64);
        self.buf.extend_from_slice(s.as_bytes());
    }

    fn put_name(&mut self, name: &str) {
        match self.names.get(name) {
            Some(&index) => {
                self.buf.push(NAME_INDEXED);
                put_varint(&mut self.buf, index);
            }
            None => {
                let index = self.names.len() as u64;
                self.names.insert(name.to_string(), index);
                self.buf.push(NAME_LITERAL);
                self.put_string(name);
            }
        }
    }
}

impl<W: Write> ElementWriter for BinaryWriter<W> {
    fn encoding(&self) -> Encoding {
        Encoding::Binary
    }

    fn preamble(&mut self, _version: SpecVersion) -> Result<()> {
        self.out.write_all(&MAGIC)?;
        self.out.write_u16::<BigEndian>(FORMAT_VERSION)?;
        self.pos += 6;

        let table: Vec<Algorithm> = Algorithm::ALL.iter().copied().filter(|a| a.uri().is_some()).collect();
        self.buf.push(table.len() as u8);
        for algorithm in table {
            self.buf.push(algorithm.id());
            if let Some(uri) = algorithm.uri() {
                self.put_string(uri);
            }
        }
        self.flush_token()
    }

    fn start_element(&mut self, name: &str) -> Result<()> {
        self.buf.push(START_ELEMENT);
        self.put_name(name);
        self.depth += 1;
        self.attributes_open = true;
        self.flush_token()
    }

    fn attribute(&mut self, name: &str, value: AttrValue<'_>) -> Result<()> {
        if !self.attributes_open {
            return Err(Error::invalid(format!("attribute {name} after element content")));
        }
        self.buf.push(ATTRIBUTE);
        self.put_name(name);
        match value {
            AttrValue::Literal(text) => {
                self.buf.push(VALUE_LITERAL);
                self.put_string(text);
            }
            AttrValue::Encoded { algorithm, payload } => {
                self.buf.push(VALUE_ENCODED);
                self.buf.push(algorithm.id());
                put_varint(&mut self.buf, payload.len() as u64);
                self.buf.extend_from_slice(payload);
            }
        }
        self.flush_token()
    }

    fn end_element(&mut self) -> Result<()> {
        self.depth = self
            .depth
            .checked_sub(1)
            .ok_or_else(|| Error::invalid("end of element with none open"))?;
        self.attributes_open = false;
        self.buf.push(END_ELEMENT);
        self.flush_token()
    }

    fn comment(&mut self, text: &str) -> Result<()> {
        self.attributes_open = false;
        self.buf.push(COMMENT);
        self.put_string(text);
        self.flush_token()
    }

    fn finish(&mut self) -> Result<()> {
        if self.depth != 0 {
            return Err(Error::invalid(format!("{} elements left open", self.depth)));
        }
        self.out.write_u8(END_DOCUMENT)?;
        self.pos += 1;
        self.out.flush()?;
        Ok(())
    }
}
