//! Binary infoset reader.
//!
//! Parses a stream produced by [`super::BinaryWriter`] back into a flat event
//! list. Used by round-trip tests and the `dump` command.

use std::collections::BTreeMap;

use crate::export::codec::{numeric, Algorithm};
use crate::util::{Error, FieldValue, Result};

use super::format::*;

/// Attribute value as stored in the stream.
#[derive(Clone, Debug, PartialEq)]
pub enum InfosetValue {
    Text(String),
    Encoded { algorithm: Algorithm, payload: Vec<u8> },
}

impl InfosetValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Encoded { .. } => None,
        }
    }

    /// Decode an algorithm payload; text values yield `None`.
    pub fn decode(&self) -> Result<Option<FieldValue>> {
        match self {
            Self::Text(_) => Ok(None),
            Self::Encoded { algorithm, payload } => numeric::decode(*algorithm, payload).map(Some),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum InfosetEvent {
    Start(String),
    Attribute { name: String, value: InfosetValue },
    End,
    Comment(String),
}

/// Parsed binary document.
#[derive(Clone, Debug, Default)]
pub struct InfosetDocument {
    pub format_version: u16,
    /// Application algorithms declared in the table, by id.
    pub algorithms: BTreeMap<u8, String>,
    pub events: Vec<InfosetEvent>,
}

impl InfosetDocument {
    /// Attributes of every element named `element`, in document order.
    pub fn elements(&self, element: &str) -> Vec<Vec<(&str, &InfosetValue)>> {
        let mut found = Vec::new();
        let mut current: Option<Vec<(&str, &InfosetValue)>> = None;
        for event in &self.events {
            match event {
                InfosetEvent::Start(name) => {
                    if let Some(done) = current.take() {
                        found.push(done);
                    }
                    if name == element {
                        current = Some(Vec::new());
                    }
                }
                InfosetEvent::Attribute { name, value } => {
                    if let Some(attrs) = current.as_mut() {
                        attrs.push((name.as_str(), value));
                    }
                }
                InfosetEvent::End | InfosetEvent::Comment(_) => {
                    if let Some(done) = current.take() {
                        found.push(done);
                    }
                }
            }
        }
        found
    }
}

/// Cursor over binary infoset bytes.
pub struct InfosetReader<'a> {
    data: &'a [u8],
    pos: usize,
    names: Vec<String>,
}

impl<'a> InfosetReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0, names: Vec::new() }
    }

    /// Parse a whole document.
    pub fn read_document(data: &'a [u8]) -> Result<InfosetDocument> {
        Self::new(data).read()
    }

    pub fn read(mut self) -> Result<InfosetDocument> {
        if self.take(4)? != MAGIC {
            return Err(Error::invalid("not a binary infoset stream"));
        }
        let v = self.take(2)?;
        let format_version = u16::from_be_bytes([v[0], v[1]]);

        let mut algorithms = BTreeMap::new();
        let count = self.u8()?;
        for _ in 0..count {
            let id = self.u8()?;
            let uri = self.string()?;
            algorithms.insert(id, uri);
        }

        let mut events = Vec::new();
        let mut depth = 0usize;
        loop {
            match self.u8()? {
                START_ELEMENT => {
                    depth += 1;
                    events.push(InfosetEvent::Start(self.name()?));
                }
                END_ELEMENT => {
                    depth = depth
                        .checked_sub(1)
                        .ok_or_else(|| Error::invalid("unbalanced end of element"))?;
                    events.push(InfosetEvent::End);
                }
                ATTRIBUTE => {
                    let name = self.name()?;
                    let value = self.value()?;
                    events.push(InfosetEvent::Attribute { name, value });
                }
                COMMENT => events.push(InfosetEvent::Comment(self.string()?)),
                END_DOCUMENT => break,
                other => return Err(Error::invalid(format!("unknown token 0x{other:02X} at {}", self.pos - 1))),
            }
        }
        if depth != 0 {
            return Err(Error::invalid(format!("{depth} elements left open")));
        }
        if self.pos != self.data.len() {
            return Err(Error::invalid("trailing bytes after end of document"));
        }
        Ok(InfosetDocument { format_version, algorithms, events })
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| Error::invalid(format!("truncated stream at {}", self.pos)))?;
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn varint(&mut self) -> Result<u64> {
        let mut value = 0u64;
        for shift in (0..64).step_by(7) {
            let byte = self.u8()?;
            value |= u64::from(byte & 0x7F) << shift;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(Error::invalid("varint too long"))
    }

    fn len(&mut self) -> Result<usize> {
        usize::try_from(self.varint()?).map_err(|_| Error::invalid("length overflow"))
    }

    fn string(&mut self) -> Result<String> {
        let n = self.len()?;
        Ok(String::from_utf8(self.take(n)?.to_vec())?)
    }

    fn name(&mut self) -> Result<String> {
        match self.u8()? {
            NAME_LITERAL => {
                let name = self.string()?;
                self.names.push(name.clone());
                Ok(name)
            }
            NAME_INDEXED => {
                let index = self.len()?;
                self.names
                    .get(index)
                    .cloned()
                    .ok_or_else(|| Error::invalid(format!("name index {index} out of range")))
            }
            other => Err(Error::invalid(format!("bad name marker {other}"))),
        }
    }

    fn value(&mut self) -> Result<InfosetValue> {
        match self.u8()? {
            VALUE_LITERAL => Ok(InfosetValue::Text(self.string()?)),
            VALUE_ENCODED => {
                let id = self.u8()?;
                let algorithm =
                    Algorithm::from_id(id).ok_or_else(|| Error::invalid(format!("unknown algorithm id {id}")))?;
                let n = self.len()?;
                Ok(InfosetValue::Encoded { algorithm, payload: self.take(n)?.to_vec() })
            }
            other => Err(Error::invalid(format!("bad value marker {other}"))),
        }
    }
}
