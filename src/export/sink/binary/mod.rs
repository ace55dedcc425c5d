//! Binary infoset encoding.
//!
//! [`BinaryWriter`] emits the token stream described in [`format`];
//! [`InfosetReader`] parses it back.

pub mod format;
mod reader;
mod writer;

pub use reader::{InfosetDocument, InfosetEvent, InfosetReader, InfosetValue};
pub use writer::{BinarySink, BinaryWriter};
