//! Core layer - configuration, compression helpers and diagnostics.
//!
//! This module provides:
//! - [`ExportOptions`] - the configuration surface read by the engine
//! - [`CompressionMethod`], [`Encoding`], [`SpecVersion`]
//! - [`deflate`] / [`inflate`] - zlib framing for compressed payloads
//! - [`Diagnostics`] - recovered per-field problems

mod compression;
mod diagnostics;
mod options;

pub use compression::{deflate, inflate, is_zlib};
pub use diagnostics::{Diagnostic, Diagnostics};
pub use options::{CompressionMethod, Encoding, ExportOptions, SpecVersion};
