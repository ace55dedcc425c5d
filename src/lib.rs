//! # x3d-export
//!
//! Export engine for declarative 3D scene graphs. A retained [`scene::Scene`]
//! is written as one of three encodings:
//!
//! - XML markup (`.x3d`)
//! - binary infoset (`.x3db`), with per-field numeric compression
//! - classic brace-delimited text (`.x3dv`, or `.wrl` for VRML 2.0)
//!
//! Shared nodes are written once and referenced by DEF/USE, prototypes are
//! declared ahead of their users, and fields equal to their default are left
//! out.
//!
//! ## Modules
//!
//! - [`util`] - Field types, values, ids, errors
//! - [`core`] - Options, compression helpers, diagnostics
//! - [`scene`] - Node catalog, scene graph, JSON scene documents
//! - [`export`] - Exporter, value codec and output sinks
//!
//! ## Example
//!
//! ```ignore
//! use x3d_export::prelude::*;
//!
//! let mut scene = Scene::new();
//! let shape = scene.create_node("Shape")?;
//! let geometry = scene.create_node("Box")?;
//! scene.set_field(geometry, "size", FieldValue::vec3f(1.0, 2.0, 3.0))?;
//! scene.add_child(shape, "geometry", geometry)?;
//! scene.add_root_child(shape)?;
//!
//! let report = export_to_path(&scene, "box.x3d", &ExportOptions::default())?;
//! println!("{} nodes written", report.nodes);
//! ```

pub mod util;
pub mod core;
pub mod scene;
pub mod export;

// Re-export commonly used types
pub use util::{Error, Result};
pub use export::{export_to_path, export_to_writer, ExportReport, Exporter};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::util::{Access, Error, FieldType, FieldValue, NodeId, ProtoId, Result};
    pub use crate::core::{CompressionMethod, Diagnostic, Encoding, ExportOptions, SpecVersion};
    pub use crate::scene::{Catalog, FieldDecl, Scene};
    pub use crate::export::{export_to_path, export_to_writer, ExportReport, Exporter};
    pub use crate::export::sink::{BinarySink, ClassicSink, OutputSink, XmlSink};
}
