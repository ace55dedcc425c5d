//! Export engine.
//!
//! - [`Exporter`] - runs one export pass of a [`Scene`] into an [`OutputSink`]
//! - [`codec`] - per-field value encoding and compression policy
//! - [`DefaultElider`] - default-value suppression
//! - [`sink`] - XML, binary infoset and classic text sinks
//!
//! For the common cases use [`export_to_writer`] or [`export_to_path`].

pub mod codec;
mod elider;
mod exporter;
pub mod sink;

pub use elider::{DefaultElider, FLOAT_EPSILON};
pub use exporter::{DefaultInstance, ExportReport, Exporter};

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use tracing::info;

use crate::core::{Encoding, ExportOptions};
use crate::scene::Scene;
use crate::util::{Error, Result};

use sink::{BinarySink, ClassicSink, XmlSink};

/// Export `scene` to `out` in `encoding`.
pub fn export_to_writer<W: Write>(
    scene: &Scene,
    encoding: Encoding,
    options: &ExportOptions,
    out: W,
) -> Result<ExportReport> {
    match encoding {
        Encoding::Xml => Exporter::new(XmlSink::xml(out, options), options.clone()).export(scene),
        Encoding::Binary => Exporter::new(BinarySink::binary(out), options.clone()).export(scene),
        Encoding::Classic => Exporter::new(ClassicSink::new(out), options.clone()).export(scene),
    }
}

/// Export `scene` to a file; the encoding follows the file extension.
///
/// The version is checked before the file is created.
pub fn export_to_path(scene: &Scene, path: impl AsRef<Path>, options: &ExportOptions) -> Result<ExportReport> {
    let path = path.as_ref();
    let encoding = Encoding::from_path(path)
        .ok_or_else(|| Error::other(format!("cannot tell the encoding of {}", path.display())))?;
    encoding.check_version(options.version)?;

    info!("Writing {} ({})", path.display(), encoding.name());
    let file = File::create(path)?;
    export_to_writer(scene, encoding, options, BufWriter::new(file))
}
