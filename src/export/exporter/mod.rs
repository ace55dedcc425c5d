//! The exporter: one scene in, one document out.
//!
//! [`Exporter::export`] checks the target version, then runs a single
//! export pass over the scene:
//!
//! 1. document header (profile, components, meta)
//! 2. prototype declarations, dependencies first (`flattener`)
//! 3. the node graph from the root (`walker`)
//! 4. IMPORT / EXPORT statements, then routes (`statements`)
//! 5. document footer
//!
//! All traversal state lives in the pass, so an exporter can be reused and
//! separate exporters can run on separate threads.

mod flattener;
mod statements;
mod types;
mod walker;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::debug;

use crate::core::{Diagnostics, ExportOptions};
use crate::scene::Scene;
use crate::util::{NodeId, ProtoId, Result};

use super::codec::FieldCodec;
use super::sink::OutputSink;
use types::{PassStats, Scope};

pub use types::{DefaultInstance, ExportReport};

/// Drives one [`OutputSink`] with the given options.
pub struct Exporter<S> {
    sink: S,
    options: ExportOptions,
}

impl<S: OutputSink> Exporter<S> {
    pub fn new(sink: S, options: ExportOptions) -> Self {
        Self { sink, options }
    }

    pub fn options(&self) -> &ExportOptions {
        &self.options
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Serialize `scene` into the sink.
    ///
    /// Fails before writing anything when the sink's encoding has no preamble
    /// for the configured version. Sink failures abort the export and leave
    /// partial output behind.
    pub fn export(&mut self, scene: &Scene) -> Result<ExportReport> {
        let encoding = self.sink.encoding();
        encoding.check_version(self.options.version)?;
        debug!(
            "Exporting {} nodes as {} {} ({})",
            scene.node_count(),
            encoding.name(),
            self.options.version,
            self.options.compression
        );

        let mut pass = ExportPass::new(scene, &mut self.sink, &self.options);
        pass.run()?;
        let report = pass.finish();
        debug!(
            "Export done: {} nodes, {} USE, {} fields ({} elided), {} protos, {} routes",
            report.nodes, report.uses, report.fields, report.elided, report.protos, report.routes
        );
        Ok(report)
    }
}

/// Traversal state of a single export.
struct ExportPass<'a> {
    scene: &'a Scene,
    sink: &'a mut dyn OutputSink,
    options: &'a ExportOptions,
    codec: FieldCodec,
    /// Nodes already expanded; later visits become USE references.
    used: HashSet<NodeId>,
    scope: Scope,
    defaults: HashMap<String, Arc<DefaultInstance>>,
    declared: HashSet<ProtoId>,
    in_progress: HashSet<ProtoId>,
    diagnostics: Diagnostics,
    stats: PassStats,
}

impl<'a> ExportPass<'a> {
    fn new(scene: &'a Scene, sink: &'a mut dyn OutputSink, options: &'a ExportOptions) -> Self {
        let codec = FieldCodec::new(options, sink.binary_values());
        Self {
            scene,
            sink,
            options,
            codec,
            used: HashSet::new(),
            scope: Scope { def_map: scene.def_map(), is_map: Default::default() },
            defaults: HashMap::new(),
            declared: HashSet::new(),
            in_progress: HashSet::new(),
            diagnostics: Diagnostics::new(),
            stats: PassStats::default(),
        }
    }

    fn run(&mut self) -> Result<()> {
        let scene = self.scene;
        self.write_header()?;
        self.declare_prototypes()?;

        debug!("Writing {} top-level nodes", scene.root_nodes().len());
        for &node in scene.root_nodes() {
            self.visit(node, None)?;
        }

        self.write_imports_and_exports()?;
        self.emit_routes(scene.routes())?;
        self.sink.end_document()
    }

    /// Run `f` with `scope` active, restoring the enclosing scope afterwards.
    fn with_scope<T>(&mut self, scope: Scope, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let saved = std::mem::replace(&mut self.scope, scope);
        let result = f(self);
        self.scope = saved;
        result
    }

    fn finish(self) -> ExportReport {
        let elided = self.diagnostics.elided();
        ExportReport {
            nodes: self.stats.nodes,
            uses: self.stats.uses,
            fields: self.stats.fields,
            elided,
            protos: self.stats.protos,
            routes: self.stats.routes,
            diagnostics: self.diagnostics.into_entries(),
            default_instances: self.defaults.into_iter().collect(),
        }
    }
}
