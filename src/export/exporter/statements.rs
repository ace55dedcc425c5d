//! Document-level statements: header, IMPORT/EXPORT and ROUTE.

use tracing::trace;

use crate::core::Diagnostic;
use crate::export::sink::{DocumentHeader, RouteSpec};
use crate::scene::{Component, Route};
use crate::util::Result;

use super::ExportPass;

/// Head `meta` entry naming the producing tool.
const GENERATOR_META: &str = "generator";

/// Profile assumed by VRML97 documents.
const VRML97_PROFILE: &str = "Immersive";

/// Generator string written into the document head.
fn generator_name() -> String {
    let date = option_env!("X3D_EXPORT_BUILD_DATE").unwrap_or("unknown");
    format!("x3d-export {} (built {})", env!("CARGO_PKG_VERSION"), date)
}

impl<'a> ExportPass<'a> {
    fn unsupported(&mut self, what: String) {
        self.diagnostics.report(Diagnostic::Unsupported { what });
    }

    pub(super) fn write_header(&mut self) -> Result<()> {
        let scene = self.scene;
        let version = self.options.version;

        let mut meta = scene.meta().to_vec();
        if !meta.iter().any(|(name, _)| name == GENERATOR_META) {
            meta.push((GENERATOR_META.to_string(), generator_name()));
        }

        let components: &[Component] = if version.is_vrml97() {
            if !scene.components().is_empty() {
                self.unsupported(format!("COMPONENT statements in VRML {version}"));
            }
            if scene.profile() != VRML97_PROFILE {
                self.unsupported(format!("PROFILE {} in VRML {version}", scene.profile()));
            }
            &[]
        } else {
            scene.components()
        };

        self.sink.start_document(&DocumentHeader {
            version,
            profile: scene.profile(),
            components,
            meta: &meta,
        })
    }

    pub(super) fn write_imports_and_exports(&mut self) -> Result<()> {
        let scene = self.scene;
        if self.options.version.is_vrml97() {
            if !scene.imports().is_empty() {
                self.unsupported("IMPORT statements in VRML 2.0".into());
            }
            if !scene.exports().is_empty() {
                self.unsupported("EXPORT statements in VRML 2.0".into());
            }
            return Ok(());
        }

        for import in scene.imports() {
            self.sink.emit_import(import)?;
        }
        for export in scene.exports() {
            let node = scene.node_ref(export.node)?;
            let label = self.scope.route_label(&node)?;
            self.sink.emit_export(label, export.exported_name.as_deref())?;
        }
        Ok(())
    }

    /// Routes of the current scope. Endpoints must carry a label there.
    pub(super) fn emit_routes(&mut self, routes: &'a [Route]) -> Result<()> {
        let scene = self.scene;
        for route in routes {
            let from = scene.node_ref(route.from_node)?;
            let to = scene.node_ref(route.to_node)?;

            let from_field = from.field_declaration(route.from_field);
            let to_field = to.field_declaration(route.to_field);
            let (Some(from_field), Some(to_field)) = (from_field, to_field) else {
                let (node, index) = match from_field {
                    None => (from, route.from_field),
                    Some(_) => (to, route.to_field),
                };
                self.diagnostics.report(Diagnostic::UnknownField { kind: node.kind_name().to_string(), index });
                continue;
            };

            let from_node = self.scope.route_label(&from)?;
            let to_node = self.scope.route_label(&to)?;
            trace!("ROUTE {}.{} TO {}.{}", from_node, from_field.name, to_node, to_field.name);
            self.sink.emit_route(&RouteSpec {
                from_node,
                from_field: &from_field.name,
                to_node,
                to_field: &to_field.name,
            })?;
            self.stats.routes += 1;
        }
        Ok(())
    }
}
