//! Scene layer - the node/field model the exporter reads.
//!
//! - [`Catalog`] / [`NodeSchema`] / [`FieldDecl`] - data-driven node kinds
//! - [`Scene`] - node arena, DEF labels, prototypes, routes
//! - [`NodeRef`] - read-only node view used by the exporter
//! - [`SceneDocument`] - JSON scene documents

mod builtin;
mod catalog;
pub mod document;
mod node;
mod proto;
#[allow(clippy::module_inception)]
mod scene;

pub use builtin::WORLD_ROOT;
pub use catalog::{Catalog, FieldDecl, NodeSchema, SchemaBuilder};
pub use document::{load_scene, scene_from_json, SceneDocument};
pub use node::{Node, NodeFieldIndices, NodeKind, NodeRef};
pub use proto::{IsConnection, IsMap, ProtoBody, ProtoKind, Prototype};
pub use scene::{Component, Export, Import, Route, Scene};
