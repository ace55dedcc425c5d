//! Utility types shared by every layer.
//!
//! - [`FieldType`] / [`Access`] - field type tags and access categories
//! - [`FieldValue`] - owned field values
//! - [`NodeId`] / [`ProtoId`] - arena identities
//! - [`Error`] / [`Result`] - error handling

mod error;
mod field_type;
mod ids;
mod value;

pub use error::*;
pub use field_type::*;
pub use ids::*;
pub use value::*;
