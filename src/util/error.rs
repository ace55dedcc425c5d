//! Error types for the export engine.
//!
//! Only structural faults live here. Per-field problems that the exporter
//! recovers from (unknown field indices, unsupported node kinds inside a
//! prototype body) are reported as [`crate::core::Diagnostic`] values instead.

use thiserror::Error;

use super::ids::NodeId;

/// Main error type for export operations.
#[derive(Error, Debug)]
pub enum Error {
    /// The destination sink failed to accept bytes. Aborts the export.
    #[error("Sink write failed: {0}")]
    SinkWrite(#[from] std::io::Error),

    /// An input file (scene document, options, encoded stream) could not be read.
    #[error("Cannot read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// No preamble exists for this version in the requested encoding.
    #[error("Unsupported spec version {major}.{minor} for {encoding} encoding")]
    UnsupportedSpecVersion {
        major: u32,
        minor: u32,
        encoding: &'static str,
    },

    /// A node was reached a second time but has no DEF label to USE it by.
    #[error("Shared {kind} node has no DEF label; cannot emit USE reference")]
    UnlabeledSharedNode { kind: String },

    /// A ROUTE, IMPORT or EXPORT endpoint is not DEF-labelled in its scope.
    #[error("Route endpoint {kind} node has no DEF label in the current scope")]
    MissingRouteLabel { kind: String },

    /// A node id that does not belong to the scene.
    #[error("Invalid node id: {0:?}")]
    InvalidNode(NodeId),

    /// Unknown node kind requested from a catalog.
    #[error("Unknown node kind: {0}")]
    UnknownNodeKind(String),

    /// Field name not declared for the node kind.
    #[error("Field {field} not declared on {kind}")]
    UnknownField { kind: String, field: String },

    /// Value does not fit the declared field type.
    #[error("Type mismatch on {field}: expected {expected}")]
    TypeMismatch { field: String, expected: String },

    /// Deflate/inflate failure or malformed compressed payload.
    #[error("Compression error: {0}")]
    Compression(String),

    /// Malformed encoded stream (reader side) or illegal sink call order.
    #[error("Invalid structure: {0}")]
    InvalidStructure(String),

    /// Scene document could not be turned into a scene.
    #[error("Scene document error: {0}")]
    Document(String),

    /// JSON parse error (scene documents, option files).
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// UTF-8 conversion error.
    #[error("Invalid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an "other" error from a string.
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Create an invalid structure error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidStructure(msg.into())
    }

    /// Create a read error for an input file.
    pub fn read(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.as_ref().display().to_string(),
            source,
        }
    }

    /// Create a document error.
    pub fn document(msg: impl Into<String>) -> Self {
        Self::Document(msg.into())
    }

    /// True for errors that mean the output is incomplete because bytes could
    /// not be written.
    pub fn is_sink_failure(&self) -> bool {
        matches!(self, Self::SinkWrite(_))
    }
}

/// Result type alias for export operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = Error::UnsupportedSpecVersion { major: 2, minor: 0, encoding: "XML" };
        assert!(e.to_string().contains("2.0"));
        assert!(e.to_string().contains("XML"));

        let e = Error::UnlabeledSharedNode { kind: "Box".into() };
        assert!(e.to_string().contains("Box"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "test");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::SinkWrite(_)));
        assert!(err.is_sink_failure());
    }

    #[test]
    fn test_read_error_is_not_sink_failure() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = Error::read("scene.json", io_err);
        assert!(!err.is_sink_failure());
        assert!(err.to_string().contains("scene.json"));
    }
}
