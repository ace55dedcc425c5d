//! Recoverable export diagnostics.
//!
//! Per-field problems never abort an export. They are logged and collected
//! here, and the collection is handed back in the export report.

use std::fmt;

/// One recovered problem.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Diagnostic {
    /// A field index the node kind does not declare; the field was skipped.
    UnknownField { kind: String, index: usize },
    /// A node kind without a schema met during prototype default-instance
    /// synthesis; the node was passed through unexpanded.
    UnsupportedNodeKind { kind: String, proto: String },
    /// A stored value whose variant or shape does not match the declared type.
    ValueMismatch { kind: String, field: String, expected: String },
    /// A construct the target version cannot express; it was left out.
    Unsupported { what: String },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownField { kind, index } => {
                write!(f, "unknown field index {index} on {kind}, skipped")
            }
            Self::UnsupportedNodeKind { kind, proto } => {
                write!(f, "unsupported node kind {kind} in prototype {proto}, passed through")
            }
            Self::ValueMismatch { kind, field, expected } => {
                write!(f, "{kind}.{field} does not hold a {expected} value, skipped")
            }
            Self::Unsupported { what } => write!(f, "{what} not expressible in target version"),
        }
    }
}

/// Collector shared by every stage of one export pass.
#[derive(Clone, Debug, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
    elided: usize,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record and log a diagnostic.
    pub fn report(&mut self, diagnostic: Diagnostic) {
        tracing::warn!("{}", diagnostic);
        self.entries.push(diagnostic);
    }

    /// Count one field dropped because it equals its default.
    #[inline]
    pub fn count_elided(&mut self) {
        self.elided += 1;
    }

    /// Number of default-valued fields left out.
    pub fn elided(&self) -> usize {
        self.elided
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_entries(self) -> Vec<Diagnostic> {
        self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect() {
        let mut d = Diagnostics::new();
        assert!(d.is_empty());
        d.report(Diagnostic::UnknownField { kind: "Box".into(), index: 9 });
        d.count_elided();
        d.count_elided();
        assert_eq!(d.entries().len(), 1);
        assert_eq!(d.elided(), 2);
        assert!(d.entries()[0].to_string().contains("index 9"));
    }
}
