//! Unified error handling for the trace-engine library.
//!
//! Only the trust boundary (wire-format conversion) and the id-keyed
//! collections on the editor produce errors. The numeric kernels and the
//! spatial index are deliberately infallible: malformed input yields
//! degenerate output rather than an error, since they run on the render
//! hot path.

use std::fmt;

/// Unified error type for trace-engine operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceError {
    /// A mandatory wire-format array (`lat` or `lng`) is absent
    MissingArray { name: &'static str },
    /// No marker with the given id exists on the trace
    MarkerNotFound { id: u32 },
    /// No child trace reference with the given id exists on the trace
    ChildNotFound { id: u32 },
}

impl fmt::Display for TraceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraceError::MissingArray { name } => {
                write!(f, "Wire trace is missing mandatory array '{}'", name)
            }
            TraceError::MarkerNotFound { id } => {
                write!(f, "No marker with id {}", id)
            }
            TraceError::ChildNotFound { id } => {
                write!(f, "No child trace with id {}", id)
            }
        }
    }
}

impl std::error::Error for TraceError {}

/// Result type alias for trace-engine operations.
pub type Result<T> = std::result::Result<T, TraceError>;
