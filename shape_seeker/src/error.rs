// THEORY:
// Every failure the engine can report lives in one enum. Most of them are not
// fatal at all: a degenerate boundary, a mistyped command or a record mismatch
// are logged and the frame carries on. Only a frame source that can no longer
// deliver frames ends a line of execution.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SeekerError>;

#[derive(Debug, Error)]
pub enum SeekerError {
    /// The boundary encloses no area, so it has no centroid to sample around.
    #[error("boundary encloses zero area; centroid is undefined")]
    DegenerateBoundary,

    /// Neither word of a query is in the vocabulary.
    #[error("invalid query: shape {shape:?}, color {color:?}")]
    InvalidQuery { shape: String, color: String },

    #[error("invalid shape: {0}")]
    InvalidShape(String),

    #[error("invalid color: {0}")]
    InvalidColor(String),

    /// A command or batch line that is not `<shape tokens...> <color>`.
    #[error("malformed query: {0:?}")]
    MalformedQuery(String),

    #[error("built {records} shape records for {boundaries} boundaries")]
    RecordCountMismatch { records: usize, boundaries: usize },

    /// The frame source is exhausted or unreadable.
    #[error("frame acquisition failed: {0}")]
    AcquisitionFailure(String),

    #[error("display failed: {0}")]
    Display(String),

    #[error("invalid configuration in {path:?}: {reason}")]
    Config { path: Option<PathBuf>, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
