//! Error types for the audit engine

use crate::page::RenderState;
use thiserror::Error;

/// Result type alias for audit operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort a capture or a whole analysis branch
#[derive(Error, Debug)]
pub enum Error {
    /// A render did not finish within the configured deadline
    #[error("Render timed out after {0}ms")]
    RenderTimeout(u64),

    /// The renderer could not produce a capture
    #[error("Render failed: {0}")]
    RenderFailure(String),

    /// The language classifier could not be reached or refused the input
    #[error("Language classifier unavailable: {0}")]
    ClassifierUnavailable(String),

    /// A rendered page violates its own structural contract
    #[error("Invalid rendered page: {0}")]
    InvalidPage(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Screenshot could not be decoded
    #[error("Image decoding failed: {0}")]
    ImageError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Per-element failures of the region extractor.
///
/// These never abort a check: the element is skipped and the failure is
/// recorded as a report note.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GeometryError {
    #[error("element `{id}` has a non-positive box ({width}x{height})")]
    EmptyBox { id: String, width: i32, height: i32 },

    #[error("element `{id}` lies entirely outside the {state} screenshot")]
    OutOfBounds { id: String, state: RenderState },

    #[error("element `{id}` references a missing {state} screenshot")]
    MissingScreenshot { id: String, state: RenderState },

    #[error("element `{id}` leaves no background pixels to sample")]
    NoBackground { id: String },

    #[error("element `{id}` has an empty {region} region")]
    EmptyRegion { id: String, region: &'static str },
}

impl GeometryError {
    /// Identifier of the element that failed
    pub fn element_id(&self) -> &str {
        match self {
            GeometryError::EmptyBox { id, .. }
            | GeometryError::OutOfBounds { id, .. }
            | GeometryError::MissingScreenshot { id, .. }
            | GeometryError::NoBackground { id }
            | GeometryError::EmptyRegion { id, .. } => id,
        }
    }
}

#[cfg(feature = "snapshot")]
impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::ImageError(err.to_string())
    }
}
