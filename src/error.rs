//! Structured error types for folio.
//!
//! Malformed markup, unknown CSS and broken images never reach this type:
//! they degrade inside the pipeline. What remains are contract violations
//! between the layout engine and the drawing sink, unusable font data, and
//! plain I/O or serialization failures at the edges.

use thiserror::Error;

/// The unified error type returned by all public folio API functions.
#[derive(Debug, Error)]
pub enum FolioError {
    /// A drawing call addressed a page that does not exist. The layout
    /// engine and the sink have gone out of sync.
    #[error("invalid page index {index} (document has {count} page(s))")]
    InvalidPage { index: usize, count: usize },

    /// A font could not be loaded, parsed, or embedded.
    #[error("font error: {0}")]
    Font(String),

    /// An image could not be prepared for embedding.
    #[error("image error: {0}")]
    Image(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
