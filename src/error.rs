use reqwest::StatusCode;
use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors aborting an archive run.
#[derive(Debug, Error)]
pub enum Error {
    /// The bounding box corners are out of range or not ordered.
    #[error("invalid bounding box: {0}")]
    InvalidBoundingBox(String),

    /// The zoom level cannot be addressed with 32-bit tile indices.
    #[error("invalid zoom level {0} (must be 0-{max})", max = crate::tile::MAX_ZOOM)]
    InvalidZoom(u8),

    /// No zoom levels were configured.
    #[error("at least one zoom level is required")]
    NoZoomLevels,

    /// A URL template could not be expanded for a tile.
    #[error("failed formatting tile URL: {0}")]
    UrlFormat(#[from] strfmt::FmtError),

    /// The HTTP client could not be built.
    #[error("failed creating HTTP client")]
    Client(#[source] reqwest::Error),

    /// A storage-layer operation on the archive failed.
    #[error("failed to {step} archive {path:?}")]
    Archive {
        /// What was being done when the failure happened.
        step: &'static str,
        /// Archive file path.
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Per-attempt failures fetching a single tile. These are retried and never
/// abort a run.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("unexpected status {0}")]
    Status(StatusCode),

    #[error("failed reading response body: {0}")]
    Body(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
