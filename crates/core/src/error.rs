//! Error types surfaced by the core crate.

use std::io;

use thiserror::Error;

/// Failures raised by [`CollectionStore`](crate::store::CollectionStore).
#[derive(Debug, Error)]
pub enum StoreError {
    /// The referenced record does not exist.
    #[error("{entity} {id} not found")]
    NotFound {
        /// Kind of record that was looked up.
        entity: &'static str,
        /// Identifier that was requested.
        id: u64,
    },

    /// Deleting a player that still takes part in sessions.
    #[error("{player} played in {sessions} session(s) and cannot be deleted")]
    PlayerInUse {
        /// Name of the player.
        player: String,
        /// Number of sessions referencing the player.
        sessions: usize,
    },

    /// Input rejected before touching the store.
    #[error("invalid input: {0}")]
    Validation(String),

    /// Reading or writing the store files failed.
    #[error("store I/O failed: {0}")]
    Io(#[from] io::Error),

    /// The collection document could not be encoded or decoded.
    #[error("collection file is malformed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Cover image bytes could not be decoded or encoded.
    #[error("cover image error: {0}")]
    Image(#[from] image::ImageError),
}

/// Failures raised while talking to the remote game database.
#[derive(Debug, Error)]
pub enum LookupError {
    /// Transport-level failure.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The endpoint answered with a non-success status.
    #[error("unexpected status {status} from {url}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Requested URL.
        url: String,
    },

    /// The endpoint URL could not be built.
    #[error("invalid endpoint: {0}")]
    Url(#[from] url::ParseError),

    /// The response body is not well-formed XML.
    #[error("malformed response: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Reading the response stream failed.
    #[error("response stream failed: {0}")]
    Io(#[from] io::Error),
}

/// Failures raised while exporting the collection.
#[derive(Debug, Error)]
pub enum ExportError {
    /// The export document could not be serialized.
    #[error("failed to serialize export: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The clipboard rejected the document.
    #[error("clipboard unavailable: {0}")]
    Clipboard(String),
}
