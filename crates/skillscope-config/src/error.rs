//! Ladder intake error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while fetching an intensity ladder document.
#[derive(Debug, Error)]
pub enum LadderError {
    /// The ladder endpoint answered with an error status.
    #[error("ladder endpoint returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// The request timed out.
    #[error("ladder request timed out after {0}s")]
    Timeout(u64),

    /// A network error occurred.
    #[error("network error: {0}")]
    Network(String),

    /// The document was not valid JSON.
    #[error("ladder document is not valid JSON: {0}")]
    Parse(String),

    /// A local ladder file could not be read.
    #[error("failed to read ladder file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
