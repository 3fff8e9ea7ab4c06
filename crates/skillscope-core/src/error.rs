//! Store error types.
//!
//! Rejected evidence is not an error (it is reported as `None`); these
//! variants cover failures of the persistence layer underneath the store.

use thiserror::Error;

/// Errors raised while reading or writing the persisted evidence document.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The storage backend failed to read or write.
    #[error("storage I/O failed for key `{key}`: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    /// The in-memory document could not be serialized.
    #[error("failed to serialize evidence document: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The storage backend rejected the operation for another reason.
    #[error("storage backend error: {0}")]
    Backend(String),

    /// The persisted document is not valid JSON of the expected shape.
    #[error("unreadable evidence document: {0}")]
    Corrupt(#[source] serde_json::Error),

    /// The persisted document carries another version tag.
    #[error("version mismatch: found `{found}`, expected `{expected}`")]
    VersionMismatch {
        found: String,
        expected: &'static str,
    },
}

impl StoreError {
    /// Wrap an I/O error with the key it was raised for.
    pub fn io(key: &str, source: std::io::Error) -> Self {
        StoreError::Io {
            key: key.to_string(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_mentions_key() {
        let err = StoreError::io(
            "cs.evidence.v2",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.to_string().contains("cs.evidence.v2"));
    }

    #[test]
    fn version_mismatch_names_both_versions() {
        let err = StoreError::VersionMismatch {
            found: "cs.evidence.v1".into(),
            expected: "cs.evidence.v2",
        };
        let msg = err.to_string();
        assert!(msg.contains("cs.evidence.v1"));
        assert!(msg.contains("cs.evidence.v2"));
    }
}
