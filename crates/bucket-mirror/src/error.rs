//! Error types for bucket mirroring.

use std::path::PathBuf;
use thiserror::Error;

/// Boxed error returned by [`crate::ObjectStore`] implementations.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while mirroring a fixture tree into a bucket.
///
/// None of these are retried. A failure after the clear phase started leaves
/// the bucket partially cleared or partially uploaded.
#[derive(Error, Debug)]
pub enum MirrorError {
    /// Listing, deleting or uploading against the object store failed.
    #[error("Failed to {operation} in bucket '{bucket}': {source}")]
    Storage {
        bucket: String,
        operation: String,
        #[source]
        source: BoxError,
    },

    /// A local fixture file or directory could not be read.
    #[error("Failed to read local fixture {}: {source}", .path.display())]
    LocalFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The run was cancelled or hit its deadline.
    #[error("Mirroring bucket '{bucket}' was cancelled; the bucket may be partially cleared or uploaded")]
    Cancelled { bucket: String },
}

impl MirrorError {
    pub(crate) fn storage(
        bucket: &str,
        operation: impl Into<String>,
        source: BoxError,
    ) -> Self {
        MirrorError::Storage {
            bucket: bucket.to_string(),
            operation: operation.into(),
            source,
        }
    }

    pub(crate) fn local(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        MirrorError::LocalFile {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias for mirror operations.
pub type MirrorResult<T> = Result<T, MirrorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_names_bucket_and_operation() {
        let error = MirrorError::storage("assets", "list objects", "access denied".into());
        assert_eq!(
            error.to_string(),
            "Failed to list objects in bucket 'assets': access denied"
        );
    }

    #[test]
    fn test_local_error_names_path() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let error = MirrorError::local("/fixtures/s3/assets/a.png", io);
        assert_eq!(
            error.to_string(),
            "Failed to read local fixture /fixtures/s3/assets/a.png: gone"
        );
    }
}
