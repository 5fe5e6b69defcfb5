//! Object store mirroring for fixture resets
//!
//! Makes a bucket's contents exactly equal to a local directory tree:
//!
//! ```text
//! <fixtures_root>/<bucket>/<relative/path>  ->  s3://<bucket>/<relative/path>
//! ```
//!
//! Each bucket is fully cleared (paginated list + bulk delete) and then every
//! local file is uploaded. This is a full replace, not a diff; every run
//! re-uploads every file.
//!
//! # Example
//!
//! ```ignore
//! use bucket_mirror::{mirror_all, MirrorOptions, S3Client};
//! use tokio_util::sync::CancellationToken;
//!
//! let store = S3Client::new(false).await;
//! let reports = mirror_all(&store, "fixtures/s3".as_ref(), &MirrorOptions::default(), &CancellationToken::new()).await?;
//! ```

mod error;
mod local;
mod mirror;
mod s3;
pub mod testing;

use async_trait::async_trait;

pub use error::{BoxError, MirrorError, MirrorResult};
pub use local::{list_files_recursive, object_key, LocalObject};
pub use mirror::{
    clear_bucket, count_objects, discover_buckets, mirror_all, mirror_bucket, upload_directory,
    MirrorOptions, MirrorReport,
};
pub use s3::S3Client;

/// One page of a bucket listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectPage {
    pub keys: Vec<String>,
    /// Token for the next page; `None` when the listing is complete
    pub next_continuation_token: Option<String>,
}

/// The object store operations a mirror needs.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// List one page of keys, continuing from `continuation_token` if given.
    async fn list_objects(
        &self,
        bucket: &str,
        continuation_token: Option<String>,
    ) -> Result<ObjectPage, BoxError>;

    /// Delete `keys` in a single bulk request.
    async fn delete_objects(&self, bucket: &str, keys: &[String]) -> Result<(), BoxError>;

    /// Store `body` under `key`, replacing any existing object.
    async fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<(), BoxError>;
}
