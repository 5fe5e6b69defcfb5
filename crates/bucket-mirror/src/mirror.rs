//! Clear-then-upload mirroring of fixture trees into buckets.

use crate::error::{MirrorError, MirrorResult};
use crate::local::{list_files_recursive, list_subdirectories};
use crate::ObjectStore;
use std::future::Future;
use std::path::Path;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Options for a mirror run.
#[derive(Debug, Clone, Default)]
pub struct MirrorOptions {
    /// Only mirror these buckets; empty means every bucket directory
    pub buckets: Vec<String>,
    /// Count what would change without deleting or uploading anything
    pub dry_run: bool,
}

/// Outcome of mirroring one bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MirrorReport {
    pub bucket: String,
    /// Objects removed by the clear phase (or present, for a dry run)
    pub deleted: usize,
    /// Files uploaded (or that would be, for a dry run)
    pub uploaded: usize,
}

async fn cancellable<T, F>(cancel: &CancellationToken, bucket: &str, future: F) -> MirrorResult<T>
where
    F: Future<Output = MirrorResult<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(MirrorError::Cancelled {
            bucket: bucket.to_string(),
        }),
        result = future => result,
    }
}

/// Delete every object in `bucket`, one listing page at a time.
///
/// Keeps listing until the store returns no continuation token. Returns the
/// number of objects deleted; an empty bucket is a no-op.
pub async fn clear_bucket<S>(
    store: &S,
    bucket: &str,
    cancel: &CancellationToken,
) -> MirrorResult<usize>
where
    S: ObjectStore + ?Sized,
{
    let mut deleted = 0;
    let mut continuation_token: Option<String> = None;

    loop {
        let page = cancellable(cancel, bucket, async {
            store
                .list_objects(bucket, continuation_token.take())
                .await
                .map_err(|e| MirrorError::storage(bucket, "list objects", e))
        })
        .await?;

        if !page.keys.is_empty() {
            cancellable(cancel, bucket, async {
                store
                    .delete_objects(bucket, &page.keys)
                    .await
                    .map_err(|e| MirrorError::storage(bucket, "delete objects", e))
            })
            .await?;
            deleted += page.keys.len();
            debug!("Deleted {} objects from {}", page.keys.len(), bucket);
        }

        match page.next_continuation_token {
            Some(token) => continuation_token = Some(token),
            None => break,
        }
    }

    Ok(deleted)
}

/// Count the objects currently in `bucket` without modifying it.
pub async fn count_objects<S>(
    store: &S,
    bucket: &str,
    cancel: &CancellationToken,
) -> MirrorResult<usize>
where
    S: ObjectStore + ?Sized,
{
    let mut count = 0;
    let mut continuation_token: Option<String> = None;

    loop {
        let page = cancellable(cancel, bucket, async {
            store
                .list_objects(bucket, continuation_token.take())
                .await
                .map_err(|e| MirrorError::storage(bucket, "list objects", e))
        })
        .await?;
        count += page.keys.len();

        match page.next_continuation_token {
            Some(token) => continuation_token = Some(token),
            None => break,
        }
    }

    Ok(count)
}

/// Upload every file under `root` to `bucket`, keyed by its relative path.
pub async fn upload_directory<S>(
    store: &S,
    bucket: &str,
    root: &Path,
    cancel: &CancellationToken,
) -> MirrorResult<usize>
where
    S: ObjectStore + ?Sized,
{
    let files = list_files_recursive(root).await?;

    for file in &files {
        let body = tokio::fs::read(&file.path)
            .await
            .map_err(|e| MirrorError::local(&file.path, e))?;
        let size = body.len();

        cancellable(cancel, bucket, async {
            store
                .put_object(bucket, &file.key, body)
                .await
                .map_err(|e| MirrorError::storage(bucket, format!("upload '{}'", file.key), e))
        })
        .await?;
        debug!("Uploaded s3://{}/{} ({} bytes)", bucket, file.key, size);
    }

    Ok(files.len())
}

/// Replace the contents of `bucket` with the files under `root`.
///
/// The bucket is cleared first, then every file is uploaded. If this fails or
/// is cancelled part way, the bucket is left partially cleared or partially
/// uploaded; rerunning the mirror restores it.
pub async fn mirror_bucket<S>(
    store: &S,
    bucket: &str,
    root: &Path,
    cancel: &CancellationToken,
) -> MirrorResult<MirrorReport>
where
    S: ObjectStore + ?Sized,
{
    info!("Mirroring {} into bucket {}", root.display(), bucket);

    let deleted = clear_bucket(store, bucket, cancel).await?;
    info!("Cleared {} objects from bucket {}", deleted, bucket);

    let uploaded = upload_directory(store, bucket, root, cancel).await?;
    info!("Uploaded {} objects to bucket {}", uploaded, bucket);

    Ok(MirrorReport {
        bucket: bucket.to_string(),
        deleted,
        uploaded,
    })
}

/// Bucket names under `fixtures_root`: one per subdirectory.
pub async fn discover_buckets(fixtures_root: &Path) -> MirrorResult<Vec<String>> {
    list_subdirectories(fixtures_root).await
}

/// Mirror every bucket directory under `fixtures_root`, one bucket at a time.
pub async fn mirror_all<S>(
    store: &S,
    fixtures_root: &Path,
    options: &MirrorOptions,
    cancel: &CancellationToken,
) -> MirrorResult<Vec<MirrorReport>>
where
    S: ObjectStore + ?Sized,
{
    let mut buckets = discover_buckets(fixtures_root).await?;
    if !options.buckets.is_empty() {
        for wanted in &options.buckets {
            if !buckets.contains(wanted) {
                return Err(MirrorError::local(
                    fixtures_root.join(wanted),
                    std::io::Error::new(
                        std::io::ErrorKind::NotFound,
                        format!("no fixture directory for bucket '{wanted}'"),
                    ),
                ));
            }
        }
        buckets.retain(|bucket| options.buckets.contains(bucket));
    }

    info!("Found {} bucket fixture directories", buckets.len());

    let mut reports = Vec::with_capacity(buckets.len());
    for bucket in &buckets {
        let root = fixtures_root.join(bucket);
        let report = if options.dry_run {
            let existing = count_objects(store, bucket, cancel).await?;
            let files = list_files_recursive(&root).await?;
            info!(
                "[dry run] bucket {}: would delete {} objects and upload {} files",
                bucket,
                existing,
                files.len()
            );
            MirrorReport {
                bucket: bucket.clone(),
                deleted: existing,
                uploaded: files.len(),
            }
        } else {
            mirror_bucket(store, bucket, &root, cancel).await?
        };
        reports.push(report);
    }

    Ok(reports)
}
