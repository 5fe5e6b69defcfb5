//! In-memory object store for tests.

use crate::error::BoxError;
use crate::{ObjectPage, ObjectStore};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

type Bucket = BTreeMap<String, Vec<u8>>;

/// Buckets held in memory with S3-like paginated listing.
///
/// Continuation tokens are the last key of the previous page, so deleting the
/// keys of a page does not disturb the listing of the following pages.
pub struct InMemoryObjectStore {
    buckets: Mutex<BTreeMap<String, Bucket>>,
    page_size: usize,
    fail_upload_key: Option<String>,
    pub list_calls: AtomicUsize,
    pub delete_calls: AtomicUsize,
    pub put_calls: AtomicUsize,
}

impl InMemoryObjectStore {
    /// Create a store whose listings return at most `page_size` keys.
    pub fn new(page_size: usize) -> Self {
        Self {
            buckets: Mutex::new(BTreeMap::new()),
            page_size: page_size.max(1),
            fail_upload_key: None,
            list_calls: AtomicUsize::new(0),
            delete_calls: AtomicUsize::new(0),
            put_calls: AtomicUsize::new(0),
        }
    }

    /// Make uploads of `key` fail.
    pub fn failing_upload(mut self, key: &str) -> Self {
        self.fail_upload_key = Some(key.to_string());
        self
    }

    pub fn create_bucket(&self, bucket: &str) {
        self.lock().entry(bucket.to_string()).or_default();
    }

    pub fn insert(&self, bucket: &str, key: &str, body: &[u8]) {
        self.lock()
            .entry(bucket.to_string())
            .or_default()
            .insert(key.to_string(), body.to_vec());
    }

    /// Snapshot of a bucket's objects; empty if the bucket does not exist.
    pub fn objects(&self, bucket: &str) -> BTreeMap<String, Vec<u8>> {
        self.lock().get(bucket).cloned().unwrap_or_default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, Bucket>> {
        self.buckets.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn no_such_bucket(bucket: &str) -> BoxError {
    format!("NoSuchBucket: the bucket '{bucket}' does not exist").into()
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn list_objects(
        &self,
        bucket: &str,
        continuation_token: Option<String>,
    ) -> Result<ObjectPage, BoxError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let buckets = self.lock();
        let objects = buckets.get(bucket).ok_or_else(|| no_such_bucket(bucket))?;

        let remaining: Vec<&String> = match &continuation_token {
            Some(after) => objects
                .keys()
                .filter(|key| key.as_str() > after.as_str())
                .collect(),
            None => objects.keys().collect(),
        };

        let keys: Vec<String> = remaining
            .iter()
            .take(self.page_size)
            .map(|key| key.to_string())
            .collect();
        let next_continuation_token = if remaining.len() > keys.len() {
            keys.last().cloned()
        } else {
            None
        };

        Ok(ObjectPage {
            keys,
            next_continuation_token,
        })
    }

    async fn delete_objects(&self, bucket: &str, keys: &[String]) -> Result<(), BoxError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        if keys.is_empty() {
            return Err("MalformedXML: delete request must name at least one key".into());
        }
        let mut buckets = self.lock();
        let objects = buckets
            .get_mut(bucket)
            .ok_or_else(|| no_such_bucket(bucket))?;
        for key in keys {
            objects.remove(key);
        }
        Ok(())
    }

    async fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<(), BoxError> {
        self.put_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_upload_key.as_deref() == Some(key) {
            return Err(format!("InternalError: upload of '{key}' failed").into());
        }
        let mut buckets = self.lock();
        let objects = buckets
            .get_mut(bucket)
            .ok_or_else(|| no_such_bucket(bucket))?;
        objects.insert(key.to_string(), body);
        Ok(())
    }
}
