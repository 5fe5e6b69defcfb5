//! S3 object store implementation

use crate::error::BoxError;
use crate::{ObjectPage, ObjectStore};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{Delete, ObjectIdentifier};

/// Shared S3 client for a mirror run
///
/// Creating an S3 client is relatively expensive, so one client is built per
/// run and reused for every bucket.
pub struct S3Client {
    client: aws_sdk_s3::Client,
}

impl S3Client {
    /// Create a new S3 client from the default AWS provider chain
    ///
    /// `force_path_style` addresses buckets as `endpoint/bucket` instead of
    /// `bucket.endpoint`, which most S3-compatible servers (MinIO, LocalStack)
    /// require.
    pub async fn new(force_path_style: bool) -> Self {
        let sdk_config = aws_config::load_defaults(BehaviorVersion::latest()).await;
        let config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(force_path_style)
            .build();
        Self {
            client: aws_sdk_s3::Client::from_conf(config),
        }
    }

    pub fn from_client(client: aws_sdk_s3::Client) -> Self {
        Self { client }
    }
}

fn sdk_error<E>(error: E) -> BoxError
where
    E: std::error::Error,
{
    DisplayErrorContext(error).to_string().into()
}

#[async_trait]
impl ObjectStore for S3Client {
    async fn list_objects(
        &self,
        bucket: &str,
        continuation_token: Option<String>,
    ) -> Result<ObjectPage, BoxError> {
        let response = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .set_continuation_token(continuation_token)
            .send()
            .await
            .map_err(sdk_error)?;

        let keys = response
            .contents
            .unwrap_or_default()
            .into_iter()
            .filter_map(|object| object.key)
            .collect();

        Ok(ObjectPage {
            keys,
            next_continuation_token: response.next_continuation_token,
        })
    }

    async fn delete_objects(&self, bucket: &str, keys: &[String]) -> Result<(), BoxError> {
        let objects = keys
            .iter()
            .map(|key| ObjectIdentifier::builder().key(key).build())
            .collect::<Result<Vec<_>, _>>()?;
        let delete = Delete::builder()
            .set_objects(Some(objects))
            .quiet(true)
            .build()?;

        let response = self
            .client
            .delete_objects()
            .bucket(bucket)
            .delete(delete)
            .send()
            .await
            .map_err(sdk_error)?;

        // DeleteObjects reports per-key failures in a successful response.
        let errors = response.errors.unwrap_or_default();
        if let Some(first) = errors.first() {
            return Err(format!(
                "{} of {} keys were not deleted (first: {} {}: {})",
                errors.len(),
                keys.len(),
                first.key.as_deref().unwrap_or("<unknown>"),
                first.code.as_deref().unwrap_or("<no code>"),
                first.message.as_deref().unwrap_or("<no message>")
            )
            .into());
        }

        Ok(())
    }

    async fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<(), BoxError> {
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(())
    }
}
