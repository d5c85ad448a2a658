use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::upload::UploadedFileRow;

/// Object-storage seam: write screenshot bytes under a per-user key.
/// Put is not idempotent; keys carry a randomized component to avoid
/// collisions.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, key: &str, bytes: Bytes) -> Result<(), AppError>;
}

/// Metadata seam: record one stored screenshot. Rows are created only after
/// the object write succeeded and are never updated.
#[async_trait]
pub trait FileStore: Send + Sync {
    async fn record(&self, new: NewUploadedFile<'_>) -> Result<UploadedFileRow, AppError>;
}

#[derive(Debug)]
pub struct NewUploadedFile<'a> {
    pub user_id: Uuid,
    pub file_name: &'a str,
    pub file_path: &'a str,
    pub file_size: i64,
}

/// S3 (or MinIO) backed object store used in production.
#[derive(Clone)]
pub struct S3ObjectStore {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3ObjectStore {
    pub fn new(client: aws_sdk_s3::Client, bucket: String) -> Self {
        Self { client, bucket }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put(&self, key: &str, bytes: Bytes) -> Result<(), AppError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("Object write failed for {key}: {e}")))?;
        Ok(())
    }
}

/// Postgres-backed uploaded-file ledger used in production.
#[derive(Clone)]
pub struct PgFileStore {
    pool: PgPool,
}

impl PgFileStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FileStore for PgFileStore {
    async fn record(&self, new: NewUploadedFile<'_>) -> Result<UploadedFileRow, AppError> {
        Ok(sqlx::query_as::<_, UploadedFileRow>(
            r#"
            INSERT INTO uploaded_files (user_id, file_name, file_path, file_size)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(new.user_id)
        .bind(new.file_name)
        .bind(new.file_path)
        .bind(new.file_size)
        .fetch_one(&self.pool)
        .await?)
    }
}
