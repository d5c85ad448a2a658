//! Screenshot upload batch.
//!
//! Files are processed strictly one at a time: write the object, then record
//! the metadata row. A failure on either step counts that file as failed and
//! moves on to the next one — partial success is the accepted outcome, and
//! nothing is retried.

pub mod handlers;
pub mod store;

use bytes::Bytes;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use store::{FileStore, NewUploadedFile, ObjectStore};

/// One file received from the client, not yet stored anywhere.
#[derive(Debug)]
pub struct IncomingFile {
    pub name: String,
    pub bytes: Bytes,
}

/// Result of one batch: how many files made it, and which did not.
#[derive(Debug, Serialize)]
pub struct UploadReport {
    pub uploaded: usize,
    pub failed: Vec<String>,
}

/// Uploads a batch of screenshots for one user, sequentially.
pub async fn upload_screenshots(
    objects: &dyn ObjectStore,
    files_db: &dyn FileStore,
    user_id: Uuid,
    files: Vec<IncomingFile>,
) -> UploadReport {
    let mut uploaded = 0usize;
    let mut failed = Vec::new();

    for file in files {
        let key = object_key(user_id, &file.name);
        let size = file.bytes.len() as i64;

        let result = async {
            objects.put(&key, file.bytes.clone()).await?;
            files_db
                .record(NewUploadedFile {
                    user_id,
                    file_name: &file.name,
                    file_path: &key,
                    file_size: size,
                })
                .await
        }
        .await;

        match result {
            Ok(_) => uploaded += 1,
            Err(e) => {
                warn!("Failed to upload {}: {e}", file.name);
                failed.push(file.name);
            }
        }
    }

    info!(
        "Upload batch for user {user_id}: {uploaded} stored, {} failed",
        failed.len()
    );
    UploadReport { uploaded, failed }
}

/// Collision-free object key: `{user_id}/{uuid}.{ext}`, keeping the original
/// file extension when it has one.
pub fn object_key(user_id: Uuid, file_name: &str) -> String {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty())
        .unwrap_or("bin");
    format!("{user_id}/{}.{ext}", Uuid::new_v4())
}
