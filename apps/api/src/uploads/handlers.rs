use axum::{
    extract::{Multipart, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::state::AppState;
use crate::uploads::{upload_screenshots, IncomingFile, UploadReport};

/// A batch is capped at 50 screenshots.
const MAX_FILES_PER_BATCH: usize = 50;

#[derive(Deserialize)]
pub struct UserIdQuery {
    pub user_id: Uuid,
}

/// POST /api/v1/uploads
///
/// Multipart batch of screenshots. Returns a per-batch report; a partially
/// failed batch is still a 200 — each failure was already reported per file.
pub async fn handle_upload(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
    multipart: Multipart,
) -> Result<Json<UploadReport>, AppError> {
    let files = collect_files(multipart).await?;
    if files.is_empty() {
        return Err(AppError::Validation("No files in upload batch".to_string()));
    }

    let report = upload_screenshots(
        state.objects.as_ref(),
        state.files.as_ref(),
        params.user_id,
        files,
    )
    .await;
    Ok(Json(report))
}

/// Drains the multipart body into in-memory files. Only fields carrying a
/// filename are screenshots; stray form fields are skipped.
async fn collect_files(mut multipart: Multipart) -> Result<Vec<IncomingFile>, AppError> {
    let mut files = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed multipart body: {e}")))?
    {
        let Some(name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Failed to read file {name}: {e}")))?;
        files.push(IncomingFile { name, bytes });

        if files.len() > MAX_FILES_PER_BATCH {
            return Err(AppError::Validation(format!(
                "At most {MAX_FILES_PER_BATCH} files per batch"
            )));
        }
    }

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::extract::FromRequest;
    use axum::http::Request;

    async fn multipart_from(body: &str) -> Multipart {
        let request = Request::builder()
            .header(
                "content-type",
                "multipart/form-data; boundary=XBOUNDARYX",
            )
            .body(Body::from(body.to_string()))
            .unwrap();
        Multipart::from_request(request, &()).await.unwrap()
    }

    #[tokio::test]
    async fn test_collect_files_skips_fields_without_filename() {
        let body = "--XBOUNDARYX\r\n\
            Content-Disposition: form-data; name=\"note\"\r\n\r\n\
            just some text\r\n\
            --XBOUNDARYX\r\n\
            Content-Disposition: form-data; name=\"files\"; filename=\"a.png\"\r\n\
            Content-Type: image/png\r\n\r\n\
            pixels\r\n\
            --XBOUNDARYX--\r\n";

        let files = collect_files(multipart_from(body).await).await.unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "a.png");
        assert_eq!(files[0].bytes.as_ref(), b"pixels");
    }

    #[tokio::test]
    async fn test_collect_files_empty_when_only_form_fields() {
        let body = "--XBOUNDARYX\r\n\
            Content-Disposition: form-data; name=\"note\"\r\n\r\n\
            just some text\r\n\
            --XBOUNDARYX--\r\n";

        let files = collect_files(multipart_from(body).await).await.unwrap();
        assert!(files.is_empty());
    }
}
