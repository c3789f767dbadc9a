//! Image upload handlers.
//!
//! Both endpoints accept a multipart form with one image field. Object keys
//! are freshly generated UUIDs so uploads never collide or overwrite.

use axum::extract::{Multipart, State};
use bytes::Bytes;
use serde::Serialize;
use tracing::debug;

use crate::api::state::AppState;
use crate::api::types::{ApiError, Json};

#[derive(Serialize)]
pub struct UploadResponse {
    pub url: String,
}

struct UploadedImage {
    bytes: Bytes,
    content_type: String,
    extension: &'static str,
}

/// Drain the form: the first file field becomes the image, every non-file
/// field is captured by name. Field order in the form does not matter.
async fn read_form(
    multipart: &mut Multipart,
) -> Result<(Option<UploadedImage>, Vec<(String, String)>), ApiError> {
    let mut image = None;
    let mut extra = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Failed to read multipart field: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();

        if field.file_name().is_none() {
            let value = field
                .text()
                .await
                .map_err(|e| ApiError::bad_request(format!("Failed to read field '{}': {}", name, e)))?;
            extra.push((name, value));
            continue;
        }

        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let extension = mime_guess::get_mime_extensions_str(&content_type)
            .and_then(|exts| exts.first())
            .copied()
            .unwrap_or("bin");
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("Failed to read image: {}", e)))?;

        if bytes.is_empty() {
            return Err(ApiError::bad_request("Empty image upload"));
        }

        if image.is_none() {
            image = Some(UploadedImage {
                bytes,
                content_type,
                extension,
            });
        }
    }

    Ok((image, extra))
}

/// POST /upload
pub async fn upload_scan_image(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let (image, _) = read_form(&mut multipart).await?;
    let image = image.ok_or_else(|| ApiError::bad_request("No image provided"))?;

    let key = format!("{}.{}", uuid::Uuid::new_v4(), image.extension);
    debug!(key = %key, size = image.bytes.len(), "uploading scan image");

    let url = state
        .uploads
        .put(&state.scan_bucket, &key, image.bytes, &image.content_type)
        .await?;

    Ok(Json(UploadResponse { url }))
}

/// POST /upload-profile
///
/// Carries a `userId` form field alongside the image; the stored URL is
/// written onto that user's profile.
pub async fn upload_profile_image(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let (image, extra) = read_form(&mut multipart).await?;
    let image = image.ok_or_else(|| ApiError::bad_request("No image provided"))?;

    let user_id: i64 = extra
        .iter()
        .find(|(name, _)| name == "userId" || name == "user_id")
        .and_then(|(_, value)| value.parse().ok())
        .ok_or_else(|| ApiError::bad_request("Missing or invalid userId field"))?;

    let key = format!("{}.{}", uuid::Uuid::new_v4(), image.extension);
    debug!(user_id, key = %key, "uploading profile image");

    let url = state
        .uploads
        .put(
            &state.profile_bucket,
            &key,
            image.bytes,
            &image.content_type,
        )
        .await?;

    state.accounts.set_profile_image(user_id, &url).await?;

    Ok(Json(UploadResponse { url }))
}
