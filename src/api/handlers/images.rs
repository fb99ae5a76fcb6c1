use axum::extract::{Multipart, State};
use axum::Json;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::table_error;
use crate::api::response::{ApiError, AppJson, MessageResponse};
use crate::gallery::{self, parse_tags, UploadRequest, UploadStatus};
use crate::object_store::DEFAULT_CONTENT_TYPE;
use crate::storage::models::{id_from_string_or_number, ImageRecord};
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub message: String,
    pub status: UploadStatus,
    pub url: String,
}

/// Tags arrive either as the comma-separated form string or as a JSON array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum TagsInput {
    List(Vec<String>),
    Csv(String),
}

impl TagsInput {
    pub fn into_tags(self) -> Vec<String> {
        match self {
            TagsInput::List(tags) => tags,
            TagsInput::Csv(csv) => parse_tags(&csv),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateTagsRequest {
    #[serde(deserialize_with = "id_from_string_or_number")]
    pub id: String,
    pub tags: TagsInput,
}

#[derive(Debug, Deserialize)]
pub struct DeleteImageRequest {
    #[serde(deserialize_with = "id_from_string_or_number")]
    pub id: String,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn upload_image(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut file_data = Bytes::new();
    let mut file_name: Option<String> = None;
    let mut file_content_type: Option<String> = None;
    let mut tags = String::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart data: {e}")))?
    {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "file" => {
                file_name = field.file_name().map(|s| s.to_string());
                file_content_type = field.content_type().map(|s| s.to_string());

                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Failed to read file: {e}")))?;

                if data.len() as u64 > state.config.max_upload_size {
                    return Err(ApiError::payload_too_large(format!(
                        "File exceeds maximum upload size of {} bytes",
                        state.config.max_upload_size
                    )));
                }
                file_data = data;
            }
            "tags" => {
                tags = field
                    .text()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Invalid tags: {e}")))?;
            }
            _ => {
                // Ignore unknown fields
            }
        }
    }

    // Determine MIME type: from multipart Content-Type, or guess from filename, or fallback
    let content_type = file_content_type
        .filter(|ct| ct != DEFAULT_CONTENT_TYPE)
        .or_else(|| {
            file_name
                .as_deref()
                .and_then(|n| mime_guess::from_path(n).first())
                .map(|m| m.to_string())
        });

    let mut request = UploadRequest {
        data: file_data,
        original_name: file_name,
        generated_name: None,
        content_type,
        tags_csv: tags,
    };
    // A missing or blank name is left for upload_image to reject
    if state.config.gallery.randomize_keys {
        if let Ok(name) = request.storage_key() {
            request.generated_name = Some(generated_key(&name));
        }
    }

    let outcome = gallery::upload_image(
        state.object_store.as_ref(),
        state.images.as_ref(),
        request,
    )
    .await
    .map_err(|e| {
        tracing::warn!(error = %e, "Upload failed");
        ApiError::from(e)
    })?;

    let message = match outcome.status {
        UploadStatus::Inserted => "Image uploaded and data inserted successfully",
        UploadStatus::Exists => "Image already exists in the database",
    };
    tracing::info!(key = %outcome.key, status = ?outcome.status, "Handled upload");

    Ok(Json(UploadResponse {
        message: message.to_string(),
        status: outcome.status,
        url: outcome.url,
    }))
}

pub async fn list_images(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ImageRecord>>, ApiError> {
    let images = state.images.select_all().await.map_err(table_error)?;
    Ok(Json(images))
}

pub async fn update_image_tags(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<UpdateTagsRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let tags = req.tags.into_tags();
    state
        .images
        .update_tags(&req.id, tags)
        .await
        .map_err(table_error)?
        .ok_or_else(|| ApiError::not_found("Image not found"))?;

    tracing::debug!(image_id = %req.id, "Updated tags");
    Ok(MessageResponse::json("File updated successfully"))
}

pub async fn delete_image(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<DeleteImageRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let deleted = state
        .images
        .delete_by_id(&req.id)
        .await
        .map_err(table_error)?;
    if !deleted {
        return Err(ApiError::not_found("Image not found"));
    }

    tracing::debug!(image_id = %req.id, "Deleted image record");
    Ok(MessageResponse::json("File deleted successfully"))
}

// ============================================================================
// Helpers
// ============================================================================

/// `<uuid>.<ext>`, keeping the client's extension so the key still maps to a MIME type.
fn generated_key(original: &str) -> String {
    let id = uuid::Uuid::new_v4();
    match std::path::Path::new(original)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| e.chars().all(|c| c.is_ascii_alphanumeric()))
    {
        Some(ext) => format!("{id}.{}", ext.to_ascii_lowercase()),
        None => id.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_key_keeps_extension() {
        let key = generated_key("Cat Photo.PNG");
        assert!(key.ends_with(".png"), "{key}");
        assert_eq!(key.len(), 36 + 4);
    }

    #[test]
    fn test_generated_key_without_extension() {
        assert_eq!(generated_key("README").len(), 36);
        assert_eq!(generated_key("weird.p/g").len(), 36);
    }

    #[test]
    fn test_tags_input() {
        let csv: TagsInput = serde_json::from_str(r#""a,b""#).unwrap();
        assert_eq!(csv.into_tags(), vec!["a", "b"]);

        let list: TagsInput = serde_json::from_str(r#"["a,b", "c"]"#).unwrap();
        assert_eq!(list.into_tags(), vec!["a,b", "c"]);
    }
}
