use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use std::sync::Arc;

use crate::api::response::ApiError;
use crate::object_store::{ObjectStoreError, DEFAULT_CONTENT_TYPE};
use crate::AppState;

/// Serve object bytes by key. Public URLs of the local backend point here.
/// Route: GET /storage/*key
pub async fn serve_object(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<Response, ApiError> {
    let data = state.object_store.get(&key).await.map_err(|e| match e {
        ObjectStoreError::NotFound(_) | ObjectStoreError::InvalidKey(_) => {
            ApiError::not_found("File content not found")
        }
        _ => ApiError::internal(format!("Failed to retrieve file: {e}")),
    })?;

    let mime_type = mime_guess::from_path(&key)
        .first()
        .map(|m| m.to_string())
        .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());

    let mut response = (StatusCode::OK, data).into_response();
    let headers = response.headers_mut();

    headers.insert(
        header::CONTENT_TYPE,
        mime_type
            .parse()
            .unwrap_or(header::HeaderValue::from_static(DEFAULT_CONTENT_TYPE)),
    );

    if let Ok(value) = format!("inline; filename=\"{}\"", key.replace('"', "")).parse() {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }

    // Cache for 1 hour
    headers.insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("public, max-age=3600"),
    );

    Ok(response)
}
