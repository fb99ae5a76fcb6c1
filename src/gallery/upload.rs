use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::dedupe::{ensure_record, parse_tags, Ensured};
use crate::object_store::{validate_key, ObjectStore, DEFAULT_CONTENT_TYPE};
use crate::storage::ImageTable;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("File is required")]
    MissingFile,
    #[error("File name is missing")]
    MissingFilename,
    #[error("Invalid file name: {0}")]
    InvalidFilename(String),
    #[error("Error uploading file to storage: {0}")]
    StorageWriteFailed(String),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

#[derive(Debug, Default)]
pub struct UploadRequest {
    pub data: Bytes,
    /// Client-supplied file name.
    pub original_name: Option<String>,
    /// Server-generated storage key; preferred over `original_name`.
    pub generated_name: Option<String>,
    pub content_type: Option<String>,
    pub tags_csv: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    Inserted,
    Exists,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOutcome {
    pub status: UploadStatus,
    pub key: String,
    pub url: String,
}

impl UploadRequest {
    /// Storage key: the generated name if usable, else the last path
    /// component of the original name. Blank candidates are skipped.
    pub fn storage_key(&self) -> Result<String, UploadError> {
        [self.generated_name.as_deref(), self.original_name.as_deref()]
            .into_iter()
            .flatten()
            .map(|name| name.rsplit(['/', '\\']).next().unwrap_or(name).trim())
            .find(|name| !name.is_empty())
            .map(str::to_string)
            .ok_or(UploadError::MissingFilename)
    }
}

/// Store one file and index it, unless its URL is already indexed.
pub async fn upload_image(
    store: &dyn ObjectStore,
    table: &dyn ImageTable,
    req: UploadRequest,
) -> Result<UploadOutcome, UploadError> {
    if req.data.is_empty() {
        return Err(UploadError::MissingFile);
    }
    let key = req.storage_key()?;
    if validate_key(&key).is_err() {
        return Err(UploadError::InvalidFilename(key));
    }
    let content_type = req
        .content_type
        .as_deref()
        .filter(|ct| !ct.is_empty())
        .unwrap_or(DEFAULT_CONTENT_TYPE);

    store
        .put(&key, req.data, content_type)
        .await
        .map_err(|e| UploadError::StorageWriteFailed(e.to_string()))?;

    let url = store.public_url(&key);

    let status = match ensure_record(table, &url, parse_tags(&req.tags_csv)).await {
        Ok(Ensured::Inserted(_)) => UploadStatus::Inserted,
        Ok(Ensured::Exists) => UploadStatus::Exists,
        Err(e) => {
            tracing::error!(%url, error = %e, "Failed to index uploaded image");
            return Err(UploadError::DatabaseError(e.to_string()));
        }
    };

    tracing::debug!(%key, %url, ?status, "Uploaded image");
    Ok(UploadOutcome { status, key, url })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(original: Option<&str>, generated: Option<&str>) -> UploadRequest {
        UploadRequest {
            original_name: original.map(str::to_string),
            generated_name: generated.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_storage_key_prefers_generated_name() {
        let req = named(Some("cat.png"), Some("0190-abc.png"));
        assert_eq!(req.storage_key().unwrap(), "0190-abc.png");
    }

    #[test]
    fn test_storage_key_falls_back_to_original() {
        let req = named(Some("cat.png"), None);
        assert_eq!(req.storage_key().unwrap(), "cat.png");
    }

    #[test]
    fn test_storage_key_skips_blank_generated_name() {
        let req = named(Some("cat.png"), Some(""));
        assert_eq!(req.storage_key().unwrap(), "cat.png");

        let req = named(Some("cat.png"), Some("dir/"));
        assert_eq!(req.storage_key().unwrap(), "cat.png");

        let req = named(Some("  "), Some(" "));
        assert!(matches!(req.storage_key(), Err(UploadError::MissingFilename)));
    }

    #[test]
    fn test_storage_key_strips_client_directories() {
        assert_eq!(
            named(Some("../../etc/cat.png"), None).storage_key().unwrap(),
            "cat.png"
        );
        assert_eq!(
            named(Some("C:\\Users\\me\\dog.jpg"), None)
                .storage_key()
                .unwrap(),
            "dog.jpg"
        );
    }

    #[test]
    fn test_storage_key_missing() {
        assert!(matches!(
            named(None, None).storage_key(),
            Err(UploadError::MissingFilename)
        ));
        assert!(matches!(
            named(Some("dir/"), None).storage_key(),
            Err(UploadError::MissingFilename)
        ));
    }
}
