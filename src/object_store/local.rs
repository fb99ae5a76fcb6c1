use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Url;
use std::path::{Path, PathBuf};

use super::{validate_key, ObjectStore, ObjectStoreError, StoredObject};

/// Local filesystem bucket for development and testing.
/// Objects are served back through the `/storage/*key` route.
pub struct LocalStore {
    base_path: PathBuf,
    public_base_url: Url,
}

impl LocalStore {
    pub fn new<P: AsRef<Path>>(
        base_path: P,
        public_base_url: &str,
    ) -> Result<Self, ObjectStoreError> {
        let public_base_url = Url::parse(public_base_url)
            .map_err(|e| ObjectStoreError::InvalidBaseUrl(format!("{public_base_url}: {e}")))?;
        if public_base_url.cannot_be_a_base() {
            return Err(ObjectStoreError::InvalidBaseUrl(public_base_url.to_string()));
        }
        let base_path = base_path.as_ref().to_path_buf();
        std::fs::create_dir_all(&base_path)?;
        Ok(Self {
            base_path,
            public_base_url,
        })
    }

    fn object_path(&self, key: &str) -> Result<PathBuf, ObjectStoreError> {
        validate_key(key)?;
        Ok(self.base_path.join(key))
    }
}

#[async_trait]
impl ObjectStore for LocalStore {
    async fn list(&self, limit: Option<usize>) -> Result<Vec<StoredObject>, ObjectStoreError> {
        let mut objects = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.base_path).await?;

        while let Some(entry) = entries.next_entry().await? {
            let meta = entry.metadata().await?;
            if !meta.is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                tracing::warn!(path = ?entry.path(), "Skipping non UTF-8 object name");
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            let content_type = mime_guess::from_path(&name).first().map(|m| m.to_string());
            objects.push(StoredObject {
                name,
                size: Some(meta.len()),
                content_type,
            });
        }

        // read_dir order is unspecified; sort so listings page the same way remote buckets do
        objects.sort_by(|a, b| a.name.cmp(&b.name));
        if let Some(limit) = limit {
            objects.truncate(limit);
        }
        Ok(objects)
    }

    async fn put(
        &self,
        key: &str,
        data: Bytes,
        _content_type: &str,
    ) -> Result<(), ObjectStoreError> {
        let path = self.object_path(key)?;
        tokio::fs::write(&path, &data).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Bytes, ObjectStoreError> {
        let path = self.object_path(key)?;
        if !path.exists() {
            return Err(ObjectStoreError::NotFound(key.to_string()));
        }
        let data = tokio::fs::read(&path).await?;
        Ok(Bytes::from(data))
    }

    fn public_url(&self, key: &str) -> String {
        let mut url = self.public_base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().push("storage").push(key);
        }
        url.to_string()
    }
}
