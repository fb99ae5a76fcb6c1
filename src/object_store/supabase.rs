use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};

use super::{collect_pages, validate_key, ListPage, ObjectStore, ObjectStoreError, StoredObject};

/// Supabase Storage bucket backend.
pub struct SupabaseStore {
    base_url: Url,
    bucket: String,
    client: Client,
    page_size: usize,
    service_key: String,
}

#[derive(Serialize)]
struct ListRequest<'a> {
    prefix: &'a str,
    limit: usize,
    offset: usize,
    #[serde(rename = "sortBy")]
    sort_by: SortBy<'a>,
}

#[derive(Serialize)]
struct SortBy<'a> {
    column: &'a str,
    order: &'a str,
}

#[derive(Deserialize)]
struct ListEntry {
    name: String,
    /// Folders come back with a null id.
    id: Option<String>,
    #[serde(default)]
    metadata: Option<EntryMetadata>,
}

#[derive(Deserialize)]
struct EntryMetadata {
    #[serde(default)]
    size: Option<u64>,
    #[serde(default)]
    mimetype: Option<String>,
}

impl SupabaseStore {
    pub fn new(
        base_url: &str,
        service_key: &str,
        bucket: &str,
        page_size: usize,
    ) -> Result<Self, anyhow::Error> {
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("SUPABASE_URL must be an absolute http(s) URL");
        }
        let client = Client::builder().build()?;

        Ok(Self {
            base_url,
            bucket: bucket.to_string(),
            client,
            page_size: page_size.max(1),
            service_key: service_key.to_string(),
        })
    }

    /// `{base}/storage/v1/object/<segments...>`, each segment percent-encoded.
    fn object_endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(["storage", "v1", "object"]);
            path.extend(segments);
        }
        url
    }

    fn list_url(&self) -> Url {
        self.object_endpoint(&["list", &self.bucket])
    }

    fn upload_url(&self, key: &str) -> Url {
        self.object_endpoint(&[&self.bucket, key])
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .bearer_auth(&self.service_key)
            .header("apikey", &self.service_key)
    }

    async fn list_page(&self, offset: usize, limit: usize) -> Result<ListPage, ObjectStoreError> {
        let body = ListRequest {
            prefix: "",
            limit,
            offset,
            sort_by: SortBy {
                column: "name",
                order: "asc",
            },
        };

        let resp = self
            .authorized(self.client.post(self.list_url()))
            .json(&body)
            .send()
            .await
            .map_err(|e| ObjectStoreError::Backend(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(ObjectStoreError::Backend(format!(
                "Supabase list failed ({status}): {body}"
            )));
        }

        let entries: Vec<ListEntry> = resp
            .json()
            .await
            .map_err(|e| ObjectStoreError::Backend(e.to_string()))?;
        let fetched = entries.len();
        tracing::debug!(bucket = %self.bucket, offset, fetched, "Listed bucket page");

        let objects = entries
            .into_iter()
            // Folders have no id; dot-files are bucket placeholders
            .filter(|e| e.id.is_some() && !e.name.starts_with('.'))
            .map(|e| {
                let (size, content_type) = e
                    .metadata
                    .map(|m| (m.size, m.mimetype))
                    .unwrap_or((None, None));
                StoredObject {
                    name: e.name,
                    size,
                    content_type,
                }
            })
            .collect();

        Ok(ListPage { fetched, objects })
    }
}

#[async_trait]
impl ObjectStore for SupabaseStore {
    async fn list(&self, limit: Option<usize>) -> Result<Vec<StoredObject>, ObjectStoreError> {
        collect_pages(self.page_size, limit, move |offset, want| {
            self.list_page(offset, want)
        })
        .await
    }

    async fn put(
        &self,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> Result<(), ObjectStoreError> {
        validate_key(key)?;

        // Upsert so re-uploading an existing key lands on the dedupe path
        // instead of failing with a duplicate-object error.
        let resp = self
            .authorized(self.client.post(self.upload_url(key)))
            .header("Content-Type", content_type)
            .header("x-upsert", "true")
            .body(data)
            .send()
            .await
            .map_err(|e| ObjectStoreError::Backend(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(ObjectStoreError::Backend(format!(
                "Supabase upload failed ({status}): {body}"
            )));
        }

        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Bytes, ObjectStoreError> {
        validate_key(key)?;

        let resp = self
            .authorized(self.client.get(self.upload_url(key)))
            .send()
            .await
            .map_err(|e| ObjectStoreError::Backend(e.to_string()))?;

        // Storage API reports missing objects as 400 with a "not_found" body on some versions
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ObjectStoreError::NotFound(key.to_string()));
        }

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            if body.contains("not_found") || body.contains("Object not found") {
                return Err(ObjectStoreError::NotFound(key.to_string()));
            }
            return Err(ObjectStoreError::Backend(format!(
                "Supabase download failed ({status}): {body}"
            )));
        }

        resp.bytes()
            .await
            .map_err(|e| ObjectStoreError::Backend(e.to_string()))
    }

    fn public_url(&self, key: &str) -> String {
        self.object_endpoint(&["public", &self.bucket, key]).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SupabaseStore {
        SupabaseStore::new("https://abc.supabase.co", "service-key", "images", 100).unwrap()
    }

    #[test]
    fn test_public_url() {
        assert_eq!(
            store().public_url("cat.png"),
            "https://abc.supabase.co/storage/v1/object/public/images/cat.png"
        );
    }

    #[test]
    fn test_public_url_encodes_key() {
        assert_eq!(
            store().public_url("my cat#1.png"),
            "https://abc.supabase.co/storage/v1/object/public/images/my%20cat%231.png"
        );
    }

    #[test]
    fn test_endpoints_respect_base_path() {
        let store =
            SupabaseStore::new("http://localhost:54321/", "k", "images", 100).unwrap();
        assert_eq!(
            store.list_url().as_str(),
            "http://localhost:54321/storage/v1/object/list/images"
        );
        assert_eq!(
            store.upload_url("a.png").as_str(),
            "http://localhost:54321/storage/v1/object/images/a.png"
        );
    }

    #[test]
    fn test_rejects_relative_url() {
        assert!(SupabaseStore::new("not a url", "k", "images", 100).is_err());
    }
}
