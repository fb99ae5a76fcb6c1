mod local;
mod supabase;

pub use local::LocalStore;
pub use supabase::SupabaseStore;

use async_trait::async_trait;
use bytes::Bytes;
use std::future::Future;
use thiserror::Error;

pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Object not found: {0}")]
    NotFound(String),
    #[error("Invalid object key: {0}")]
    InvalidKey(String),
    #[error("Invalid public base URL: {0}")]
    InvalidBaseUrl(String),
    #[error("Backend error: {0}")]
    Backend(String),
}

/// An object as reported by a bucket listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub name: String,
    pub size: Option<u64>,
    pub content_type: Option<String>,
}

impl StoredObject {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size: None,
            content_type: None,
        }
    }
}

/// Abstraction over the bucket that holds gallery images.
/// The public URL of a key is the identity the metadata table indexes on,
/// so `public_url` must be deterministic for a given key.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// List objects in the bucket, following pagination until exhausted or
    /// until `limit` objects have been collected.
    async fn list(&self, limit: Option<usize>) -> Result<Vec<StoredObject>, ObjectStoreError>;
    async fn put(&self, key: &str, data: Bytes, content_type: &str)
        -> Result<(), ObjectStoreError>;
    async fn get(&self, key: &str) -> Result<Bytes, ObjectStoreError>;
    fn public_url(&self, key: &str) -> String;
}

/// One page of a remote listing. `fetched` counts raw entries, including
/// ones the backend filtered out of `objects`, so a short page can be told
/// apart from a filtered one.
pub(crate) struct ListPage {
    pub fetched: usize,
    pub objects: Vec<StoredObject>,
}

/// Walk an offset-paginated listing until a short page or until `limit`
/// objects are collected. `fetch` receives `(offset, page_limit)`.
pub(crate) async fn collect_pages<F, Fut>(
    page_size: usize,
    limit: Option<usize>,
    mut fetch: F,
) -> Result<Vec<StoredObject>, ObjectStoreError>
where
    F: FnMut(usize, usize) -> Fut,
    Fut: Future<Output = Result<ListPage, ObjectStoreError>>,
{
    let page_size = page_size.max(1);
    let mut objects = Vec::new();
    let mut offset = 0;

    loop {
        let want = match limit {
            Some(limit) => page_size.min(limit.saturating_sub(objects.len())),
            None => page_size,
        };
        if want == 0 {
            break;
        }

        let page = fetch(offset, want).await?;
        objects.extend(page.objects);
        if page.fetched < want {
            break;
        }
        offset += page.fetched;
    }

    if let Some(limit) = limit {
        objects.truncate(limit);
    }
    Ok(objects)
}

/// Reject keys that could escape the bucket namespace, and dot-prefixed
/// keys, which listings treat as hidden.
pub(crate) fn validate_key(key: &str) -> Result<(), ObjectStoreError> {
    if key.is_empty()
        || key.starts_with('.')
        || key.contains('/')
        || key.contains('\\')
        || key.chars().any(char::is_control)
    {
        return Err(ObjectStoreError::InvalidKey(key.to_string()));
    }
    Ok(())
}
