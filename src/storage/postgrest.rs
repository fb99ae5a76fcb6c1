use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::models::{ImageRecord, InsertOutcome, NewImage};
use super::{ImageTable, TableError};

/// Postgres unique_violation
const UNIQUE_VIOLATION: &str = "23505";

/// Metadata table served by a Supabase PostgREST endpoint.
///
/// Expects a `url` column with a unique constraint so that concurrent
/// inserts of the same URL surface as a conflict instead of a second row.
pub struct PostgrestTable {
    client: Client,
    endpoint: Url,
    service_key: String,
    table: String,
}

#[derive(Debug, Deserialize)]
struct PostgrestError {
    #[serde(default)]
    code: Option<String>,
    message: String,
}

impl PostgrestTable {
    pub fn new(base_url: &str, service_key: &str, table: &str) -> Result<Self, anyhow::Error> {
        let mut endpoint = Url::parse(base_url)?;
        match endpoint.path_segments_mut() {
            Ok(mut path) => {
                path.pop_if_empty().extend(["rest", "v1", table]);
            }
            Err(()) => anyhow::bail!("SUPABASE_URL must be an absolute http(s) URL"),
        }
        let client = Client::builder().build()?;

        Ok(Self {
            client,
            endpoint,
            service_key: service_key.to_string(),
            table: table.to_string(),
        })
    }

    fn request(&self, method: reqwest::Method) -> reqwest::RequestBuilder {
        self.client
            .request(method, self.endpoint.clone())
            .bearer_auth(&self.service_key)
            .header("apikey", &self.service_key)
    }

    /// Mutations ask for the affected rows back so callers can tell a
    /// no-op (unknown id) from a success.
    fn returning(&self, method: reqwest::Method) -> reqwest::RequestBuilder {
        self.request(method).header("Prefer", "return=representation")
    }

    async fn rows<T: DeserializeOwned>(&self, resp: Response) -> Result<Vec<T>, TableError> {
        let resp = check(resp).await?;
        resp.json()
            .await
            .map_err(|e| TableError::Backend(format!("Invalid response from {}: {e}", self.table)))
    }
}

/// Pass PostgREST error messages through verbatim.
async fn check(resp: Response) -> Result<Response, TableError> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    Err(match serde_json::from_str::<PostgrestError>(&body) {
        Ok(err)
            if status == StatusCode::CONFLICT || err.code.as_deref() == Some(UNIQUE_VIOLATION) =>
        {
            TableError::Conflict(err.message)
        }
        Ok(err) => TableError::Backend(err.message),
        Err(_) => TableError::Backend(format!("PostgREST request failed ({status}): {body}")),
    })
}

fn eq(value: &str) -> String {
    format!("eq.{value}")
}

#[async_trait]
impl ImageTable for PostgrestTable {
    async fn select_all(&self) -> Result<Vec<ImageRecord>, TableError> {
        let resp = self
            .request(reqwest::Method::GET)
            .query(&[("select", "*")])
            .send()
            .await?;
        self.rows(resp).await
    }

    async fn select_by_url(&self, url: &str) -> Result<Option<ImageRecord>, TableError> {
        let filter = eq(url);
        let resp = self
            .request(reqwest::Method::GET)
            .query(&[("select", "*"), ("url", filter.as_str()), ("limit", "1")])
            .send()
            .await?;
        Ok(self.rows(resp).await?.into_iter().next())
    }

    async fn insert(&self, image: NewImage) -> Result<InsertOutcome, TableError> {
        let resp = self
            .returning(reqwest::Method::POST)
            .json(&image)
            .send()
            .await?;

        match self.rows::<ImageRecord>(resp).await {
            Ok(rows) => rows
                .into_iter()
                .next()
                .map(InsertOutcome::Inserted)
                .ok_or_else(|| TableError::Backend("Insert returned no rows".to_string())),
            Err(TableError::Conflict(message)) => {
                tracing::debug!(url = %image.url, %message, "Insert hit unique constraint");
                Ok(InsertOutcome::Duplicate)
            }
            Err(e) => Err(e),
        }
    }

    async fn update_tags(
        &self,
        id: &str,
        tags: Vec<String>,
    ) -> Result<Option<ImageRecord>, TableError> {
        let resp = self
            .returning(reqwest::Method::PATCH)
            .query(&[("id", eq(id))])
            .json(&serde_json::json!({ "tags": tags }))
            .send()
            .await?;
        Ok(self.rows(resp).await?.into_iter().next())
    }

    async fn delete_by_id(&self, id: &str) -> Result<bool, TableError> {
        let resp = self
            .returning(reqwest::Method::DELETE)
            .query(&[("id", eq(id))])
            .send()
            .await?;
        let rows: Vec<serde_json::Value> = self.rows(resp).await?;
        Ok(!rows.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint() {
        let table = PostgrestTable::new("https://abc.supabase.co", "key", "main").unwrap();
        assert_eq!(table.endpoint.as_str(), "https://abc.supabase.co/rest/v1/main");
    }

    #[test]
    fn test_eq_filter() {
        assert_eq!(eq("https://x/a.png"), "eq.https://x/a.png");
    }
}
