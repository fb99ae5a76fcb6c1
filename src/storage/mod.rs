pub mod db;
mod images;
pub mod models;
mod postgrest;
mod tables;

pub use db::{Database, DatabaseError};
pub use postgrest::PostgrestTable;
pub use tables::*;

use async_trait::async_trait;
use thiserror::Error;

use models::{ImageRecord, InsertOutcome, NewImage};

#[derive(Debug, Error)]
pub enum TableError {
    #[error(transparent)]
    Database(#[from] DatabaseError),
    #[error("{0}")]
    Http(#[from] reqwest::Error),
    /// Unique constraint violation reported by the backend.
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Backend(String),
}

/// The metadata table: one row per indexed image, unique on `url`.
/// Every operation targets the same table.
#[async_trait]
pub trait ImageTable: Send + Sync {
    async fn select_all(&self) -> Result<Vec<ImageRecord>, TableError>;
    async fn select_by_url(&self, url: &str) -> Result<Option<ImageRecord>, TableError>;
    /// Insert a new row. A URL that is already present yields
    /// `InsertOutcome::Duplicate` rather than an error.
    async fn insert(&self, image: NewImage) -> Result<InsertOutcome, TableError>;
    /// Replace the tags of a row. `None` if the id is unknown.
    async fn update_tags(&self, id: &str, tags: Vec<String>)
        -> Result<Option<ImageRecord>, TableError>;
    /// `false` if the id is unknown.
    async fn delete_by_id(&self, id: &str) -> Result<bool, TableError>;
}
