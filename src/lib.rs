//! image-gallery - admin service for a tagged image bucket
//!
//! This crate provides:
//! - Swappable object storage backends (local filesystem, Supabase Storage)
//! - A metadata table of `{id, url, tags}` rows (embedded redb or Supabase PostgREST)
//! - Bucket sync, deduplicated uploads and random image picks
//! - REST API with multipart upload support and signed admin tokens

pub mod api;
pub mod auth;
pub mod config;
pub mod gallery;
pub mod object_store;
pub mod storage;
#[cfg(test)]
pub mod testutil;

use std::sync::Arc;

use auth::AdminAuth;
use config::Config;
use object_store::ObjectStore;
use storage::ImageTable;

/// Shared application state
pub struct AppState {
    pub auth: AdminAuth,
    pub config: Config,
    pub images: Arc<dyn ImageTable>,
    pub object_store: Arc<dyn ObjectStore>,
}
