mod admin;
mod auth;
mod gallery;
mod images;
mod static_files;

use crate::api::response::ApiError;
use crate::storage::TableError;

pub use admin::health;
pub use auth::{login, require_admin};
pub use gallery::{random_image, sync_bucket};
pub use images::{delete_image, list_images, update_image_tags, upload_image};
pub use static_files::serve_object;

/// Map a metadata table failure to an ApiError, keeping the store's message.
fn table_error(e: TableError) -> ApiError {
    tracing::error!(error = %e, "Metadata table request failed");
    ApiError::upstream(e.to_string())
}
