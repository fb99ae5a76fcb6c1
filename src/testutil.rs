//! Shared test helpers for image-gallery handler tests.

use std::sync::Arc;

use chrono::Utc;

use crate::auth::AdminAuth;
use crate::config::{
    AdminConfig, Config, GalleryConfig, MetadataConfig, NodeConfig, StorageConfig,
};
use crate::object_store::LocalStore;
use crate::storage::Database;
use crate::AppState;

pub const TEST_USER: &str = "admin";
pub const TEST_PASSWORD: &str = "correct horse";
pub const TEST_BASE_URL: &str = "http://gallery.test";

/// Create a test AppState with a temporary database and local object store.
/// Uploads keep their original file names so repeated uploads dedupe.
pub fn test_state(temp_dir: &tempfile::TempDir) -> Arc<AppState> {
    let data_dir = temp_dir.path().join("data");
    let files_dir = temp_dir.path().join("files");

    let config = Config {
        admin: AdminConfig {
            username: TEST_USER.to_string(),
            password: TEST_PASSWORD.to_string(),
            token_secret: Some("test-secret".to_string()),
            token_ttl_secs: 600,
        },
        gallery: GalleryConfig {
            randomize_keys: false,
            ..Default::default()
        },
        metadata: MetadataConfig::default(),
        node: NodeConfig {
            bind_address: "127.0.0.1:0".to_string(),
            data_dir: data_dir.to_string_lossy().to_string(),
            public_base_url: TEST_BASE_URL.to_string(),
        },
        storage: StorageConfig {
            local_storage_path: files_dir.to_string_lossy().to_string(),
            ..Default::default()
        },
        supabase: None,
        max_upload_size: 1024 * 1024, // 1MB for tests
    };

    let db = Database::open(&data_dir).expect("Failed to open test database");
    let object_store = LocalStore::new(&files_dir, TEST_BASE_URL)
        .expect("Failed to create test object store");
    let auth = AdminAuth::new(TEST_USER, TEST_PASSWORD, b"test-secret", 600);

    Arc::new(AppState {
        auth,
        config,
        images: Arc::new(db),
        object_store: Arc::new(object_store),
    })
}

/// A valid admin bearer token for `state`.
pub fn admin_token(state: &AppState) -> String {
    state.auth.issue(Utc::now()).token
}
