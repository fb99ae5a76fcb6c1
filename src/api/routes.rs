use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::config::Backend;
use crate::AppState;

/// Room for multipart boundaries, part headers and the tags field on top of
/// the file itself; the file size is checked separately in the handler.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn create_router(state: Arc<AppState>) -> Router {
    let upload_limit = usize::try_from(state.config.max_upload_size)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD);

    // Admin routes require a bearer token from /api/login
    let admin = Router::new()
        .route("/api/sync", post(handlers::sync_bucket))
        .route("/api/images", get(handlers::list_images))
        .route(
            "/api/images",
            post(handlers::upload_image).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/api/images", put(handlers::update_image_tags))
        .route("/api/images", delete(handlers::delete_image))
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            handlers::require_admin,
        ));

    let mut router = Router::new()
        .route("/api/login", post(handlers::login))
        .route("/api/random", get(handlers::random_image))
        // Internal
        .route("/_internal/health", get(handlers::health))
        .merge(admin);

    // Local objects are served by this process; remote buckets serve their own URLs
    if state.config.storage.backend == Backend::Local {
        router = router.route("/storage/*key", get(handlers::serve_object));
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}
