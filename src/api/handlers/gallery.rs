use axum::extract::State;
use axum::Json;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::response::{ApiError, AppQuery};
use crate::gallery::{self, SyncStatus};
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct RandomImageParams {
    /// URL the caller showed last; re-drawn a few times if picked again.
    #[serde(default)]
    pub exclude: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RandomImageResponse {
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SyncResult {
    pub file: String,
    pub status: SyncStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SyncResponse {
    pub message: String,
    pub results: Vec<SyncResult>,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn random_image(
    State(state): State<Arc<AppState>>,
    AppQuery(params): AppQuery<RandomImageParams>,
) -> Result<Json<RandomImageResponse>, ApiError> {
    let mut rng = StdRng::from_entropy();
    let url = gallery::pick_avoiding(
        state.object_store.as_ref(),
        state.config.gallery.random_list_limit,
        params.exclude.as_deref(),
        state.config.gallery.random_attempts,
        &mut rng,
    )
    .await
    .map_err(|e| {
        tracing::warn!(error = %e, "Random pick failed");
        ApiError::from(e)
    })?;

    Ok(Json(RandomImageResponse { url }))
}

pub async fn sync_bucket(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SyncResponse>, ApiError> {
    let report = gallery::reconcile(state.object_store.as_ref(), state.images.as_ref())
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, "Sync failed");
            ApiError::from(e)
        })?;

    let (inserted, skipped, failed) = (
        report.inserted().len(),
        report.skipped().len(),
        report.failed().len(),
    );
    tracing::info!(inserted, skipped, failed, "Sync complete");

    let results = report
        .outcomes
        .into_iter()
        .map(|o| SyncResult {
            message: match o.status {
                SyncStatus::Inserted => Some(format!("{} inserted successfully", o.url)),
                SyncStatus::Skipped => Some("Already exists".to_string()),
                SyncStatus::Failed => o.message,
            },
            file: o.file,
            status: o.status,
        })
        .collect();

    Ok(Json(SyncResponse {
        message: format!(
            "Processing complete: {inserted} inserted, {skipped} skipped, {failed} failed"
        ),
        results,
    }))
}
