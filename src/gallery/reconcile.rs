use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::dedupe::{ensure_record, Ensured};
use crate::object_store::{ObjectStore, ObjectStoreError};
use crate::storage::ImageTable;

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("No images found in the storage bucket")]
    NoImages,
    #[error("Failed to list bucket: {0}")]
    Listing(#[from] ObjectStoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Inserted,
    Skipped,
    Failed,
}

/// Per-object result of a sync pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectOutcome {
    pub file: String,
    pub url: String,
    pub status: SyncStatus,
    /// Error text for failures.
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// In bucket listing order.
    pub outcomes: Vec<ObjectOutcome>,
}

impl ReconcileReport {
    fn urls_with(&self, status: SyncStatus) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| o.status == status)
            .map(|o| o.url.as_str())
            .collect()
    }

    pub fn inserted(&self) -> Vec<&str> {
        self.urls_with(SyncStatus::Inserted)
    }

    pub fn skipped(&self) -> Vec<&str> {
        self.urls_with(SyncStatus::Skipped)
    }

    /// `(url, reason)` pairs.
    pub fn failed(&self) -> Vec<(&str, &str)> {
        self.outcomes
            .iter()
            .filter(|o| o.status == SyncStatus::Failed)
            .map(|o| (o.url.as_str(), o.message.as_deref().unwrap_or_default()))
            .collect()
    }
}

/// Give every bucket object a metadata row.
///
/// Objects are processed one at a time. A failure on one object is recorded
/// and the pass moves on; earlier inserts are never rolled back.
pub async fn reconcile(
    store: &dyn ObjectStore,
    table: &dyn ImageTable,
) -> Result<ReconcileReport, ReconcileError> {
    let objects = store.list(None).await?;
    if objects.is_empty() {
        tracing::warn!("No images found in the storage bucket");
        return Err(ReconcileError::NoImages);
    }

    let mut report = ReconcileReport::default();
    for object in objects {
        let url = store.public_url(&object.name);

        let (status, message) = match ensure_record(table, &url, Vec::new()).await {
            Ok(Ensured::Inserted(_)) => {
                tracing::info!(file = %object.name, %url, "Indexed image");
                (SyncStatus::Inserted, None)
            }
            Ok(Ensured::Exists) => {
                tracing::debug!(file = %object.name, %url, "Already indexed");
                (SyncStatus::Skipped, None)
            }
            Err(e) => {
                tracing::warn!(file = %object.name, %url, error = %e, "Failed to index image");
                (SyncStatus::Failed, Some(e.to_string()))
            }
        };

        report.outcomes.push(ObjectOutcome {
            file: object.name,
            url,
            status,
            message,
        });
    }

    Ok(report)
}
