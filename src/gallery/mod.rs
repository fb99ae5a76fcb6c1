//! Gallery operations over an object store and the metadata table:
//! bucket sync, tagged uploads and random picks.

mod dedupe;
mod random;
mod reconcile;
mod upload;

pub use dedupe::{ensure_record, parse_tags, Ensured};
pub use random::{
    pick_avoiding, pick_random, PickError, DEFAULT_PICK_ATTEMPTS, DEFAULT_PICK_LIMIT,
};
pub use reconcile::{reconcile, ObjectOutcome, ReconcileError, ReconcileReport, SyncStatus};
pub use upload::{upload_image, UploadError, UploadOutcome, UploadRequest, UploadStatus};
