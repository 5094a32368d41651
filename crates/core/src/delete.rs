//! Single-object delete

use std::time::Instant;

use crate::error::{TransferError, TransferErrorKind};
use crate::outcome::TransferOutcome;
use crate::traits::{BucketRef, ObjectStore};

/// Delete `key`; a failure is recorded for this key only and not retried
pub async fn delete_object(store: &dyn ObjectStore, bucket: &BucketRef, key: &str) -> TransferOutcome {
    let started = Instant::now();

    match store.delete_object(bucket, key).await {
        Ok(()) => {
            let elapsed = started.elapsed();
            tracing::info!("Deleted {key} in {elapsed:.2?}");
            TransferOutcome::success(key, elapsed, 0)
        }
        Err(e) => {
            let elapsed = started.elapsed();
            tracing::error!("Failed to delete {key} - {e} ({elapsed:.2?})");
            TransferOutcome::failure(
                key,
                elapsed,
                TransferError::new(TransferErrorKind::Delete, e.to_string()),
            )
        }
    }
}
