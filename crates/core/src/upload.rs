//! Single-file upload
//!
//! Small files go up in one request; large files are split according to
//! the [`PartitionPlan`] and sent part by part over one multipart upload.
//! Each part is streamed from its byte range of the file, so no worker
//! holds a whole part in memory.

use std::path::Path;
use std::time::Instant;

use crate::error::TransferError;
use crate::outcome::TransferOutcome;
use crate::sizer::{LARGE_FILE_THRESHOLD, MIN_PART_SIZE, PartitionPlan};
use crate::traits::{BucketRef, CompletedPart, ObjectStore};

/// Tuning for uploads
#[derive(Debug, Clone, Copy)]
pub struct UploadOptions {
    /// Parallelism hint fed to the sizer
    pub parallelism: usize,
    /// Files at or above this size use a multipart upload
    pub multipart_threshold: u64,
    /// Smallest part the backend accepts
    pub min_part_size: u64,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            parallelism: crate::pool::available_parallelism(),
            multipart_threshold: LARGE_FILE_THRESHOLD,
            min_part_size: MIN_PART_SIZE,
        }
    }
}

/// Upload `path` as the object `key`
///
/// Never fails the caller: every error is classified and returned in the
/// outcome so sibling uploads carry on.
pub async fn upload_file(
    store: &dyn ObjectStore,
    bucket: &BucketRef,
    path: &Path,
    key: &str,
    options: &UploadOptions,
) -> TransferOutcome {
    let started = Instant::now();
    let subject = path.display().to_string();

    match try_upload(store, bucket, path, key, options).await {
        Ok((size, parts)) => {
            let elapsed = started.elapsed();
            tracing::info!(
                parts,
                bytes = size,
                "Finished uploading {subject} ({parts} part(s)) in {elapsed:.2?}"
            );
            TransferOutcome::success(subject, elapsed, size)
        }
        Err(err) => {
            let elapsed = started.elapsed();
            tracing::error!(kind = ?err.kind, "Failed to upload {subject} - {err} ({elapsed:.2?})");
            TransferOutcome::failure(subject, elapsed, err)
        }
    }
}

async fn try_upload(
    store: &dyn ObjectStore,
    bucket: &BucketRef,
    path: &Path,
    key: &str,
    options: &UploadOptions,
) -> Result<(u64, u64), TransferError> {
    // Opening up front classifies unreadable and vanished files
    let file = tokio::fs::File::open(path)
        .await
        .map_err(|e| TransferError::from_io(&e))?;
    let metadata = file
        .metadata()
        .await
        .map_err(|e| TransferError::from_io(&e))?;
    drop(file);
    if metadata.is_dir() {
        return Err(TransferError::from_io(&std::io::Error::other("is a directory")));
    }
    let size = metadata.len();

    let plan = PartitionPlan::plan_with_threshold(
        size,
        options.parallelism,
        options.multipart_threshold,
    )
    .with_min_part_size(size, options.min_part_size);

    if plan.is_single_part() {
        store
            .put_object(bucket, key, path)
            .await
            .map_err(|e| TransferError::remote(&e))?;
        return Ok((size, 1));
    }

    tracing::debug!(
        part_size = plan.part_size,
        part_count = plan.part_count,
        "Starting multipart upload of {} ({})",
        path.display(),
        humansize::format_size(size, humansize::BINARY)
    );

    let upload_id = store
        .create_multipart_upload(bucket, key)
        .await
        .map_err(|e| TransferError::remote(&e))?;

    match upload_parts(store, bucket, key, &upload_id, path, &plan, size).await {
        Ok(parts) => {
            if let Err(e) = store
                .complete_multipart_upload(bucket, key, &upload_id, parts)
                .await
            {
                abort(store, bucket, key, &upload_id).await;
                return Err(TransferError::remote(&e));
            }
            Ok((size, plan.part_count))
        }
        Err(err) => {
            abort(store, bucket, key, &upload_id).await;
            Err(err)
        }
    }
}

async fn upload_parts(
    store: &dyn ObjectStore,
    bucket: &BucketRef,
    key: &str,
    upload_id: &str,
    path: &Path,
    plan: &PartitionPlan,
    size: u64,
) -> Result<Vec<CompletedPart>, TransferError> {
    let mut parts = Vec::with_capacity(plan.part_count as usize);

    for part_number in 1..=plan.part_count {
        let (start, end) = plan.part_range(part_number, size);
        let part = store
            .upload_part(bucket, key, upload_id, part_number as i32, path, start..end)
            .await
            .map_err(|e| TransferError::remote(&e))?;
        parts.push(part);
    }

    Ok(parts)
}

async fn abort(store: &dyn ObjectStore, bucket: &BucketRef, key: &str, upload_id: &str) {
    if let Err(e) = store.abort_multipart_upload(bucket, key, upload_id).await {
        tracing::warn!("Failed to abort multipart upload {upload_id} for {key}: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransferErrorKind;
    use crate::testing::MemoryStore;
    use tempfile::TempDir;

    fn bucket() -> BucketRef {
        BucketRef::new("ns", "backups")
    }

    /// Options that send every non-empty file through a multipart upload
    fn tiny_parts() -> UploadOptions {
        UploadOptions {
            parallelism: 1,
            multipart_threshold: 0,
            min_part_size: 1,
        }
    }

    fn write_file(dir: &TempDir, name: &str, data: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, data).unwrap();
        path
    }

    #[tokio::test]
    async fn test_single_part_upload() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "a.txt", b"0123456789");
        let store = MemoryStore::new();

        let outcome = upload_file(&store, &bucket(), &path, "key/a.txt", &UploadOptions::default())
            .await;

        assert!(outcome.succeeded());
        assert_eq!(outcome.bytes, 10);
        assert_eq!(store.get("key/a.txt").unwrap(), b"0123456789");
    }

    #[tokio::test]
    async fn test_empty_file_upload() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "empty", b"");
        let store = MemoryStore::new();

        let outcome = upload_file(&store, &bucket(), &path, "empty", &tiny_parts()).await;

        assert!(outcome.succeeded());
        assert_eq!(store.get("empty").unwrap(), b"");
        assert_eq!(store.pending_uploads(), 0);
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let store = MemoryStore::new();

        let outcome = upload_file(
            &store,
            &bucket(),
            &dir.path().join("vanished"),
            "vanished",
            &UploadOptions::default(),
        )
        .await;

        assert!(!outcome.succeeded());
        assert_eq!(outcome.error.unwrap().kind, TransferErrorKind::NotFound);
        assert!(store.keys().is_empty());
    }

    #[tokio::test]
    async fn test_directory_is_os_failure() {
        let dir = TempDir::new().unwrap();
        let store = MemoryStore::new();

        let outcome =
            upload_file(&store, &bucket(), dir.path(), "dir", &UploadOptions::default()).await;

        assert!(!outcome.succeeded());
        assert_eq!(outcome.error.unwrap().kind, TransferErrorKind::OsFailure);
        assert!(store.keys().is_empty());
    }

    #[tokio::test]
    async fn test_multipart_upload_reassembles_content() {
        let data: Vec<u8> = (0..=255u8).cycle().take(10_000).collect();
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "big.bin", &data);
        let store = MemoryStore::new();

        let outcome = upload_file(&store, &bucket(), &path, "big.bin", &tiny_parts()).await;

        assert!(outcome.succeeded());
        assert_eq!(outcome.bytes, 10_000);
        assert_eq!(store.get("big.bin").unwrap(), data);
        assert_eq!(store.pending_uploads(), 0);
        assert!(store.aborted().is_empty());
    }

    #[tokio::test]
    async fn test_multipart_part_count() {
        let data = vec![1u8; 10_000];
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "big.bin", &data);
        let store = MemoryStore::new();

        // 10_000 / 35 = 285 bytes per part, 36 parts once the remainder is covered
        let (size, parts) = try_upload(&store, &bucket(), &path, "big.bin", &tiny_parts())
            .await
            .unwrap();
        assert_eq!(size, 10_000);
        assert_eq!(parts, 36);
    }

    #[tokio::test]
    async fn test_failed_part_aborts_upload() {
        let data = vec![7u8; 4096];
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "big.bin", &data);
        let store = MemoryStore::new();
        store.fail_part(2);

        let outcome = upload_file(&store, &bucket(), &path, "big.bin", &tiny_parts()).await;

        assert!(!outcome.succeeded());
        assert_eq!(outcome.error.unwrap().kind, TransferErrorKind::Remote);
        assert_eq!(store.aborted(), vec!["upload-0".to_string()]);
        assert_eq!(store.pending_uploads(), 0);
        assert!(store.get("big.bin").is_none());
    }

    #[tokio::test]
    async fn test_failed_complete_aborts_upload() {
        let data = vec![9u8; 4096];
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "big.bin", &data);
        let store = MemoryStore::new();
        store.fail_complete();

        let outcome = upload_file(&store, &bucket(), &path, "big.bin", &tiny_parts()).await;

        assert!(!outcome.succeeded());
        assert_eq!(outcome.error.unwrap().kind, TransferErrorKind::Remote);
        assert_eq!(store.aborted(), vec!["upload-0".to_string()]);
        assert!(store.get("big.bin").is_none());
    }
}
