//! Single-object download
//!
//! Streams an object body to disk in fixed-size chunks, so memory use does
//! not grow with object size.

use std::path::Path;
use std::time::Instant;

use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::error::{TransferError, TransferErrorKind};
use crate::mapping::{PathMapper, resolve_dest_root};
use crate::outcome::TransferOutcome;
use crate::traits::{BucketRef, ObjectBody, ObjectStore};

/// Read size for streaming object bodies: 1 MiB
pub const CHUNK_SIZE: usize = 1024 * 1024;

/// Download `key`, placing it under `dest_prefix` (or the current directory)
/// after stripping `src_prefix`
pub async fn download_object(
    store: &dyn ObjectStore,
    bucket: &BucketRef,
    key: &str,
    src_prefix: &str,
    dest_prefix: Option<&Path>,
) -> TransferOutcome {
    let started = Instant::now();
    let dest_root = match resolve_dest_root(dest_prefix) {
        Ok(root) => root,
        Err(e) => return failed(key, started, TransferError::from_io(&e)),
    };
    match PathMapper::local_destination(key, src_prefix, &dest_root) {
        Ok(dest) => download_to(store, bucket, key, &dest).await,
        Err(err) => failed(key, started, err),
    }
}

/// Download `key` to exactly `dest`, creating missing parent directories
pub async fn download_to(
    store: &dyn ObjectStore,
    bucket: &BucketRef,
    key: &str,
    dest: &Path,
) -> TransferOutcome {
    let started = Instant::now();

    match try_download(store, bucket, key, dest).await {
        Ok(bytes) => {
            let elapsed = started.elapsed();
            tracing::info!(
                bytes,
                "Finished downloading {key} to {} in {elapsed:.2?}",
                dest.display()
            );
            TransferOutcome::success(key, elapsed, bytes)
        }
        Err(err) => failed(key, started, err),
    }
}

fn failed(key: &str, started: Instant, err: TransferError) -> TransferOutcome {
    let elapsed = started.elapsed();
    tracing::error!(kind = ?err.kind, "Failed to download {key} - {err} ({elapsed:.2?})");
    TransferOutcome::failure(key, elapsed, err)
}

async fn try_download(
    store: &dyn ObjectStore,
    bucket: &BucketRef,
    key: &str,
    dest: &Path,
) -> Result<u64, TransferError> {
    // Folder placeholder objects become directories
    if key.ends_with('/') {
        tokio::fs::create_dir_all(dest)
            .await
            .map_err(|e| TransferError::from_io(&e))?;
        return Ok(0);
    }

    let mut body = store
        .get_object(bucket, key)
        .await
        .map_err(|e| TransferError::new(TransferErrorKind::RemoteFetch, e.to_string()))?;

    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| TransferError::from_io(&e))?;
    }

    let mut file = File::create(dest)
        .await
        .map_err(|e| TransferError::from_io(&e))?;

    match stream_to_file(&mut body, &mut file).await {
        Ok(bytes) => Ok(bytes),
        Err(err) => {
            drop(file);
            if let Err(e) = tokio::fs::remove_file(dest).await {
                tracing::warn!("Failed to remove partial file {}: {e}", dest.display());
            }
            Err(err)
        }
    }
}

async fn stream_to_file(body: &mut ObjectBody, file: &mut File) -> Result<u64, TransferError> {
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut total = 0u64;

    loop {
        let n = body
            .read(&mut buf)
            .await
            .map_err(|e| TransferError::new(TransferErrorKind::RemoteFetch, e.to_string()))?;
        if n == 0 {
            break;
        }
        file.write_all(&buf[..n])
            .await
            .map_err(|e| TransferError::from_io(&e))?;
        total += n as u64;
    }

    file.flush().await.map_err(|e| TransferError::from_io(&e))?;
    Ok(total)
}
