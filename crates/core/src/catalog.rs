//! Remote object listing
//!
//! Walks every page of a bucket listing and folds the result into a
//! name → size map. The listing doubles as the pre-flight check that the
//! namespace and bucket are reachable, so a failed first page is reported
//! as a connectivity error.

use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::traits::{BucketRef, ListOptions, ObjectStore};

/// Page size requested from the backend
pub const LIST_PAGE_SIZE: i32 = 1000;

/// Name → size mapping of listed objects, sorted by name
pub type ObjectMap = BTreeMap<String, u64>;

/// List every object in `bucket`, optionally restricted to keys starting with `prefix`
pub async fn list_objects(
    store: &dyn ObjectStore,
    bucket: &BucketRef,
    prefix: Option<&str>,
) -> Result<ObjectMap> {
    let prefix = prefix.filter(|p| !p.is_empty());
    let mut objects = ObjectMap::new();
    let mut start_with: Option<String> = None;
    let mut page = 0usize;

    loop {
        let options = ListOptions {
            prefix: prefix.map(str::to_string),
            start_with: start_with.take(),
            max_keys: Some(LIST_PAGE_SIZE),
        };

        let result = match store.list_objects(bucket, options).await {
            Ok(result) => result,
            Err(e) if page == 0 => return Err(unreachable_bucket(bucket, e)),
            Err(e) => return Err(e),
        };
        page += 1;

        tracing::debug!(
            page,
            entries = result.entries.len(),
            "Listed page of {bucket}"
        );

        for entry in result.entries {
            if prefix.is_some_and(|p| !entry.key.starts_with(p)) {
                continue;
            }
            objects.insert(entry.key, entry.size);
        }

        match result.next_start_with {
            Some(next) if !next.is_empty() => start_with = Some(next),
            _ => break,
        }
    }

    Ok(objects)
}

/// Confirm `bucket` can be listed, fetching at most one key
pub async fn check_bucket(
    store: &dyn ObjectStore,
    bucket: &BucketRef,
    prefix: Option<&str>,
) -> Result<()> {
    let options = ListOptions {
        prefix: prefix.filter(|p| !p.is_empty()).map(str::to_string),
        start_with: None,
        max_keys: Some(1),
    };
    let page = store
        .list_objects(bucket, options)
        .await
        .map_err(|e| unreachable_bucket(bucket, e))?;
    tracing::debug!(entries = page.entries.len(), "Bucket {bucket} is reachable");
    Ok(())
}

fn unreachable_bucket(bucket: &BucketRef, err: Error) -> Error {
    match err {
        Error::Connectivity(_) => err,
        other => Error::Connectivity(format!("bucket {bucket}: {other}")),
    }
}
