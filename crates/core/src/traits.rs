//! ObjectStore trait definition
//!
//! This trait is the capability the transfer engine consumes. It is
//! implemented by the S3 adapter and mocked or faked in tests, which keeps
//! the engine independent of any particular SDK.

use std::fmt;
use std::ops::Range;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncRead;

use crate::error::Result;

/// A namespace + bucket pair addressing one bucket on the backend
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BucketRef {
    /// Tenant-scoping namespace
    pub namespace: String,
    /// Bucket name
    pub bucket: String,
}

impl BucketRef {
    pub fn new(namespace: impl Into<String>, bucket: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            bucket: bucket.into(),
        }
    }
}

impl fmt::Display for BucketRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.bucket)
    }
}

/// A listed remote object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectEntry {
    /// Object name
    pub key: String,
    /// Size in bytes
    pub size: u64,
}

impl ObjectEntry {
    pub fn new(key: impl Into<String>, size: u64) -> Self {
        Self {
            key: key.into(),
            size,
        }
    }
}

/// Options for a single list request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListOptions {
    /// Prefix to filter by (backends may ignore it)
    pub prefix: Option<String>,

    /// Continuation cursor returned by the previous page
    pub start_with: Option<String>,

    /// Maximum number of keys to return per request
    pub max_keys: Option<i32>,
}

/// One page of a bucket listing
#[derive(Debug, Clone, Default)]
pub struct ListPage {
    /// Objects on this page
    pub entries: Vec<ObjectEntry>,

    /// Cursor for the next page; `None` or empty when the listing is exhausted
    pub next_start_with: Option<String>,
}

/// A part acknowledged by the backend during a multipart upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedPart {
    pub part_number: i32,
    pub etag: String,
}

/// Streaming body of a fetched object
pub type ObjectBody = Box<dyn AsyncRead + Send + Unpin>;

/// Trait for object storage operations against a namespace + bucket pair
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Resolve the tenant namespace this client talks to
    async fn namespace(&self) -> Result<String>;

    /// List one page of objects, size metadata only
    async fn list_objects(&self, bucket: &BucketRef, options: ListOptions) -> Result<ListPage>;

    /// Fetch an object as a stream
    async fn get_object(&self, bucket: &BucketRef, key: &str) -> Result<ObjectBody>;

    /// Upload a whole local file as one object
    async fn put_object(&self, bucket: &BucketRef, key: &str, path: &Path) -> Result<()>;

    /// Start a multipart upload and return its upload id
    async fn create_multipart_upload(&self, bucket: &BucketRef, key: &str) -> Result<String>;

    /// Upload one part (1-based part number), streamed from `range` of the file at `path`
    async fn upload_part(
        &self,
        bucket: &BucketRef,
        key: &str,
        upload_id: &str,
        part_number: i32,
        path: &Path,
        range: Range<u64>,
    ) -> Result<CompletedPart>;

    /// Assemble uploaded parts into the final object
    async fn complete_multipart_upload(
        &self,
        bucket: &BucketRef,
        key: &str,
        upload_id: &str,
        parts: Vec<CompletedPart>,
    ) -> Result<()>;

    /// Discard an unfinished multipart upload
    async fn abort_multipart_upload(
        &self,
        bucket: &BucketRef,
        key: &str,
        upload_id: &str,
    ) -> Result<()>;

    /// Delete an object
    async fn delete_object(&self, bucket: &BucketRef, key: &str) -> Result<()>;
}
