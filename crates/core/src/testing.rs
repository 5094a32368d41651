//! In-memory object store used by the transfer tests

use std::collections::{BTreeMap, HashMap, HashSet};
use std::ops::Range;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use crate::error::{Error, Result};
use crate::traits::{
    BucketRef, CompletedPart, ListOptions, ListPage, ObjectBody, ObjectEntry, ObjectStore,
};

#[derive(Default)]
pub struct MemoryStore {
    objects: Mutex<BTreeMap<String, Vec<u8>>>,
    uploads: Mutex<HashMap<String, (String, BTreeMap<i32, Vec<u8>>)>>,
    aborted: Mutex<Vec<String>>,
    fail_parts: Mutex<HashSet<i32>>,
    fail_complete: AtomicBool,
    page_size: Option<usize>,
    next_upload: AtomicUsize,
    pub list_calls: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            page_size: Some(page_size),
            ..Self::default()
        }
    }

    pub fn insert(&self, key: &str, data: &[u8]) {
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), data.to_vec());
    }

    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }

    pub fn fail_part(&self, part_number: i32) {
        self.fail_parts.lock().unwrap().insert(part_number);
    }

    pub fn fail_complete(&self) {
        self.fail_complete.store(true, Ordering::SeqCst);
    }

    pub fn aborted(&self) -> Vec<String> {
        self.aborted.lock().unwrap().clone()
    }

    pub fn pending_uploads(&self) -> usize {
        self.uploads.lock().unwrap().len()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn namespace(&self) -> Result<String> {
        Ok("test-namespace".to_string())
    }

    async fn list_objects(&self, _bucket: &BucketRef, options: ListOptions) -> Result<ListPage> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let objects = self.objects.lock().unwrap();
        let mut matching = objects
            .iter()
            .filter(|(k, _)| options.start_with.as_deref().is_none_or(|s| k.as_str() >= s))
            .map(|(k, v)| ObjectEntry::new(k.clone(), v.len() as u64));

        let limit = self.page_size.unwrap_or(usize::MAX);
        let entries: Vec<ObjectEntry> = matching.by_ref().take(limit).collect();
        let next_start_with = matching.next().map(|e| e.key);

        Ok(ListPage {
            entries,
            next_start_with,
        })
    }

    async fn get_object(&self, _bucket: &BucketRef, key: &str) -> Result<ObjectBody> {
        let data = self
            .get(key)
            .ok_or_else(|| Error::NotFound(key.to_string()))?;
        Ok(Box::new(std::io::Cursor::new(data)))
    }

    async fn put_object(&self, _bucket: &BucketRef, key: &str, path: &Path) -> Result<()> {
        let data = tokio::fs::read(path).await?;
        self.insert(key, &data);
        Ok(())
    }

    async fn create_multipart_upload(&self, _bucket: &BucketRef, key: &str) -> Result<String> {
        let id = format!("upload-{}", self.next_upload.fetch_add(1, Ordering::SeqCst));
        self.uploads
            .lock()
            .unwrap()
            .insert(id.clone(), (key.to_string(), BTreeMap::new()));
        Ok(id)
    }

    async fn upload_part(
        &self,
        _bucket: &BucketRef,
        _key: &str,
        upload_id: &str,
        part_number: i32,
        path: &Path,
        range: Range<u64>,
    ) -> Result<CompletedPart> {
        if self.fail_parts.lock().unwrap().contains(&part_number) {
            return Err(Error::Network(format!("part {part_number} rejected")));
        }
        let mut file = tokio::fs::File::open(path).await?;
        file.seek(std::io::SeekFrom::Start(range.start)).await?;
        let mut data = vec![0u8; (range.end - range.start) as usize];
        file.read_exact(&mut data).await?;

        let mut uploads = self.uploads.lock().unwrap();
        let (_, parts) = uploads
            .get_mut(upload_id)
            .ok_or_else(|| Error::NotFound(upload_id.to_string()))?;
        parts.insert(part_number, data);
        Ok(CompletedPart {
            part_number,
            etag: format!("etag-{part_number}"),
        })
    }

    async fn complete_multipart_upload(
        &self,
        _bucket: &BucketRef,
        key: &str,
        upload_id: &str,
        parts: Vec<CompletedPart>,
    ) -> Result<()> {
        if self.fail_complete.load(Ordering::SeqCst) {
            return Err(Error::Network("complete rejected".into()));
        }
        let (_, stored) = self
            .uploads
            .lock()
            .unwrap()
            .remove(upload_id)
            .ok_or_else(|| Error::NotFound(upload_id.to_string()))?;
        let mut data = Vec::new();
        for part in parts {
            let bytes = stored
                .get(&part.part_number)
                .ok_or_else(|| Error::General(format!("missing part {}", part.part_number)))?;
            data.extend_from_slice(bytes);
        }
        self.insert(key, &data);
        Ok(())
    }

    async fn abort_multipart_upload(
        &self,
        _bucket: &BucketRef,
        _key: &str,
        upload_id: &str,
    ) -> Result<()> {
        self.uploads.lock().unwrap().remove(upload_id);
        self.aborted.lock().unwrap().push(upload_id.to_string());
        Ok(())
    }

    async fn delete_object(&self, _bucket: &BucketRef, key: &str) -> Result<()> {
        self.objects
            .lock()
            .unwrap()
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| Error::NotFound(key.to_string()))
    }
}
