//! Multi-file transfer orchestration
//!
//! Turns an action into one task per file or object and fans the tasks out
//! over a [`WorkerPool`]. A failed task never stops its siblings; the
//! returned [`RunReport`] records whether any of them failed.

use std::fmt;
use std::fs::FileType;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::catalog::ObjectMap;
use crate::delete::delete_object;
use crate::download::download_to;
use crate::error::{Error, Result, TransferError};
use crate::mapping::{PathMapper, absolute_path, resolve_dest_root};
use crate::outcome::{RunReport, TransferOutcome};
use crate::pool::WorkerPool;
use crate::traits::{BucketRef, ObjectStore};
use crate::upload::{UploadOptions, upload_file};

/// Top-level action requested by the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Upload,
    Download,
    List,
    Delete,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Action::Upload => "upload",
            Action::Download => "download",
            Action::List => "list",
            Action::Delete => "delete",
        })
    }
}

/// One unit of work, consumed exactly once by a worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferTask {
    Upload { path: PathBuf, key: String },
    Download { key: String, destination: PathBuf },
    Delete { key: String },
}

impl fmt::Display for TransferTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferTask::Upload { path, .. } => write!(f, "{}", path.display()),
            TransferTask::Download { key, .. } | TransferTask::Delete { key } => f.write_str(key),
        }
    }
}

/// Tasks ready to run, plus objects that were rejected while planning
#[derive(Debug, Default)]
pub struct TaskPlan {
    pub tasks: Vec<TransferTask>,
    pub rejected: Vec<TransferOutcome>,
}

impl TaskPlan {
    pub fn len(&self) -> usize {
        self.tasks.len() + self.rejected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Runs batches of transfers against one bucket
#[derive(Clone)]
pub struct TransferCoordinator {
    store: Arc<dyn ObjectStore>,
    bucket: BucketRef,
    pool: WorkerPool,
    mapper: PathMapper,
    upload_options: UploadOptions,
}

impl TransferCoordinator {
    /// Coordinator with one worker per available CPU
    pub fn new(store: Arc<dyn ObjectStore>, bucket: BucketRef) -> Self {
        Self {
            store,
            bucket,
            pool: WorkerPool::default(),
            mapper: PathMapper::new(),
            upload_options: UploadOptions::default(),
        }
    }

    /// Set the worker count and the sizer's parallelism hint
    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.pool = WorkerPool::new(parallelism);
        self.upload_options.parallelism = self.pool.workers();
        self
    }

    pub fn with_mapper(mut self, mapper: PathMapper) -> Self {
        self.mapper = mapper;
        self
    }

    pub fn bucket(&self) -> &BucketRef {
        &self.bucket
    }

    /// Plan one upload per eligible file under `src`
    ///
    /// Entries the directory walk could not read are carried as failures.
    pub fn plan_upload(&self, src: &Path) -> Result<TaskPlan> {
        let scan = enumerate_local(src)?;
        let tasks = scan
            .files
            .into_iter()
            .map(|path| -> Result<TransferTask> {
                let path = absolute_path(&path)?;
                let key = self.mapper.remote_key(&path)?;
                Ok(TransferTask::Upload { path, key })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(TaskPlan {
            tasks,
            rejected: scan.unreadable,
        })
    }

    /// Plan one download per listed object
    ///
    /// Objects whose key cannot be mapped to a safe local path are rejected
    /// up front and reported as failures.
    pub fn plan_download(
        &self,
        objects: &ObjectMap,
        src_prefix: &str,
        dest_prefix: Option<&Path>,
    ) -> Result<TaskPlan> {
        let dest_root = resolve_dest_root(dest_prefix)?;
        let mut plan = TaskPlan::default();

        for key in objects.keys() {
            match PathMapper::local_destination(key, src_prefix, &dest_root) {
                Ok(destination) => plan.tasks.push(TransferTask::Download {
                    key: key.clone(),
                    destination,
                }),
                Err(err) => {
                    tracing::error!("Failed to download {key} - {err}");
                    plan.rejected
                        .push(TransferOutcome::failure(key.clone(), Default::default(), err));
                }
            }
        }

        Ok(plan)
    }

    /// Plan one delete per listed object
    pub fn plan_delete(&self, objects: &ObjectMap) -> TaskPlan {
        TaskPlan {
            tasks: objects
                .keys()
                .map(|key| TransferTask::Delete { key: key.clone() })
                .collect(),
            rejected: Vec::new(),
        }
    }

    /// Run a plan to completion
    pub async fn execute(
        &self,
        plan: TaskPlan,
        mut on_outcome: impl FnMut(&TransferOutcome),
    ) -> RunReport {
        let started = Instant::now();
        let store = Arc::clone(&self.store);
        let bucket = self.bucket.clone();
        let options = self.upload_options;

        let mut report = self
            .pool
            .run(
                plan.tasks,
                move |task| {
                    let store = Arc::clone(&store);
                    let bucket = bucket.clone();
                    async move { run_task(store.as_ref(), &bucket, task, &options).await }
                },
                &mut on_outcome,
            )
            .await;

        for outcome in plan.rejected {
            on_outcome(&outcome);
            report.record(outcome);
        }

        report.elapsed = started.elapsed();
        tracing::info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            "Run finished in {:.2?}",
            report.elapsed
        );
        report
    }

    /// Upload `src` (a file or a directory tree)
    pub async fn upload(
        &self,
        src: &Path,
        on_outcome: impl FnMut(&TransferOutcome),
    ) -> Result<RunReport> {
        let plan = self.plan_upload(src)?;
        Ok(self.execute(plan, on_outcome).await)
    }

    /// Download every listed object
    pub async fn download(
        &self,
        objects: &ObjectMap,
        src_prefix: &str,
        dest_prefix: Option<&Path>,
        on_outcome: impl FnMut(&TransferOutcome),
    ) -> Result<RunReport> {
        let plan = self.plan_download(objects, src_prefix, dest_prefix)?;
        Ok(self.execute(plan, on_outcome).await)
    }

    /// Delete every listed object
    pub async fn delete(
        &self,
        objects: &ObjectMap,
        on_outcome: impl FnMut(&TransferOutcome),
    ) -> RunReport {
        let plan = self.plan_delete(objects);
        self.execute(plan, on_outcome).await
    }
}

async fn run_task(
    store: &dyn ObjectStore,
    bucket: &BucketRef,
    task: TransferTask,
    options: &UploadOptions,
) -> TransferOutcome {
    match task {
        TransferTask::Upload { path, key } => {
            tracing::debug!("Starting upload for {}", path.display());
            upload_file(store, bucket, &path, &key, options).await
        }
        TransferTask::Download { key, destination } => {
            download_to(store, bucket, &key, &destination).await
        }
        TransferTask::Delete { key } => delete_object(store, bucket, &key).await,
    }
}

/// Result of walking an upload source
#[derive(Debug, Default)]
pub struct LocalScan {
    /// Files to upload
    pub files: Vec<PathBuf>,
    /// Entries the walk could not read, already failed
    pub unreadable: Vec<TransferOutcome>,
}

/// Enumerate the regular files to upload from `src`
///
/// A directory is walked recursively, following symlinks and including
/// hidden entries. Directories, sockets, named pipes and other special
/// files are skipped without being counted as failures. Entries whose
/// metadata cannot be read are kept so the upload reports why; entries
/// the walk itself cannot read (such as a directory without read
/// permission) are returned as failed outcomes.
pub fn enumerate_local(src: &Path) -> Result<LocalScan> {
    let metadata = std::fs::metadata(src).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => {
            Error::NotFound(format!("Source not found: {}", src.display()))
        }
        _ => Error::Io(e),
    })?;

    if !metadata.is_dir() {
        let mut scan = LocalScan::default();
        match skip_reason(&metadata.file_type()) {
            Some(reason) => tracing::debug!("Skipping {} ({reason})", src.display()),
            None => scan.files.push(src.to_path_buf()),
        }
        return Ok(scan);
    }

    let root = src.to_string_lossy();
    let root = root.trim_end_matches('/');
    tracing::info!("Getting files in {root}/");
    let pattern = format!("{}/**/*", glob::Pattern::escape(root));

    let entries = glob::glob_with(&pattern, glob::MatchOptions::new())
        .map_err(|e| Error::InvalidPath(format!("{}: {e}", src.display())))?;

    let mut scan = LocalScan::default();
    for entry in entries {
        let path = match entry {
            Ok(path) => path,
            Err(e) => {
                let subject = e.path().display().to_string();
                let err = TransferError::from_io(e.error());
                tracing::error!("Failed to read {subject} - {err}");
                scan.unreadable
                    .push(TransferOutcome::failure(subject, Duration::ZERO, err));
                continue;
            }
        };

        match std::fs::metadata(&path) {
            Ok(meta) => match skip_reason(&meta.file_type()) {
                Some(reason) => tracing::debug!("Skipping {} ({reason})", path.display()),
                None => scan.files.push(path),
            },
            Err(_) => scan.files.push(path),
        }
    }

    Ok(scan)
}

/// Why an entry is not uploaded, or `None` for regular files
fn skip_reason(file_type: &FileType) -> Option<&'static str> {
    if file_type.is_file() {
        return None;
    }
    if file_type.is_dir() {
        return Some("directory");
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::FileTypeExt;
        if file_type.is_socket() {
            return Some("socket");
        }
        if file_type.is_fifo() {
            return Some("named pipe");
        }
    }

    Some("special file")
}
