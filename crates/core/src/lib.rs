//! osb-core: Core library for the osb object storage backup client
//!
//! This crate provides the transfer engine behind the `osb` CLI:
//! - Paginated bucket listing
//! - Multipart sizing, single-file upload, streamed download and delete
//! - A bounded worker pool that fans transfers out across many files
//! - Local path ↔ object key mapping
//! - Configuration and profile management
//!
//! The engine talks to storage only through the [`ObjectStore`] trait, so it
//! is independent of any specific SDK and can be exercised against fakes.

pub mod catalog;
pub mod config;
pub mod coordinator;
pub mod delete;
pub mod download;
pub mod error;
pub mod mapping;
pub mod outcome;
pub mod pool;
pub mod profile;
pub mod sizer;
pub mod traits;
pub mod upload;

#[cfg(test)]
mod testing;

pub use catalog::{ObjectMap, check_bucket, list_objects};
pub use config::{Config, ConfigManager};
pub use coordinator::{
    Action, LocalScan, TaskPlan, TransferCoordinator, TransferTask, enumerate_local,
};
pub use error::{Error, Result, TransferError, TransferErrorKind};
pub use mapping::PathMapper;
pub use outcome::{RunReport, TransferOutcome};
pub use pool::WorkerPool;
pub use profile::{Profile, ProfileManager};
pub use sizer::PartitionPlan;
pub use traits::{
    BucketRef, CompletedPart, ListOptions, ListPage, ObjectBody, ObjectEntry, ObjectStore,
};
pub use upload::UploadOptions;
