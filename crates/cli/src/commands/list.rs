//! list action - print every object under the prefix with its size

use osb_core::{BucketRef, ObjectEntry, ObjectMap, ObjectStore};
use serde::Serialize;

use super::{Settings, list_or_exit};
use crate::exit_code::ExitCode;
use crate::output::{Formatter, list_line};

/// Output structure for the list action (JSON format)
#[derive(Debug, Serialize)]
struct ListOutput<'a> {
    bucket: &'a str,
    prefix: &'a str,
    objects: Vec<ObjectEntry>,
    total_objects: usize,
    total_size_bytes: u64,
    total_size_human: String,
}

pub(super) async fn execute(
    store: &dyn ObjectStore,
    bucket: &BucketRef,
    settings: &Settings,
    formatter: &Formatter,
) -> ExitCode {
    formatter.banner(&format!("Listing Objects in {} Bucket", bucket.bucket));

    let prefix = settings.prefix();
    let objects = match list_or_exit(store, bucket, Some(prefix), formatter).await {
        Ok(objects) => objects,
        Err(code) => return code,
    };

    if formatter.is_json() {
        formatter.json(&list_output(bucket, prefix, &objects));
    } else {
        for line in render(&objects) {
            formatter.println(&line);
        }
    }
    ExitCode::Success
}

fn render(objects: &ObjectMap) -> Vec<String> {
    objects
        .iter()
        .map(|(key, size)| list_line(*size, key))
        .collect()
}

fn list_output<'a>(bucket: &'a BucketRef, prefix: &'a str, objects: &ObjectMap) -> ListOutput<'a> {
    let total_size_bytes = objects.values().sum();
    ListOutput {
        bucket: &bucket.bucket,
        prefix,
        objects: objects
            .iter()
            .map(|(key, size)| ObjectEntry::new(key, *size))
            .collect(),
        total_objects: objects.len(),
        total_size_bytes,
        total_size_human: humansize::format_size(total_size_bytes, humansize::BINARY),
    }
}
