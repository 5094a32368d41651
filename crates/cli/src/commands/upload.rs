//! upload action - send a file or directory tree to the bucket

use std::path::Path;

use osb_core::{Action, ObjectStore, TransferCoordinator, TransferTask, check_bucket};

use super::{Settings, run_plan};
use crate::exit_code::ExitCode;
use crate::output::Formatter;

pub(super) async fn execute(
    coordinator: &TransferCoordinator,
    store: &dyn ObjectStore,
    settings: &Settings,
    formatter: &Formatter,
) -> ExitCode {
    formatter.banner("Uploading to Object Storage");

    let src = Path::new(settings.prefix());
    if src.is_dir() {
        formatter.status(&format!("Getting files in {}", src.display()));
    }

    let plan = match coordinator.plan_upload(src) {
        Ok(plan) => plan,
        Err(e) => {
            formatter.error(&format!("Failed to read {} - {e}", src.display()));
            return ExitCode::from_error(&e);
        }
    };

    let first_key = plan.tasks.iter().find_map(|task| match task {
        TransferTask::Upload { key, .. } => Some(key.as_str()),
        _ => None,
    });
    if let Err(e) = check_bucket(store, coordinator.bucket(), first_key).await {
        formatter.error(&e.to_string());
        return ExitCode::from_error(&e);
    }

    run_plan(coordinator, Action::Upload, plan, formatter).await
}
