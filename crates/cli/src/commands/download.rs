//! download action - fetch every object under the prefix

use osb_core::{Action, ObjectStore, TransferCoordinator};

use super::{Settings, list_or_exit, run_plan};
use crate::exit_code::ExitCode;
use crate::output::Formatter;

pub(super) async fn execute(
    coordinator: &TransferCoordinator,
    store: &dyn ObjectStore,
    settings: &Settings,
    formatter: &Formatter,
) -> ExitCode {
    formatter.banner("Downloading from Object Storage");

    let prefix = settings.prefix();
    let objects = match list_or_exit(store, coordinator.bucket(), Some(prefix), formatter).await {
        Ok(objects) => objects,
        Err(code) => return code,
    };

    let plan = match coordinator.plan_download(&objects, prefix, settings.dst.as_deref()) {
        Ok(plan) => plan,
        Err(e) => {
            formatter.error(&format!("Failed to prepare destination - {e}"));
            return ExitCode::from_error(&e);
        }
    };

    run_plan(coordinator, Action::Download, plan, formatter).await
}
