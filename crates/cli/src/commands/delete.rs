//! delete action - remove every object under the prefix

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
    formatter.banner("Deleting from Object Storage");

    let objects = match list_or_exit(store, coordinator.bucket(), Some(settings.prefix()), formatter).await {
        Ok(objects) => objects,
        Err(code) => return code,
    };
    if objects.is_empty() {
        formatter.warning("Nothing to delete");
    }

    let plan = coordinator.plan_delete(&objects);
    run_plan(coordinator, Action::Delete, plan, formatter).await
}
