//! End-of-run summary and final banner

use humansize::{BINARY, format_size};
use osb_core::{Action, BucketRef, RunReport, TransferError};
use serde::Serialize;

use crate::exit_code::ExitCode;
use crate::output::Formatter;

const ALL_SUCCEEDED: &str = "All transfers succeeded";
const FAILURES_DETECTED: &str = "Failures detected - see log lines above";

/// Output structure for a finished run (JSON format)
#[derive(Debug, Serialize)]
struct RunOutput<'a> {
    action: Action,
    bucket: &'a str,
    status: &'static str,
    succeeded: usize,
    failed: usize,
    total_size_bytes: u64,
    total_size_human: String,
    elapsed_ms: u64,
    failures: Vec<FailureOutput<'a>>,
}

#[derive(Debug, Serialize)]
struct FailureOutput<'a> {
    subject: &'a str,
    #[serde(flatten)]
    error: &'a TransferError,
}

/// Print the run summary and map the aggregate status to an exit code
pub(super) fn finish(
    action: Action,
    bucket: &BucketRef,
    report: &RunReport,
    formatter: &Formatter,
) -> ExitCode {
    if formatter.is_json() {
        formatter.json(&run_output(action, bucket, report));
    } else {
        formatter.println("");
        formatter.println(&summary_line(action, report));
        if report.is_success() {
            formatter.banner(ALL_SUCCEEDED);
        } else {
            formatter.banner(FAILURES_DETECTED);
        }
    }

    if report.is_success() {
        ExitCode::Success
    } else {
        ExitCode::GeneralError
    }
}

fn run_output<'a>(action: Action, bucket: &'a BucketRef, report: &'a RunReport) -> RunOutput<'a> {
    RunOutput {
        action,
        bucket: &bucket.bucket,
        status: if report.is_success() { "success" } else { "failed" },
        succeeded: report.succeeded(),
        failed: report.failed(),
        total_size_bytes: report.bytes(),
        total_size_human: format_size(report.bytes(), BINARY),
        elapsed_ms: report.elapsed.as_millis() as u64,
        failures: report
            .failures()
            .filter_map(|outcome| {
                outcome.error.as_ref().map(|error| FailureOutput {
                    subject: &outcome.subject,
                    error,
                })
            })
            .collect(),
    }
}

fn summary_line(action: Action, report: &RunReport) -> String {
    let verb = match action {
        Action::Upload => "Uploaded",
        Action::Download => "Downloaded",
        Action::Delete => "Deleted",
        Action::List => "Listed",
    };
    let noun = if report.succeeded() == 1 { "file" } else { "files" };
    let mut line = format!(
        "{verb} {} {noun} ({}) in {:.2?}",
        report.succeeded(),
        format_size(report.bytes(), BINARY),
        report.elapsed
    );
    if report.failed() > 0 {
        line.push_str(&format!(", {} failed", report.failed()));
    }
    line
}
