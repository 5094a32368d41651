//! CLI definition and action dispatch
//!
//! osb is a single command: the action is chosen with `-a`, and every action
//! runs against one bucket through the same connection preamble.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use osb_core::{
    Action, BucketRef, ObjectStore, PathMapper, TaskPlan, TransferCoordinator, list_objects,
};
use osb_s3::S3Client;

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig, ProgressBar};

mod delete;
mod download;
mod list;
pub mod settings;
mod summary;
mod upload;

pub use settings::Settings;

/// osb - object storage backup
///
/// Lists, uploads, downloads and deletes files in an object storage bucket
/// through its S3-compatible endpoint.
#[derive(Parser, Debug)]
#[command(name = "osb")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Action to perform
    #[arg(short, long, value_enum)]
    pub action: ActionArg,

    /// Bucket name (defaults to the profile's bucket)
    #[arg(short, long)]
    pub bucket: Option<String>,

    /// Local file or directory to upload, or object prefix to list, download or delete
    #[arg(short, long)]
    pub src: Option<String>,

    /// Destination directory for downloads (defaults to the current directory)
    #[arg(short, long)]
    pub dst: Option<PathBuf>,

    /// Config file (defaults to ~/.config/osb/config.toml)
    #[arg(short = 'c', long = "config-file")]
    pub config_file: Option<PathBuf>,

    /// Config profile to use
    #[arg(short = 't', long = "config-profile")]
    pub config_profile: Option<String>,

    /// HTTPS proxy, e.g. www-proxy-server.com:80
    #[arg(short, long)]
    pub proxy: Option<String>,

    /// Number of concurrent transfers (defaults to the number of CPUs)
    #[arg(short = 'n', long, value_parser = parse_parallelism)]
    pub parallelism: Option<usize>,

    /// Access key, overriding the profile
    #[arg(long, env = "OSB_ACCESS_KEY", hide_env_values = true)]
    pub access_key: Option<String>,

    /// Secret key, overriding the profile
    #[arg(long, env = "OSB_SECRET_KEY", hide_env_values = true)]
    pub secret_key: Option<String>,

    /// Output format: human-readable or JSON
    #[arg(long)]
    pub json: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Disable progress bar
    #[arg(long)]
    pub no_progress: bool,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

/// Action names accepted by `-a`
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ActionArg {
    Upload,
    Download,
    List,
    Delete,
}

impl From<ActionArg> for Action {
    fn from(arg: ActionArg) -> Self {
        match arg {
            ActionArg::Upload => Action::Upload,
            ActionArg::Download => Action::Download,
            ActionArg::List => Action::List,
            ActionArg::Delete => Action::Delete,
        }
    }
}

fn parse_parallelism(value: &str) -> Result<usize, String> {
    match value.parse::<usize>() {
        Ok(0) => Err("parallelism must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

/// Resolve settings, then run the action on a fresh runtime
pub fn run(cli: Cli) -> ExitCode {
    let mut formatter = Formatter::new(OutputConfig {
        json: cli.json,
        no_color: cli.no_color,
        no_progress: cli.no_progress,
        quiet: cli.quiet,
    });

    let settings = match Settings::resolve(&cli) {
        Ok(settings) => settings,
        Err(e) => {
            formatter.error(&e.to_string());
            return ExitCode::from_error(&e);
        }
    };
    if settings.json && !formatter.is_json() {
        formatter = Formatter::new(OutputConfig {
            json: true,
            ..formatter.config()
        });
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            formatter.error(&format!("Failed to start runtime: {e}"));
            return ExitCode::GeneralError;
        }
    };

    runtime.block_on(async {
        tokio::select! {
            code = execute(settings, &formatter) => code,
            _ = tokio::signal::ctrl_c() => {
                formatter.error("Interrupted");
                ExitCode::Interrupted
            }
        }
    })
}

/// Connect to object storage and run the selected action
pub async fn execute(settings: Settings, formatter: &Formatter) -> ExitCode {
    formatter.banner("Connecting to Object Storage");

    let client = match S3Client::new(&settings.profile).await {
        Ok(client) => client,
        Err(e) => {
            formatter.error(&format!("Failed to create S3 client: {e}"));
            return ExitCode::from_error(&e);
        }
    };
    let store: Arc<dyn ObjectStore> = Arc::new(client);

    let namespace = match store.namespace().await {
        Ok(namespace) => namespace,
        Err(e) => {
            formatter.error(&format!("Error connecting to object storage - {e}"));
            return ExitCode::from_error(&e);
        }
    };
    formatter.status(&format!("Succeeded - Namespace = {namespace}"));

    let bucket = BucketRef::new(namespace, &settings.bucket);
    let mapper = match &settings.profile.key_prefix {
        Some(prefix) => PathMapper::with_key_prefix(prefix),
        None => PathMapper::new(),
    };
    let coordinator = TransferCoordinator::new(Arc::clone(&store), bucket)
        .with_parallelism(settings.parallelism)
        .with_mapper(mapper);

    match settings.action {
        Action::List => list::execute(store.as_ref(), coordinator.bucket(), &settings, formatter).await,
        Action::Upload => upload::execute(&coordinator, store.as_ref(), &settings, formatter).await,
        Action::Download => {
            download::execute(&coordinator, store.as_ref(), &settings, formatter).await
        }
        Action::Delete => delete::execute(&coordinator, store.as_ref(), &settings, formatter).await,
    }
}

/// List the bucket under `prefix`, reporting a failure as a fatal exit code
async fn list_or_exit(
    store: &dyn ObjectStore,
    bucket: &BucketRef,
    prefix: Option<&str>,
    formatter: &Formatter,
) -> Result<osb_core::ObjectMap, ExitCode> {
    list_objects(store, bucket, prefix).await.map_err(|e| {
        formatter.error(&e.to_string());
        ExitCode::from_error(&e)
    })
}

/// Run a plan with a per-file progress bar and print the summary
async fn run_plan(
    coordinator: &TransferCoordinator,
    action: Action,
    plan: TaskPlan,
    formatter: &Formatter,
) -> ExitCode {
    let progress = ProgressBar::new(formatter.config(), plan.len() as u64);
    let report = coordinator
        .execute(plan, |outcome| progress.inc(!outcome.succeeded()))
        .await;
    progress.finish_and_clear();

    summary::finish(action, coordinator.bucket(), &report, formatter)
}
