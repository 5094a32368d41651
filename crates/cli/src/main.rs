//! osb - object storage backup
//!
//! Lists, uploads, downloads and deletes files in an object storage bucket.

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use osb_cli::commands::{self, Cli};

/// Log filter used when `RUST_LOG` is unset
const DEFAULT_FILTER: &str = "warn,osb_core=info,osb_s3=info,osb_cli=info";

const DEBUG_FILTER: &str = "info,osb_core=debug,osb_s3=debug,osb_cli=debug";

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.debug, cli.quiet);

    let exit_code = commands::run(cli);
    std::process::exit(exit_code.as_i32());
}

fn init_tracing(debug: bool, quiet: bool) {
    let filter = if debug {
        EnvFilter::new(DEBUG_FILTER)
    } else if quiet {
        EnvFilter::new("error")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .init();
}
