//! CI entry point: assemble the request from `INPUT_*` variables, send it
//! once, and exit non-zero if the step failed.

mod github;

use std::process::ExitCode;

use dispatch_core::{dispatch, RequestSpec, Reporter, UreqTransport};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::github::{EnvInputs, GithubReporter};

fn init_tracing() {
    // stdout carries workflow commands; diagnostics go to stderr.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    init_tracing();

    let mut reporter = GithubReporter::from_env();

    let spec = match RequestSpec::from_inputs(&EnvInputs) {
        Ok(spec) => spec,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            reporter.set_failed(&e.to_string());
            return ExitCode::FAILURE;
        }
    };

    info!(method = %spec.method, url = %spec.base_url, "dispatching request");
    let outcome = dispatch(&spec, &UreqTransport::new(), &mut reporter);
    info!(failure = outcome.is_failure(), "dispatch finished");

    if reporter.failed() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
