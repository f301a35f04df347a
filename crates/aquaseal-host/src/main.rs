//! AquaSeal host - serves bridge calls over stdin/stdout.
//!
//! Reads one JSON call per line from stdin and writes one JSON response per
//! call to stdout. Logs go to stderr and to rotating files.

mod logging;
mod protocol;
mod runtime;

use std::process::ExitCode;

use aquaseal_core::{Bridge, BridgeConfig};
use tokio::io::BufReader;
use tracing::{error, info};

use crate::logging::LoggingConfig;
use crate::runtime::RuntimeConfig;

fn main() -> ExitCode {
    let _logging_guard = match logging::init(&LoggingConfig::auto()) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("aquaseal-host: logging disabled: {e}");
            None
        }
    };

    info!("Starting AquaSeal host");

    let config = match BridgeConfig::load() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let runtime = match runtime::build(&RuntimeConfig::default()) {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to start async runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = runtime.block_on(async {
        let bridge = Bridge::from_config(&config);
        protocol::serve(
            &bridge,
            BufReader::new(tokio::io::stdin()),
            tokio::io::stdout(),
        )
        .await
    });

    match result {
        Ok(_) => {
            info!("Input closed, shutting down");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Host channel failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
