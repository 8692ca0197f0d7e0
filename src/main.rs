use std::process::ExitCode;

use event_logger::cli::{build_cli, parse_config, WriteRequest};
use event_logger::internal::host::build_host;
use event_logger::EventWriter;
use tracing::{debug, error, info};

fn main() -> ExitCode {
    // Parse command line arguments first
    let matches = build_cli().get_matches();
    let config = match parse_config(&matches) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            return ExitCode::from(1);
        }
    };

    // Initialize logging
    if let Err(e) = event_logger::internal::logger::init_logger(&config.logging) {
        eprintln!("Failed to initialize logger: {}", e);
        return ExitCode::from(1);
    }

    debug!("Version: {}", event_logger::internal::config::get_version_info());
    debug!("Backend: {}", config.host.backend.as_str());

    let host = match build_host(&config.host) {
        Ok(host) => host,
        Err(e) => {
            error!("Failed to open host backend: {}", e);
            return ExitCode::from(1);
        }
    };

    let request = WriteRequest::from_matches(&matches);
    let writer = EventWriter::new(config.event_log, host);

    match request.execute(&writer) {
        Ok(true) => {
            info!(
                "Wrote {} entry to '{}' as '{}'",
                request.severity,
                writer.config().log,
                writer.config().source
            );
            ExitCode::SUCCESS
        }
        Ok(false) => {
            eprintln!("Failed to write {} entry", request.severity);
            ExitCode::from(1)
        }
        Err(e) => {
            eprintln!("Invalid argument: {}", e);
            ExitCode::from(2)
        }
    }
}
