use anyhow::Context;
use clap::Command;
use event_logger::cli::config_args;
use event_logger::internal::config::{get_version_info, AppConfig};
use event_logger::internal::host::build_host;
use event_logger::SourceRegistrar;

fn main() -> anyhow::Result<()> {
    // Leak the version string to get a 'static lifetime
    let version: &'static str = Box::leak(get_version_info().into_boxed_str());

    let matches = config_args(
        Command::new("register-source")
            .version(version)
            .about("Register the configured event source with the host event log"),
    )
    .get_matches();

    let config = AppConfig::load_from_args(&matches).context("Failed to load configuration")?;
    event_logger::internal::logger::init_logger(&config.logging)?;

    let host = build_host(&config.host)?;
    let registration = SourceRegistrar::new(&*host)
        .ensure_registered(&config.event_log.log, &config.event_log.source)
        .with_context(|| {
            format!(
                "Failed to register '{}' under '{}'",
                config.event_log.source, config.event_log.log
            )
        })?;

    let state = if registration.created {
        "registered"
    } else {
        "already registered"
    };
    println!("{}: '{}' under '{}'", state, registration.source, registration.channel);

    match registration.message_resource {
        Some(path) => println!("message resource: {}", path),
        None => println!("message resource: none"),
    }

    Ok(())
}
