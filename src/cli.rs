use clap::{Arg, ArgMatches, Command};

use crate::internal::config::AppConfig;
use crate::internal::host::{EventHost, EventId, Severity};
use crate::internal::writer::{ArgumentError, EventWriter};

/// Arguments selecting the source, channel and backend; shared by both binaries
pub fn config_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("config")
                .long("config")
                .help("Path to config file (default: ./event-logger.*, /etc/event-logger/config.*)")
        )
        .arg(
            Arg::new("source")
                .long("source")
                .short('s')
                .help("Event source name")
        )
        .arg(
            Arg::new("log")
                .long("log")
                .short('l')
                .help("Destination log channel (default: Application)")
        )
        .arg(
            Arg::new("backend")
                .long("backend")
                .value_parser(["windows", "file", "memory"])
                .help("Host backend receiving registrations and entries")
        )
        .arg(
            Arg::new("state-dir")
                .long("state-dir")
                .help("State directory of the file backend")
        )
}

pub fn build_cli() -> Command {
    // Leak the version string to get a 'static lifetime
    let version: &'static str = Box::leak(
        crate::internal::config::get_version_info().into_boxed_str()
    );

    let command = Command::new("event-logger")
        .version(version)
        .about("Write an entry to the host event log")
        .arg(
            Arg::new("level")
                .long("level")
                .value_parser(["info", "warning", "error"])
                .default_value("info")
                .help("Entry severity (info|warning|error)")
        )
        .arg(
            Arg::new("message")
                .long("message")
                .short('m')
                .required(true)
                .help("Entry message; the short description for errors")
        )
        .arg(
            Arg::new("stack-trace")
                .long("stack-trace")
                .help("Stack trace attached to an error entry")
        )
        .arg(
            Arg::new("event-id")
                .long("event-id")
                .short('i')
                .value_parser(clap::value_parser!(u32))
                .help("Event id (random within the severity's range when omitted)")
        );

    config_args(command)
}

pub fn parse_config(matches: &ArgMatches) -> anyhow::Result<AppConfig> {
    Ok(AppConfig::load_from_args(matches)?)
}

/// One entry requested on the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRequest {
    pub severity: Severity,
    pub message: String,
    pub stack_trace: Option<String>,
    pub event_id: Option<EventId>,
}

impl WriteRequest {
    pub fn from_matches(matches: &ArgMatches) -> Self {
        let severity = match matches.get_one::<String>("level").map(|s| s.as_str()) {
            Some("warning") => Severity::Warning,
            Some("error") => Severity::Error,
            _ => Severity::Info,
        };

        Self {
            severity,
            message: matches
                .get_one::<String>("message")
                .cloned()
                .unwrap_or_default(),
            stack_trace: matches.get_one::<String>("stack-trace").cloned(),
            event_id: matches.get_one::<u32>("event-id").copied(),
        }
    }

    /// Dispatch to the writer operation matching the severity
    pub fn execute<H: EventHost>(&self, writer: &EventWriter<H>) -> Result<bool, ArgumentError> {
        let stack_trace = self.stack_trace.as_deref().unwrap_or_default();
        match (self.severity, self.event_id) {
            (Severity::Info, Some(id)) => writer.write_info_with_id(&self.message, id),
            (Severity::Info, None) => writer.write_info(&self.message),
            (Severity::Warning, Some(id)) => writer.write_warning_with_id(&self.message, id),
            (Severity::Warning, None) => writer.write_warning(&self.message),
            (Severity::Error, Some(id)) => {
                writer.write_error_with_id(&self.message, stack_trace, id)
            }
            (Severity::Error, None) => writer.write_error(&self.message, stack_trace),
        }
    }
}
