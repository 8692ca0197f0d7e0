// src/internal/writer/event_writer.rs

use std::ops::RangeInclusive;

use rand::Rng;
use tracing::{debug, error, warn};

use crate::internal::config::EventLogConfig;
use crate::internal::host::{EventHost, EventId, LogEntry, Severity};
use crate::internal::registrar::SourceRegistrar;

#[cfg(windows)]
pub const LINE_ENDING: &str = "\r\n";
#[cfg(not(windows))]
pub const LINE_ENDING: &str = "\n";

pub const STACK_TRACE_SEPARATOR: &str = "--------Stack Trace---------";

/// A required argument was empty
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArgumentError {
    #[error("{param} should not be null or empty")]
    Empty { param: &'static str },
}

fn require(param: &'static str, value: &str) -> Result<(), ArgumentError> {
    if value.is_empty() {
        return Err(ArgumentError::Empty { param });
    }
    Ok(())
}

/// Range auto-generated event ids are drawn from for `severity`
pub fn auto_id_range(severity: Severity) -> RangeInclusive<EventId> {
    match severity {
        Severity::Info => 0..=99,
        Severity::Warning => 100..=199,
        Severity::Error => 200..=299,
    }
}

/// Draw a fresh event id for `severity`
pub fn random_event_id(severity: Severity) -> EventId {
    rand::rng().random_range(auto_id_range(severity))
}

/// Body of an error entry
pub fn format_error_message(short_description: &str, stack_trace: &str) -> String {
    format!(
        "Description: {}{}{}{}{}",
        short_description, LINE_ENDING, STACK_TRACE_SEPARATOR, LINE_ENDING, stack_trace
    )
}

/// EventWriter writes info, warning and error entries for the configured
/// source, registering the source on the way
pub struct EventWriter<H: EventHost> {
    config: EventLogConfig,
    host: H,
}

impl<H: EventHost> EventWriter<H> {
    pub fn new(config: EventLogConfig, host: H) -> Self {
        Self { config, host }
    }

    pub fn config(&self) -> &EventLogConfig {
        &self.config
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// Write an informational entry with an id in 0..=99
    pub fn write_info(&self, message: &str) -> Result<bool, ArgumentError> {
        self.write_info_with_id(message, random_event_id(Severity::Info))
    }

    pub fn write_info_with_id(&self, message: &str, event_id: EventId) -> Result<bool, ArgumentError> {
        require("message", message)?;
        Ok(self.write_event(message, Severity::Info, event_id))
    }

    /// Write a warning with an id in 100..=199
    pub fn write_warning(&self, message: &str) -> Result<bool, ArgumentError> {
        self.write_warning_with_id(message, random_event_id(Severity::Warning))
    }

    pub fn write_warning_with_id(
        &self,
        message: &str,
        event_id: EventId,
    ) -> Result<bool, ArgumentError> {
        require("message", message)?;
        Ok(self.write_event(message, Severity::Warning, event_id))
    }

    /// Write an error with an id in 200..=299
    pub fn write_error(&self, short_description: &str, stack_trace: &str) -> Result<bool, ArgumentError> {
        self.write_error_with_id(
            short_description,
            stack_trace,
            random_event_id(Severity::Error),
        )
    }

    pub fn write_error_with_id(
        &self,
        short_description: &str,
        stack_trace: &str,
        event_id: EventId,
    ) -> Result<bool, ArgumentError> {
        require("short_description", short_description)?;
        require("stack_trace", stack_trace)?;

        let message = format_error_message(short_description, stack_trace);
        Ok(self.write_event(&message, Severity::Error, event_id))
    }

    /// Register the configured source and hand one entry to the host.
    /// Every failure past validation comes back as `false`.
    pub fn write_event(&self, message: &str, severity: Severity, event_id: EventId) -> bool {
        let channel = self.config.log.as_str();

        let registration = match SourceRegistrar::new(&self.host)
            .ensure_registered(channel, &self.config.source)
        {
            Ok(registration) => registration,
            Err(e) => {
                warn!(
                    channel,
                    source = %self.config.source,
                    event_id,
                    "Source registration failed: {}",
                    e
                );
                return false;
            }
        };

        let entry = LogEntry {
            source: registration.source,
            message: message.to_string(),
            severity,
            event_id,
        };

        match self.host.write_entry(&entry) {
            Ok(()) => {
                debug!(channel, source = %entry.source, event_id, %severity, "Entry written");
                true
            }
            Err(e) => {
                error!(
                    channel,
                    source = %entry.source,
                    event_id,
                    %severity,
                    "Host rejected entry: {}",
                    e
                );
                false
            }
        }
    }
}
