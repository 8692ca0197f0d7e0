//! Shared fixtures for writer and registration tests
#![allow(dead_code)]

use event_logger::internal::host::MemoryHost;
use event_logger::{EventLogConfig, EventWriter};

pub const SOURCE: &str = "WindowsEventLoggingTest";

/// Writer over a fresh in-memory host, plus a handle sharing the host's state
pub fn memory_writer(config: EventLogConfig) -> (EventWriter<MemoryHost>, MemoryHost) {
    let host = MemoryHost::new();
    let writer = EventWriter::new(config, host.clone());
    (writer, host)
}

/// Writer for the test source on the default channel
pub fn default_writer() -> (EventWriter<MemoryHost>, MemoryHost) {
    memory_writer(EventLogConfig::for_source(SOURCE))
}
