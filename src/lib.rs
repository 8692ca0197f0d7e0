pub mod cli;
pub mod internal;

// Re-export commonly used types
pub use internal::config::{AppConfig, EventLogConfig};
pub use internal::host::{EventHost, EventId, LogEntry, Severity};
pub use internal::registrar::{Registration, SourceRegistrar};
pub use internal::writer::{ArgumentError, EventWriter};
