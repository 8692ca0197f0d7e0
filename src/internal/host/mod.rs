use std::fmt;
use std::io;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::internal::config::{HostBackend, HostConfig};

pub mod file;
pub mod memory;
#[cfg(windows)]
pub mod windows;

pub use file::FileHost;
pub use memory::MemoryHost;

/// Registration field naming the message-formatting resource
pub const MESSAGE_FILE_FIELD: &str = "EventMessageFile";

pub type EventId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        f.write_str(name)
    }
}

/// One entry handed to the host; the host assigns the timestamp
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub source: String,
    pub message: String,
    pub severity: Severity,
    pub event_id: EventId,
}

/// Access to the host's persistent source registrations and its
/// event-recording primitive
pub trait EventHost: Send + Sync {
    /// Check whether `source` is registered under `channel`
    fn source_exists(&self, channel: &str, source: &str) -> Result<bool, RegistrationError>;

    /// Create an empty registration. Creating one that already exists succeeds.
    fn create_source(&self, channel: &str, source: &str) -> Result<(), RegistrationError>;

    fn read_field(
        &self,
        channel: &str,
        source: &str,
        field: &str,
    ) -> Result<Option<String>, RegistrationError>;

    fn write_field(
        &self,
        channel: &str,
        source: &str,
        field: &str,
        value: &str,
    ) -> Result<(), RegistrationError>;

    /// Where the host keeps its message-formatting resource, if it can tell.
    /// The file is not required to exist.
    fn message_resource_location(&self) -> Option<PathBuf>;

    fn write_entry(&self, entry: &LogEntry) -> Result<(), HostWriteError>;
}

impl<T: EventHost + ?Sized> EventHost for Box<T> {
    fn source_exists(&self, channel: &str, source: &str) -> Result<bool, RegistrationError> {
        (**self).source_exists(channel, source)
    }

    fn create_source(&self, channel: &str, source: &str) -> Result<(), RegistrationError> {
        (**self).create_source(channel, source)
    }

    fn read_field(
        &self,
        channel: &str,
        source: &str,
        field: &str,
    ) -> Result<Option<String>, RegistrationError> {
        (**self).read_field(channel, source, field)
    }

    fn write_field(
        &self,
        channel: &str,
        source: &str,
        field: &str,
        value: &str,
    ) -> Result<(), RegistrationError> {
        (**self).write_field(channel, source, field, value)
    }

    fn message_resource_location(&self) -> Option<PathBuf> {
        (**self).message_resource_location()
    }

    fn write_entry(&self, entry: &LogEntry) -> Result<(), HostWriteError> {
        (**self).write_entry(entry)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    #[error("Invalid channel name: {0}")]
    InvalidChannel(String),
    #[error("Source {name} is already registered under {channel}")]
    SourceConflict { name: String, channel: String },
    #[error("Access denied to registration {path}: {reason}")]
    AccessDenied { path: String, reason: String },
    #[error("Registration {path} could not be resolved: {reason}")]
    Unresolvable { path: String, reason: String },
}

impl RegistrationError {
    /// Classify an I/O failure against the registration at `path`
    pub fn from_io(path: impl Into<String>, err: io::Error) -> Self {
        let path = path.into();
        match err.kind() {
            io::ErrorKind::PermissionDenied => RegistrationError::AccessDenied {
                path,
                reason: err.to_string(),
            },
            _ => RegistrationError::Unresolvable {
                path,
                reason: err.to_string(),
            },
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum HostWriteError {
    #[error("Source {0} is not registered with any channel")]
    InvalidSource(String),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Entry rejected by host: {0}")]
    Rejected(String),
}

/// Check that `channel` can name a log channel on every backend: not blank,
/// and usable as a single path component or registry key name
pub fn validate_channel(channel: &str) -> Result<(), String> {
    if channel.trim().is_empty() {
        return Err("channel name must not be empty".to_string());
    }
    if channel == "." || channel == ".." {
        return Err(format!("'{}' is not a channel name", channel));
    }
    if let Some(c) = channel
        .chars()
        .find(|c| matches!(c, '/' | '\\' | '\0'))
    {
        return Err(format!(
            "channel name '{}' contains forbidden character {:?}",
            channel, c
        ));
    }
    Ok(())
}

/// Build the backend named by `cfg`
pub fn build_host(cfg: &HostConfig) -> anyhow::Result<Box<dyn EventHost>> {
    match cfg.backend {
        HostBackend::File => {
            let host = FileHost::open(cfg.resolved_state_dir())?
                .with_message_resource(cfg.message_resource.clone());
            Ok(Box::new(host))
        }
        HostBackend::Memory => Ok(Box::new(
            MemoryHost::new().with_message_resource(cfg.message_resource.clone()),
        )),
        #[cfg(windows)]
        HostBackend::Windows => Ok(Box::new(
            windows::WindowsHost::new().with_message_resource(cfg.message_resource.clone()),
        )),
        #[cfg(not(windows))]
        HostBackend::Windows => Err(anyhow::anyhow!(
            "the windows backend is not available on this platform"
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_denied_maps_to_access_denied() {
        let err = RegistrationError::from_io(
            "Application\\Billing",
            io::Error::new(io::ErrorKind::PermissionDenied, "nope"),
        );
        assert!(matches!(err, RegistrationError::AccessDenied { .. }));
    }

    #[test]
    fn test_other_io_maps_to_unresolvable() {
        let err = RegistrationError::from_io(
            "Application\\Billing",
            io::Error::new(io::ErrorKind::InvalidData, "corrupt"),
        );
        assert!(matches!(err, RegistrationError::Unresolvable { .. }));
    }

    #[test]
    fn test_validate_channel() {
        assert!(validate_channel("Application").is_ok());
        assert!(validate_channel("My Service Log").is_ok());
        assert!(validate_channel("").is_err());
        assert!(validate_channel("  ").is_err());
        assert!(validate_channel("..").is_err());
        assert!(validate_channel("../x").is_err());
        assert!(validate_channel("a/b").is_err());
        assert!(validate_channel("a\\b").is_err());
    }

    #[test]
    fn test_build_memory_host() {
        let cfg = HostConfig {
            backend: HostBackend::Memory,
            ..Default::default()
        };
        let host = build_host(&cfg).unwrap();
        assert!(!host.source_exists("Application", "Billing").unwrap());
    }

    #[cfg(not(windows))]
    #[test]
    fn test_windows_backend_unavailable_elsewhere() {
        let cfg = HostConfig {
            backend: HostBackend::Windows,
            ..Default::default()
        };
        assert!(build_host(&cfg).is_err());
    }
}
