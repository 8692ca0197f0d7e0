// src/internal/host/windows.rs

use std::ffi::OsStr;
use std::io;
use std::os::windows::ffi::OsStrExt;
use std::path::PathBuf;

use tracing::debug;
use windows_sys::Win32::System::EventLog::{
    DeregisterEventSource, RegisterEventSourceW, ReportEventW, EVENTLOG_ERROR_TYPE,
    EVENTLOG_INFORMATION_TYPE, EVENTLOG_WARNING_TYPE,
};
use winreg::enums::{HKEY_LOCAL_MACHINE, KEY_READ, KEY_WRITE};
use winreg::RegKey;

use super::{EventHost, HostWriteError, LogEntry, RegistrationError, Severity};

const EVENTLOG_KEY: &str = r"SYSTEM\CurrentControlSet\Services\EventLog";
const FRAMEWORK_KEY: &str = r"SOFTWARE\Microsoft\.NETFramework";
const FRAMEWORK_DIR: &str = "v4.0.30319";
const MESSAGE_DLL: &str = "EventLogMessages.dll";

/// Host backed by the Windows registry and event log
#[derive(Default)]
pub struct WindowsHost {
    message_resource: Option<PathBuf>,
}

impl WindowsHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `path` instead of looking up the framework's message file
    pub fn with_message_resource(mut self, path: impl Into<Option<PathBuf>>) -> Self {
        self.message_resource = path.into();
        self
    }

    fn key_path(channel: &str, source: &str) -> String {
        format!(r"{}\{}\{}", EVENTLOG_KEY, channel, source)
    }

    fn hklm() -> RegKey {
        RegKey::predef(HKEY_LOCAL_MACHINE)
    }

    fn framework_message_file() -> Option<PathBuf> {
        let settings = Self::hklm().open_subkey_with_flags(FRAMEWORK_KEY, KEY_READ).ok()?;
        let install_root: String = settings.get_value("InstallRoot").ok()?;
        Some(PathBuf::from(install_root).join(FRAMEWORK_DIR).join(MESSAGE_DLL))
    }
}

fn wide(s: &str) -> Vec<u16> {
    OsStr::new(s).encode_wide().chain(std::iter::once(0)).collect()
}

impl EventHost for WindowsHost {
    fn source_exists(&self, channel: &str, source: &str) -> Result<bool, RegistrationError> {
        let path = Self::key_path(channel, source);
        match Self::hklm().open_subkey_with_flags(&path, KEY_READ) {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(RegistrationError::from_io(path, e)),
        }
    }

    fn create_source(&self, channel: &str, source: &str) -> Result<(), RegistrationError> {
        // opens the key when it is already there
        let path = Self::key_path(channel, source);
        Self::hklm()
            .create_subkey(&path)
            .map(|_| debug!("Ensured registry key {}", path))
            .map_err(|e| RegistrationError::from_io(path.clone(), e))
    }

    fn read_field(
        &self,
        channel: &str,
        source: &str,
        field: &str,
    ) -> Result<Option<String>, RegistrationError> {
        let path = Self::key_path(channel, source);
        let key = Self::hklm()
            .open_subkey_with_flags(&path, KEY_READ)
            .map_err(|e| RegistrationError::from_io(path.clone(), e))?;
        match key.get_value::<String, _>(field) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(RegistrationError::from_io(path, e)),
        }
    }

    fn write_field(
        &self,
        channel: &str,
        source: &str,
        field: &str,
        value: &str,
    ) -> Result<(), RegistrationError> {
        let path = Self::key_path(channel, source);
        let key = Self::hklm()
            .open_subkey_with_flags(&path, KEY_WRITE)
            .map_err(|e| RegistrationError::from_io(path.clone(), e))?;
        key.set_value(field, &value.to_string())
            .map_err(|e| RegistrationError::from_io(path, e))
    }

    fn message_resource_location(&self) -> Option<PathBuf> {
        self.message_resource
            .clone()
            .or_else(Self::framework_message_file)
    }

    fn write_entry(&self, entry: &LogEntry) -> Result<(), HostWriteError> {
        if entry.event_id > u32::from(u16::MAX) {
            return Err(HostWriteError::Rejected(format!(
                "event id {} is out of range",
                entry.event_id
            )));
        }

        let source = wide(&entry.source);
        let message = wide(&entry.message);
        let strings = [message.as_ptr()];
        let kind = match entry.severity {
            Severity::Info => EVENTLOG_INFORMATION_TYPE,
            Severity::Warning => EVENTLOG_WARNING_TYPE,
            Severity::Error => EVENTLOG_ERROR_TYPE,
        };

        // SAFETY: every pointer refers to a NUL-terminated buffer that
        // outlives the calls, and the handle is released before returning.
        unsafe {
            let handle = RegisterEventSourceW(std::ptr::null(), source.as_ptr());
            if handle.is_null() {
                return Err(HostWriteError::InvalidSource(entry.source.clone()));
            }

            let reported = ReportEventW(
                handle,
                kind,
                0,
                entry.event_id,
                std::ptr::null_mut(),
                1,
                0,
                strings.as_ptr(),
                std::ptr::null(),
            );
            let last_error = io::Error::last_os_error();
            DeregisterEventSource(handle);

            if reported == 0 {
                return Err(HostWriteError::Io(last_error));
            }
        }

        Ok(())
    }
}
