use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{EventHost, HostWriteError, LogEntry, RegistrationError};

type Fields = HashMap<String, String>;

#[derive(Default)]
struct MemoryState {
    registrations: HashMap<(String, String), Fields>,
    entries: Vec<LogEntry>,
    creates: usize,
    field_writes: usize,
    deny_access: bool,
    fail_writes: bool,
}

/// In-process host - keeps registrations and entries in memory and counts
/// every mutation, so callers can check what a registration pass changed
#[derive(Clone, Default)]
pub struct MemoryHost {
    state: Arc<Mutex<MemoryState>>,
    message_resource: Option<PathBuf>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report `path` as the host's message-formatting resource
    pub fn with_message_resource(mut self, path: impl Into<Option<PathBuf>>) -> Self {
        self.message_resource = path.into();
        self
    }

    /// Make every registration lookup fail with access denied
    pub fn deny_access(&self, deny: bool) {
        self.lock().deny_access = deny;
    }

    /// Make every entry write fail
    pub fn fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }

    /// Register `source` under `channel` without counting it as a mutation
    pub fn seed_registration(&self, channel: &str, source: &str, fields: &[(&str, &str)]) {
        let fields = fields
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self.lock()
            .registrations
            .insert((channel.to_string(), source.to_string()), fields);
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.lock().entries.clone()
    }

    pub fn last_entry(&self) -> Option<LogEntry> {
        self.lock().entries.last().cloned()
    }

    /// Number of registrations created through [`EventHost::create_source`]
    pub fn create_count(&self) -> usize {
        self.lock().creates
    }

    /// Number of field updates made through [`EventHost::write_field`]
    pub fn field_write_count(&self) -> usize {
        self.lock().field_writes
    }

    pub fn is_registered(&self, channel: &str, source: &str) -> bool {
        self.lock()
            .registrations
            .contains_key(&(channel.to_string(), source.to_string()))
    }

    pub fn field(&self, channel: &str, source: &str, field: &str) -> Option<String> {
        self.lock()
            .registrations
            .get(&(channel.to_string(), source.to_string()))
            .and_then(|fields| fields.get(field).cloned())
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_access(state: &MemoryState, channel: &str, source: &str) -> Result<(), RegistrationError> {
        if state.deny_access {
            return Err(RegistrationError::AccessDenied {
                path: format!("{}\\{}", channel, source),
                reason: "access denied by memory host".to_string(),
            });
        }
        Ok(())
    }
}

impl EventHost for MemoryHost {
    fn source_exists(&self, channel: &str, source: &str) -> Result<bool, RegistrationError> {
        let state = self.lock();
        Self::check_access(&state, channel, source)?;
        Ok(state
            .registrations
            .contains_key(&(channel.to_string(), source.to_string())))
    }

    fn create_source(&self, channel: &str, source: &str) -> Result<(), RegistrationError> {
        let mut state = self.lock();
        Self::check_access(&state, channel, source)?;
        let owner = state
            .registrations
            .keys()
            .find(|(_, name)| name == source)
            .map(|(owner, _)| owner.clone());
        if let Some(owner) = owner.filter(|owner| owner != channel) {
            return Err(RegistrationError::SourceConflict {
                name: source.to_string(),
                channel: owner,
            });
        }
        let key = (channel.to_string(), source.to_string());
        if !state.registrations.contains_key(&key) {
            state.registrations.insert(key, Fields::new());
            state.creates += 1;
        }
        Ok(())
    }

    fn read_field(
        &self,
        channel: &str,
        source: &str,
        field: &str,
    ) -> Result<Option<String>, RegistrationError> {
        let state = self.lock();
        Self::check_access(&state, channel, source)?;
        match state
            .registrations
            .get(&(channel.to_string(), source.to_string()))
        {
            Some(fields) => Ok(fields.get(field).cloned()),
            None => Err(RegistrationError::Unresolvable {
                path: format!("{}\\{}", channel, source),
                reason: "registration does not exist".to_string(),
            }),
        }
    }

    fn write_field(
        &self,
        channel: &str,
        source: &str,
        field: &str,
        value: &str,
    ) -> Result<(), RegistrationError> {
        let mut state = self.lock();
        Self::check_access(&state, channel, source)?;
        let fields = state
            .registrations
            .get_mut(&(channel.to_string(), source.to_string()))
            .ok_or_else(|| RegistrationError::Unresolvable {
                path: format!("{}\\{}", channel, source),
                reason: "registration does not exist".to_string(),
            })?;
        fields.insert(field.to_string(), value.to_string());
        state.field_writes += 1;
        Ok(())
    }

    fn message_resource_location(&self) -> Option<PathBuf> {
        self.message_resource.clone()
    }

    fn write_entry(&self, entry: &LogEntry) -> Result<(), HostWriteError> {
        let mut state = self.lock();
        if state.fail_writes {
            return Err(HostWriteError::Rejected(
                "writes disabled on memory host".to_string(),
            ));
        }
        let known = state
            .registrations
            .keys()
            .any(|(_, source)| *source == entry.source);
        if !known {
            return Err(HostWriteError::InvalidSource(entry.source.clone()));
        }
        state.entries.push(entry.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::internal::host::Severity;

    fn entry(source: &str) -> LogEntry {
        LogEntry {
            source: source.to_string(),
            message: "hello".to_string(),
            severity: Severity::Info,
            event_id: 7,
        }
    }

    #[test]
    fn test_create_is_idempotent() {
        let host = MemoryHost::new();
        host.create_source("Application", "Billing").unwrap();
        host.create_source("Application", "Billing").unwrap();
        assert_eq!(host.create_count(), 1);
        assert!(host.is_registered("Application", "Billing"));
    }

    #[test]
    fn test_write_entry_requires_registered_source() {
        let host = MemoryHost::new();
        assert!(matches!(
            host.write_entry(&entry("Billing")),
            Err(HostWriteError::InvalidSource(_))
        ));

        host.create_source("Application", "Billing").unwrap();
        host.write_entry(&entry("Billing")).unwrap();
        assert_eq!(host.entries().len(), 1);
    }

    #[test]
    fn test_clones_share_state() {
        let host = MemoryHost::new();
        let other = host.clone();
        other.create_source("Application", "Billing").unwrap();
        assert!(host.is_registered("Application", "Billing"));
    }

    #[test]
    fn test_source_belongs_to_one_channel() {
        let host = MemoryHost::new();
        host.create_source("Application", "Billing").unwrap();
        assert!(matches!(
            host.create_source("Security", "Billing"),
            Err(RegistrationError::SourceConflict { ref channel, .. }) if channel == "Application"
        ));
        assert!(!host.is_registered("Security", "Billing"));
    }

    #[test]
    fn test_deny_access() {
        let host = MemoryHost::new();
        host.deny_access(true);
        assert!(matches!(
            host.source_exists("Application", "Billing"),
            Err(RegistrationError::AccessDenied { .. })
        ));
    }
}
