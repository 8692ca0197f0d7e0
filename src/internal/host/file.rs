// src/internal/host/file.rs

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use fs4::fs_std::FileExt;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::debug;

use super::{
    validate_channel, EventHost, EventId, HostWriteError, LogEntry, RegistrationError, Severity,
};

const REGISTRY_FILE: &str = "registry.json";
const LOCK_FILE: &str = "registry.lock";

/// channel -> source -> field -> value
type Registry = BTreeMap<String, BTreeMap<String, BTreeMap<String, String>>>;

/// Journal line written for every entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JournalRecord {
    pub timestamp: DateTime<Utc>,
    pub channel: String,
    pub source: String,
    pub severity: Severity,
    pub event_id: EventId,
    pub message: String,
}

/// Exclusive hold on the state directory; released when dropped
struct StateLock {
    _file: File,
}

/// Host backed by a directory: registrations live in `registry.json`,
/// entries are appended as JSON lines to `<channel>.jsonl`.
///
/// Every registry update and journal append happens under an exclusive
/// lock on `registry.lock`, so any number of hosts over the same directory,
/// in one process or many, see a consistent registry.
pub struct FileHost {
    root: PathBuf,
    message_resource: Option<PathBuf>,
}

impl FileHost {
    /// Open (creating if needed) the state directory at `root`
    pub fn open(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        debug!("File host state directory: {}", root.display());
        Ok(Self {
            root,
            message_resource: None,
        })
    }

    pub fn with_message_resource(mut self, path: impl Into<Option<PathBuf>>) -> Self {
        self.message_resource = path.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn registry_path(&self) -> PathBuf {
        self.root.join(REGISTRY_FILE)
    }

    /// Journal file receiving the entries of `channel`
    pub fn journal_path(&self, channel: &str) -> io::Result<PathBuf> {
        validate_channel(channel)
            .map_err(|reason| io::Error::new(io::ErrorKind::InvalidInput, reason))?;
        Ok(self.root.join(format!("{}.jsonl", channel)))
    }

    /// Read back every entry recorded for `channel`
    pub fn read_journal(&self, channel: &str) -> io::Result<Vec<JournalRecord>> {
        let path = self.journal_path(channel)?;
        let _lock = self.lock_state()?;
        if !path.exists() {
            return Ok(Vec::new());
        }
        fs::read_to_string(&path)?
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                serde_json::from_str(line)
                    .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
            })
            .collect()
    }

    fn lock_state(&self) -> io::Result<StateLock> {
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(self.root.join(LOCK_FILE))?;
        file.lock_exclusive()?;
        Ok(StateLock { _file: file })
    }

    fn load_registry(&self) -> io::Result<Registry> {
        let path = self.registry_path();
        match fs::read_to_string(&path) {
            Ok(data) if data.trim().is_empty() => Ok(Registry::new()),
            Ok(data) => serde_json::from_str(&data)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Registry::new()),
            Err(e) => Err(e),
        }
    }

    fn store_registry(&self, registry: &Registry) -> io::Result<()> {
        let data = serde_json::to_vec_pretty(registry)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        let mut tmp = NamedTempFile::new_in(&self.root)?;
        tmp.write_all(&data)?;
        tmp.as_file().sync_all()?;
        tmp.persist(self.registry_path()).map_err(|e| e.error)?;
        Ok(())
    }

    fn registration_path(channel: &str, source: &str) -> String {
        format!("{}\\{}", channel, source)
    }

    /// Lock the state directory and load the registry
    fn locked_registry(&self, path: &str) -> Result<(StateLock, Registry), RegistrationError> {
        let lock = self
            .lock_state()
            .map_err(|e| RegistrationError::from_io(path, e))?;
        let registry = self
            .load_registry()
            .map_err(|e| RegistrationError::from_io(path, e))?;
        Ok((lock, registry))
    }
}

fn channel_of(registry: &Registry, source: &str) -> Option<String> {
    registry
        .iter()
        .find(|(_, sources)| sources.contains_key(source))
        .map(|(channel, _)| channel.clone())
}

impl EventHost for FileHost {
    fn source_exists(&self, channel: &str, source: &str) -> Result<bool, RegistrationError> {
        let path = Self::registration_path(channel, source);
        let (_lock, registry) = self.locked_registry(&path)?;
        Ok(registry
            .get(channel)
            .is_some_and(|sources| sources.contains_key(source)))
    }

    fn create_source(&self, channel: &str, source: &str) -> Result<(), RegistrationError> {
        validate_channel(channel).map_err(RegistrationError::InvalidChannel)?;
        let path = Self::registration_path(channel, source);
        let (_lock, mut registry) = self.locked_registry(&path)?;

        // a source belongs to exactly one channel
        if let Some(owner) = channel_of(&registry, source) {
            if owner != channel {
                return Err(RegistrationError::SourceConflict {
                    name: source.to_string(),
                    channel: owner,
                });
            }
            debug!("Registration {} already present", path);
            return Ok(());
        }

        registry
            .entry(channel.to_string())
            .or_default()
            .insert(source.to_string(), BTreeMap::new());

        self.store_registry(&registry)
            .map_err(|e| RegistrationError::from_io(path, e))
    }

    fn read_field(
        &self,
        channel: &str,
        source: &str,
        field: &str,
    ) -> Result<Option<String>, RegistrationError> {
        let path = Self::registration_path(channel, source);
        let (_lock, registry) = self.locked_registry(&path)?;

        let fields = registry
            .get(channel)
            .and_then(|sources| sources.get(source))
            .ok_or_else(|| RegistrationError::Unresolvable {
                path,
                reason: "registration does not exist".to_string(),
            })?;
        Ok(fields.get(field).cloned())
    }

    fn write_field(
        &self,
        channel: &str,
        source: &str,
        field: &str,
        value: &str,
    ) -> Result<(), RegistrationError> {
        let path = Self::registration_path(channel, source);
        let (_lock, mut registry) = self.locked_registry(&path)?;

        let fields = registry
            .get_mut(channel)
            .and_then(|sources| sources.get_mut(source))
            .ok_or_else(|| RegistrationError::Unresolvable {
                path: path.clone(),
                reason: "registration does not exist".to_string(),
            })?;
        fields.insert(field.to_string(), value.to_string());

        self.store_registry(&registry)
            .map_err(|e| RegistrationError::from_io(path, e))
    }

    fn message_resource_location(&self) -> Option<PathBuf> {
        self.message_resource.clone()
    }

    fn write_entry(&self, entry: &LogEntry) -> Result<(), HostWriteError> {
        let _lock = self.lock_state()?;
        let channel = channel_of(&self.load_registry()?, &entry.source)
            .ok_or_else(|| HostWriteError::InvalidSource(entry.source.clone()))?;

        let record = JournalRecord {
            timestamp: Utc::now(),
            channel: channel.clone(),
            source: entry.source.clone(),
            severity: entry.severity,
            event_id: entry.event_id,
            message: entry.message.clone(),
        };
        let mut line = serde_json::to_string(&record)
            .map_err(|e| HostWriteError::Rejected(e.to_string()))?;
        line.push('\n');

        let mut journal = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.journal_path(&channel)?)?;
        journal.write_all(line.as_bytes())?;
        journal.flush()?;
        Ok(())
    }
}
