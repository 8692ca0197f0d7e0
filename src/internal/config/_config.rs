use config::{Config, ConfigError, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::internal::host::validate_channel;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Channel used when none is configured
pub const DEFAULT_LOG: &str = "Application";

/// Get version information
pub fn get_version_info() -> String {
    let target = if cfg!(windows) { "windows" } else { "portable" };
    format!("event-logger version {} ({} host)", VERSION, target)
}

/// Which host backend receives registrations and entries
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum HostBackend {
    #[serde(rename = "windows")]
    Windows,
    #[serde(rename = "file")]
    File,
    #[serde(rename = "memory")]
    Memory,
}

impl Default for HostBackend {
    fn default() -> Self {
        if cfg!(windows) {
            HostBackend::Windows
        } else {
            HostBackend::File
        }
    }
}

impl HostBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            HostBackend::Windows => "windows",
            HostBackend::File => "file",
            HostBackend::Memory => "memory",
        }
    }
}

impl std::str::FromStr for HostBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "windows" => Ok(HostBackend::Windows),
            "file" => Ok(HostBackend::File),
            "memory" => Ok(HostBackend::Memory),
            other => Err(ConfigError::Message(format!(
                "unknown host backend: {}",
                other
            ))),
        }
    }
}

/// The source/channel pair every write goes through
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventLogConfig {
    #[serde(default)]
    pub source: String,
    #[serde(default = "default_log")]
    pub log: String,
}

impl Default for EventLogConfig {
    fn default() -> Self {
        Self {
            source: String::new(),
            log: default_log(),
        }
    }
}

impl EventLogConfig {
    pub fn new(source: impl Into<String>, log: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            log: log.into(),
        }
    }

    /// Settings for `source` writing to the default channel
    pub fn for_source(source: impl Into<String>) -> Self {
        Self::new(source, DEFAULT_LOG)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HostConfig {
    #[serde(default)]
    pub backend: HostBackend,
    #[serde(default)]
    pub state_dir: Option<PathBuf>,
    #[serde(default)]
    pub message_resource: Option<PathBuf>,
}

impl HostConfig {
    /// Root directory of the file backend
    pub fn resolved_state_dir(&self) -> PathBuf {
        self.state_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .map(|dir| dir.join("event-logger"))
                .unwrap_or_else(|| PathBuf::from("event-logger"))
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_true")]
    pub color: bool,
    #[serde(default)]
    pub output_path: Option<String>,
    #[serde(default)]
    pub append_to_file: bool,
    #[serde(default)]
    pub disable_console: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            color: true,
            output_path: None,
            append_to_file: false,
            disable_console: false,
        }
    }
}

fn default_log() -> String {
    DEFAULT_LOG.to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub event_log: EventLogConfig,
    #[serde(default)]
    pub host: HostConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load from the default locations and the environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with_file(None)
    }

    /// Load like [`AppConfig::load`], layering `extra_file` over the
    /// default locations when given
    pub fn load_with_file(extra_file: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            // Start with default values
            .set_default("event_log.log", DEFAULT_LOG)?
            .set_default("host.backend", HostBackend::default().as_str())?
            .set_default("logging.level", "info")?
            .set_default("logging.color", true)?
            // Load config files in order of precedence
            .add_source(File::with_name("event-logger").required(false))
            .add_source(File::with_name("/etc/event-logger/config").required(false));

        if let Some(path) = extra_file {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        let config = builder
            // EVENT_LOGGER__EVENT_LOG__SOURCE=MyService
            .add_source(
                config::Environment::with_prefix("EVENT_LOGGER")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Reject settings no writer can run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.event_log.source.trim().is_empty() {
            return Err(ConfigError::Message(
                "event_log.source is required".to_string(),
            ));
        }
        validate_channel(&self.event_log.log)
            .map_err(|reason| ConfigError::Message(format!("event_log.log: {}", reason)))?;
        Ok(())
    }

    pub fn from_args(source: String, log: Option<String>, backend: Option<HostBackend>) -> Self {
        Self {
            event_log: EventLogConfig {
                source,
                log: log.unwrap_or_else(default_log),
            },
            host: HostConfig {
                backend: backend.unwrap_or_default(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Apply command line overrides on top of the loaded settings
    pub fn apply_args(&mut self, matches: &clap::ArgMatches) -> Result<(), ConfigError> {
        if let Some(source) = matches.get_one::<String>("source") {
            self.event_log.source = source.clone();
        }

        if let Some(log) = matches.get_one::<String>("log") {
            self.event_log.log = log.clone();
        }

        if let Some(backend) = matches.get_one::<String>("backend") {
            self.host.backend = backend.parse()?;
        }

        if let Some(state_dir) = matches.get_one::<String>("state-dir") {
            self.host.state_dir = Some(PathBuf::from(state_dir));
        }

        Ok(())
    }

    pub fn load_from_args(matches: &clap::ArgMatches) -> Result<Self, ConfigError> {
        let config_file = matches.get_one::<String>("config").map(|s| s.as_str());
        let mut config = Self::load_with_file(config_file)?;
        config.apply_args(matches)?;
        config.validate()?;
        Ok(config)
    }
}
