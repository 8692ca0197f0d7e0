// src/internal/config/mod.rs

#[path = "_config.rs"]
pub mod config;

pub use self::config::{
    get_version_info, AppConfig, EventLogConfig, HostBackend, HostConfig, LoggingConfig,
    DEFAULT_LOG, VERSION,
};
