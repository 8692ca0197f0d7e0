// src/internal/logger/logger.rs

use std::fs::{self, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use tracing_subscriber::{
    fmt::{self},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::internal::config::LoggingConfig;

/// Install the process-wide diagnostics subscriber.
///
/// Console output goes to stderr so it never mixes with what the binaries
/// print on stdout. `RUST_LOG` takes precedence over `cfg.level`.
pub fn init_logger(cfg: &LoggingConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cfg.level.clone()));

    let console = (!cfg.disable_console).then(|| {
        fmt::layer()
            .with_writer(io::stderr)
            .with_ansi(cfg.color)
            .with_level(true)
            .with_target(true)
    });

    let file = match &cfg.output_path {
        Some(output_path) => {
            let log_file = create_log_file(output_path, cfg.append_to_file)?;
            Some(
                fmt::layer()
                    .with_writer(SharedFileWriter::new(log_file))
                    .with_ansi(false)
                    .with_level(true)
                    .with_target(true),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .try_init()?;

    Ok(())
}

/// Create or open log file based on configuration
fn create_log_file(path: &str, append: bool) -> anyhow::Result<fs::File> {
    let path = Path::new(path);

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .append(append)
        .truncate(!append)
        .open(path)?;

    Ok(file)
}

/// File writer shared between the threads that emit diagnostics
#[derive(Clone)]
struct SharedFileWriter {
    file: Arc<Mutex<fs::File>>,
}

impl SharedFileWriter {
    fn new(file: fs::File) -> Self {
        Self {
            file: Arc::new(Mutex::new(file)),
        }
    }
}

impl io::Write for SharedFileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .flush()
    }
}

impl<'a> fmt::MakeWriter<'a> for SharedFileWriter {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_create_log_file_makes_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/diag.log");
        create_log_file(path.to_str().unwrap(), true).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_truncates_unless_appending() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("diag.log");
        fs::write(&path, "old line\n").unwrap();

        let mut file = create_log_file(path.to_str().unwrap(), true).unwrap();
        file.write_all(b"new line\n").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "old line\nnew line\n");

        create_log_file(path.to_str().unwrap(), false).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "");
    }
}
