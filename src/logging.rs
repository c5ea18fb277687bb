//! Daemon log file writer.
//!
//! Independent of the process-wide `tracing` subscriber: the daemon
//! controller wants a dedicated, line-buffered, immediately-flushed log
//! file per daemon under the vault's `logs/` directory, with each line starting
//! with an ISO-8601 UTC timestamp and a level tag.

use chrono::Utc;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn tag(self) -> &'static str {
        match self {
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }
}

/// A single daemon's append-only log file.
pub struct DaemonLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl DaemonLog {
    /// Open (creating the parent directory and file if necessary) the log
    /// file for `daemon_name` under `logs_dir`, e.g. `logs/mail.log`.
    pub fn open(logs_dir: &Path, daemon_name: &str) -> io::Result<Self> {
        std::fs::create_dir_all(logs_dir)?;
        let path = logs_dir.join(format!("{daemon_name}.log"));
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write_line(&self, level: LogLevel, message: &str) {
        let timestamp = Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
        let line = format!("{timestamp} [{}] {message}\n", level.tag());
        if let Ok(mut file) = self.file.lock() {
            // Best-effort: a failed log write must never abort a sync.
            let _ = file.write_all(line.as_bytes());
            let _ = file.flush();
        }
    }

    pub fn info(&self, message: &str) {
        self.write_line(LogLevel::Info, message);
    }

    pub fn warn(&self, message: &str) {
        self.write_line(LogLevel::Warn, message);
    }

    pub fn error(&self, message: &str) {
        self.write_line(LogLevel::Error, message);
    }
}
