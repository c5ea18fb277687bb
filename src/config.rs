//! Configuration the core consumes from its embedder.
//!
//! Vault bootstrap and config-file resolution are the CLI's concern (spec
//! §1); the core only ever sees the already-resolved paths and tuning
//! knobs below.

use std::path::PathBuf;

/// Resolved on-disk layout for one vault.
#[derive(Debug, Clone)]
pub struct VaultPaths {
    pub vault_root: PathBuf,
    pub data_dir: PathBuf,
    pub mail_db_path: PathBuf,
    pub calendar_db_path: PathBuf,
    pub logs_dir: PathBuf,
    pub exports_dir: PathBuf,
}

impl VaultPaths {
    /// Derive the conventional layout under `vault_root`:
    /// `Swiftea/mail.db`, `Swiftea/calendar.db`, `Swiftea/logs/`,
    /// `exports/mail/`.
    pub fn under(vault_root: impl Into<PathBuf>) -> Self {
        let vault_root = vault_root.into();
        let data_dir = vault_root.join("Swiftea");
        Self {
            mail_db_path: data_dir.join("mail.db"),
            calendar_db_path: data_dir.join("calendar.db"),
            logs_dir: data_dir.join("logs"),
            exports_dir: vault_root.join("exports"),
            data_dir,
            vault_root,
        }
    }
}

/// Retry/backoff tuning shared by the mail and calendar sync engines and
/// the daemon controller.
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    pub base_delay_secs: u64,
    pub max_delay_secs: u64,
    pub max_attempts: u32,
    /// Upper bound of the jitter window, as a fraction of the capped
    /// delay; `backoff_delay` draws from the top half of this range, so
    /// the default 0.20 yields a 10-20% jitter band.
    pub jitter_fraction: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            base_delay_secs: 2,
            max_delay_secs: 60,
            max_attempts: 5,
            jitter_fraction: 0.20,
        }
    }
}

/// Calendar sync engine window and behavior tuning.
#[derive(Debug, Clone, Copy)]
pub struct CalendarSyncConfig {
    pub lookback_days: i64,
    pub date_range_days: i64,
    pub retry: RetryConfig,
}

impl Default for CalendarSyncConfig {
    fn default() -> Self {
        Self {
            lookback_days: 30,
            date_range_days: 180,
            retry: RetryConfig::default(),
        }
    }
}

/// Mail sync engine tuning.
#[derive(Debug, Clone, Copy)]
pub struct MailSyncConfig {
    pub retry: RetryConfig,
}

impl Default for MailSyncConfig {
    fn default() -> Self {
        Self {
            retry: RetryConfig::default(),
        }
    }
}

/// Daemon controller scheduling tuning.
#[derive(Debug, Clone, Copy)]
pub struct DaemonConfig {
    pub periodic_interval_secs: u64,
    pub debounce_secs: u64,
    pub retry: RetryConfig,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            periodic_interval_secs: 300,
            debounce_secs: 30,
            retry: RetryConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vault_paths_layout() {
        let paths = VaultPaths::under("/home/user/vault");
        assert_eq!(paths.mail_db_path, PathBuf::from("/home/user/vault/Swiftea/mail.db"));
        assert_eq!(paths.calendar_db_path, PathBuf::from("/home/user/vault/Swiftea/calendar.db"));
        assert_eq!(paths.logs_dir, PathBuf::from("/home/user/vault/Swiftea/logs"));
        assert_eq!(paths.exports_dir, PathBuf::from("/home/user/vault/exports"));
    }

    #[test]
    fn test_daemon_config_defaults() {
        let cfg = DaemonConfig::default();
        assert_eq!(cfg.periodic_interval_secs, 300);
        assert_eq!(cfg.debounce_secs, 30);
        assert_eq!(cfg.retry.max_attempts, 5);
    }
}
