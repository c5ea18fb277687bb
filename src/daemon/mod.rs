//! Daemon Controller: periodic timer, wake/sleep/change
//! hooks, debounce, in-flight guard, retry with backoff.

pub mod controller;

pub use controller::{DaemonController, SyncStatusSnapshot, SyncTrigger};

use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    #[error("mail sync failed: {0}")]
    Mail(#[from] crate::mail::MailSyncError),

    #[error("calendar sync failed: {0}")]
    Calendar(#[from] crate::calendar::CalendarSyncError),

    #[error("supervisor error: {0}")]
    Supervisor(String),
}

/// What the daemon controller needs from a Sync Engine: run one attempt,
/// classify its own errors as retryable, and expose the `sync_status`
/// snapshot it persists.
#[async_trait]
pub trait SyncEngine: Send + Sync {
    type Error: std::fmt::Display + Send + Sync + 'static;

    async fn run_once(&self, trigger: SyncTrigger) -> Result<(), Self::Error>;

    fn is_retryable(error: &Self::Error) -> bool;

    async fn status_snapshot(&self) -> SyncStatusSnapshot;
}

#[async_trait]
impl<P: crate::provider::MailSourceProvider> SyncEngine for crate::mail::MailSyncEngine<P> {
    type Error = crate::mail::MailSyncError;

    async fn run_once(&self, _trigger: SyncTrigger) -> Result<(), Self::Error> {
        let mode = if self.has_synced_before().await? {
            crate::mail::MailSyncMode::Incremental
        } else {
            crate::mail::MailSyncMode::Full
        };
        self.sync(mode).await?;
        Ok(())
    }

    fn is_retryable(error: &Self::Error) -> bool {
        error.is_retryable()
    }

    async fn status_snapshot(&self) -> SyncStatusSnapshot {
        let store = self.store();
        SyncStatusSnapshot {
            state: store.get_sync_status("state").await.ok().flatten().unwrap_or_else(|| "idle".into()),
            last_sync_time: store
                .get_sync_status("last_sync_time")
                .await
                .ok()
                .flatten()
                .and_then(|v| v.parse().ok()),
            last_error: store
                .get_sync_status("last_sync_error")
                .await
                .ok()
                .flatten()
                .filter(|e| !e.is_empty()),
        }
    }
}

#[async_trait]
impl<P: crate::provider::CalendarSourceProvider> SyncEngine for crate::calendar::CalendarSyncEngine<P> {
    type Error = crate::calendar::CalendarSyncError;

    async fn run_once(&self, _trigger: SyncTrigger) -> Result<(), Self::Error> {
        self.sync().await?;
        Ok(())
    }

    fn is_retryable(error: &Self::Error) -> bool {
        error.is_retryable()
    }

    async fn status_snapshot(&self) -> SyncStatusSnapshot {
        let store = self.store();
        SyncStatusSnapshot {
            state: store.get_sync_status("state").await.ok().flatten().unwrap_or_else(|| "idle".into()),
            last_sync_time: store
                .get_sync_status("last_sync_time")
                .await
                .ok()
                .flatten()
                .and_then(|v| v.parse().ok()),
            last_error: store
                .get_sync_status("last_sync_error")
                .await
                .ok()
                .flatten()
                .filter(|e| !e.is_empty()),
        }
    }
}
