//! Source Provider / Action Sink interfaces.
//!
//! The provider is the boundary to the external system stores. It is
//! consumed, never owned: the Sync Engines take one as a parameter per
//! call rather than reaching for ambient state: global singletons
//! replaced by explicit dependency injection.

use crate::calendar::types::{CalendarSnapshot, EventSnapshot, ReminderSnapshot};
use crate::mail::types::{MailSnapshot, MailboxSnapshot, MessageBody};
use async_trait::async_trait;
use futures::stream::BoxStream;

#[derive(Debug, Clone)]
pub struct AccessResult {
    pub granted: bool,
    pub error: Option<String>,
}

impl AccessResult {
    pub fn granted() -> Self {
        Self { granted: true, error: None }
    }

    pub fn denied(error: impl Into<String>) -> Self {
        Self { granted: false, error: Some(error.into()) }
    }
}

/// A half-open UTC time range, end-exclusive.
#[derive(Debug, Clone, Copy)]
pub struct TimeRange {
    pub start_utc: i64,
    pub end_utc: i64,
}

/// Mail-side Source Provider.
#[async_trait]
pub trait MailSourceProvider: Send + Sync {
    async fn request_access(&self) -> AccessResult;

    async fn list_mailboxes(&self) -> Result<Vec<MailboxSnapshot>, ProviderError>;

    /// `since_utc` narrows the provider's own enumeration; the engine's
    /// upsert path still tolerates rows the provider decides to re-emit
    /// regardless.
    async fn iter_messages(
        &self,
        mailbox_upstream_id: &str,
        since_utc: Option<i64>,
    ) -> Result<BoxStream<'async_trait, Result<MailSnapshot, ProviderError>>, ProviderError>;

    async fn read_message_body(&self, source_file_path: &str) -> Result<MessageBody, ProviderError>;
}

/// Calendar-side Source Provider.
#[async_trait]
pub trait CalendarSourceProvider: Send + Sync {
    async fn request_access(&self) -> AccessResult;

    async fn list_calendars(&self) -> Result<Vec<CalendarSnapshot>, ProviderError>;

    async fn list_events(
        &self,
        calendar_upstream_id: &str,
        range: TimeRange,
    ) -> Result<Vec<EventSnapshot>, ProviderError>;

    async fn list_reminders(&self, range: Option<TimeRange>) -> Result<Vec<ReminderSnapshot>, ProviderError>;
}

/// Errors a Source Provider may report back to a Sync Engine. Distinct
/// from `MailSyncError`/`CalendarSyncError`: this is the provider's own
/// vocabulary, which the engines translate into their error kind.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("access denied: {0}")]
    AccessDenied(String),

    #[error("transient provider error: {0}")]
    Transient(String),

    #[error("failed to read {item}: {cause}")]
    ReadFailed { item: String, cause: String },

    #[error("{0}")]
    Other(String),
}

impl ProviderError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ProviderError::Transient(_))
    }
}

/// Action Sink: not part of the sync path. The core only
/// resolves a public ID to an upstream handle; everything else (archive,
/// delete, move, flag, mark, reply, compose) is the sink's concern and
/// lives outside this crate.
#[async_trait]
pub trait ActionSink: Send + Sync {
    async fn resolve(&self, public_id: &str) -> Result<String, ProviderError>;
}
