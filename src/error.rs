//! Crate-wide error aggregation.
//!
//! Each component (schema, store, mail sync, calendar sync, query) owns its
//! own `thiserror` enum with variants specific to that component's failure
//! modes; `CoreError` is the aggregate a caller sees when it crosses
//! component boundaries (e.g. the daemon controller, which drives a sync
//! engine that touches both the store and the schema layer).

use crate::export::ExportError;
use crate::query::QueryError;
use crate::schema::SchemaError;
use crate::store::StoreError;

/// Result alias for code that can fail with any core component's error.
pub type CoreResult<T> = Result<T, CoreError>;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("query error: {0}")]
    Query(#[from] QueryError),

    #[error("mail sync error: {0}")]
    MailSync(#[from] crate::mail::MailSyncError),

    #[error("calendar sync error: {0}")]
    CalendarSync(#[from] crate::calendar::CalendarSyncError),

    #[error("export error: {0}")]
    Export(#[from] ExportError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// Whether the daemon controller should retry the operation that
    /// produced this error under the backoff policy.
    pub fn is_retryable(&self) -> bool {
        match self {
            CoreError::Store(e) => e.is_retryable(),
            CoreError::MailSync(e) => e.is_retryable(),
            CoreError::CalendarSync(e) => e.is_retryable(),
            _ => false,
        }
    }
}

/// Recognizes the documented transient-error vocabulary: a description
/// matching this set means "try again later", not a structural failure.
pub fn looks_transient(description: &str) -> bool {
    let lower = description.to_lowercase();
    ["locked", "busy", "timeout", "temporarily", "try again"]
        .iter()
        .any(|needle| lower.contains(needle))
}
