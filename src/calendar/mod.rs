//! Calendar Sync Engine.

pub mod recurrence;
pub mod sync;
pub mod types;

pub use recurrence::is_valid_recurrence_rule;
pub use sync::{CalendarSyncEngine, CalendarSyncResult};

use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum CalendarSyncError {
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("transient error: {0}")]
    Transient(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("failed to parse {item_id}: {cause}")]
    Parse { item_id: String, cause: String },

    #[error("invalid {field}: {reason}")]
    Invalid { field: String, reason: String },
}

impl CalendarSyncError {
    pub fn is_retryable(&self) -> bool {
        match self {
            CalendarSyncError::Transient(_) => true,
            CalendarSyncError::Store(e) => e.is_retryable(),
            _ => false,
        }
    }
}
