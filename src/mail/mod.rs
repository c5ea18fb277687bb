//! Mail Sync Engine.

pub mod sync;
pub mod types;

pub use sync::{MailSyncEngine, MailSyncMode, MailSyncResult};

use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum MailSyncError {
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

impl MailSyncError {
    /// Only `Transient` and a `Store::Busy` are worth a daemon retry
    ///.
    pub fn is_retryable(&self) -> bool {
        match self {
            MailSyncError::Transient(_) => true,
            MailSyncError::Store(e) => e.is_retryable(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_retryable() {
        assert!(MailSyncError::Transient("timeout".into()).is_retryable());
        assert!(MailSyncError::Store(StoreError::Busy("locked".into())).is_retryable());
        assert!(!MailSyncError::Store(StoreError::Corrupt("x".into())).is_retryable());
        assert!(!MailSyncError::PermissionDenied("no".into()).is_retryable());
    }
}
