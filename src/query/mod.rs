//! Query & Search: field-filter tokenizing, SQL + FTS
//! compilation, BM25/recency ordering.

pub mod event_search;
pub mod mail_search;
pub mod parser;

pub use event_search::{search_events, EventQuery};
pub use mail_search::{search_mail, MailQuery};

/// Default page size for an empty query: an empty query returns the N
/// most recent.
pub const DEFAULT_PAGE_SIZE: i64 = 50;

#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("invalid {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error(transparent)]
    Store(#[from] crate::store::StoreError),
}

impl From<sqlx::Error> for QueryError {
    fn from(err: sqlx::Error) -> Self {
        QueryError::Store(crate::store::StoreError::from(err))
    }
}
