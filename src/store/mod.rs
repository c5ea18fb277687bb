//! Mirror Store: typed CRUD over mirror entities, transactional
//! batch upserts, and deletion reconciliation.

pub mod calendar_store;
pub mod mail_store;

pub use calendar_store::CalendarStore;
pub use mail_store::MailStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store busy: {0}")]
    Busy(String),

    #[error("store corrupt: {0}")]
    Corrupt(String),

    #[error("constraint violation: {0}")]
    Constraint(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("io error: {0}")]
    Io(String),
}

impl StoreError {
    /// `Busy` is the only kind the sync engines retry under backoff
    ///; the others are fatal to the current attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Busy(_))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) => {
                let message = db_err.message().to_lowercase();
                if message.contains("locked") || message.contains("busy") {
                    StoreError::Busy(db_err.message().to_string())
                } else if let Some(code) = db_err.code() {
                    match code.as_ref() {
                        "787" | "1555" | "2067" => StoreError::Constraint(db_err.message().to_string()),
                        _ => StoreError::Corrupt(db_err.message().to_string()),
                    }
                } else {
                    StoreError::Corrupt(db_err.message().to_string())
                }
            }
            sqlx::Error::RowNotFound => StoreError::NotFound("row not found".to_string()),
            sqlx::Error::Io(io_err) => StoreError::Io(io_err.to_string()),
            other => StoreError::Io(other.to_string()),
        }
    }
}
