//! Exporter: Markdown-with-frontmatter, JSON envelope, and
//! iCalendar rendering, all driven from the same mirror entity rows.

pub mod batch;
pub mod html;
pub mod ics;
pub mod json;
pub mod markdown;

pub use batch::export_message_to_disk;
pub use html::strip_html;
pub use ics::{export_event_ics, export_events_ics};
pub use json::JsonEnvelope;
pub use markdown::{export_event_markdown, export_message_markdown};

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("message {id} has no locally readable body ({reason})")]
    NotAvailable { id: String, reason: String },

    #[error("io error writing export: {0}")]
    Io(#[from] std::io::Error),
}

/// Flat, idempotent export filename: `<public_id>.<ext>`.
pub fn export_filename(public_id: &str, extension: &str) -> String {
    format!("{public_id}.{extension}")
}

/// Reads the raw body already mirrored for `message`. Markdown/JSON export
/// always succeeds (it falls back to an empty body); this is the
/// narrower "give me the source text" path that an `ews:`-prefixed
/// message must refuse: exportable, but raw body is unavailable.
pub fn raw_body(message: &crate::mail::types::MailMessage) -> Result<&str, ExportError> {
    if message.is_ews_virtual() {
        return Err(ExportError::NotAvailable {
            id: message.id.clone(),
            reason: "source_file_path names a remote/virtual record".to_string(),
        });
    }
    Ok(message.body_text.as_deref().unwrap_or(""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mail::types::MailMessage;

    fn sample(source_file_path: Option<&str>) -> MailMessage {
        MailMessage {
            id: "m1".into(),
            upstream_rowid: 1,
            message_id_header: None,
            subject: "Hi".into(),
            sender_name: None,
            sender_email: None,
            date_sent_utc: 0,
            mailbox_id: "mbox1".into(),
            is_read: false,
            is_flagged: false,
            has_attachments: false,
            body_text: Some("hello".into()),
            body_html: None,
            source_file_path: source_file_path.map(String::from),
            export_path: None,
            synced_at: 0,
        }
    }

    #[test]
    fn test_raw_body_available_for_local_message() {
        let message = sample(Some("/tmp/a.eml"));
        assert_eq!(raw_body(&message).unwrap(), "hello");
    }

    #[test]
    fn test_raw_body_refuses_ews_virtual_message() {
        let message = sample(Some("ews:12345"));
        assert!(matches!(raw_body(&message), Err(ExportError::NotAvailable { .. })));
    }

    #[test]
    fn test_export_filename_is_flat_and_idempotent() {
        assert_eq!(export_filename("abc123", "md"), "abc123.md");
        assert_eq!(export_filename("abc123", "md"), export_filename("abc123", "md"));
    }
}
