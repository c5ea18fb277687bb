//! Mail entity types.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mailbox {
    pub id: String,
    pub account: String,
    pub name: String,
    pub path: String,
    pub message_count: i64,
    pub synced_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MailMessage {
    pub id: String,
    pub upstream_rowid: i64,
    pub message_id_header: Option<String>,
    pub subject: String,
    pub sender_name: Option<String>,
    pub sender_email: Option<String>,
    pub date_sent_utc: i64,
    pub mailbox_id: String,
    pub is_read: bool,
    pub is_flagged: bool,
    pub has_attachments: bool,
    pub body_text: Option<String>,
    pub body_html: Option<String>,
    pub source_file_path: Option<String>,
    pub export_path: Option<String>,
    pub synced_at: i64,
}

impl MailMessage {
    /// `ews:`-prefixed paths name a remote/virtual record whose raw body
    /// is unavailable locally.
    pub fn is_ews_virtual(&self) -> bool {
        self.source_file_path
            .as_deref()
            .is_some_and(|p| p.starts_with("ews:"))
    }
}

/// A single upstream read of a mailbox, handed to the sync engine by the
/// Source Provider.
#[derive(Debug, Clone)]
pub struct MailboxSnapshot {
    pub upstream_id: String,
    pub account: String,
    pub name: String,
    pub path: String,
    pub message_count: i64,
}

/// A single upstream read of a message, handed to the sync engine by the
/// Source Provider.
#[derive(Debug, Clone)]
pub struct MailSnapshot {
    pub upstream_rowid: i64,
    pub message_id_header: Option<String>,
    pub subject: String,
    pub sender_name: Option<String>,
    pub sender_email: Option<String>,
    pub date_sent_utc: i64,
    pub is_read: bool,
    pub is_flagged: bool,
    pub has_attachments: bool,
    pub source_file_path: Option<String>,
}

/// Parsed body + attachment metadata returned by
/// `Source Provider::read_message_body`.
#[derive(Debug, Clone, Default)]
pub struct MessageBody {
    pub text: Option<String>,
    pub html: Option<String>,
    pub attachments: Vec<AttachmentMeta>,
}

#[derive(Debug, Clone)]
pub struct AttachmentMeta {
    pub filename: String,
    pub size_bytes: u64,
}
