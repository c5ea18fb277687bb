//! Mail query compilation and execution.

use super::parser::{parse_date_midnight_utc, split_filter, tokenize};
use super::QueryError;
use crate::mail::types::MailMessage;
use crate::store::mail_store::row_to_message;
use sqlx::sqlite::Sqlite;
use sqlx::{QueryBuilder, SqlitePool};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MailQuery {
    pub from: Option<String>,
    /// No recipient column exists on the mirrored `MailMessage` row
    ///; matched against `body_text` as the closest available
    /// substitute (see DESIGN.md).
    pub to: Option<String>,
    pub subject: Option<String>,
    pub mailbox: Option<String>,
    pub is_read: Option<bool>,
    pub is_flagged: Option<bool>,
    pub has_attachments: bool,
    pub after_utc: Option<i64>,
    pub before_utc: Option<i64>,
    pub free_text: String,
}

impl MailQuery {
    pub fn is_empty(&self) -> bool {
        self.from.is_none()
            && self.to.is_none()
            && self.subject.is_none()
            && self.mailbox.is_none()
            && self.is_read.is_none()
            && self.is_flagged.is_none()
            && !self.has_attachments
            && self.after_utc.is_none()
            && self.before_utc.is_none()
            && self.free_text.trim().is_empty()
    }
}

/// Tokenizes `input` into a `MailQuery`.
/// Unrecognized prefixes and unquoted bare words fall through to
/// `free_text`.
pub fn parse_mail_query(input: &str) -> Result<MailQuery, QueryError> {
    let mut query = MailQuery::default();
    let mut free_words = Vec::new();

    for token in tokenize(input) {
        let Some(filter) = split_filter(&token) else {
            free_words.push(token);
            continue;
        };

        match filter.key.as_str() {
            "from" => query.from = Some(filter.value),
            "to" => query.to = Some(filter.value),
            "subject" => query.subject = Some(filter.value),
            "mailbox" => query.mailbox = Some(filter.value),
            "is" => match filter.value.to_lowercase().as_str() {
                "read" => query.is_read = Some(true),
                "unread" => query.is_read = Some(false),
                "flagged" => query.is_flagged = Some(true),
                "unflagged" => query.is_flagged = Some(false),
                other => {
                    return Err(QueryError::InvalidInput {
                        field: "is".into(),
                        reason: format!("unrecognized value '{other}'"),
                    })
                }
            },
            "has" => {
                if filter.value.to_lowercase() == "attachments" {
                    query.has_attachments = true;
                } else {
                    free_words.push(token);
                }
            }
            "after" => {
                query.after_utc = Some(parse_date_midnight_utc(&filter.value).ok_or_else(|| {
                    QueryError::InvalidInput {
                        field: "after".into(),
                        reason: format!("invalid date '{}'", filter.value),
                    }
                })?)
            }
            "before" => {
                let midnight = parse_date_midnight_utc(&filter.value).ok_or_else(|| QueryError::InvalidInput {
                    field: "before".into(),
                    reason: format!("invalid date '{}'", filter.value),
                })?;
                query.before_utc = Some(midnight + 86_400);
            }
            "date" => {
                let midnight = parse_date_midnight_utc(&filter.value).ok_or_else(|| QueryError::InvalidInput {
                    field: "date".into(),
                    reason: format!("invalid date '{}'", filter.value),
                })?;
                query.after_utc = Some(midnight);
                query.before_utc = Some(midnight + 86_400);
            }
            // Unrecognized prefixes fall through into free text verbatim
            //.
            _ => free_words.push(token),
        }
    }

    query.free_text = free_words.join(" ");
    Ok(query)
}

/// Compiles `query` to SQL + (conditionally) FTS MATCH and executes it.
/// A purely structured query never touches `mail_messages_fts`;
/// free text ranks by BM25, else by recency.
pub async fn search_mail(pool: &SqlitePool, query: &MailQuery, limit: i64) -> Result<Vec<MailMessage>, QueryError> {
    let use_fts = !query.free_text.trim().is_empty();

    let mut builder: QueryBuilder<Sqlite> = if use_fts {
        let mut b = QueryBuilder::new(
            "SELECT mail_messages.* FROM mail_messages_fts
             JOIN mail_messages ON mail_messages.rowid = mail_messages_fts.rowid
             LEFT JOIN mailboxes ON mailboxes.id = mail_messages.mailbox_id
             WHERE mail_messages_fts MATCH ",
        );
        b.push_bind(query.free_text.clone());
        b
    } else {
        QueryBuilder::new(
            "SELECT mail_messages.* FROM mail_messages
             LEFT JOIN mailboxes ON mailboxes.id = mail_messages.mailbox_id
             WHERE 1 = 1",
        )
    };

    if let Some(from) = &query.from {
        builder.push(" AND (LOWER(mail_messages.sender_email) LIKE ");
        builder.push_bind(like_pattern(from));
        builder.push(" OR LOWER(mail_messages.sender_name) LIKE ");
        builder.push_bind(like_pattern(from));
        builder.push(")");
    }
    if let Some(to) = &query.to {
        builder.push(" AND LOWER(mail_messages.body_text) LIKE ");
        builder.push_bind(like_pattern(to));
    }
    if let Some(subject) = &query.subject {
        builder.push(" AND LOWER(mail_messages.subject) LIKE ");
        builder.push_bind(like_pattern(subject));
    }
    if let Some(mailbox) = &query.mailbox {
        builder.push(" AND LOWER(mailboxes.name) = ");
        builder.push_bind(mailbox.to_lowercase());
    }
    if let Some(is_read) = query.is_read {
        builder.push(" AND mail_messages.is_read = ");
        builder.push_bind(is_read);
    }
    if let Some(is_flagged) = query.is_flagged {
        builder.push(" AND mail_messages.is_flagged = ");
        builder.push_bind(is_flagged);
    }
    if query.has_attachments {
        builder.push(" AND mail_messages.has_attachments = ");
        builder.push_bind(true);
    }
    if let Some(after) = query.after_utc {
        builder.push(" AND mail_messages.date_sent_utc >= ");
        builder.push_bind(after);
    }
    if let Some(before) = query.before_utc {
        builder.push(" AND mail_messages.date_sent_utc < ");
        builder.push_bind(before);
    }

    if use_fts {
        builder.push(" ORDER BY bm25(mail_messages_fts) LIMIT ");
    } else {
        builder.push(" ORDER BY mail_messages.date_sent_utc DESC LIMIT ");
    }
    builder.push_bind(limit);

    let rows = builder.build().fetch_all(pool).await.map_err(QueryError::from)?;
    Ok(rows.iter().map(row_to_message).collect())
}

fn like_pattern(value: &str) -> String {
    format!("%{}%", value.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mail::types::{Mailbox, MailMessage};
    use crate::schema::{initialize_in_memory, DbKind};
    use crate::store::MailStore;

    #[test]
    fn test_parse_mail_query_matches_spec_example() {
        let query = parse_mail_query("from:a is:unread hello").unwrap();
        assert_eq!(query.from.as_deref(), Some("a"));
        assert_eq!(query.is_read, Some(false));
        assert_eq!(query.free_text, "hello");
    }

    #[test]
    fn test_unknown_prefix_is_free_text() {
        let query = parse_mail_query("foo:bar hello").unwrap();
        assert!(query.from.is_none());
        assert_eq!(query.free_text, "foo:bar hello");
    }

    #[test]
    fn test_empty_query_is_empty() {
        let query = parse_mail_query("").unwrap();
        assert!(query.is_empty());
    }

    async fn seeded_store() -> MailStore {
        let pool = initialize_in_memory(DbKind::Mail).await.unwrap();
        let store = MailStore::new(pool);
        store
            .upsert_mailbox(&Mailbox {
                id: "mbox1".into(),
                account: "acct".into(),
                name: "Inbox".into(),
                path: "/inbox".into(),
                message_count: 3,
                synced_at: 0,
            })
            .await
            .unwrap();
        let messages = [
            ("m1", "Q1 budget review", 1000),
            ("m2", "Q2 planning", 2000),
            ("m3", "budget variance Q1", 3000),
        ];
        for (id, subject, date) in messages {
            store
                .upsert_message(&MailMessage {
                    id: id.into(),
                    upstream_rowid: 1,
                    message_id_header: Some(format!("<{id}@x>")),
                    subject: subject.into(),
                    sender_name: Some("Alice".into()),
                    sender_email: Some("alice@example.com".into()),
                    date_sent_utc: date,
                    mailbox_id: "mbox1".into(),
                    is_read: false,
                    is_flagged: false,
                    has_attachments: false,
                    body_text: Some("body".into()),
                    body_html: None,
                    source_file_path: None,
                    export_path: None,
                    synced_at: 0,
                })
                .await
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_structured_only_query_orders_by_recency() {
        let store = seeded_store().await;
        let query = parse_mail_query("mailbox:inbox").unwrap();
        let results = search_mail(store.pool(), &query, 10).await.unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].id, "m3");
    }

    #[tokio::test]
    async fn test_fts_query_matches_subject() {
        let store = seeded_store().await;
        let query = parse_mail_query("subject:budget Q1").unwrap();
        assert!(!query.free_text.is_empty());
        let results = search_mail(store.pool(), &query, 10).await.unwrap();
        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn test_filters_with_no_matches_return_empty_not_error() {
        let store = seeded_store().await;
        let query = parse_mail_query("mailbox:nonexistent").unwrap();
        let results = search_mail(store.pool(), &query, 10).await.unwrap();
        assert!(results.is_empty());
    }
}
