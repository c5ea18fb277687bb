//! Mail side of the Mirror Store: mailboxes and messages.

use super::StoreError;
use crate::mail::types::{Mailbox, MailMessage};
use sqlx::{Row, SqlitePool};
use std::collections::HashSet;

pub struct MailStore {
    pool: SqlitePool,
}

impl MailStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn upsert_mailbox(&self, mailbox: &Mailbox) -> Result<(), StoreError> {
        self.upsert_mailboxes(std::slice::from_ref(mailbox)).await
    }

    /// One transaction per batch; inserts new rows, updates mutable
    /// fields on existing rows keyed by public ID.
    pub async fn upsert_mailboxes(&self, mailboxes: &[Mailbox]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        for mailbox in mailboxes {
            sqlx::query(
                "INSERT INTO mailboxes (id, account, name, path, message_count, synced_at)
                 VALUES (?, ?, ?, ?, ?, ?)
                 ON CONFLICT(id) DO UPDATE SET
                    account = excluded.account,
                    name = excluded.name,
                    path = excluded.path,
                    message_count = excluded.message_count,
                    synced_at = excluded.synced_at",
            )
            .bind(&mailbox.id)
            .bind(&mailbox.account)
            .bind(&mailbox.name)
            .bind(&mailbox.path)
            .bind(mailbox.message_count)
            .bind(mailbox.synced_at)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Removes mailboxes for `account` whose id is not in `keep`, mirroring
    /// the Source Provider no longer enumerating them.
    pub async fn delete_mailboxes_not_in(
        &self,
        account: &str,
        keep: &HashSet<String>,
    ) -> Result<u64, StoreError> {
        let existing: Vec<String> = sqlx::query("SELECT id FROM mailboxes WHERE account = ?")
            .bind(account)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(|row| row.get::<String, _>("id"))
            .collect();

        let to_delete: Vec<&String> = existing.iter().filter(|id| !keep.contains(*id)).collect();
        if to_delete.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        for id in &to_delete {
            sqlx::query("DELETE FROM mailboxes WHERE id = ?")
                .bind(id.as_str())
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(to_delete.len() as u64)
    }

    pub async fn upsert_message(&self, message: &MailMessage) -> Result<(), StoreError> {
        self.upsert_messages(std::slice::from_ref(message)).await
    }

    /// Idempotent: replaying the same input yields the same row content
    /// modulo `synced_at`.
    pub async fn upsert_messages(&self, messages: &[MailMessage]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        for message in messages {
            sqlx::query(
                "INSERT INTO mail_messages (
                    id, upstream_rowid, message_id_header, subject, sender_name, sender_email,
                    date_sent_utc, mailbox_id, is_read, is_flagged, has_attachments,
                    body_text, body_html, source_file_path, export_path, synced_at
                 ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                 ON CONFLICT(id) DO UPDATE SET
                    upstream_rowid = excluded.upstream_rowid,
                    message_id_header = excluded.message_id_header,
                    subject = excluded.subject,
                    sender_name = excluded.sender_name,
                    sender_email = excluded.sender_email,
                    date_sent_utc = excluded.date_sent_utc,
                    mailbox_id = excluded.mailbox_id,
                    is_read = excluded.is_read,
                    is_flagged = excluded.is_flagged,
                    has_attachments = excluded.has_attachments,
                    body_text = COALESCE(excluded.body_text, mail_messages.body_text),
                    body_html = COALESCE(excluded.body_html, mail_messages.body_html),
                    source_file_path = excluded.source_file_path,
                    synced_at = excluded.synced_at",
            )
            .bind(&message.id)
            .bind(message.upstream_rowid)
            .bind(&message.message_id_header)
            .bind(&message.subject)
            .bind(&message.sender_name)
            .bind(&message.sender_email)
            .bind(message.date_sent_utc)
            .bind(&message.mailbox_id)
            .bind(message.is_read)
            .bind(message.is_flagged)
            .bind(message.has_attachments)
            .bind(&message.body_text)
            .bind(&message.body_html)
            .bind(&message.source_file_path)
            .bind(&message.export_path)
            .bind(message.synced_at)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn get_message(&self, id: &str) -> Result<Option<MailMessage>, StoreError> {
        let row = sqlx::query("SELECT * FROM mail_messages WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| row_to_message(&r)))
    }

    pub async fn get_messages(&self, mailbox_id: &str, limit: i64) -> Result<Vec<MailMessage>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM mail_messages WHERE mailbox_id = ? ORDER BY date_sent_utc DESC LIMIT ?",
        )
        .bind(mailbox_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(row_to_message).collect())
    }

    pub async fn update_export_path(&self, id: &str, path: &str) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE mail_messages SET export_path = ? WHERE id = ?")
            .bind(path)
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("mail message {id}")));
        }
        Ok(())
    }

    pub async fn get_sync_status(&self, key: &str) -> Result<Option<String>, StoreError> {
        let row = sqlx::query("SELECT value FROM sync_status WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.get::<Option<String>, _>("value")).flatten())
    }

    pub async fn set_sync_status(&self, key: &str, value: &str) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO sync_status (key, value, updated_at) VALUES (?, ?, strftime('%s','now'))
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

pub(crate) fn row_to_message(row: &sqlx::sqlite::SqliteRow) -> MailMessage {
    MailMessage {
        id: row.get("id"),
        upstream_rowid: row.get("upstream_rowid"),
        message_id_header: row.get("message_id_header"),
        subject: row.get("subject"),
        sender_name: row.get("sender_name"),
        sender_email: row.get("sender_email"),
        date_sent_utc: row.get("date_sent_utc"),
        mailbox_id: row.get("mailbox_id"),
        is_read: row.get("is_read"),
        is_flagged: row.get("is_flagged"),
        has_attachments: row.get("has_attachments"),
        body_text: row.get("body_text"),
        body_html: row.get("body_html"),
        source_file_path: row.get("source_file_path"),
        export_path: row.get("export_path"),
        synced_at: row.get("synced_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{initialize_in_memory, DbKind};

    fn sample_message(id: &str, mailbox_id: &str) -> MailMessage {
        MailMessage {
            id: id.to_string(),
            upstream_rowid: 1,
            message_id_header: Some(format!("<{id}@x>")),
            subject: "Hello".into(),
            sender_name: Some("Alice".into()),
            sender_email: Some("alice@example.com".into()),
            date_sent_utc: 1000,
            mailbox_id: mailbox_id.to_string(),
            is_read: false,
            is_flagged: false,
            has_attachments: false,
            body_text: Some("body".into()),
            body_html: None,
            source_file_path: None,
            export_path: None,
            synced_at: 1000,
        }
    }

    async fn make_store() -> MailStore {
        let pool = initialize_in_memory(DbKind::Mail).await.unwrap();
        MailStore::new(pool)
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent() {
        let store = make_store().await;
        store
            .upsert_mailbox(&Mailbox {
                id: "mbox1".into(),
                account: "acct".into(),
                name: "Inbox".into(),
                path: "/inbox".into(),
                message_count: 1,
                synced_at: 1000,
            })
            .await
            .unwrap();

        let message = sample_message("m1", "mbox1");
        store.upsert_message(&message).await.unwrap();
        store.upsert_message(&message).await.unwrap();

        let fetched = store.get_message("m1").await.unwrap().unwrap();
        assert_eq!(fetched.subject, "Hello");
        assert_eq!(fetched.sender_email.as_deref(), Some("alice@example.com"));
    }

    #[tokio::test]
    async fn test_delete_mailboxes_not_in_is_account_scoped() {
        let store = make_store().await;
        for (id, account) in [("a1", "acct1"), ("a2", "acct1"), ("b1", "acct2")] {
            store
                .upsert_mailbox(&Mailbox {
                    id: id.into(),
                    account: account.into(),
                    name: id.into(),
                    path: id.into(),
                    message_count: 0,
                    synced_at: 0,
                })
                .await
                .unwrap();
        }

        let keep: HashSet<String> = ["a1".to_string()].into_iter().collect();
        let deleted = store.delete_mailboxes_not_in("acct1", &keep).await.unwrap();
        assert_eq!(deleted, 1);

        let remaining: Vec<String> = sqlx::query("SELECT id FROM mailboxes ORDER BY id")
            .fetch_all(store.pool())
            .await
            .unwrap()
            .iter()
            .map(|r| r.get::<String, _>("id"))
            .collect();
        assert_eq!(remaining, vec!["a1", "b1"]);
    }

    #[tokio::test]
    async fn test_sync_status_roundtrip() {
        let store = make_store().await;
        assert_eq!(store.get_sync_status("state").await.unwrap(), None);
        store.set_sync_status("state", "running").await.unwrap();
        assert_eq!(store.get_sync_status("state").await.unwrap(), Some("running".to_string()));
        store.set_sync_status("state", "success").await.unwrap();
        assert_eq!(store.get_sync_status("state").await.unwrap(), Some("success".to_string()));
    }
}
