//! Full/incremental mail sync algorithm.

use super::types::{MailMessage, Mailbox};
use super::MailSyncError;
use crate::identity::IdentityEngine;
use crate::provider::{MailSourceProvider, ProviderError};
use crate::store::MailStore;
use futures::StreamExt;
use std::collections::HashSet;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailSyncMode {
    Full,
    Incremental,
}

#[derive(Debug, Clone, Default)]
pub struct MailSyncResult {
    pub added: u64,
    pub updated: u64,
    pub mailboxes_processed: u64,
    pub duration: Duration,
    pub warnings: Vec<String>,
}

pub struct MailSyncEngine<P: MailSourceProvider> {
    store: MailStore,
    provider: P,
}

impl<P: MailSourceProvider> MailSyncEngine<P> {
    pub fn new(store: MailStore, provider: P) -> Self {
        Self { store, provider }
    }

    pub fn store(&self) -> &MailStore {
        &self.store
    }

    /// Whether this mirror has ever completed a sync. Used by the
    /// daemon controller to decide full-vs-incremental on startup: full
    /// if the mirror is empty, incremental otherwise.
    pub async fn has_synced_before(&self) -> Result<bool, MailSyncError> {
        Ok(self.store.get_sync_status("last_sync_time").await?.is_some())
    }

    /// Runs one sync attempt to completion or to a fatal error (spec
    /// §4.E algorithm). Does not retry; retry-under-backoff is the
    /// daemon controller's concern, not this engine's.
    pub async fn sync(&self, mode: MailSyncMode) -> Result<MailSyncResult, MailSyncError> {
        let start = Instant::now();
        self.store.set_sync_status("state", "running").await?;
        self.store
            .set_sync_status("last_sync_start", &now_utc().to_string())
            .await?;

        match self.run(mode).await {
            Ok(mut result) => {
                result.duration = start.elapsed();
                self.store.set_sync_status("state", "success").await?;
                self.store
                    .set_sync_status("last_sync_time", &now_utc().to_string())
                    .await?;
                self.store
                    .set_sync_status("last_sync_error", "")
                    .await?;
                info!(
                    added = result.added,
                    updated = result.updated,
                    warnings = result.warnings.len(),
                    "mail sync completed"
                );
                Ok(result)
            }
            Err(e) => {
                self.store.set_sync_status("state", "failed").await?;
                self.store
                    .set_sync_status("last_sync_error", &e.to_string())
                    .await?;
                warn!(error = %e, "mail sync failed");
                Err(e)
            }
        }
    }

    async fn run(&self, mode: MailSyncMode) -> Result<MailSyncResult, MailSyncError> {
        let mut result = MailSyncResult::default();

        let since = match mode {
            MailSyncMode::Full => None,
            MailSyncMode::Incremental => self
                .store
                .get_sync_status("last_sync_time")
                .await?
                .and_then(|v| v.parse::<i64>().ok()),
        };

        let mailboxes = self
            .provider
            .list_mailboxes()
            .await
            .map_err(map_provider_error)?;

        for mailbox_snapshot in mailboxes {
            let mailbox = Mailbox {
                id: format!("mbox:{}", mailbox_snapshot.upstream_id),
                account: mailbox_snapshot.account.clone(),
                name: mailbox_snapshot.name.clone(),
                path: mailbox_snapshot.path.clone(),
                message_count: mailbox_snapshot.message_count,
                synced_at: now_utc(),
            };
            self.store.upsert_mailbox(&mailbox).await?;
            result.mailboxes_processed += 1;

            debug!(mailbox = %mailbox.name, "syncing mailbox");

            let mut stream = self
                .provider
                .iter_messages(&mailbox_snapshot.upstream_id, since)
                .await
                .map_err(map_provider_error)?;

            let mut batch = Vec::new();
            let mut existing_ids = HashSet::new();
            while let Some(item) = stream.next().await {
                let snapshot = match item {
                    Ok(s) => s,
                    Err(e) => {
                        result.warnings.push(format!("{}: {e}", mailbox.name));
                        continue;
                    }
                };

                let id = IdentityEngine::mail_message_public_id(
                    &mailbox.id,
                    snapshot.message_id_header.as_deref(),
                    snapshot.upstream_rowid,
                );

                if self.store.get_message(&id).await?.is_some() {
                    existing_ids.insert(id.clone());
                }

                let mut message = MailMessage {
                    id,
                    upstream_rowid: snapshot.upstream_rowid,
                    message_id_header: snapshot.message_id_header,
                    subject: snapshot.subject,
                    sender_name: snapshot.sender_name,
                    sender_email: snapshot.sender_email,
                    date_sent_utc: snapshot.date_sent_utc,
                    mailbox_id: mailbox.id.clone(),
                    is_read: snapshot.is_read,
                    is_flagged: snapshot.is_flagged,
                    has_attachments: snapshot.has_attachments,
                    body_text: None,
                    body_html: None,
                    source_file_path: snapshot.source_file_path,
                    export_path: None,
                    synced_at: now_utc(),
                };

                if message.has_attachments || message.body_text.is_none() {
                    if let Some(path) = message.source_file_path.clone() {
                        if !message.is_ews_virtual() {
                            match self.provider.read_message_body(&path).await {
                                Ok(body) => {
                                    message.body_text = body.text;
                                    message.body_html = body.html;
                                }
                                Err(e) => {
                                    result
                                        .warnings
                                        .push(format!("{}: body read failed: {e}", message.id));
                                }
                            }
                        }
                    }
                }

                batch.push(message);
            }

            for message in &batch {
                if existing_ids.contains(&message.id) {
                    result.updated += 1;
                } else {
                    result.added += 1;
                }
            }
            if !batch.is_empty() {
                self.store.upsert_messages(&batch).await?;
            }
        }

        Ok(result)
    }
}

fn map_provider_error(e: ProviderError) -> MailSyncError {
    match e {
        ProviderError::AccessDenied(msg) => MailSyncError::PermissionDenied(msg),
        ProviderError::Transient(msg) => MailSyncError::Transient(msg),
        ProviderError::ReadFailed { item, cause } => MailSyncError::Parse { item_id: item, cause },
        ProviderError::Other(msg) => MailSyncError::Invalid {
            field: "provider".into(),
            reason: msg,
        },
    }
}

fn now_utc() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mail::types::{MailSnapshot, MailboxSnapshot, MessageBody};
    use crate::provider::AccessResult;
    use crate::schema::{initialize_in_memory, DbKind};
    use async_trait::async_trait;
    use futures::stream::{self, BoxStream};
    use std::sync::Mutex;

    struct FakeMailProvider {
        mailboxes: Vec<MailboxSnapshot>,
        messages: Mutex<Vec<(String, Vec<MailSnapshot>)>>,
    }

    #[async_trait]
    impl MailSourceProvider for FakeMailProvider {
        async fn request_access(&self) -> AccessResult {
            AccessResult::granted()
        }

        async fn list_mailboxes(&self) -> Result<Vec<MailboxSnapshot>, ProviderError> {
            Ok(self.mailboxes.clone())
        }

        async fn iter_messages(
            &self,
            mailbox_upstream_id: &str,
            _since_utc: Option<i64>,
        ) -> Result<BoxStream<'async_trait, Result<MailSnapshot, ProviderError>>, ProviderError> {
            let messages = self
                .messages
                .lock()
                .unwrap()
                .iter()
                .find(|(id, _)| id == mailbox_upstream_id)
                .map(|(_, msgs)| msgs.clone())
                .unwrap_or_default();
            Ok(Box::pin(stream::iter(messages.into_iter().map(Ok))))
        }

        async fn read_message_body(&self, _source_file_path: &str) -> Result<MessageBody, ProviderError> {
            Ok(MessageBody::default())
        }
    }

    impl Clone for MailboxSnapshot {
        fn clone(&self) -> Self {
            Self {
                upstream_id: self.upstream_id.clone(),
                account: self.account.clone(),
                name: self.name.clone(),
                path: self.path.clone(),
                message_count: self.message_count,
            }
        }
    }

    impl Clone for MailSnapshot {
        fn clone(&self) -> Self {
            Self {
                upstream_rowid: self.upstream_rowid,
                message_id_header: self.message_id_header.clone(),
                subject: self.subject.clone(),
                sender_name: self.sender_name.clone(),
                sender_email: self.sender_email.clone(),
                date_sent_utc: self.date_sent_utc,
                is_read: self.is_read,
                is_flagged: self.is_flagged,
                has_attachments: self.has_attachments,
                source_file_path: self.source_file_path.clone(),
            }
        }
    }

    fn snapshot(rowid: i64, subject: &str) -> MailSnapshot {
        MailSnapshot {
            upstream_rowid: rowid,
            message_id_header: Some(format!("<{rowid}@x>")),
            subject: subject.to_string(),
            sender_name: Some("Alice".into()),
            sender_email: Some("alice@example.com".into()),
            date_sent_utc: 1000 + rowid,
            is_read: false,
            is_flagged: false,
            has_attachments: false,
            source_file_path: None,
        }
    }

    #[tokio::test]
    async fn test_fresh_full_sync_adds_all_messages() {
        let pool = initialize_in_memory(DbKind::Mail).await.unwrap();
        let store = MailStore::new(pool);
        let provider = FakeMailProvider {
            mailboxes: vec![
                MailboxSnapshot {
                    upstream_id: "inbox".into(),
                    account: "acct".into(),
                    name: "Inbox".into(),
                    path: "/inbox".into(),
                    message_count: 2,
                },
                MailboxSnapshot {
                    upstream_id: "sent".into(),
                    account: "acct".into(),
                    name: "Sent".into(),
                    path: "/sent".into(),
                    message_count: 0,
                },
            ],
            messages: Mutex::new(vec![(
                "inbox".into(),
                vec![snapshot(1, "Hello"), snapshot(2, "World")],
            )]),
        };

        let engine = MailSyncEngine::new(store, provider);
        let result = engine.sync(MailSyncMode::Full).await.unwrap();
        assert_eq!(result.added, 2);
        assert_eq!(result.updated, 0);
        assert_eq!(result.mailboxes_processed, 2);
        assert!(result.warnings.is_empty());
    }

    #[tokio::test]
    async fn test_replaying_same_snapshot_counts_as_update() {
        let pool = initialize_in_memory(DbKind::Mail).await.unwrap();
        let store = MailStore::new(pool);
        let provider = FakeMailProvider {
            mailboxes: vec![MailboxSnapshot {
                upstream_id: "inbox".into(),
                account: "acct".into(),
                name: "Inbox".into(),
                path: "/inbox".into(),
                message_count: 1,
            }],
            messages: Mutex::new(vec![("inbox".into(), vec![snapshot(1, "Hello")])]),
        };

        let engine = MailSyncEngine::new(store, provider);
        engine.sync(MailSyncMode::Full).await.unwrap();
        let second = engine.sync(MailSyncMode::Full).await.unwrap();
        assert_eq!(second.added, 0);
        assert_eq!(second.updated, 1);
    }
}
