//! Migration registries for the mail and calendar mirror databases.
//!
//! Migrations are linearly ordered and identified by a unique `name`;
//! once released a migration is never reordered or renamed.

use super::DbKind;

pub struct Migration {
    pub name: &'static str,
    pub up_sql: &'static str,
}

pub fn for_kind(kind: DbKind) -> &'static [Migration] {
    match kind {
        DbKind::Mail => MAIL_MIGRATIONS,
        DbKind::Calendar => CALENDAR_MIGRATIONS,
    }
}

pub static MAIL_MIGRATIONS: &[Migration] = &[
    Migration {
        name: "001_mail_initial_schema",
        up_sql: r#"
            CREATE TABLE mailboxes (
                id TEXT PRIMARY KEY,
                account TEXT NOT NULL,
                name TEXT NOT NULL,
                path TEXT NOT NULL,
                message_count INTEGER NOT NULL DEFAULT 0,
                synced_at INTEGER NOT NULL
            );

            CREATE TABLE mail_messages (
                id TEXT PRIMARY KEY,
                upstream_rowid INTEGER NOT NULL,
                message_id_header TEXT,
                subject TEXT NOT NULL DEFAULT '',
                sender_name TEXT,
                sender_email TEXT,
                date_sent_utc INTEGER NOT NULL,
                mailbox_id TEXT NOT NULL,
                is_read INTEGER NOT NULL DEFAULT 0,
                is_flagged INTEGER NOT NULL DEFAULT 0,
                has_attachments INTEGER NOT NULL DEFAULT 0,
                body_text TEXT,
                body_html TEXT,
                source_file_path TEXT,
                export_path TEXT,
                synced_at INTEGER NOT NULL,
                FOREIGN KEY (mailbox_id) REFERENCES mailboxes(id) ON DELETE CASCADE
            );

            CREATE INDEX idx_mail_messages_mailbox ON mail_messages (mailbox_id);
            CREATE INDEX idx_mail_messages_date_sent ON mail_messages (date_sent_utc);
            CREATE INDEX idx_mail_messages_is_read ON mail_messages (is_read);
            CREATE INDEX idx_mail_messages_is_flagged ON mail_messages (is_flagged);

            CREATE TABLE sync_status (
                key TEXT PRIMARY KEY,
                value TEXT,
                updated_at INTEGER NOT NULL
            );

            CREATE VIRTUAL TABLE mail_messages_fts USING fts5(
                subject, sender_name, sender_email, body_text,
                content='mail_messages', content_rowid='rowid'
            );

            CREATE TRIGGER mail_messages_ai AFTER INSERT ON mail_messages BEGIN
                INSERT INTO mail_messages_fts(rowid, subject, sender_name, sender_email, body_text)
                VALUES (new.rowid, new.subject, new.sender_name, new.sender_email, new.body_text);
            END;

            CREATE TRIGGER mail_messages_ad AFTER DELETE ON mail_messages BEGIN
                INSERT INTO mail_messages_fts(mail_messages_fts, rowid, subject, sender_name, sender_email, body_text)
                VALUES('delete', old.rowid, old.subject, old.sender_name, old.sender_email, old.body_text);
            END;

            CREATE TRIGGER mail_messages_au AFTER UPDATE ON mail_messages BEGIN
                INSERT INTO mail_messages_fts(mail_messages_fts, rowid, subject, sender_name, sender_email, body_text)
                VALUES('delete', old.rowid, old.subject, old.sender_name, old.sender_email, old.body_text);
                INSERT INTO mail_messages_fts(rowid, subject, sender_name, sender_email, body_text)
                VALUES (new.rowid, new.subject, new.sender_name, new.sender_email, new.body_text);
            END;
        "#,
    },
];

pub static CALENDAR_MIGRATIONS: &[Migration] = &[
    Migration {
        name: "001_calendar_initial_schema",
        up_sql: r#"
            CREATE TABLE calendars (
                id TEXT PRIMARY KEY,
                upstream_id TEXT NOT NULL,
                title TEXT NOT NULL,
                source_type TEXT NOT NULL,
                color TEXT,
                is_subscribed INTEGER NOT NULL DEFAULT 0,
                is_immutable INTEGER NOT NULL DEFAULT 0,
                synced_at INTEGER NOT NULL
            );

            CREATE TABLE events (
                id TEXT PRIMARY KEY,
                upstream_event_id TEXT,
                external_id TEXT,
                calendar_id TEXT NOT NULL,
                summary TEXT NOT NULL DEFAULT '',
                description TEXT,
                location TEXT,
                url TEXT,
                start_utc INTEGER NOT NULL,
                end_utc INTEGER NOT NULL,
                start_tz TEXT,
                end_tz TEXT,
                is_all_day INTEGER NOT NULL DEFAULT 0,
                recurrence_rule TEXT,
                master_event_id TEXT,
                occurrence_date_utc INTEGER,
                status TEXT NOT NULL DEFAULT 'confirmed',
                created_utc INTEGER NOT NULL,
                updated_utc INTEGER NOT NULL,
                synced_at INTEGER NOT NULL,
                FOREIGN KEY (calendar_id) REFERENCES calendars(id) ON DELETE CASCADE,
                FOREIGN KEY (master_event_id) REFERENCES events(id) ON DELETE SET NULL
            );

            CREATE INDEX idx_events_calendar ON events (calendar_id);
            CREATE INDEX idx_events_start ON events (start_utc);
            CREATE INDEX idx_events_master ON events (master_event_id);

            CREATE TABLE attendees (
                row_id INTEGER PRIMARY KEY AUTOINCREMENT,
                event_id TEXT NOT NULL,
                name TEXT,
                email TEXT,
                response_status TEXT NOT NULL DEFAULT 'needs-action',
                is_organizer INTEGER NOT NULL DEFAULT 0,
                is_optional INTEGER NOT NULL DEFAULT 0,
                FOREIGN KEY (event_id) REFERENCES events(id) ON DELETE CASCADE
            );

            CREATE INDEX idx_attendees_event ON attendees (event_id);

            CREATE TABLE reminders (
                id TEXT PRIMARY KEY,
                upstream_id TEXT NOT NULL,
                calendar_id TEXT NOT NULL,
                title TEXT NOT NULL DEFAULT '',
                notes TEXT,
                due_utc INTEGER,
                priority INTEGER NOT NULL DEFAULT 0,
                is_completed INTEGER NOT NULL DEFAULT 0,
                completed_utc INTEGER,
                synced_at INTEGER NOT NULL,
                FOREIGN KEY (calendar_id) REFERENCES calendars(id) ON DELETE CASCADE
            );

            CREATE INDEX idx_reminders_calendar ON reminders (calendar_id);

            CREATE TABLE sync_status (
                key TEXT PRIMARY KEY,
                value TEXT,
                updated_at INTEGER NOT NULL
            );

            CREATE VIRTUAL TABLE events_fts USING fts5(
                summary, description, location,
                content='events', content_rowid='rowid'
            );

            CREATE TRIGGER events_ai AFTER INSERT ON events BEGIN
                INSERT INTO events_fts(rowid, summary, description, location)
                VALUES (new.rowid, new.summary, new.description, new.location);
            END;

            CREATE TRIGGER events_ad AFTER DELETE ON events BEGIN
                INSERT INTO events_fts(events_fts, rowid, summary, description, location)
                VALUES('delete', old.rowid, old.summary, old.description, old.location);
            END;

            CREATE TRIGGER events_au AFTER UPDATE ON events BEGIN
                INSERT INTO events_fts(events_fts, rowid, summary, description, location)
                VALUES('delete', old.rowid, old.summary, old.description, old.location);
                INSERT INTO events_fts(rowid, summary, description, location)
                VALUES (new.rowid, new.summary, new.description, new.location);
            END;
        "#,
    },
];
