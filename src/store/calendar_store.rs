//! Calendar side of the Mirror Store: calendars, events,
//! attendees, and reminders.

use super::StoreError;
use crate::calendar::types::{Attendee, Calendar, Event, Reminder};
use sqlx::{Row, SqlitePool};
use std::collections::HashSet;

pub struct CalendarStore {
    pool: SqlitePool,
}

impl CalendarStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn upsert_calendar(&self, calendar: &Calendar) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO calendars (id, upstream_id, title, source_type, color, is_subscribed, is_immutable, synced_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                source_type = excluded.source_type,
                color = excluded.color,
                is_subscribed = excluded.is_subscribed,
                is_immutable = excluded.is_immutable,
                synced_at = excluded.synced_at",
        )
        .bind(&calendar.id)
        .bind(&calendar.upstream_id)
        .bind(&calendar.title)
        .bind(&calendar.source_type)
        .bind(&calendar.color)
        .bind(calendar.is_subscribed)
        .bind(calendar.is_immutable)
        .bind(calendar.synced_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn delete_calendars_not_in(&self, keep: &HashSet<String>) -> Result<u64, StoreError> {
        let existing: Vec<String> = sqlx::query("SELECT id FROM calendars")
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
            sqlx::query("DELETE FROM calendars WHERE id = ?")
                .bind(id.as_str())
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(to_delete.len() as u64)
    }

    pub async fn upsert_event(&self, event: &Event) -> Result<(), StoreError> {
        self.upsert_events(std::slice::from_ref(event)).await
    }

    /// One transaction per batch, matching the mail store's batching
    ///.
    pub async fn upsert_events(&self, events: &[Event]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        for event in events {
            sqlx::query(
                "INSERT INTO events (
                    id, upstream_event_id, external_id, calendar_id, summary, description, location, url,
                    start_utc, end_utc, start_tz, end_tz, is_all_day, recurrence_rule, master_event_id,
                    occurrence_date_utc, status, created_utc, updated_utc, synced_at
                 ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                 ON CONFLICT(id) DO UPDATE SET
                    upstream_event_id = excluded.upstream_event_id,
                    external_id = excluded.external_id,
                    calendar_id = excluded.calendar_id,
                    summary = excluded.summary,
                    description = excluded.description,
                    location = excluded.location,
                    url = excluded.url,
                    start_utc = excluded.start_utc,
                    end_utc = excluded.end_utc,
                    start_tz = excluded.start_tz,
                    end_tz = excluded.end_tz,
                    is_all_day = excluded.is_all_day,
                    recurrence_rule = excluded.recurrence_rule,
                    master_event_id = excluded.master_event_id,
                    occurrence_date_utc = excluded.occurrence_date_utc,
                    status = excluded.status,
                    updated_utc = excluded.updated_utc,
                    synced_at = excluded.synced_at",
            )
            .bind(&event.id)
            .bind(&event.upstream_event_id)
            .bind(&event.external_id)
            .bind(&event.calendar_id)
            .bind(&event.summary)
            .bind(&event.description)
            .bind(&event.location)
            .bind(&event.url)
            .bind(event.start_utc)
            .bind(event.end_utc)
            .bind(&event.start_tz)
            .bind(&event.end_tz)
            .bind(event.is_all_day)
            .bind(&event.recurrence_rule)
            .bind(&event.master_event_id)
            .bind(event.occurrence_date_utc)
            .bind(&event.status)
            .bind(event.created_utc)
            .bind(event.updated_utc)
            .bind(event.synced_at)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn get_event(&self, id: &str) -> Result<Option<Event>, StoreError> {
        let row = sqlx::query("SELECT * FROM events WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| row_to_event(&r)))
    }

    /// Looks up a stored event by its native upstream identifier within
    /// one calendar, independent of the current public ID. Used by
    /// identity reconciliation to find the row a snapshot belongs to when
    /// its `external_id` has changed but the upstream's own row id has not.
    pub async fn find_event_by_upstream_event_id(
        &self,
        calendar_id: &str,
        upstream_event_id: &str,
    ) -> Result<Option<Event>, StoreError> {
        let row = sqlx::query("SELECT * FROM events WHERE calendar_id = ? AND upstream_event_id = ?")
            .bind(calendar_id)
            .bind(upstream_event_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| row_to_event(&r)))
    }

    /// Content-match fallback: finds a stored event in the same calendar
    /// whose summary matches case-insensitively and whose start time is
    /// within `tolerance_secs`, used when every identifier on a snapshot
    /// differs from what is stored (identity reconciliation's last
    /// resort).
    pub async fn find_event_by_content_match(
        &self,
        calendar_id: &str,
        summary: &str,
        start_utc: i64,
        tolerance_secs: i64,
    ) -> Result<Option<Event>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM events WHERE calendar_id = ? AND LOWER(summary) = LOWER(?)
             AND start_utc BETWEEN ? AND ?",
        )
        .bind(calendar_id)
        .bind(summary.trim())
        .bind(start_utc - tolerance_secs)
        .bind(start_utc + tolerance_secs)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.first().map(row_to_event))
    }

    pub async fn get_events_in_range(
        &self,
        calendar_id: &str,
        start_utc: i64,
        end_utc: i64,
    ) -> Result<Vec<Event>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM events WHERE calendar_id = ? AND start_utc < ? AND end_utc > ?
             ORDER BY start_utc ASC",
        )
        .bind(calendar_id)
        .bind(end_utc)
        .bind(start_utc)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(row_to_event).collect())
    }

    /// Deletes events belonging to `calendar_id` whose id is not in `keep`,
    /// the within-window deletion sweep.
    pub async fn delete_events_not_in(
        &self,
        calendar_id: &str,
        start_utc: i64,
        end_utc: i64,
        keep: &HashSet<String>,
    ) -> Result<u64, StoreError> {
        let existing: Vec<String> = sqlx::query(
            "SELECT id FROM events WHERE calendar_id = ? AND start_utc < ? AND end_utc > ?",
        )
        .bind(calendar_id)
        .bind(end_utc)
        .bind(start_utc)
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
            sqlx::query("DELETE FROM events WHERE id = ?")
                .bind(id.as_str())
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(to_delete.len() as u64)
    }

    /// Delete-all-then-insert-all inside a single transaction: attendees
    /// carry no stable upstream identity of their own, so they are
    /// replaced wholesale rather than diffed.
    pub async fn replace_attendees(&self, event_id: &str, attendees: &[Attendee]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM attendees WHERE event_id = ?")
            .bind(event_id)
            .execute(&mut *tx)
            .await?;
        for attendee in attendees {
            sqlx::query(
                "INSERT INTO attendees (event_id, name, email, response_status, is_organizer, is_optional)
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(event_id)
            .bind(&attendee.name)
            .bind(&attendee.email)
            .bind(&attendee.response_status)
            .bind(attendee.is_organizer)
            .bind(attendee.is_optional)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn get_attendees(&self, event_id: &str) -> Result<Vec<Attendee>, StoreError> {
        let rows = sqlx::query(
            "SELECT event_id, name, email, response_status, is_organizer, is_optional
             FROM attendees WHERE event_id = ?",
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .iter()
            .map(|row| Attendee {
                event_id: row.get("event_id"),
                name: row.get("name"),
                email: row.get("email"),
                response_status: row.get("response_status"),
                is_organizer: row.get("is_organizer"),
                is_optional: row.get("is_optional"),
            })
            .collect())
    }

    pub async fn upsert_reminder(&self, reminder: &Reminder) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO reminders (id, upstream_id, calendar_id, title, notes, due_utc, priority, is_completed, completed_utc, synced_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                notes = excluded.notes,
                due_utc = excluded.due_utc,
                priority = excluded.priority,
                is_completed = excluded.is_completed,
                completed_utc = excluded.completed_utc,
                synced_at = excluded.synced_at",
        )
        .bind(&reminder.id)
        .bind(&reminder.upstream_id)
        .bind(&reminder.calendar_id)
        .bind(&reminder.title)
        .bind(&reminder.notes)
        .bind(reminder.due_utc)
        .bind(reminder.priority)
        .bind(reminder.is_completed)
        .bind(reminder.completed_utc)
        .bind(reminder.synced_at)
        .execute(&self.pool)
        .await?;
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

pub(crate) fn row_to_event(row: &sqlx::sqlite::SqliteRow) -> Event {
    Event {
        id: row.get("id"),
        upstream_event_id: row.get("upstream_event_id"),
        external_id: row.get("external_id"),
        calendar_id: row.get("calendar_id"),
        summary: row.get("summary"),
        description: row.get("description"),
        location: row.get("location"),
        url: row.get("url"),
        start_utc: row.get("start_utc"),
        end_utc: row.get("end_utc"),
        start_tz: row.get("start_tz"),
        end_tz: row.get("end_tz"),
        is_all_day: row.get("is_all_day"),
        recurrence_rule: row.get("recurrence_rule"),
        master_event_id: row.get("master_event_id"),
        occurrence_date_utc: row.get("occurrence_date_utc"),
        status: row.get("status"),
        created_utc: row.get("created_utc"),
        updated_utc: row.get("updated_utc"),
        synced_at: row.get("synced_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{initialize_in_memory, DbKind};

    fn sample_calendar() -> Calendar {
        Calendar {
            id: "cal1".into(),
            upstream_id: "up1".into(),
            title: "Work".into(),
            source_type: "local".into(),
            color: Some("#fff".into()),
            is_subscribed: false,
            is_immutable: false,
            synced_at: 0,
        }
    }

    fn sample_event(id: &str, start_utc: i64) -> Event {
        Event {
            id: id.to_string(),
            upstream_event_id: Some(format!("up-{id}")),
            external_id: None,
            calendar_id: "cal1".into(),
            summary: "Standup".into(),
            description: None,
            location: None,
            url: None,
            start_utc,
            end_utc: start_utc + 1800,
            start_tz: Some("UTC".into()),
            end_tz: Some("UTC".into()),
            is_all_day: false,
            recurrence_rule: None,
            master_event_id: None,
            occurrence_date_utc: None,
            status: "confirmed".into(),
            created_utc: 0,
            updated_utc: 0,
            synced_at: 0,
        }
    }

    async fn make_store() -> CalendarStore {
        let pool = initialize_in_memory(DbKind::Calendar).await.unwrap();
        CalendarStore::new(pool)
    }

    #[tokio::test]
    async fn test_upsert_and_get_event() {
        let store = make_store().await;
        store.upsert_calendar(&sample_calendar()).await.unwrap();
        store.upsert_event(&sample_event("ev1", 1000)).await.unwrap();

        let fetched = store.get_event("ev1").await.unwrap().unwrap();
        assert_eq!(fetched.summary, "Standup");
        assert_eq!(fetched.start_utc, 1000);
    }

    #[tokio::test]
    async fn test_get_events_in_range_is_overlap_inclusive() {
        let store = make_store().await;
        store.upsert_calendar(&sample_calendar()).await.unwrap();
        store.upsert_event(&sample_event("ev1", 1000)).await.unwrap();
        store.upsert_event(&sample_event("ev2", 100_000)).await.unwrap();

        let in_range = store.get_events_in_range("cal1", 0, 2000).await.unwrap();
        assert_eq!(in_range.len(), 1);
        assert_eq!(in_range[0].id, "ev1");
    }

    #[tokio::test]
    async fn test_replace_attendees_is_atomic_swap() {
        let store = make_store().await;
        store.upsert_calendar(&sample_calendar()).await.unwrap();
        store.upsert_event(&sample_event("ev1", 1000)).await.unwrap();

        let first = vec![Attendee {
            event_id: "ev1".into(),
            name: Some("Alice".into()),
            email: Some("alice@example.com".into()),
            response_status: "accepted".into(),
            is_organizer: true,
            is_optional: false,
        }];
        store.replace_attendees("ev1", &first).await.unwrap();
        assert_eq!(store.get_attendees("ev1").await.unwrap().len(), 1);

        let second = vec![
            Attendee {
                event_id: "ev1".into(),
                name: Some("Bob".into()),
                email: Some("bob@example.com".into()),
                response_status: "tentative".into(),
                is_organizer: false,
                is_optional: true,
            },
            Attendee {
                event_id: "ev1".into(),
                name: Some("Carol".into()),
                email: Some("carol@example.com".into()),
                response_status: "needs-action".into(),
                is_organizer: false,
                is_optional: false,
            },
        ];
        store.replace_attendees("ev1", &second).await.unwrap();
        let attendees = store.get_attendees("ev1").await.unwrap();
        assert_eq!(attendees.len(), 2);
        assert!(attendees.iter().all(|a| a.name != Some("Alice".to_string())));
    }

    #[tokio::test]
    async fn test_delete_events_not_in_is_window_scoped() {
        let store = make_store().await;
        store.upsert_calendar(&sample_calendar()).await.unwrap();
        store.upsert_event(&sample_event("ev1", 1000)).await.unwrap();
        store.upsert_event(&sample_event("ev2", 100_000)).await.unwrap();

        let keep: HashSet<String> = HashSet::new();
        let deleted = store
            .delete_events_not_in("cal1", 0, 2000, &keep)
            .await
            .unwrap();
        assert_eq!(deleted, 1);
        assert!(store.get_event("ev1").await.unwrap().is_none());
        assert!(store.get_event("ev2").await.unwrap().is_some());
    }
}
