//! Full calendar sync algorithm.

use super::types::{Attendee, Calendar, Event, EventSnapshot, Reminder};
use super::CalendarSyncError;
use crate::config::CalendarSyncConfig;
use crate::identity::{EventIdentity, IdentityEngine, Reconciliation, DEFAULT_CONTENT_MATCH_TOLERANCE_SECS};
use crate::provider::{CalendarSourceProvider, ProviderError, TimeRange};
use crate::store::CalendarStore;
use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default)]
pub struct CalendarSyncResult {
    pub events_added: u64,
    pub events_updated: u64,
    pub events_deleted: u64,
    pub calendars_processed: u64,
    pub duration: Duration,
    pub warnings: Vec<String>,
}

pub struct CalendarSyncEngine<P: CalendarSourceProvider> {
    store: CalendarStore,
    provider: P,
    config: CalendarSyncConfig,
}

impl<P: CalendarSourceProvider> CalendarSyncEngine<P> {
    pub fn new(store: CalendarStore, provider: P, config: CalendarSyncConfig) -> Self {
        Self { store, provider, config }
    }

    pub fn store(&self) -> &CalendarStore {
        &self.store
    }

    pub async fn sync(&self) -> Result<CalendarSyncResult, CalendarSyncError> {
        let start = Instant::now();
        self.store.set_sync_status("state", "running").await?;

        match self.run().await {
            Ok(mut result) => {
                result.duration = start.elapsed();
                self.store.set_sync_status("state", "success").await?;
                self.store
                    .set_sync_status("last_sync_time", &now_utc().to_string())
                    .await?;
                self.store.set_sync_status("last_sync_error", "").await?;
                info!(
                    added = result.events_added,
                    updated = result.events_updated,
                    deleted = result.events_deleted,
                    "calendar sync completed"
                );
                Ok(result)
            }
            Err(e) => {
                self.store.set_sync_status("state", "failed").await?;
                self.store
                    .set_sync_status("last_sync_error", &e.to_string())
                    .await?;
                warn!(error = %e, "calendar sync failed");
                Err(e)
            }
        }
    }

    async fn run(&self) -> Result<CalendarSyncResult, CalendarSyncError> {
        let access = self.provider.request_access().await;
        if !access.granted {
            return Err(CalendarSyncError::PermissionDenied(
                access.error.unwrap_or_else(|| "calendar access denied".into()),
            ));
        }

        let mut result = CalendarSyncResult::default();

        let now = now_utc();
        let window = TimeRange {
            start_utc: now - self.config.lookback_days * 86_400,
            end_utc: now + self.config.date_range_days * 86_400,
        };
        self.store
            .set_sync_status("date_range_start", &window.start_utc.to_string())
            .await?;
        self.store
            .set_sync_status("date_range_end", &window.end_utc.to_string())
            .await?;

        let calendars = self
            .provider
            .list_calendars()
            .await
            .map_err(map_provider_error)?
            .into_iter()
            .filter(|c| !c.upstream_id.trim().is_empty() && !looks_like_siri_suggestions(&c.title));

        let mut seen_calendar_ids = HashSet::new();

        for snapshot in calendars {
            let calendar_id = format!("cal:{}", snapshot.upstream_id);
            let calendar = Calendar {
                id: calendar_id.clone(),
                upstream_id: snapshot.upstream_id.clone(),
                title: snapshot.title.clone(),
                source_type: snapshot.source_type.clone(),
                color: snapshot.color.clone(),
                is_subscribed: snapshot.is_subscribed,
                is_immutable: snapshot.is_immutable,
                synced_at: now,
            };
            self.store.upsert_calendar(&calendar).await?;
            seen_calendar_ids.insert(calendar_id.clone());
            result.calendars_processed += 1;

            debug!(calendar = %calendar.title, "syncing calendar");

            let events = match self
                .provider
                .list_events(&snapshot.upstream_id, window)
                .await
            {
                Ok(events) => events,
                Err(e) => {
                    result.warnings.push(format!("{}: {e}", calendar.title));
                    continue;
                }
            };

            let (added, updated, seen_event_ids) =
                self.sync_calendar_events(&calendar_id, &events, &mut result).await?;
            result.events_added += added;
            result.events_updated += updated;

            let deleted = self
                .store
                .delete_events_not_in(&calendar_id, window.start_utc, window.end_utc, &seen_event_ids)
                .await?;
            result.events_deleted += deleted;
        }

        self.store.delete_calendars_not_in(&seen_calendar_ids).await?;

        if let Err(e) = self.sync_reminders().await {
            // Best-effort: reminders may have a separate permission grant
            // and never fail the whole calendar sync.
            result.warnings.push(format!("reminders: {e}"));
        }

        Ok(result)
    }

    /// Resolves the public ID for an event snapshot.
    ///
    /// A concrete recurring instance already has a deterministic,
    /// distinct identity (the series external id combined with its own
    /// `occurrence_utc`), so it is addressed directly. A master or
    /// non-recurring event instead goes through identity reconciliation:
    /// its row is first looked up by native upstream id, then (failing
    /// that) by a summary+start content match, so a public ID already
    /// chosen for it is reused even when its `external_id` has drifted.
    /// Only a genuinely unseen event gets a freshly computed ID. Returns
    /// `(public_id, is_update)`.
    async fn resolve_public_id(
        &self,
        calendar_id: &str,
        snapshot: &EventSnapshot,
    ) -> Result<(String, bool), CalendarSyncError> {
        if snapshot.occurrence_utc.is_some() {
            let id = IdentityEngine::event_public_id(
                calendar_id,
                &snapshot.summary,
                snapshot.start_utc,
                snapshot.occurrence_utc,
                snapshot.external_id.as_deref(),
            );
            let is_update = self.store.get_event(&id).await?.is_some();
            return Ok((id, is_update));
        }

        if let Some(upstream_event_id) = snapshot.upstream_event_id.as_deref() {
            if let Some(existing) = self
                .store
                .find_event_by_upstream_event_id(calendar_id, upstream_event_id)
                .await?
            {
                let stored = EventIdentity {
                    local_id: existing.upstream_event_id.clone(),
                    external_id: existing.external_id.clone(),
                    calendar_upstream_id: calendar_id.to_string(),
                };
                let current = EventIdentity {
                    local_id: snapshot.upstream_event_id.clone(),
                    external_id: snapshot.external_id.clone(),
                    calendar_upstream_id: calendar_id.to_string(),
                };
                if !matches!(
                    IdentityEngine::reconcile(Some(&stored), &current),
                    Reconciliation::Match
                ) {
                    debug!(event = %existing.id, "identity drift reconciled via upstream event id, public id kept");
                }
                return Ok((existing.id, true));
            }
        }

        if let Some(existing) = self
            .store
            .find_event_by_content_match(
                calendar_id,
                &snapshot.summary,
                snapshot.start_utc,
                DEFAULT_CONTENT_MATCH_TOLERANCE_SECS,
            )
            .await?
        {
            debug!(event = %existing.id, "identity recovered via content match, public id kept");
            return Ok((existing.id, true));
        }

        let id = IdentityEngine::event_public_id(
            calendar_id,
            &snapshot.summary,
            snapshot.start_utc,
            snapshot.occurrence_utc,
            snapshot.external_id.as_deref(),
        );
        Ok((id, false))
    }

    async fn sync_calendar_events(
        &self,
        calendar_id: &str,
        events: &[EventSnapshot],
        result: &mut CalendarSyncResult,
    ) -> Result<(u64, u64, HashSet<String>), CalendarSyncError> {
        let now = now_utc();

        // Pass 1: resolve public IDs for series masters (no occurrence),
        // so pass 2 can link concrete occurrences back to their series
        // master.
        let mut master_ids_by_external: HashMap<String, String> = HashMap::new();
        for snapshot in events.iter().filter(|e| e.occurrence_utc.is_none()) {
            if let Some(external_id) = snapshot.external_id.as_deref() {
                let (id, _) = self.resolve_public_id(calendar_id, snapshot).await?;
                master_ids_by_external.insert(external_id.to_string(), id);
            }
        }

        let mut added = 0u64;
        let mut updated = 0u64;
        let mut seen_ids = HashSet::new();

        for snapshot in events {
            let (public_id, is_update) = self.resolve_public_id(calendar_id, snapshot).await?;

            let master_event_id = if snapshot.occurrence_utc.is_some() {
                snapshot
                    .external_id
                    .as_deref()
                    .and_then(|ext| master_ids_by_external.get(ext))
                    .cloned()
            } else {
                None
            };

            if is_update {
                updated += 1;
            } else {
                added += 1;
            }

            let (start_utc, end_utc) = if snapshot.is_all_day {
                midnight_align(snapshot.start_utc, snapshot.end_utc)
            } else {
                (snapshot.start_utc, snapshot.end_utc)
            };

            if start_utc > end_utc {
                result
                    .warnings
                    .push(format!("{public_id}: start_utc > end_utc, skipped"));
                continue;
            }

            let event = Event {
                id: public_id.clone(),
                upstream_event_id: snapshot.upstream_event_id.clone(),
                external_id: snapshot.external_id.clone(),
                calendar_id: calendar_id.to_string(),
                summary: snapshot.summary.clone(),
                description: snapshot.description.clone(),
                location: snapshot.location.clone(),
                url: snapshot.url.clone(),
                start_utc,
                end_utc,
                start_tz: snapshot.start_tz.clone(),
                end_tz: snapshot.end_tz.clone(),
                is_all_day: snapshot.is_all_day,
                recurrence_rule: snapshot.recurrence_rule.clone(),
                master_event_id,
                occurrence_date_utc: snapshot.occurrence_utc,
                status: snapshot.status.clone(),
                created_utc: snapshot.created_utc,
                updated_utc: snapshot.updated_utc,
                synced_at: now,
            };
            self.store.upsert_event(&event).await?;

            let mut attendees: Vec<Attendee> = snapshot
                .attendees
                .iter()
                .map(|a| Attendee {
                    event_id: public_id.clone(),
                    name: a.name.clone(),
                    email: a.email.clone(),
                    response_status: a.response_status.clone(),
                    is_organizer: a.is_organizer,
                    is_optional: a.is_optional,
                })
                .collect();
            if !attendees.iter().any(|a| a.is_organizer) {
                if let Some(organizer_email) = snapshot.organizer_email.clone() {
                    attendees.push(Attendee {
                        event_id: public_id.clone(),
                        name: None,
                        email: Some(organizer_email),
                        response_status: "accepted".into(),
                        is_organizer: true,
                        is_optional: false,
                    });
                }
            }
            self.store.replace_attendees(&public_id, &attendees).await?;

            seen_ids.insert(public_id);
        }

        Ok((added, updated, seen_ids))
    }

    async fn sync_reminders(&self) -> Result<(), CalendarSyncError> {
        let reminders = self
            .provider
            .list_reminders(None)
            .await
            .map_err(map_provider_error)?;

        for snapshot in reminders {
            let id = IdentityEngine::reminder_public_id(&snapshot.upstream_id);
            let reminder = Reminder {
                id,
                upstream_id: snapshot.upstream_id.clone(),
                calendar_id: String::new(),
                title: snapshot.title.clone(),
                notes: snapshot.notes.clone(),
                due_utc: snapshot.due_utc,
                priority: snapshot.priority,
                is_completed: snapshot.is_completed,
                completed_utc: snapshot.completed_utc,
                synced_at: now_utc(),
            };
            self.store.upsert_reminder(&reminder).await?;
        }
        Ok(())
    }
}

/// Calendars whose titles resemble auto-generated suggestion calendars
/// are known to crash enumeration upstream and are skipped outright
///.
fn looks_like_siri_suggestions(title: &str) -> bool {
    title.to_lowercase().contains("siri suggestions")
}

/// All-day events store start/end at midnight of the tz-local day
/// converted to UTC; here the snapshot has already resolved that
/// conversion, so this only enforces `start ≤ end` by construction
///.
fn midnight_align(start_utc: i64, end_utc: i64) -> (i64, i64) {
    const DAY: i64 = 86_400;
    let start = (start_utc / DAY) * DAY;
    let end = ((end_utc + DAY - 1) / DAY) * DAY;
    (start, end.max(start))
}

fn map_provider_error(e: ProviderError) -> CalendarSyncError {
    match e {
        ProviderError::AccessDenied(msg) => CalendarSyncError::PermissionDenied(msg),
        ProviderError::Transient(msg) => CalendarSyncError::Transient(msg),
        ProviderError::ReadFailed { item, cause } => CalendarSyncError::Parse { item_id: item, cause },
        ProviderError::Other(msg) => CalendarSyncError::Invalid {
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
