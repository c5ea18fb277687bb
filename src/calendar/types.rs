//! Calendar entity types.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Calendar {
    pub id: String,
    pub upstream_id: String,
    pub title: String,
    pub source_type: String,
    pub color: Option<String>,
    pub is_subscribed: bool,
    pub is_immutable: bool,
    pub synced_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub upstream_event_id: Option<String>,
    pub external_id: Option<String>,
    pub calendar_id: String,
    pub summary: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub url: Option<String>,
    pub start_utc: i64,
    pub end_utc: i64,
    pub start_tz: Option<String>,
    pub end_tz: Option<String>,
    pub is_all_day: bool,
    pub recurrence_rule: Option<String>,
    pub master_event_id: Option<String>,
    pub occurrence_date_utc: Option<i64>,
    pub status: String,
    pub created_utc: i64,
    pub updated_utc: i64,
    pub synced_at: i64,
}

impl Event {
    /// A recurring instance carries its own `occurrence_date_utc` and
    /// points back at the series master.
    pub fn is_recurring_instance(&self) -> bool {
        self.master_event_id.is_some() && self.occurrence_date_utc.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attendee {
    pub event_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub response_status: String,
    pub is_organizer: bool,
    pub is_optional: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reminder {
    pub id: String,
    pub upstream_id: String,
    pub calendar_id: String,
    pub title: String,
    pub notes: Option<String>,
    pub due_utc: Option<i64>,
    pub priority: i64,
    pub is_completed: bool,
    pub completed_utc: Option<i64>,
    pub synced_at: i64,
}

/// A single upstream read of a calendar, handed to the sync engine by the
/// Source Provider.
#[derive(Debug, Clone)]
pub struct CalendarSnapshot {
    pub upstream_id: String,
    pub title: String,
    pub source_type: String,
    pub color: Option<String>,
    pub is_subscribed: bool,
    pub is_immutable: bool,
}

/// A single upstream read of an event, handed to the sync engine by the
/// Source Provider.
#[derive(Debug, Clone)]
pub struct EventSnapshot {
    pub upstream_event_id: Option<String>,
    pub external_id: Option<String>,
    pub summary: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub url: Option<String>,
    pub start_utc: i64,
    pub end_utc: i64,
    pub start_tz: Option<String>,
    pub end_tz: Option<String>,
    pub is_all_day: bool,
    pub recurrence_rule: Option<String>,
    pub occurrence_utc: Option<i64>,
    pub status: String,
    pub created_utc: i64,
    pub updated_utc: i64,
    pub attendees: Vec<AttendeeSnapshot>,
    /// The organizer's email when the upstream store reports it
    /// separately from the attendee list (e.g. a CalDAV `ORGANIZER`
    /// property with no matching `ATTENDEE` entry for itself).
    pub organizer_email: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AttendeeSnapshot {
    pub name: Option<String>,
    pub email: Option<String>,
    pub response_status: String,
    pub is_organizer: bool,
    pub is_optional: bool,
}

/// A single upstream read of a reminder.
#[derive(Debug, Clone)]
pub struct ReminderSnapshot {
    pub upstream_id: String,
    pub title: String,
    pub notes: Option<String>,
    pub due_utc: Option<i64>,
    pub priority: i64,
    pub is_completed: bool,
    pub completed_utc: Option<i64>,
}
