//! JSON export envelope: the stable contract consumers
//! (CLI, agents) parse.

use crate::calendar::types::{Attendee, Event};
use crate::mail::types::MailMessage;
use chrono::{TimeZone, Utc};
use serde::Serialize;

/// `{ "version": "1.0", "query": string?, "total": int, "items": [...] }`
///. Every date inside `items` is ISO-8601 UTC with a `Z`
/// suffix, or `YYYY-MM-DD` when the item is an all-day event.
#[derive(Debug, Clone, Serialize)]
pub struct JsonEnvelope<T: Serialize> {
    pub version: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    pub total: usize,
    pub items: Vec<T>,
}

impl<T: Serialize> JsonEnvelope<T> {
    pub fn new(query: Option<String>, items: Vec<T>) -> Self {
        Self {
            version: "1.0",
            total: items.len(),
            query,
            items,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageJson {
    pub id: String,
    pub subject: String,
    pub from_name: Option<String>,
    pub from_email: Option<String>,
    pub date: String,
    pub mailbox_id: String,
    pub is_read: bool,
    pub is_flagged: bool,
    pub has_attachments: bool,
}

impl From<&MailMessage> for MessageJson {
    fn from(m: &MailMessage) -> Self {
        Self {
            id: m.id.clone(),
            subject: m.subject.clone(),
            from_name: m.sender_name.clone(),
            from_email: m.sender_email.clone(),
            date: iso8601_utc(m.date_sent_utc),
            mailbox_id: m.mailbox_id.clone(),
            is_read: m.is_read,
            is_flagged: m.is_flagged,
            has_attachments: m.has_attachments,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AttendeeJson {
    pub name: Option<String>,
    pub email: Option<String>,
    pub response_status: String,
    pub is_organizer: bool,
}

impl From<&Attendee> for AttendeeJson {
    fn from(a: &Attendee) -> Self {
        Self {
            name: a.name.clone(),
            email: a.email.clone(),
            response_status: a.response_status.clone(),
            is_organizer: a.is_organizer,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EventJson {
    pub id: String,
    pub calendar_id: String,
    pub summary: String,
    pub location: Option<String>,
    pub start: String,
    pub end: String,
    pub is_all_day: bool,
    pub attendees: Vec<AttendeeJson>,
}

impl EventJson {
    pub fn from_event(event: &Event, attendees: &[Attendee]) -> Self {
        let date_fmt = if event.is_all_day { date_only } else { iso8601_utc };
        Self {
            id: event.id.clone(),
            calendar_id: event.calendar_id.clone(),
            summary: event.summary.clone(),
            location: event.location.clone(),
            start: date_fmt(event.start_utc),
            end: date_fmt(event.end_utc),
            is_all_day: event.is_all_day,
            attendees: attendees.iter().map(AttendeeJson::from).collect(),
        }
    }
}

fn iso8601_utc(seconds: i64) -> String {
    Utc.timestamp_opt(seconds, 0)
        .single()
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
        .unwrap_or_default()
}

fn date_only(seconds: i64) -> String {
    Utc.timestamp_opt(seconds, 0)
        .single()
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}
